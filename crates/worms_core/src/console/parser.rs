//! Statement splitting and parsing for console scripts.
//!
//! Syntax: `[db.]<collection>.<method>(<json args>)[;]`. A statement may span
//! several lines and ends once its brackets balance. `//` outside a string
//! starts a comment that runs to the end of the line.

use crate::console::ConsoleError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;

static STATEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?:db\.)?([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z]+)\((.*)\)\s*;?$")
        .expect("valid statement regex")
});

/// Unparsed statement text with its starting line (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub line: usize,
    pub text: String,
}

/// Parsed console statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub collection: String,
    pub method: String,
    pub args: Vec<Json>,
}

#[derive(Default)]
struct BracketState {
    depth: usize,
    opened: bool,
    in_string: bool,
    escaped: bool,
}

impl BracketState {
    fn feed(&mut self, ch: char) {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return;
        }
        match ch {
            '"' => self.in_string = true,
            '(' | '[' | '{' => {
                self.depth += 1;
                self.opened = true;
            }
            ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
    }

    fn is_complete(&self) -> bool {
        self.opened && self.depth == 0 && !self.in_string
    }
}

#[derive(Default)]
struct Splitter {
    statements: Vec<RawStatement>,
    buffer: String,
    start_line: usize,
    state: BracketState,
}

impl Splitter {
    fn feed_line(&mut self, line_no: usize, line: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }

        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            if !self.state.in_string {
                if ch == '/' && chars.peek() == Some(&'/') {
                    break;
                }
                if self.buffer.is_empty() && (ch.is_whitespace() || ch == ';') {
                    continue;
                }
            }

            if self.buffer.is_empty() {
                self.start_line = line_no;
            }
            self.buffer.push(ch);
            self.state.feed(ch);

            if self.state.is_complete() {
                while chars.next_if(|next| next.is_whitespace()).is_some() {}
                if chars.next_if_eq(&';').is_some() {
                    self.buffer.push(';');
                }
                self.emit();
            }
        }

        // Text without any bracket cannot continue on the next line.
        if !self.state.opened && !self.state.in_string {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        let text = text.trim();
        if !text.is_empty() {
            self.statements.push(RawStatement {
                line: self.start_line,
                text: text.to_string(),
            });
        }
        self.state = BracketState::default();
    }

    fn finish(mut self) -> Vec<RawStatement> {
        self.emit();
        self.statements
    }
}

/// Splits a script into statements, dropping blank lines and `//` comments.
///
/// Several statements may share a line; each ends where its brackets
/// balance. An unterminated trailing statement is still returned so the
/// parser can report it.
pub fn split_statements(script: &str) -> Vec<RawStatement> {
    let mut splitter = Splitter::default();
    for (index, line) in script.lines().enumerate() {
        splitter.feed_line(index + 1, line);
    }
    splitter.finish()
}

/// Parses one statement into collection, method and JSON arguments.
pub fn parse_statement(raw: &RawStatement) -> Result<Statement, ConsoleError> {
    let syntax = |message: String| ConsoleError::Syntax {
        line: raw.line,
        message,
    };

    let captures = STATEMENT_RE
        .captures(raw.text.trim())
        .ok_or_else(|| syntax("expected `<collection>.<method>(<args>)`".to_string()))?;

    let args_text = captures.get(3).map_or("", |m| m.as_str());
    let args = match serde_json::from_str::<Json>(&format!("[{args_text}]")) {
        Ok(Json::Array(args)) => args,
        Ok(_) => return Err(syntax("arguments must be JSON values".to_string())),
        Err(err) => return Err(syntax(format!("invalid JSON arguments: {err}"))),
    };

    Ok(Statement {
        line: raw.line,
        collection: captures[1].to_string(),
        method: captures[2].to_string(),
        args,
    })
}
