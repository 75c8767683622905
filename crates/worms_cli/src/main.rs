//! `worms` console entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and `WORMS_*` variables.
//! - Open the catalog store, optionally seed it, and replay a console script.
//! - Pretty-print result sets; timestamps render as RFC 3339.

use clap::Parser;
use log::info;
use serde_json::Value as Json;
use std::error::Error;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use worms_core::console::run_script;
use worms_core::db::{open_db, open_db_in_memory};
use worms_core::model::value::format_epoch_ms;
use worms_core::{
    init_logging, CatalogConfig, CatalogService, SqliteCatalogRepository, StatementOutput,
    DEMO_SCRIPT,
};

#[derive(Debug, Parser)]
#[command(name = "worms", version, about = "WoRMS marine species catalog console")]
struct Cli {
    /// SQLite database file. Defaults to $WORMS_DB_PATH, else in-memory.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Insert the demo dataset before running statements.
    #[arg(long)]
    seed: bool,
    /// Console script to run. Reads stdin when neither --script nor --demo is given.
    #[arg(long, conflicts_with = "demo")]
    script: Option<PathBuf>,
    /// Run the bundled walkthrough script.
    #[arg(long)]
    demo: bool,
    /// trace|debug|info|warn|error. Defaults to $WORMS_LOG_LEVEL.
    #[arg(long)]
    log_level: Option<String>,
    /// Absolute directory for rolling log files. Defaults to $WORMS_LOG_DIR.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = CatalogConfig::from_env()?.with_overrides(
        cli.db,
        cli.log_level.as_deref(),
        cli.log_dir,
    )?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, &log_dir.to_string_lossy())?;
    }
    info!(
        "event=cli_start module=cli status=ok version={} persistent={}",
        worms_core::core_version(),
        config.db_path.is_some()
    );

    let conn = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    if cli.seed {
        let service = CatalogService::new(SqliteCatalogRepository::try_new(&conn)?);
        let summary = service.seed_demo()?;
        println!(
            "seeded species={} taxonomy={} distribution={}",
            summary.species, summary.taxonomy, summary.distribution
        );
    }

    let script = match (cli.script, cli.demo) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, true) => DEMO_SCRIPT.to_string(),
        (None, false) => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let repo = SqliteCatalogRepository::try_new(&conn)?;
    let report = run_script(&repo, &script);
    for statement in &report.statements {
        println!("> {}", first_line(&statement.source));
        match &statement.result {
            Ok(output) => println!("{}", render(output)?),
            Err(err) => println!("! line {}: {err}", statement.line),
        }
    }

    eprintln!(
        "{} statements, {} failed{}",
        report.statements.len(),
        report.failures(),
        if report.aborted {
            ", aborted: store unavailable"
        } else {
            ""
        }
    );
    Ok(if report.aborted {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn first_line(source: &str) -> String {
    let mut lines = source.lines();
    let first = lines.next().unwrap_or_default().trim();
    if lines.next().is_some() {
        format!("{first} ...")
    } else {
        first.to_string()
    }
}

fn render(output: &StatementOutput) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(output)?;
    humanize_timestamps(&mut value);
    serde_json::to_string_pretty(&value)
}

fn humanize_timestamps(value: &mut Json) {
    match value {
        Json::Object(object) => {
            for (key, field) in object.iter_mut() {
                if key == "createdAt" || key == "updatedAt" {
                    if let Some(text) = field.as_i64().and_then(format_epoch_ms) {
                        *field = Json::String(text);
                        continue;
                    }
                }
                humanize_timestamps(field);
            }
        }
        Json::Array(items) => items.iter_mut().for_each(humanize_timestamps),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::{first_line, humanize_timestamps};
    use serde_json::json;

    #[test]
    fn timestamps_render_as_rfc3339_at_any_depth() {
        let mut value = json!({
            "documents": [{"updatedAt": 0, "distribution_info": {"createdAt": 1_000}}]
        });
        humanize_timestamps(&mut value);
        assert_eq!(value["documents"][0]["updatedAt"], "1970-01-01T00:00:00.000Z");
        assert_eq!(
            value["documents"][0]["distribution_info"]["createdAt"],
            "1970-01-01T00:00:01.000Z"
        );
    }

    #[test]
    fn multiline_sources_are_abbreviated() {
        assert_eq!(first_line("species.find()"), "species.find()");
        assert_eq!(first_line("species.insertMany([\n{}\n])"), "species.insertMany([ ...");
    }
}
