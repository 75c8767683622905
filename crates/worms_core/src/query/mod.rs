//! Filter and update documents.
//!
//! # Responsibility
//! - Provide typed filter/update values with builder APIs.
//! - Parse JSON filter/update/record documents used by the console.
//! - Reject malformed documents before they reach storage.
//!
//! # Invariants
//! - Filter clauses are ANDed.
//! - Absent and `null` optional fields are indistinguishable.
//! - Relative timestamps (`$ago`) resolve against a caller-provided `now`.

pub mod document;
pub mod filter;
pub mod update;
