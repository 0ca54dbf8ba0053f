//! Data model shared by the read and write paths.
//!
//! Parsers deliver [`CellEvent`]s, record sinks turn them into [`Record`]s,
//! and the writer accepts rows of [`CellValue`]s.

mod cell;
mod record;

pub use cell::*;
pub use record::*;
