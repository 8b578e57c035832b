//! Command handlers for the budget CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod aggregate;
mod export;
mod form;
mod import;
mod init;
mod row;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use aggregate::{
    aggregate_add, aggregate_clear, aggregate_list, aggregate_remove, aggregate_summary,
    AddReport, EntryView,
};
pub use export::{export, ExportReport};
pub use form::{labels, meta, show, FieldView, SectionView};
pub use import::{import, ImportReport};
pub use init::init;
pub use row::{row_add, row_remove, row_set, RowChange};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data that callers of the library can inspect.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}
