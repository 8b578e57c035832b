//! Error types.
//!
//! Plumbing (file I/O, config, CLI) uses `anyhow` with context. The budget core reports the
//! user-facing failure kinds through `BudgetError` so that callers can tell a malformed import
//! apart from an advisory export warning.

use crate::model::{CategoryId, FieldKey};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The failure kinds of the budget core. All of them are recoverable by the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetError {
    /// The document does not match any supported import shape.
    #[error("Unsupported or malformed document: {0}")]
    Format(String),

    /// An export was attempted while no raw field holds a value.
    #[error("The report is empty; nothing has been entered yet (use --force to export anyway)")]
    EmptyReport,

    /// The static export did not contain the same number of tagged fields as the form.
    #[error("Static export produced {found} tagged fields but {expected} were expected")]
    StructuralMismatch { expected: usize, found: usize },

    #[error("Unknown fund category '{0}'")]
    UnknownCategory(String),

    #[error("Field '{field}' does not belong to category '{category}'")]
    UnknownField { category: CategoryId, field: String },

    #[error("Field '{field}' is derived in category '{category}' and cannot be edited")]
    DerivedField { category: CategoryId, field: FieldKey },

    #[error("Row {index} does not exist in category '{category}' ({len} rows)")]
    RowIndex {
        category: CategoryId,
        index: usize,
        len: usize,
    },

    #[error("Entry {index} does not exist in the aggregation ({len} entries)")]
    EntryIndex { index: usize, len: usize },
}

impl BudgetError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        BudgetError::Format(message.into())
    }
}
