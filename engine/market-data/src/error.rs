//! Error types for the market data stores

use std::fmt;
use thiserror::Error;

/// Result type alias for loading operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while loading a CSV source
#[derive(Error, Debug)]
pub enum LoadError {
    /// File missing or unreadable
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The file has no header row at all
    #[error("No columns to parse from file")]
    NoColumns,

    /// The file has fewer columns than the table needs
    #[error("Expected at least {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    /// A required column label was not found in the header
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A date cell that must parse did not
    #[error("Invalid date '{value}' at row {row}")]
    InvalidDate { row: usize, value: String },

    /// A numeric cell held something other than a number
    #[error("Invalid number '{value}' in column '{column}' at row {row}")]
    InvalidNumber { row: usize, column: String, value: String },

    /// A row carried more fields than the header declares
    #[error("Expected at most {expected} fields at row {row}, found {found}")]
    ExtraFields { row: usize, expected: usize, found: usize },
}

impl LoadError {
    /// Create a new missing column error
    pub fn missing_column(label: impl Into<String>) -> Self {
        Self::MissingColumn(label.into())
    }
}

/// Which store a query was issued against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Prices,
    Events,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Prices => write!(f, "price"),
            StoreKind::Events => write!(f, "event"),
        }
    }
}

/// A query was issued against a store whose load failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{store} data unavailable")]
pub struct DataUnavailable {
    pub store: StoreKind,
}

impl DataUnavailable {
    pub fn new(store: StoreKind) -> Self {
        Self { store }
    }
}
