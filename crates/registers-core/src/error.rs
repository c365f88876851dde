use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the death-register pipeline.
///
/// Every variant is fatal for the run: a dataset with silently missing
/// periods is worse than no dataset.  Unparseable age fields are not errors
/// and never reach this type.
#[derive(Error, Debug)]
pub enum RegisterError {
    /// A period source file is missing or could not be read.
    #[error("Failed to read period file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited structure of a period file could not be parsed.
    #[error("Malformed period file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A data row has more cells than the header row.
    #[error("Malformed period file {path}: line {line} has {found} fields, header has {expected}")]
    RowWidth {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A required column is absent from a period file's header row.
    #[error("Period file {path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An output file could not be written.
    #[error("Failed to write output file {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Pass-through for CSV errors raised outside a period file.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Convenience alias used throughout the register crates.
pub type Result<T> = std::result::Result<T, RegisterError>;
