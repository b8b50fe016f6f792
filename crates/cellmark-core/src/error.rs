//! Errors raised while loading detection tables.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    /// I/O error while reading a table or listing a results folder
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} is not a valid directory")]
    NotADirectory { path: PathBuf },

    #[error("{path:?} has no header line")]
    EmptyFile { path: PathBuf },

    /// A column named in the column map is absent from the header
    #[error("Missing required column '{column}' in {path:?}")]
    MissingColumn { column: String, path: PathBuf },

    /// A box coordinate could not be read as a number
    #[error("Malformed box at line {line}: column '{column}' has value '{value}'")]
    MalformedBox {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Invalid number at line {line}: column '{column}' has value '{value}'")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
}
