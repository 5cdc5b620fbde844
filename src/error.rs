use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum WormbaitError {
    #[error("no identifiers to process: {0}")]
    #[diagnostic(help("enter one or more XLOC ids separated by newlines, commas or spaces"))]
    InvalidInput(String),

    #[error("no database file given")]
    #[diagnostic(help("pass --database or set deg_file in wormbait.json"))]
    MissingDatabasePath,

    #[error("no output file given")]
    #[diagnostic(help("pass --output or set out_file in wormbait.json"))]
    MissingOutputPath,

    #[error("malformed table at line {line}: expected {expected} columns, found {found}")]
    MalformedTable {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("malformed table: {0}")]
    MalformedHeader(String),

    #[error("failed to read database file {path}: {message}")]
    DatabaseRead { path: PathBuf, message: String },

    #[error("WormBase request failed: {0}")]
    RemoteHttp(String),

    #[error("WormBase returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("WormBase response is not JSON: {0}")]
    RemoteDecode(String),

    #[error("WormBase response has no data for field {0}")]
    FieldMissing(String),

    #[error("failed to write output table {path}: {message}")]
    OutputWrite { path: PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to save preferences: {0}")]
    ConfigWrite(String),

    #[error("run cancelled")]
    Cancelled,
}

impl WormbaitError {
    /// Remote failures are absorbed per field and never abort a run.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            WormbaitError::RemoteHttp(_)
                | WormbaitError::RemoteStatus { .. }
                | WormbaitError::RemoteDecode(_)
                | WormbaitError::FieldMissing(_)
        )
    }
}
