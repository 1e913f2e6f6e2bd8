use std::path::PathBuf;


/// Fatal conditions.  Any of these aborts the run without producing a ledger.
#[derive(thiserror::Error, Debug)]
pub enum RidershipError {
    #[error("unable to construct street graph from {path:?}: {reason}")]
    GraphConstruction { path: PathBuf, reason: String },
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },
    #[error("bad configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RidershipError {
    pub fn malformed(line: u64, reason: impl Into<String>) -> RidershipError {
        RidershipError::MalformedRecord { line, reason: reason.into() }
    }
}
