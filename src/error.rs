// ❗ Planner errors
// Everything that can fail sits at a file boundary; the grade math never does.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("transcript {path} ends inside the header block ({rows} of {expected} rows)")]
    TruncatedHeader {
        path: PathBuf,
        rows: usize,
        expected: usize,
    },

    #[error("section listing has no usable '{0}' column")]
    MissingColumn(&'static str),

    #[error("catalog: {0}")]
    InvalidCatalog(String),
}

pub type PlannerResult<T> = std::result::Result<T, PlannerError>;
