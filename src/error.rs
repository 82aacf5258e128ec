//! Errors surfaced by the pipeline. Missing numeric values are not errors,
//! they are recovered locally by dropping the row or carrying NaN.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A raw line did not split into exactly 17 fields. Aborts the current
    /// file; the organizer continues with the next one.
    #[error("{}:{line}: expected {expected} fields, found {found}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Two files in a merge have different column sets. Fatal for the merge,
    /// no partial output is produced.
    #[error("{}: header {found:?} does not match rest of corpus {expected:?}", path.display())]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A merge or extraction ran over zero usable rows.
    #[error("empty corpus: {0}")]
    EmptyCorpus(String),

    /// The regression collaborator could not produce a solution.
    #[error("regression failed for {product}: {reason}")]
    Regression { product: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
