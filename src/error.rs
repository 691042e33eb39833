//! Error taxonomy for the enrichment run.
//!
//! Every variant aborts the whole batch: a bad record or a failed lookup is
//! surfaced to the caller instead of being skipped per row. Library functions
//! return `anyhow::Result`, so callers that care about a specific failure
//! recover the variant with `downcast_ref::<Error>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("record has two or more MCC candidates ({})", join_codes(.0))]
    AmbiguousCode(Vec<u32>),

    #[error("reference site unavailable for MCC {code}: {reason}")]
    LookupUnavailable { code: u32, reason: String },

    #[error("reference site has no entry for MCC {code}")]
    CodeNotFound { code: u32 },

    #[error("reference page for MCC {code} is malformed: {detail}")]
    MalformedPage { code: u32, detail: String },

    #[error("reference file {file} has an invalid line: {line:?}")]
    InvalidCacheFile { file: String, line: String },

    #[error("invalid input file {file}: {detail}")]
    InvalidInputFormat { file: String, detail: String },
}

fn join_codes(codes: &[u32]) -> String {
    codes
        .iter()
        .map(|code| code.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
