//! Concurrent, order-preserving batch enrichment.
//!
//! Every record is enriched independently on a bounded rayon pool; results
//! are collected positionally, so the output order always equals the input
//! order no matter how the lookups interleave. The first error aborts the
//! batch: a shared flag stops workers from starting further network
//! lookups, in-flight siblings finish, their results are discarded, and
//! the lowest-input-index error is surfaced.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::cache::CategoryCache;
use crate::mcc;
use crate::statement::Record;

/// Upper bound on concurrent reference lookups.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Code column value for records without an MCC token.
const MISSING_CODE: i32 = -1;

/// A record plus the two derived columns. Built exactly once per input
/// record; a record without a code is a valid outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedRecord {
    pub fields: Vec<String>,
    pub code: String,
    pub category: String,
}

impl ExtendedRecord {
    fn resolved(record: &Record, code: u32, name: &str) -> Self {
        Self {
            fields: record.fields.clone(),
            code: code.to_string(),
            category: format!("{name} (MCC: {code})"),
        }
    }

    fn missing(record: &Record) -> Self {
        Self {
            fields: record.fields.clone(),
            code: MISSING_CODE.to_string(),
            category: format!("Warning: MCC not found (MCC: {MISSING_CODE})"),
        }
    }
}

pub struct Extender {
    cache: CategoryCache,
    max_concurrent: usize,
}

impl Extender {
    pub fn new(cache: CategoryCache, max_concurrent: usize) -> Self {
        Self {
            cache,
            max_concurrent,
        }
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    /// Enrich a batch. The result has the same length and order as the
    /// input; on any failure the whole batch fails and partial results
    /// are dropped.
    pub fn extend(&self, records: &[Record]) -> Result<Vec<ExtendedRecord>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let threads = self.max_concurrent.clamp(1, records.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("failed to build enrichment worker pool")?;

        let cancelled = AtomicBool::new(false);
        let results: Vec<Result<Option<ExtendedRecord>>> = pool.install(|| {
            records
                .par_iter()
                .map(|record| {
                    let result = self.extend_record(record, &cancelled);
                    if result.is_err() {
                        cancelled.store(true, Ordering::Relaxed);
                    }
                    result
                })
                .collect()
        });

        // Results are positional, so scanning in order makes the
        // lowest-input-index error the one surfaced.
        let mut extended = Vec::with_capacity(records.len());
        for result in results {
            match result {
                Ok(Some(record)) => extended.push(record),
                // Worker skipped after a sibling failed; that failure
                // follows in the scan.
                Ok(None) => {}
                Err(err) => return Err(err),
            }
        }

        debug_assert_eq!(extended.len(), records.len());
        Ok(extended)
    }

    fn extend_record(
        &self,
        record: &Record,
        cancelled: &AtomicBool,
    ) -> Result<Option<ExtendedRecord>> {
        // Extraction always runs: ambiguity is detected even for records
        // scheduled after a failure, keeping the surfaced error stable.
        let code = mcc::extract_from_fields(record.fields.iter().map(String::as_str))?;

        match code {
            None => Ok(Some(ExtendedRecord::missing(record))),
            Some(code) => {
                if cancelled.load(Ordering::Relaxed) {
                    return Ok(None);
                }
                let name = self.cache.resolve(code)?;
                Ok(Some(ExtendedRecord::resolved(record, code, &name)))
            }
        }
    }
}
