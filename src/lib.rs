//! # mcc-import
//!
//! Extends bank statement exports with the merchant category resolved from
//! the MCC code embedded in each transaction's free text. Codes are resolved
//! against a local reference file first; unknown codes are looked up on the
//! reference site and written back to the file so later runs stay offline.
//!
//! ## Architecture
//!
//! - **mcc**: MCC token extraction from free-text fields
//! - **cache**: two-tier code-to-name cache shared by concurrent workers
//! - **remote**: reference-site lookup client for unresolved codes
//! - **extend**: concurrent, order-preserving batch enrichment
//! - **codes**: reference-file loading and persistence
//! - **statement**: statement-file ingestion, merging and output
//! - **error**: the error taxonomy surfaced to the CLI
//! - **cli**: command-line surface
//! - **config**: reference-file path resolution

pub mod cache;
pub mod cli;
pub mod codes;
pub mod config;
pub mod error;
pub mod extend;
pub mod mcc;
pub mod remote;
pub mod statement;
