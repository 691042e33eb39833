//! Statement-file ingestion, merging and output.
//!
//! Statements are `;`-delimited text with a header row. Rows are kept as
//! raw fields in file order; the engine appends `MCC` and `Category` and
//! the output keeps the input header plus those two columns. Input files
//! are read as UTF-8.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::extend::ExtendedRecord;

pub const EXTRA_COLUMNS: [&str; 2] = ["MCC", "Category"];

/// One statement row exactly as read, field order following the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// Read one statement file: `.csv` extension, a header row, at least one
/// data row, and every row as wide as the header.
pub fn load(path: &Path) -> Result<Statement> {
    let file = path.display().to_string();

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(Error::InvalidInputFormat {
            file,
            detail: "expected a \".csv\" file".to_string(),
        }
        .into());
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open statement file: {file}"))?;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::InvalidInputFormat {
            file: file.clone(),
            detail: e.to_string(),
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    if rows.len() < 2 {
        return Err(Error::InvalidInputFormat {
            file,
            detail: "expected a header row and at least one data row".to_string(),
        }
        .into());
    }

    let headers = rows.remove(0);
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != headers.len() {
            return Err(Error::InvalidInputFormat {
                file,
                // idx is 0-based over data rows; +2 accounts for the header line.
                detail: format!(
                    "line {} has {} fields, the header has {}",
                    idx + 2,
                    row.len(),
                    headers.len()
                ),
            }
            .into());
        }
    }

    Ok(Statement {
        headers,
        records: rows.into_iter().map(Record::new).collect(),
    })
}

/// Read and concatenate several statement files in order. All files must
/// carry the same header row; the first mismatching file fails the run.
pub fn load_merged(paths: &[PathBuf]) -> Result<Statement> {
    let mut merged: Option<Statement> = None;
    for path in paths {
        let statement = load(path)?;
        match merged.as_mut() {
            None => merged = Some(statement),
            Some(first) => {
                if statement.headers != first.headers {
                    return Err(Error::InvalidInputFormat {
                        file: path.display().to_string(),
                        detail: format!(
                            "header row differs from {}",
                            paths[0].display()
                        ),
                    }
                    .into());
                }
                first.records.extend(statement.records);
            }
        }
    }

    merged.context("no input files given")
}

/// Default output path: `{stem}-out.{ext}` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("statement");
    let ext = input.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    input.with_file_name(format!("{stem}-out.{ext}"))
}

/// Write the extended rows with the input header plus `MCC` and `Category`.
pub fn write_extended(path: &Path, headers: &[String], rows: &[ExtendedRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("failed to create output file: {}", path.display()))?;

    let mut header_row: Vec<&str> = headers.iter().map(String::as_str).collect();
    header_row.extend(EXTRA_COLUMNS);
    writer.write_record(&header_row)?;

    for row in rows {
        let mut out: Vec<&str> = row.fields.iter().map(String::as_str).collect();
        out.push(&row.code);
        out.push(&row.category);
        writer.write_record(&out)?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to write output file: {}", path.display()))?;
    Ok(())
}
