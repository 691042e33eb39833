//! Reference-file loading and persistence.
//!
//! The file is `;`-delimited: an opaque header line kept verbatim, then one
//! `code;name` row per MCC, sorted ascending by code on every save. Saving
//! goes through a sibling temp file and a rename, so a crash mid-write
//! leaves the previous file intact for the next run.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_HEADER: &str = "MCC;Category";

#[derive(Debug, Clone)]
pub struct CodesFile {
    pub header: String,
    pub entries: HashMap<u32, String>,
}

/// Parse the reference file into a cache seed. A missing or empty file is
/// a valid first-run state and yields an empty seed with the default
/// header; a present line that is not a `code;name` pair is an error
/// naming the file and the line.
pub fn load(path: &Path) -> Result<CodesFile> {
    let file = path.display().to_string();

    if !path.exists() {
        return Ok(CodesFile {
            header: DEFAULT_HEADER.to_string(),
            entries: HashMap::new(),
        });
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read reference file: {file}"))?;
    if text.trim().is_empty() {
        return Ok(CodesFile {
            header: DEFAULT_HEADER.to_string(),
            entries: HashMap::new(),
        });
    }

    let mut lines = text.lines().map(|l| l.strip_suffix('\r').unwrap_or(l));
    let header = lines
        .next()
        .unwrap_or(DEFAULT_HEADER)
        .to_string();

    let mut entries = HashMap::new();
    for line in lines {
        let invalid = |line: &str| Error::InvalidCacheFile {
            file: file.clone(),
            line: line.to_string(),
        };

        let parts: Vec<&str> = line.split(';').collect();
        if parts.len() != 2 {
            return Err(invalid(line).into());
        }

        let code: u32 = parts[0].trim().parse().map_err(|_| invalid(line))?;
        if entries.insert(code, parts[1].to_string()).is_some() {
            // Same code twice: the file is corrupt rather than merely stale.
            return Err(invalid(line).into());
        }
    }

    Ok(CodesFile { header, entries })
}

/// Rewrite the reference file from a cache snapshot: preserved header,
/// then `code;name` rows ascending by code. Atomic replace via temp file
/// and rename.
pub fn save(path: &Path, header: &str, entries: &HashMap<u32, String>) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create reference directory: {}", parent.display())
        })?;
    }

    let sorted: BTreeMap<u32, &String> = entries.iter().map(|(k, v)| (*k, v)).collect();
    let mut out = String::with_capacity(text_size_hint(header, entries));
    out.push_str(header);
    out.push('\n');
    for (code, name) in sorted {
        out.push_str(&format!("{code};{name}\n"));
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, out)
        .with_context(|| format!("failed to write temp reference file: {}", tmp.display()))?;

    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to replace reference file: {}",
            path.display()
        )
    })?;
    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

fn text_size_hint(header: &str, entries: &HashMap<u32, String>) -> usize {
    header.len() + 1 + entries.values().map(|name| name.len() + 8).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "mcc_import_codes_test_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    fn entries(pairs: &[(u32, &str)]) -> HashMap<u32, String> {
        pairs
            .iter()
            .map(|(code, name)| (*code, name.to_string()))
            .collect()
    }

    #[test]
    fn missing_file_yields_an_empty_seed() -> Result<()> {
        let base = temp_dir("missing");
        let loaded = load(&base.join("mcc-codes.csv"))?;
        assert_eq!(loaded.header, DEFAULT_HEADER);
        assert!(loaded.entries.is_empty());
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips_and_sorts_by_code() -> Result<()> {
        let base = temp_dir("round_trip");
        let path = base.join("mcc-codes.csv");

        let original = entries(&[(5812, "Eating places"), (4111, "Local transport")]);
        save(&path, "MCC;Описание", &original)?;

        let written = fs::read_to_string(&path)?;
        assert_eq!(
            written,
            "MCC;Описание\n4111;Local transport\n5812;Eating places\n"
        );

        let loaded = load(&path)?;
        assert_eq!(loaded.header, "MCC;Описание");
        assert_eq!(loaded.entries, original);

        let _ = fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn wrong_field_count_names_file_and_line() -> Result<()> {
        let base = temp_dir("bad_width");
        let path = base.join("mcc-codes.csv");
        fs::create_dir_all(&base)?;
        fs::write(&path, "MCC;Category\n5812;Eating places;extra\n")?;

        let err = load(&path).unwrap_err();
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidCacheFile { file, line }) => {
                assert!(file.contains("mcc-codes.csv"));
                assert_eq!(line, "5812;Eating places;extra");
            }
            other => panic!("expected InvalidCacheFile, got {other:?}"),
        }

        let _ = fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn non_numeric_code_is_rejected() -> Result<()> {
        let base = temp_dir("bad_code");
        let path = base.join("mcc-codes.csv");
        fs::create_dir_all(&base)?;
        fs::write(&path, "MCC;Category\nx812;Eating places\n")?;

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidCacheFile { .. })
        ));

        let _ = fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn duplicate_code_is_rejected() -> Result<()> {
        let base = temp_dir("dup_code");
        let path = base.join("mcc-codes.csv");
        fs::create_dir_all(&base)?;
        fs::write(&path, "MCC;Category\n5812;Eating places\n5812;Eating places\n")?;

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidCacheFile { .. })
        ));

        let _ = fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn save_replaces_an_existing_file_without_leftovers() -> Result<()> {
        let base = temp_dir("replace");
        let path = base.join("mcc-codes.csv");
        save(&path, DEFAULT_HEADER, &entries(&[(5812, "Eating places")]))?;
        save(
            &path,
            DEFAULT_HEADER,
            &entries(&[(5812, "Eating places"), (5411, "Grocery stores")]),
        )?;

        let written = fs::read_to_string(&path)?;
        assert_eq!(
            written,
            "MCC;Category\n5411;Grocery stores\n5812;Eating places\n"
        );
        assert!(!tmp_path(&path).exists());

        let _ = fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn windows_line_endings_are_accepted() -> Result<()> {
        let base = temp_dir("crlf");
        let path = base.join("mcc-codes.csv");
        fs::create_dir_all(&base)?;
        fs::write(&path, "MCC;Category\r\n5812;Eating places\r\n")?;

        let loaded = load(&path)?;
        assert_eq!(loaded.entries[&5812], "Eating places");

        let _ = fs::remove_dir_all(base);
        Ok(())
    }
}
