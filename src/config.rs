use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::codes::tmp_path;

pub const CODES_FILE_NAME: &str = "mcc-codes.csv";

/// Reference-file resolution: explicit flag, then a file in the working
/// directory, then the per-user data directory.
pub fn resolve_codes_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.codes.clone() {
        return Ok(p);
    }

    let local = PathBuf::from(CODES_FILE_NAME);
    if local.exists() {
        return Ok(local);
    }

    Ok(mcc_import_home()?.join(CODES_FILE_NAME))
}

pub fn clear_codes_file(path: &Path) -> Result<()> {
    remove_file_if_exists(path, "reference")?;
    remove_file_if_exists(&tmp_path(path), "stale temp")?;
    Ok(())
}

fn mcc_import_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("mcc-import"))
}

fn remove_file_if_exists(path: &Path, kind: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {kind} file: {}", path.display()))?;
    }
    Ok(())
}
