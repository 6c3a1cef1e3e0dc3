use anyhow::{bail, Result};
use std::{fs, path::Path};

use super::constants::MEMORY_DB_PATH;

/// Reject database paths that could escape the working tree or point at
/// something other than a regular SQLite file.
pub fn validate_db_path(db_path: &str) -> Result<()> {
    if db_path == MEMORY_DB_PATH {
        return Ok(());
    }

    if db_path.trim().is_empty() {
        bail!("DB_PATH is empty");
    }

    if db_path.contains('\0') || db_path.contains(['\n', '\r', '\t']) {
        bail!("DB_PATH contains control characters");
    }

    let path = Path::new(db_path);

    if path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        bail!("DB_PATH may not contain '..' components");
    }

    if path.file_name().is_none() {
        bail!("DB_PATH must name a file");
    }

    if let Ok(meta) = fs::symlink_metadata(path) {
        if meta.file_type().is_symlink() {
            bail!("DB_PATH may not be a symlink");
        }
        if meta.is_dir() {
            bail!("DB_PATH points to a directory");
        }
    }

    Ok(())
}

/// Build the sqlx connection URL for a validated path.
pub fn sqlite_url(db_path: &str) -> String {
    if db_path == MEMORY_DB_PATH {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite://{}", db_path)
    }
}
