//! JSON snapshot persistence.
//!
//! One file per contest, named by contest ID:
//! ```text
//! output_dir/
//! ├── contest_512345.json
//! └── contest_512346.json
//! ```
//!
//! The presence of a file is the only record that a contest has been
//! scraped; [`load_existing`] reads names, never contents.

use crate::models::ContestSnapshot;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

const FILE_PREFIX: &str = "contest_";
const FILE_SUFFIX: &str = ".json";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize contest {contest_id}: {source}")]
    Serialize {
        contest_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Path of the snapshot file for a contest.
pub fn snapshot_path(output_dir: &Path, contest_id: &str) -> PathBuf {
    output_dir.join(format!("{FILE_PREFIX}{contest_id}{FILE_SUFFIX}"))
}

/// Staging path a snapshot is written to before being renamed into place.
pub fn staging_path(output_dir: &Path, contest_id: &str) -> PathBuf {
    output_dir.join(format!("{FILE_PREFIX}{contest_id}{FILE_SUFFIX}{TMP_SUFFIX}"))
}

/// Write a snapshot as pretty-printed UTF-8 JSON.
///
/// Non-ASCII handles and titles are written as-is, not escaped. The file is
/// staged under a `.tmp` name and renamed, so `contest_<id>.json` only ever
/// exists complete.
///
/// # Returns
///
/// The path written, or the reason the write failed.
#[instrument(level = "info", skip_all, fields(contest_id = %snapshot.contest_id))]
pub async fn write_snapshot(
    snapshot: &ContestSnapshot,
    output_dir: &Path,
) -> Result<PathBuf, PersistError> {
    let json =
        serde_json::to_string_pretty(snapshot).map_err(|source| PersistError::Serialize {
            contest_id: snapshot.contest_id.clone(),
            source,
        })?;

    fs::create_dir_all(output_dir)
        .await
        .map_err(|source| PersistError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let staging = staging_path(output_dir, &snapshot.contest_id);
    if let Err(source) = fs::write(&staging, json).await {
        error!(path = %staging.display(), error = %source, "Failed to write snapshot");
        let _ = fs::remove_file(&staging).await;
        return Err(PersistError::Io {
            path: staging,
            source,
        });
    }

    let path = snapshot_path(output_dir, &snapshot.contest_id);
    if let Err(source) = fs::rename(&staging, &path).await {
        error!(path = %path.display(), error = %source, "Failed to move snapshot into place");
        let _ = fs::remove_file(&staging).await;
        return Err(PersistError::Io { path, source });
    }

    info!(path = %path.display(), "Saved snapshot");
    Ok(path)
}

/// Contest IDs that already have a snapshot file in `output_dir`.
///
/// A missing directory counts as empty.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display()))]
pub async fn load_existing(output_dir: &Path) -> io::Result<HashSet<String>> {
    let existing: HashSet<String> = list_snapshot_files(output_dir)
        .await?
        .iter()
        .filter_map(|name| contest_id_from_file_name(name))
        .map(str::to_string)
        .collect();

    if !existing.is_empty() {
        info!(count = existing.len(), "Found existing contest files");
    }
    Ok(existing)
}

/// Sorted names of the snapshot files in `output_dir`.
pub async fn list_snapshot_files(output_dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = match fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Output directory does not exist yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if contest_id_from_file_name(&name).is_some() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn contest_id_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)
}
