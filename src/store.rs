//! Writes results to disk.
//!
//! Every write goes to a temporary file next to the target and is renamed over
//! it once complete, so readers and concurrent writers never see a partial file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::model::CauseListEntry;
use crate::WriteError;

type WriteResult<T> = core::result::Result<T, WriteError>;

pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> WriteResult<PathBuf> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| WriteError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), "results saved");
    Ok(path.to_path_buf())
}

/// The header is always the full `CauseListEntry` column set, even with no rows.
pub fn write_csv(rows: &[CauseListEntry], path: &Path) -> WriteResult<PathBuf> {
    let csv_err = |source| WriteError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(CauseListEntry::COLUMNS)
        .map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    let bytes = writer.into_inner().map_err(|e| WriteError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })?;

    write_atomic(path, &bytes)?;
    info!(path = %path.display(), rows = rows.len(), "cause list saved");
    Ok(path.to_path_buf())
}

pub fn read_csv(path: &Path) -> WriteResult<Vec<CauseListEntry>> {
    let csv_err = |source| WriteError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<CauseListEntry>, _>>()
        .map_err(csv_err)
}

pub fn write_bytes(bytes: &[u8], path: &Path) -> WriteResult<PathBuf> {
    write_atomic(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "file saved");
    Ok(path.to_path_buf())
}

/// Creates `dir` and all of its parents.
pub fn ensure_directory(dir: &Path) -> WriteResult<()> {
    fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Keeps letters, digits, `_` and `-`; every other run becomes one `_`.
pub fn sanitize_file_stem(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

fn write_atomic(path: &Path, bytes: &[u8]) -> WriteResult<()> {
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_directory(dir)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(target_permissions(path))
        .map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// The temp file is created 0600. Replacing a file keeps its mode, new files get 0644.
#[cfg(unix)]
fn target_permissions(path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644))
}
