//! Archive intake: validate and unpack an uploaded zip
//!
//! Every entry is checked before anything is written, so a rejected archive
//! leaves the destination untouched.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use atlas_core::ArchiveError;
use chrono::Utc;
use zip::ZipArchive;

/// Outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub extract_dir: PathBuf,
    pub entry_count: usize,
    pub total_bytes: u64,
}

/// Create a fresh working directory for one project run:
/// `temp_root/project_<id>_<yyyymmdd_HHMMSS>`.
pub fn prepare_workdir(temp_root: &Path, project_id: &str) -> Result<PathBuf, ArchiveError> {
    let safe_id: String = project_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let dir = temp_root.join(format!(
        "project_{}_{}",
        safe_id,
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Relative path for an archive entry, or `None` if it would land outside
/// the destination.
pub fn safe_entry_path(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    if normalized.starts_with('/') {
        return None;
    }
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

fn invalid(e: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Invalid(e.to_string())
}

/// Validate `archive` and unpack it into `dest`.
///
/// Rejects entries that escape `dest`, and payloads whose archive size or
/// declared uncompressed size exceeds `max_bytes`.
pub fn extract_archive(archive: &Path, dest: &Path, max_bytes: u64) -> Result<Extraction, ArchiveError> {
    if !archive.is_file() {
        return Err(ArchiveError::NotFound(archive.to_path_buf()));
    }

    let file = fs::File::open(archive)?;
    let archive_size = file.metadata()?.len();
    if archive_size > max_bytes {
        return Err(ArchiveError::PayloadTooLarge {
            size: archive_size,
            limit: max_bytes,
        });
    }

    let mut zip = ZipArchive::new(file).map_err(invalid)?;

    let mut declared: u64 = 0;
    let mut plan: Vec<(PathBuf, bool)> = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(invalid)?;
        let name = entry.name().to_string();
        let relative = safe_entry_path(&name).ok_or(ArchiveError::PathTraversal { entry: name })?;
        declared = declared.saturating_add(entry.size());
        if declared > max_bytes {
            return Err(ArchiveError::PayloadTooLarge {
                size: declared,
                limit: max_bytes,
            });
        }
        plan.push((relative, entry.is_dir()));
    }

    fs::create_dir_all(dest)?;

    let mut total_bytes: u64 = 0;
    let mut entry_count = 0;
    for (i, (relative, is_dir)) in plan.iter().enumerate() {
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if *is_dir {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut entry = zip.by_index(i).map_err(invalid)?;
        let mut out = fs::File::create(&target)?;
        // Declared sizes can lie; cap what is actually inflated.
        let remaining = max_bytes - total_bytes;
        let written = io::copy(&mut entry.by_ref().take(remaining.saturating_add(1)), &mut out)?;
        total_bytes += written;
        if total_bytes > max_bytes {
            return Err(ArchiveError::PayloadTooLarge {
                size: total_bytes,
                limit: max_bytes,
            });
        }
        entry_count += 1;
    }

    tracing::info!(
        "Extracted {} files ({} bytes) from {} into {}",
        entry_count,
        total_bytes,
        archive.display(),
        dest.display()
    );

    Ok(Extraction {
        extract_dir: dest.to_path_buf(),
        entry_count,
        total_bytes,
    })
}
