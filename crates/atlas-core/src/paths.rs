//! Path index for cross-file resolution

use std::path::{Component, Path};

use dashmap::DashMap;

/// Maps a project-relative path to its file id. Thread-safe for concurrent access.
#[derive(Debug)]
pub struct PathIndex {
    files: DashMap<String, String>,
}

impl PathIndex {
    pub fn new() -> Self {
        PathIndex {
            files: DashMap::new(),
        }
    }

    /// Insert a file. Returns the previous id if the path was already present.
    pub fn insert(&self, relative_path: String, file_id: String) -> Option<String> {
        self.files.insert(relative_path, file_id)
    }

    /// Look up a file id by exact relative path.
    pub fn lookup(&self, relative_path: &str) -> Option<String> {
        self.files.get(relative_path).map(|r| r.value().clone())
    }

    /// First candidate present in the index, with its file id.
    pub fn lookup_first<'a, I>(&self, candidates: I) -> Option<(String, String)>
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates
            .into_iter()
            .find_map(|c| self.lookup(c).map(|id| (c.clone(), id)))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for PathIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative path of `path` under `root`, always `/`-separated. The root itself is `"."`.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

/// Lexically normalize a `/`-separated path: drops `.` segments and folds `..`.
/// Returns `None` when the path climbs above its start.
pub fn normalize(path: &str) -> Option<String> {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop()?;
            }
            s => out.push(s),
        }
    }
    Some(out.join("/"))
}

/// Directory part of a relative path (`""` for top-level files).
pub fn parent_dir(relative_path: &str) -> &str {
    match relative_path.rfind('/') {
        Some(idx) => &relative_path[..idx],
        None => "",
    }
}

/// Join two relative segments, skipping empty ones.
pub fn join(base: &str, tail: &str) -> String {
    match (base.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{tail}"),
    }
}
