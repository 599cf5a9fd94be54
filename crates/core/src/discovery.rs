use crate::model::{SourceFile, is_source_path};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const IGNORED_DIRS: [&str; 3] = ["node_modules", ".git", "dist"];

fn is_skipped_name(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.contains(&name)
}

/// Whether `path` is one that [`discover_sources`] would visit under `root`.
/// Only components below `root` are checked; paths outside it are rejected.
pub fn is_relevant_path(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    !relative
        .components()
        .any(|c| c.as_os_str().to_str().is_some_and(is_skipped_name))
}

/// Every source under `root`, sorted by path. The shared library is included.
pub fn discover_sources(root: &Path) -> Vec<SourceFile> {
    let mut paths: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !IGNORED_DIRS.contains(&name))
        })
        .build()
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if entry.file_type().is_some_and(|t| t.is_file()) && is_source_path(path) {
                return Some(path.to_path_buf());
            }
            None
        })
        .collect();
    paths.sort();
    paths.into_iter().map(SourceFile::new).collect()
}

/// Sources that the batch scheduler may build.
pub fn buildable_sources(root: &Path) -> Vec<SourceFile> {
    discover_sources(root)
        .into_iter()
        .filter(|s| !s.is_shared_library())
        .collect()
}
