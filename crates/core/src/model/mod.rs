//! Source files, their derived artifacts, and the static camera table.

mod artifact;
mod view;

pub use artifact::{Artifact, ArtifactKind, artifacts_for, mesh_path, preview_path};
pub use view::{CameraPose, Projection, VIEWS, ViewSpec, view_by_name};

use std::path::{Path, PathBuf};

/// Extension of modeling-language sources.
pub const SOURCE_EXTENSION: &str = "scad";
/// Extension of the mesh artifact.
pub const MESH_EXTENSION: &str = "stl";
/// File name reserved for the library included by other sources.
pub const SHARED_LIBRARY_NAME: &str = "modules.scad";

/// A modeling-language source document. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_shared_library(&self) -> bool {
        is_shared_library(&self.path)
    }
}

pub fn is_source_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
}

pub fn is_shared_library(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case(SHARED_LIBRARY_NAME))
}
