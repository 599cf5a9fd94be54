use super::view::{VIEWS, ViewSpec};
use super::{MESH_EXTENSION, SourceFile};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArtifactKind {
    Mesh,
    Preview(&'static ViewSpec),
}

/// A derived output of exactly one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl Artifact {
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ArtifactKind::Mesh)
    }

    pub fn view(&self) -> Option<&'static ViewSpec> {
        match self.kind {
            ArtifactKind::Mesh => None,
            ArtifactKind::Preview(view) => Some(view),
        }
    }
}

/// Source path with its extension replaced by the mesh extension.
pub fn mesh_path(source: &Path) -> PathBuf {
    source.with_extension(MESH_EXTENSION)
}

/// `preview.<view>.png` next to the source.
pub fn preview_path(source: &Path, view: &str) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("preview.{view}.png"))
}

/// The mesh first, then one preview per static view.
pub fn artifacts_for(source: &SourceFile) -> Vec<Artifact> {
    let mut artifacts = Vec::with_capacity(VIEWS.len() + 1);
    artifacts.push(Artifact {
        kind: ArtifactKind::Mesh,
        path: mesh_path(&source.path),
    });
    artifacts.extend(VIEWS.iter().map(|view| Artifact {
        kind: ArtifactKind::Preview(view),
        path: preview_path(&source.path, view.name),
    }));
    artifacts
}
