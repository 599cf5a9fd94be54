use super::metadata::extract_metadata;
use crate::config::index_path_for;
use crate::discovery::discover_sources;
use crate::error::Result;
use crate::model::{SourceFile, mesh_path};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_PREVIEW_COLUMNS: usize = 4;
const GENERATED_MARKER: &str = "<!-- generated by scadwatch; manual edits are overwritten -->";

static DATED_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:-|$)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRef {
    pub view: String,
    pub path: PathBuf,
}

/// One row of the index. Paths are relative to the models root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelIndexEntry {
    pub name: String,
    pub description: String,
    pub source: PathBuf,
    pub date: Option<String>,
    pub mesh: Option<PathBuf>,
    pub previews: Vec<PreviewRef>,
}

#[derive(Debug, Clone)]
pub struct IndexGenerator {
    models_root: PathBuf,
    output: PathBuf,
}

impl IndexGenerator {
    pub fn new(models_root: impl Into<PathBuf>) -> Self {
        let models_root = models_root.into();
        let output = index_path_for(&models_root);
        Self {
            models_root,
            output,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn collect(&self) -> Vec<ModelIndexEntry> {
        discover_sources(&self.models_root)
            .iter()
            .filter(|s| !s.is_shared_library())
            .map(|s| self.entry_for(s))
            .collect()
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.models_root)
            .unwrap_or(path)
            .to_path_buf()
    }

    fn entry_for(&self, source: &SourceFile) -> ModelIndexEntry {
        let text = fs::read_to_string(&source.path).unwrap_or_default();
        let meta = extract_metadata(&text);
        let name = meta.name.unwrap_or_else(|| {
            source
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let date = source
            .path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(|n| DATED_DIR.captures(n))
            .map(|c| c[1].to_string());

        let mesh = mesh_path(&source.path);
        let mesh = mesh.exists().then(|| self.relative(&mesh));

        let previews = discover_previews(&source.path)
            .into_iter()
            .map(|(view, path)| PreviewRef {
                view,
                path: self.relative(&path),
            })
            .collect();

        ModelIndexEntry {
            name,
            description: meta.description.unwrap_or_default(),
            source: self.relative(&source.path),
            date,
            mesh,
            previews,
        }
    }

    /// Rewrites the index document from scratch. The file is left alone when
    /// its content would not change.
    pub fn generate(&self) -> Result<PathBuf> {
        let rendered = render_index(&self.collect());
        let unchanged = fs::read_to_string(&self.output).is_ok_and(|current| current == rendered);
        if !unchanged {
            fs::create_dir_all(&self.models_root)?;
            fs::write(&self.output, rendered)?;
        }
        Ok(self.output.clone())
    }
}

/// `preview.<view>.png` files beside the source, sorted by view name.
fn discover_previews(source: &Path) -> Vec<(String, PathBuf)> {
    let Some(dir) = source.parent() else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut previews: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            let view = name.strip_prefix("preview.")?.strip_suffix(".png")?;
            if view.is_empty() || view.contains('.') {
                return None;
            }
            Some((view.to_string(), e.path()))
        })
        .collect();
    previews.sort();
    previews
}

fn link_target(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").replace(' ', "%20")
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

pub fn render_index(entries: &[ModelIndexEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{GENERATED_MARKER}");
    let _ = writeln!(out, "# Models\n");

    let mut header = String::from("| Model | Date | Description | Files |");
    let mut rule = String::from("|---|---|---|---|");
    for i in 1..=MAX_PREVIEW_COLUMNS {
        let _ = write!(header, " Preview {i} |");
        rule.push_str("---|");
    }
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{rule}");

    for entry in entries {
        let source = link_target(&entry.source);
        let mut files = format!("[scad]({source})");
        if let Some(mesh) = &entry.mesh {
            let _ = write!(files, " [stl]({})", link_target(mesh));
        }

        let _ = write!(
            out,
            "| [{}]({}) | {} | {} | {} |",
            cell(&entry.name),
            source,
            entry.date.as_deref().unwrap_or(""),
            cell(&entry.description),
            files
        );
        for i in 0..MAX_PREVIEW_COLUMNS {
            match entry.previews.get(i) {
                Some(p) => {
                    let _ = write!(out, " ![{}]({}) |", cell(&p.view), link_target(&p.path));
                }
                None => out.push_str("  |"),
            }
        }
        out.push('\n');
    }
    out
}
