//! `create`: a dated model directory from a template.

use crate::config::MODELS_DIR;
use crate::error::{Result, ScadwatchError};
use crate::model::{SOURCE_EXTENSION, VIEWS};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub const TEMPLATES_DIR: &str = "templates";
pub const DEFAULT_TEMPLATE: &str = "default";
pub const NAME_PLACEHOLDER: &str = "{{NAME}}";
pub const DESCRIPTION_PLACEHOLDER: &str = "{{DESCRIPTION}}";

const BUILTIN_TEMPLATE: &str = r#"// =============================================
// 3D: {{NAME}}
// Version: 1.0
// Author: generator
// =============================================

description = "{{DESCRIPTION}}";
version_str = "1.0";

use <../modules.scad>;

// ----------------------------
// Resolution
// ----------------------------
$fn = 0;        // fixed segmentation off
$fa = 6;        // 5-8 degrees is usually enough
$fs = 0.35;     // about the nozzle diameter
pin_fs = 0.25;  // finer for pins and holes

// ----------------------------
// Test fragments
// ----------------------------
test_fragment = false;   // true: print only a corner fragment
frag_size     = 20;      // fragment square, mm
frag_h_extra  = 20;      // clip height margin, mm

// ----------------------------
// Model parameters
// ----------------------------
base_x = 100;  // width X, mm
base_y = 50;   // depth Y, mm
base_h = 5;    // thickness Z, mm
radius_r = 3;  // corner radius

module base(){
    linear_extrude(height=base_h) rounded_rect([base_x, base_y], r=radius_r);
}

module clip_for_fragments(){
    if(test_fragment){
        intersection(){
            children(0);
            translate([0, 0, -frag_h_extra]) cube([frag_size, frag_size, base_h + 2*frag_h_extra]);
        }
    } else { children(); }
}

clip_for_fragments(){ base(); }
"#;

/// Lowercase; runs outside `[a-z0-9-]` become `-`; repeated and
/// leading/trailing dashes are removed.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.trim().to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug.trim_matches('-').to_string()
}

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub long_name: String,
    pub short_name: Option<String>,
    pub template: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProject {
    pub dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

fn scad_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

fn load_template(root: &Path, name: &str) -> Result<String> {
    let path = root.join(TEMPLATES_DIR).join(format!("{name}.{SOURCE_EXTENSION}"));
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text),
        Err(_) if name == DEFAULT_TEMPLATE => Ok(BUILTIN_TEMPLATE.to_string()),
        Err(e) => Err(ScadwatchError::Template(format!(
            "cannot read template {}: {e}",
            path.display()
        ))),
    }
}

fn render_readme(display_name: &str, short_slug: &str, description: &str) -> String {
    let mut out = format!("# {display_name}\n\n");
    if !description.is_empty() {
        out.push_str(description);
        out.push_str("\n\n");
    }
    out.push_str(&format!(
        "- Model file: `{short_slug}.{SOURCE_EXTENSION}`\n- Version: 1.0\n\n## Previews\n"
    ));
    for view in VIEWS.iter() {
        let image = format!("\n![{short_slug} {0}](preview.{0}.png)\n", view.name);
        out.push_str(&image);
    }
    out
}

fn write_if_missing(path: &Path, content: &str, created: &mut CreatedProject) -> Result<()> {
    if path.exists() {
        created.skipped.push(path.to_path_buf());
        return Ok(());
    }
    fs::write(path, content)?;
    created.written.push(path.to_path_buf());
    Ok(())
}

/// Creates `models/<date>-<long_slug>/` with `<short_slug>.scad` and a
/// README. Existing files are never overwritten.
pub fn create_project(
    root: &Path,
    request: &CreateRequest,
    date: NaiveDate,
) -> Result<CreatedProject> {
    let long_slug = slugify(&request.long_name);
    if long_slug.is_empty() {
        return Err(ScadwatchError::Usage(
            "a long name with at least one letter or digit is required".to_string(),
        ));
    }
    let short_slug = match &request.short_name {
        Some(short) => slugify(short),
        None => long_slug.clone(),
    };
    if short_slug.is_empty() {
        return Err(ScadwatchError::Usage(
            "the short name must contain a letter or digit".to_string(),
        ));
    }
    let template_name = request
        .template
        .as_deref()
        .map(slugify)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());

    let display_name = long_slug.replace('-', " ");
    let description = request.description.clone().unwrap_or_default();
    let template = load_template(root, &template_name)?;

    let dir = root
        .join(MODELS_DIR)
        .join(format!("{}-{long_slug}", date.format("%Y-%m-%d")));
    fs::create_dir_all(&dir)?;

    let scad = template
        .replace(NAME_PLACEHOLDER, &display_name)
        .replace(DESCRIPTION_PLACEHOLDER, &scad_string(&description));
    let readme = render_readme(&display_name, &short_slug, &description);

    let mut created = CreatedProject {
        dir: dir.clone(),
        written: Vec::new(),
        skipped: Vec::new(),
    };
    let source_path = dir.join(format!("{short_slug}.{SOURCE_EXTENSION}"));
    write_if_missing(&source_path, &scad, &mut created)?;
    write_if_missing(&dir.join("README.md"), &readme, &mut created)?;
    Ok(created)
}
