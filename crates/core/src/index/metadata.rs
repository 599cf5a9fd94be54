//! Name and description markers embedded in model sources.

use once_cell::sync::Lazy;
use regex::Regex;

static NAME_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*//[ \t]*3D:[ \t]*(.*?)[ \t]*$").unwrap());
static DESCRIPTION_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*description[ \t]*=[ \t]*"((?:[^"\\\n]|\\.)*)"[ \t]*;"#).unwrap()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// First `// 3D: <name>` comment and first `description = "...";` line.
/// Empty values count as absent.
pub fn extract_metadata(source: &str) -> ModelMetadata {
    let name = NAME_MARKER
        .captures(source)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty());
    let description = DESCRIPTION_ASSIGNMENT
        .captures(source)
        .map(|c| unescape(&c[1]))
        .filter(|s| !s.trim().is_empty());
    ModelMetadata { name, description }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
