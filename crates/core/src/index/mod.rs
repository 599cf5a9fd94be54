mod generator;
mod metadata;

pub use generator::{IndexGenerator, ModelIndexEntry, PreviewRef, render_index};
pub use metadata::{ModelMetadata, extract_metadata};
