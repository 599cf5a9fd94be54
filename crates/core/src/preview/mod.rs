//! Post-processing of compiler-rendered preview images.

pub mod bounds;
pub mod canonical;
pub mod overlay;

pub use bounds::MeshBounds;
pub use canonical::{canonical_bytes, canonicalize, try_canonicalize};
pub use overlay::{annotate_with_bounds, dimension_label};
