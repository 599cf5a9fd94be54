use std::path::Path;

/// Axis-aligned bounding box of a mesh's vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl MeshBounds {
    fn from_vertex(v: [f32; 3]) -> Self {
        Self { min: v, max: v }
    }

    fn include(&mut self, v: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(v[axis]);
            self.max[axis] = self.max[axis].max(v[axis]);
        }
    }

    pub fn extents(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Reads an ASCII or binary STL. `None` when unreadable or empty.
    pub fn from_stl_file(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        Self::from_stl_bytes(&bytes)
    }

    pub fn from_stl_bytes(bytes: &[u8]) -> Option<Self> {
        if is_binary_stl(bytes) {
            from_binary(bytes)
        } else {
            from_ascii(&String::from_utf8_lossy(bytes))
        }
    }
}

fn accumulate(vertices: impl Iterator<Item = [f32; 3]>) -> Option<MeshBounds> {
    let mut bounds: Option<MeshBounds> = None;
    for v in vertices.filter(|v| v.iter().all(|c| c.is_finite())) {
        match bounds.as_mut() {
            Some(b) => b.include(v),
            None => bounds = Some(MeshBounds::from_vertex(v)),
        }
    }
    bounds
}

// An 80-byte header, a triangle count, then 50 bytes per triangle. Some
// binary writers start the header with "solid", so the size is checked first.
fn is_binary_stl(bytes: &[u8]) -> bool {
    if bytes.len() < 84 {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as usize;
    84usize.saturating_add(count.saturating_mul(50)) == bytes.len()
}

fn from_binary(bytes: &[u8]) -> Option<MeshBounds> {
    let triangles = bytes[84..].chunks_exact(50);
    accumulate(triangles.flat_map(|tri| {
        // 12 bytes of normal, then three vertices.
        (0..3).map(move |i| {
            let base = 12 + i * 12;
            let coord = |o: usize| {
                f32::from_le_bytes([
                    tri[base + o],
                    tri[base + o + 1],
                    tri[base + o + 2],
                    tri[base + o + 3],
                ])
            };
            [coord(0), coord(4), coord(8)]
        })
    }))
}

fn from_ascii(text: &str) -> Option<MeshBounds> {
    accumulate(text.lines().filter_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != "vertex" {
            return None;
        }
        let x = parts.next()?.parse::<f32>().ok()?;
        let y = parts.next()?.parse::<f32>().ok()?;
        let z = parts.next()?.parse::<f32>().ok()?;
        Some([x, y, z])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII: &str = "solid OpenSCAD_Model
  facet normal 0 0 1
    outer loop
      vertex -5 0 0
      vertex 10 2.5 0
      vertex 0 0 3
    endloop
  endfacet
endsolid OpenSCAD_Model
";

    #[test]
    fn ascii_bounds() {
        let bounds = MeshBounds::from_stl_bytes(ASCII.as_bytes()).unwrap();
        assert_eq!(bounds.min, [-5.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [10.0, 2.5, 3.0]);
        assert_eq!(bounds.extents(), [15.0, 2.5, 3.0]);
    }

    #[test]
    fn binary_bounds() {
        let mut bytes = vec![0u8; 80];
        bytes[..5].copy_from_slice(b"solid");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);
        for v in [[1.0f32, 2.0, 3.0], [4.0, -2.0, 0.5], [0.0, 0.0, 9.0]] {
            for c in v {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&[0u8; 2]);

        let bounds = MeshBounds::from_stl_bytes(&bytes).unwrap();
        assert_eq!(bounds.min, [0.0, -2.0, 0.5]);
        assert_eq!(bounds.max, [4.0, 2.0, 9.0]);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert_eq!(MeshBounds::from_stl_bytes(b"solid x\nendsolid x\n"), None);
        let missing = Path::new("/no/such/file.stl");
        assert_eq!(MeshBounds::from_stl_file(missing), None);
    }
}
