#![allow(dead_code)]

use async_trait::async_trait;
use scadwatch_core::compiler::{CompileJob, CompileTarget, GeometryCompiler};
use scadwatch_core::error::{Result, ScadwatchError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const STUB_STL: &str = "solid stub\n\
facet normal 0 0 1\n\
outer loop\n\
vertex 0 0 0\n\
vertex 10 0 0\n\
vertex 0 20 5\n\
endloop\n\
endfacet\n\
endsolid stub\n";

/// Writes a stub STL for meshes and a small RGBA PNG for previews.
#[derive(Default)]
pub struct FakeCompiler {
    calls: AtomicUsize,
    inputs: Mutex<Vec<PathBuf>>,
    failing: Mutex<Vec<String>>,
}

impl FakeCompiler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }

    /// Sources whose file stem matches `stem` fail to compile.
    pub fn fail_on(&self, stem: &str) {
        self.failing.lock().unwrap().push(stem.to_string());
    }
}

#[async_trait]
impl GeometryCompiler for FakeCompiler {
    async fn compile(&self, job: &CompileJob) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(job.input.clone());

        let stem = job
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.lock().unwrap().contains(&stem) {
            return Err(ScadwatchError::Compiler {
                path: job.input.clone(),
                message: "ERROR: Parser error".to_string(),
            });
        }

        match job.target {
            CompileTarget::Mesh => fs::write(&job.output, STUB_STL)?,
            CompileTarget::Preview { .. } => fs::write(&job.output, png_bytes(4, 3))?,
        }
        Ok(())
    }
}

/// An RGBA image with per-row filters and a text chunk, i.e. not canonical.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        encoder.set_filter(png::FilterType::Paeth);
        encoder
            .add_text_chunk("Software".to_string(), "fake".to_string())
            .unwrap();
        let mut writer = encoder.write_header().unwrap();
        let data: Vec<u8> = (0..width * height * 4).map(|i| (i * 7 % 251) as u8).collect();
        writer.write_image_data(&data).unwrap();
    }
    out
}

pub fn write_model(models_root: &Path, dir: &str, stem: &str, body: &str) -> PathBuf {
    let dir = models_root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{stem}.scad"));
    fs::write(&path, body).unwrap();
    path
}
