//! Dimension label drawn into a preview image.

use super::bounds::MeshBounds;
use super::canonical;
use crate::error::Result;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use std::fs;
use std::path::Path;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const BOX_RGBA: [u8; 4] = [0, 0, 0, 160];
const TEXT_RGBA: [u8; 4] = [255, 255, 255, 255];

// Rows top to bottom, bit 4 is the leftmost column.
fn glyph(c: char) -> [u8; 7] {
    match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        _ => [0; 7],
    }
}

pub fn dimension_label(bounds: &MeshBounds) -> String {
    let [x, y, z] = bounds.extents();
    format!("X {x:.1} Y {y:.1} Z {z:.1}")
}

fn blend(pixel: &mut Rgba<u8>, src: [u8; 4]) {
    let alpha = f32::from(src[3]) / 255.0;
    for i in 0..3 {
        let mixed = f32::from(src[i]) * alpha + f32::from(pixel.0[i]) * (1.0 - alpha);
        pixel.0[i] = mixed.round() as u8;
    }
    let dst_alpha = f32::from(pixel.0[3]) / 255.0;
    pixel.0[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round() as u8;
}

fn blend_at(img: &mut RgbaImage, x: u32, y: u32, src: [u8; 4]) {
    if x < img.width() && y < img.height() {
        blend(img.get_pixel_mut(x, y), src);
    }
}

/// Draws `label` in a translucent box anchored to the bottom-left corner.
pub fn draw_label(img: &mut RgbaImage, label: &str) {
    if label.is_empty() {
        return;
    }
    let scale = if img.width() >= 400 { 2 } else { 1 };
    let pad = 3 * scale;
    let advance = (GLYPH_W + 1) * scale;
    let chars = label.chars().count() as u32;
    let box_w = chars * advance - scale + 2 * pad;
    let box_h = GLYPH_H * scale + 2 * pad;
    let margin = 4 * scale;

    let x0 = margin;
    let y0 = img.height().saturating_sub(margin + box_h);

    for y in y0..y0 + box_h {
        for x in x0..x0 + box_w {
            blend_at(img, x, y, BOX_RGBA);
        }
    }

    for (i, c) in label.chars().enumerate() {
        let gx = x0 + pad + i as u32 * advance;
        let gy = y0 + pad;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        blend_at(
                            img,
                            gx + col * scale + dx,
                            gy + row as u32 * scale + dy,
                            TEXT_RGBA,
                        );
                    }
                }
            }
        }
    }
}

/// Composites the bounds label into the PNG at `image_path` and
/// re-canonicalizes it.
pub fn annotate_with_bounds(image_path: &Path, bounds: &MeshBounds) -> Result<()> {
    let bytes = fs::read(image_path)?;
    let mut img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?
        .to_rgba8();
    draw_label(&mut img, &dimension_label(bounds));

    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::NoFilter);
    encoder.write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)?;
    fs::write(image_path, &out)?;
    canonical::try_canonicalize(image_path)?;
    Ok(())
}
