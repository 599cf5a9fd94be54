//! Deterministic PNG re-encoding.
//!
//! The compiler's own PNG writer embeds timestamps and text chunks and its
//! compressed stream varies across versions. Re-encoding the decoded pixels
//! with a fixed filter and compression level, keeping only IHDR, PLTE, tRNS,
//! IDAT and IEND, gives identical bytes for identical pixels.

use crate::error::{Result, ScadwatchError};
use std::fs;
use std::path::Path;

/// Canonicalizes `path` in place. Unreadable or malformed images are left
/// untouched; nothing is propagated.
pub fn canonicalize(path: &Path) {
    match try_canonicalize(path) {
        Ok(true) => tracing::debug!("Canonicalized {}", path.display()),
        Ok(false) => {}
        Err(e) => tracing::debug!("Leaving {} as rendered: {}", path.display(), e),
    }
}

/// Returns whether the file was rewritten. The file is only written when the
/// canonical bytes differ from what is on disk.
pub fn try_canonicalize(path: &Path) -> Result<bool> {
    let current = fs::read(path)?;
    let canonical = canonical_bytes(&current)?;
    if canonical == current {
        return Ok(false);
    }

    let tmp = path.with_extension("png.canonical");
    fs::write(&tmp, &canonical)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(true)
}

struct DecodedPng {
    width: u32,
    height: u32,
    color: png::ColorType,
    depth: png::BitDepth,
    palette: Option<Vec<u8>>,
    trns: Option<Vec<u8>>,
    pixels: Vec<u8>,
}

fn decode(input: &[u8]) -> Result<DecodedPng> {
    let mut decoder = png::Decoder::new(input);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let mut pixels = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());

    let info = reader.info();
    // A first APNG frame may cover only part of the canvas.
    if frame.width != info.width || frame.height != info.height {
        return Err(ScadwatchError::Image(
            "first frame does not cover the image".to_string(),
        ));
    }

    Ok(DecodedPng {
        width: info.width,
        height: info.height,
        color: frame.color_type,
        depth: frame.bit_depth,
        palette: info.palette.as_ref().map(|p| p.to_vec()),
        trns: info.trns.as_ref().map(|t| t.to_vec()),
        pixels,
    })
}

fn encode(image: DecodedPng) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width, image.height);
        encoder.set_color(image.color);
        encoder.set_depth(image.depth);
        if let Some(palette) = image.palette {
            encoder.set_palette(palette);
        }
        if let Some(trns) = image.trns {
            encoder.set_trns(trns);
        }
        encoder.set_compression(png::Compression::Best);
        encoder.set_filter(png::FilterType::NoFilter);
        encoder.set_adaptive_filter(png::AdaptiveFilterType::NonAdaptive);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Canonical encoding of a PNG byte stream.
pub fn canonical_bytes(input: &[u8]) -> Result<Vec<u8>> {
    encode(decode(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i % 251) as u8;
                [v, v.wrapping_mul(3), 255 - v, 255]
            })
            .collect()
    }

    fn encode_rgba(
        pixels: &[u8],
        width: u32,
        height: u32,
        compression: png::Compression,
        filter: png::FilterType,
        text: Option<&str>,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_compression(compression);
            encoder.set_filter(filter);
            encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
            if let Some(text) = text {
                encoder
                    .add_text_chunk("Comment".to_string(), text.to_string())
                    .unwrap();
            }
            encoder.set_source_gamma(png::ScaledFloat::new(1.0 / 2.2));
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(pixels).unwrap();
        }
        out
    }

    fn chunk_types(bytes: &[u8]) -> Vec<String> {
        let mut types = Vec::new();
        let mut pos = 8;
        while pos + 8 <= bytes.len() {
            let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            let name = &bytes[pos + 4..pos + 8];
            types.push(String::from_utf8_lossy(name).into_owned());
            pos += 12 + len;
        }
        types
    }

    #[test]
    fn differently_encoded_identical_pixels_converge() {
        let pixels = gradient(37, 23);
        let a = encode_rgba(
            &pixels,
            37,
            23,
            png::Compression::Fast,
            png::FilterType::Sub,
            Some("rendered at 10:01"),
        );
        let b = encode_rgba(
            &pixels,
            37,
            23,
            png::Compression::Default,
            png::FilterType::Paeth,
            Some("rendered at 10:02"),
        );
        assert_ne!(a, b);

        assert_eq!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    }

    #[test]
    fn canonical_form_is_a_fixed_point() {
        let input = encode_rgba(
            &gradient(16, 16),
            16,
            16,
            png::Compression::Fast,
            png::FilterType::Up,
            None,
        );
        let once = canonical_bytes(&input).unwrap();
        let twice = canonical_bytes(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn ancillary_chunks_are_dropped() {
        let input = encode_rgba(
            &gradient(4, 4),
            4,
            4,
            png::Compression::Fast,
            png::FilterType::Sub,
            Some("x"),
        );
        assert!(chunk_types(&input).iter().any(|t| t == "tEXt"));
        assert!(chunk_types(&input).iter().any(|t| t == "gAMA"));

        let canonical = canonical_bytes(&input).unwrap();
        let types = chunk_types(&canonical);
        assert_eq!(types.first().map(String::as_str), Some("IHDR"));
        assert_eq!(types.last().map(String::as_str), Some("IEND"));
        let critical = ["IHDR", "IDAT", "IEND"];
        assert!(types.iter().all(|t| critical.contains(&t.as_str())));
    }

    #[test]
    fn palette_and_transparency_survive() {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 2, 2);
            encoder.set_color(png::ColorType::Indexed);
            encoder.set_depth(png::BitDepth::Eight);
            encoder.set_palette(vec![255, 0, 0, 0, 255, 0]);
            encoder.set_trns(vec![0, 255]);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[0, 1, 1, 0]).unwrap();
        }

        let canonical = canonical_bytes(&out).unwrap();
        assert_eq!(
            chunk_types(&canonical),
            vec!["IHDR", "PLTE", "tRNS", "IDAT", "IEND"]
        );

        let decoded = decode(&canonical).unwrap();
        assert_eq!(decoded.pixels, vec![0, 1, 1, 0]);
        assert_eq!(decoded.palette, Some(vec![255, 0, 0, 0, 255, 0]));
    }

    #[test]
    fn malformed_file_is_left_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("preview.iso.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

        canonicalize(&path);
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG\r\n\x1a\nnot really");
        assert!(try_canonicalize(&path).is_err());
        assert!(!path.with_extension("png.canonical").exists());
    }

    #[test]
    fn already_canonical_file_is_not_rewritten() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("preview.xy.png");
        let input = encode_rgba(
            &gradient(8, 8),
            8,
            8,
            png::Compression::Fast,
            png::FilterType::Sub,
            None,
        );
        fs::write(&path, &input).unwrap();

        assert!(try_canonicalize(&path).unwrap());
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        assert!(!try_canonicalize(&path).unwrap());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), old);
    }
}
