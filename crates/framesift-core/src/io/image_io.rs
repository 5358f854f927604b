use std::path::Path;

use image::{ImageBuffer, ImageFormat, Luma, Rgb};

use crate::error::{Result, SiftError};
use crate::pixels::Decoded;

/// Encode a decoded matrix to TIFF at `path`, writing through a
/// temporary file in the same directory so a crash never leaves a
/// truncated image behind.
pub fn write_image_atomic(image: &Decoded, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::Builder::new()
        .prefix(".framesift-")
        .suffix(".tiff")
        .tempfile_in(dir)?;
    write_tiff(image, tmp.path())?;
    tmp.persist(path).map_err(|e| SiftError::Io(e.error))?;
    Ok(())
}

/// Encode to TIFF. Float input is scaled by its observed maximum into
/// the 16-bit range.
pub fn write_tiff(image: &Decoded, path: &Path) -> Result<()> {
    let w = image.width() as u32;
    let h = image.height() as u32;
    match image {
        Decoded::Mono8(m) => {
            let pixels: Vec<u8> = m.iter().copied().collect();
            let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(w, h, pixels)
                .ok_or_else(|| SiftError::Pipeline("pixel buffer size mismatch".into()))?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
        Decoded::Mono16(m) => {
            let pixels: Vec<u16> = m.iter().copied().collect();
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, pixels)
                .ok_or_else(|| SiftError::Pipeline("pixel buffer size mismatch".into()))?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
        Decoded::MonoF32(m) => {
            let max = m.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let scale = if max > 0.0 { 65535.0 / max } else { 0.0 };
            let pixels: Vec<u16> = m.iter().map(|&v| (v * scale).clamp(0.0, 65535.0) as u16).collect();
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, pixels)
                .ok_or_else(|| SiftError::Pipeline("pixel buffer size mismatch".into()))?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
        Decoded::Bgr8(m) => {
            // Stored BGR, encoded RGB.
            let mut pixels = Vec::with_capacity(m.len());
            for row in 0..h as usize {
                for col in 0..w as usize {
                    pixels.push(m[[row, col, 2]]);
                    pixels.push(m[[row, col, 1]]);
                    pixels.push(m[[row, col, 0]]);
                }
            }
            let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(w, h, pixels)
                .ok_or_else(|| SiftError::Pipeline("pixel buffer size mismatch".into()))?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
        Decoded::Bgr16(m) => {
            let mut pixels = Vec::with_capacity(m.len());
            for row in 0..h as usize {
                for col in 0..w as usize {
                    pixels.push(m[[row, col, 2]]);
                    pixels.push(m[[row, col, 1]]);
                    pixels.push(m[[row, col, 0]]);
                }
            }
            let img = ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w, h, pixels)
                .ok_or_else(|| SiftError::Pipeline("pixel buffer size mismatch".into()))?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
    }
    Ok(())
}
