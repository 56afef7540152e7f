//! I/O helpers for grayscale slices and JSON.
//!
//! - `load_grayscale_i16`: read a PNG (8 or 16 bit) into an owned i16 image.
//! - `save_grayscale_i16`: write any i16 view as a 16-bit grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageI16, ImageView};
use image::{DynamicImage, ImageBuffer, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk as grayscale i16.
///
/// 8-bit data keeps its values (0..=255). 16-bit data must fit in i16;
/// anything above `i16::MAX` is an error rather than being clipped.
pub fn load_grayscale_i16(path: &Path) -> Result<ImageI16, String> {
    let img = image::open(path).map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    let w = img.width() as usize;
    let h = img.height() as usize;
    let color = img.color();
    let data = match img {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(i16::from).collect(),
        DynamicImage::ImageLuma16(buf) => checked_i16(buf.into_raw(), path)?,
        other if color.bytes_per_pixel() == color.channel_count() => {
            other.into_luma8().into_raw().into_iter().map(i16::from).collect()
        }
        other => checked_i16(other.into_luma16().into_raw(), path)?,
    };
    Ok(ImageI16 {
        w,
        h,
        stride: w,
        data,
    })
}

fn checked_i16(raw: Vec<u16>, path: &Path) -> Result<Vec<i16>, String> {
    raw.into_iter()
        .map(|v| {
            i16::try_from(v).map_err(|_| {
                format!(
                    "{}: pixel value {v} exceeds the signed 16-bit range",
                    path.display()
                )
            })
        })
        .collect()
}

/// Save an i16 view to a 16-bit grayscale PNG, clamping negatives to 0.
pub fn save_grayscale_i16<I: ImageView<Pixel = i16>>(image: &I, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let mut raw = Vec::with_capacity(image.width() * image.height());
    for row in image.rows() {
        raw.extend(row.iter().map(|&v| v.max(0) as u16));
    }
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(image.width() as u32, image.height() as u32, raw)
            .ok_or_else(|| "Failed to create image buffer".to_string())?;
    buffer
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use std::path::PathBuf;

    fn temp_png(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vessel_recon_{}_{name}.png", std::process::id()))
    }

    #[test]
    fn eight_bit_png_keeps_its_values() {
        let path = temp_png("gray8");
        GrayImage::from_raw(2, 2, vec![0, 100, 128, 200])
            .expect("buffer")
            .save(&path)
            .expect("write png");
        let img = load_grayscale_i16(&path).expect("load");
        let _ = fs::remove_file(&path);
        assert_eq!((img.width(), img.height()), (2, 2));
        assert_eq!(img.data, vec![0, 100, 128, 200]);
    }

    #[test]
    fn sixteen_bit_png_out_of_range_is_an_error() {
        let path = temp_png("gray16_overflow");
        let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 1, vec![1000, 40000]).expect("buffer");
        buf.save(&path).expect("write png");
        let err = load_grayscale_i16(&path).expect_err("40000 does not fit in i16");
        let _ = fs::remove_file(&path);
        assert!(err.contains("40000"), "{err}");
    }

    #[test]
    fn saved_slice_loads_back() {
        let path = temp_png("gray16_saved");
        let img = ImageI16::from_fn(3, 2, |x, y| (x * 1000 + y * 20000) as i16);
        save_grayscale_i16(&img, &path).expect("save");
        let loaded = load_grayscale_i16(&path).expect("load");
        let _ = fs::remove_file(&path);
        assert_eq!(loaded.data, img.data);
    }
}
