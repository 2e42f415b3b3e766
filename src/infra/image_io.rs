// ============================================================
// Layer 6 - Image Output
// ============================================================
// Converts CHW patches back into 8-bit images and writes them.
// Values are clamped to [0, 1] before scaling to 0..=255.
//
//   1 channel  → GrayImage
//   3 channels → RgbImage

use anyhow::{bail, Context, Result};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::{fs, path::Path};

use crate::domain::patch::Patch;

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// One channel plane as a grey image.
pub fn plane_to_gray(patch: &Patch, channel: usize) -> GrayImage {
    let (w, h) = (patch.width as u32, patch.height as u32);
    GrayImage::from_fn(w, h, |x, y| Luma([to_u8(patch.get(channel, y as usize, x as usize))]))
}

pub fn patch_to_image(patch: &Patch) -> Result<DynamicImage> {
    let (w, h) = (patch.width as u32, patch.height as u32);
    match patch.channels {
        1 => Ok(DynamicImage::ImageLuma8(plane_to_gray(patch, 0))),
        3 => {
            let img = RgbImage::from_fn(w, h, |x, y| {
                let (x, y) = (x as usize, y as usize);
                Rgb([
                    to_u8(patch.get(0, y, x)),
                    to_u8(patch.get(1, y, x)),
                    to_u8(patch.get(2, y, x)),
                ])
            });
            Ok(DynamicImage::ImageRgb8(img))
        }
        c => bail!("Only 1 or 3 channel patches can be saved, got {c}"),
    }
}

/// Write a patch as an image file; the format follows the extension.
pub fn save_patch(patch: &Patch, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    patch_to_image(patch)?
        .save(path)
        .with_context(|| format!("Cannot write image '{}'", path.display()))?;
    tracing::debug!("Wrote {}x{} image to '{}'", patch.width, patch.height, path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_patch_round_trip_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");

        // 1x2 image: white then black, plus an out-of-range value
        let patch = Patch::new(3, 1, 2, vec![1.0, 0.0, 1.0, 0.0, 2.0, -1.0]).unwrap();
        save_patch(&patch, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_unsupported_channel_count() {
        let patch = Patch::new(2, 1, 1, vec![0.0, 0.0]).unwrap();
        assert!(patch_to_image(&patch).is_err());
    }
}
