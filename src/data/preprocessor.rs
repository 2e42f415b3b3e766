// ============================================================
// Layer 4 - Image Preprocessor
// ============================================================
// Turns a decoded image into a Patch the network can consume.
//
// Steps (applied in order):
//   1. Scale both sides by `scale` (rounded down)
//   2. Keep grey images as 1 channel, everything else as RGB
//   3. Reorder HWC pixels into CHW planes
//   4. Divide by 255 when any value is above 1
//
// Step 4 mirrors the dataset convention: 8-bit photos become
// [0, 1], while masks already stored as 0/1 stay untouched.
//
// Reference: image crate documentation (DynamicImage, imageops)

use anyhow::{bail, ensure, Context, Result};
use image::{imageops::FilterType, DynamicImage};

use crate::data::dataset::PairSample;
use crate::domain::{image_pair::ImagePair, patch::Patch};

/// Resizes and normalises images with a fixed scale factor.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    scale: f64,
}

impl Preprocessor {
    /// Create a preprocessor. `scale` must lie in (0, 1].
    pub fn new(scale: f64) -> Result<Self> {
        if !(scale > 0.0 && scale <= 1.0) {
            bail!("Scale must be between 0 and 1, got {scale}");
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Target size for an image of `width x height`.
    pub fn scaled_size(&self, width: u32, height: u32) -> Result<(u32, u32)> {
        let new_w = (self.scale * width as f64).floor() as u32;
        let new_h = (self.scale * height as f64).floor() as u32;
        ensure!(
            new_w > 0 && new_h > 0,
            "scale {} is too small for a {}x{} image",
            self.scale,
            width,
            height
        );
        Ok((new_w, new_h))
    }

    /// Resize, convert to CHW and normalise one image.
    pub fn preprocess(&self, img: &DynamicImage) -> Result<Patch> {
        let (new_w, new_h) = self.scaled_size(img.width(), img.height())?;

        let resized;
        let img = if (new_w, new_h) == (img.width(), img.height()) {
            img
        } else {
            resized = img.resize_exact(new_w, new_h, FilterType::CatmullRom);
            &resized
        };

        let (w, h) = (new_w as usize, new_h as usize);

        // ── HWC → CHW ────────────────────────────────────────────────────────
        let (channels, mut data) = if img.color().has_color() {
            let rgb = img.to_rgb8();
            let mut data = vec![0.0f32; 3 * h * w];
            for (x, y, p) in rgb.enumerate_pixels() {
                let (x, y) = (x as usize, y as usize);
                for c in 0..3 {
                    data[(c * h + y) * w + x] = p[c] as f32;
                }
            }
            (3, data)
        } else {
            let luma = img.to_luma8();
            (1, luma.as_raw().iter().map(|&v| v as f32).collect())
        };

        // ── Normalise ─────────────────────────────────────────────────────────
        let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max > 1.0 {
            data.iter_mut().for_each(|v| *v /= 255.0);
        }

        Patch::new(channels, h, w, data)
    }

    /// Open both images of a pair and preprocess them.
    ///
    /// The two files must have identical dimensions before scaling.
    pub fn load_pair(&self, pair: &ImagePair) -> Result<PairSample> {
        let hazy = image::open(&pair.hazy)
            .with_context(|| format!("Cannot open hazy image '{}'", pair.hazy.display()))?;
        let clean = image::open(&pair.clean)
            .with_context(|| format!("Cannot open clean image '{}'", pair.clean.display()))?;

        ensure!(
            (hazy.width(), hazy.height()) == (clean.width(), clean.height()),
            "Image and mask {} should be the same size, but are {}x{} and {}x{}",
            pair.id,
            hazy.width(),
            hazy.height(),
            clean.width(),
            clean.height()
        );

        Ok(PairSample {
            id:     pair.id.clone(),
            input:  self.preprocess(&hazy)?,
            target: self.preprocess(&clean)?,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_scale_out_of_range() {
        assert!(Preprocessor::new(0.0).is_err());
        assert!(Preprocessor::new(1.5).is_err());
        assert!(Preprocessor::new(-0.5).is_err());
        assert!(Preprocessor::new(1.0).is_ok());
    }

    #[test]
    fn test_scale_too_small() {
        let p = Preprocessor::new(0.1).unwrap();
        assert!(p.scaled_size(5, 40).is_err());
        assert_eq!(p.scaled_size(40, 25).unwrap(), (4, 2));
    }

    #[test]
    fn test_rgb_becomes_chw_in_unit_range() {
        // 2x1 image: red pixel then blue pixel
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));

        let p = Preprocessor::new(1.0).unwrap();
        let patch = p.preprocess(&DynamicImage::ImageRgb8(img)).unwrap();

        assert_eq!(patch.shape(), [3, 1, 2]);
        // R plane, G plane, B plane
        assert_eq!(patch.data, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_grey_stays_single_channel() {
        let img = GrayImage::from_pixel(4, 6, Luma([51]));
        let p = Preprocessor::new(0.5).unwrap();
        let patch = p.preprocess(&DynamicImage::ImageLuma8(img)).unwrap();

        assert_eq!(patch.shape(), [1, 3, 2]);
        for v in &patch.data {
            assert!((v - 0.2).abs() < 0.01);
        }
    }

    #[test]
    fn test_binary_mask_is_not_rescaled() {
        // Values already in {0, 1} are left alone
        let mut img = GrayImage::new(2, 2);
        img.put_pixel(1, 1, Luma([1]));
        let p = Preprocessor::new(1.0).unwrap();
        let patch = p.preprocess(&DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(patch.data, vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_load_pair_rejects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let hazy = dir.path().join("a_hazy.png");
        let clean = dir.path().join("a_clean.png");
        RgbImage::new(4, 4).save(&hazy).unwrap();
        RgbImage::new(4, 5).save(&clean).unwrap();

        let p = Preprocessor::new(1.0).unwrap();
        let err = p.load_pair(&ImagePair::new("a", hazy, clean)).unwrap_err();
        assert!(err.to_string().contains("same size"));
    }
}
