// ============================================================
// Layer 6 - Pair Preview
// ============================================================
// Writes a side-by-side preview of an input and its target:
//
//   ┌─────────┬─────────┬─────────┬─────────┐
//   │  input  │ class 1 │ class 2 │ class 3 │   multi-channel target
//   └─────────┴─────────┴─────────┴─────────┘
//   ┌─────────┬─────────┐
//   │  input  │  mask   │                       single-channel target
//   └─────────┴─────────┘
//
// Each target channel gets its own grey panel so per-class
// masks can be inspected one at a time.

use anyhow::{Context, Result};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use std::{fs, path::Path};

use crate::domain::patch::Patch;
use crate::infra::image_io::{patch_to_image, plane_to_gray};

/// Gap between panels, in pixels.
const GUTTER: u32 = 4;

fn panels(input: &Patch, target: &Patch) -> Result<Vec<(String, RgbImage)>> {
    let mut panels = vec![("Input image".to_string(), patch_to_image(input)?.to_rgb8())];

    if target.channels > 1 {
        for c in 0..target.channels {
            let gray = DynamicImage::ImageLuma8(plane_to_gray(target, c));
            panels.push((format!("output mask (class {})", c + 1), gray.to_rgb8()));
        }
    } else {
        panels.push(("output mask".to_string(), patch_to_image(target)?.to_rgb8()));
    }
    Ok(panels)
}

/// Save the preview strip and return the number of panels drawn.
pub fn save_pair_preview(input: &Patch, target: &Patch, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    let panels = panels(input, target)?;

    let width = panels.iter().map(|(_, p)| p.width()).sum::<u32>()
        + GUTTER * (panels.len() as u32 - 1);
    let height = panels.iter().map(|(_, p)| p.height()).max().unwrap_or(0);

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut x = 0u32;
    for (title, panel) in &panels {
        tracing::debug!("Panel '{}' at x={}", title, x);
        imageops::replace(&mut canvas, panel, x as i64, 0);
        x += panel.width() + GUTTER;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    canvas
        .save(path)
        .with_context(|| format!("Cannot write preview '{}'", path.display()))?;

    tracing::info!("Preview with {} panels written to '{}'", panels.len(), path.display());
    Ok(panels.len())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_target_gets_one_panel_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let input = Patch::new(3, 4, 5, vec![0.5; 60]).unwrap();
        let target = Patch::new(3, 4, 5, vec![0.25; 60]).unwrap();

        let n = save_pair_preview(&input, &target, &path).unwrap();
        assert_eq!(n, 4);

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 4 * 5 + 3 * GUTTER);
        assert_eq!(img.height(), 4);
    }

    #[test]
    fn test_single_channel_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let input = Patch::new(1, 3, 3, vec![0.0; 9]).unwrap();
        let target = Patch::new(1, 3, 3, vec![1.0; 9]).unwrap();

        assert_eq!(save_pair_preview(&input, &target, &path).unwrap(), 2);
    }
}
