use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array3;

/// Decodes an image file into an H×W×C array of RGB values in `[0, 1]`.
///
/// Single precision from the start, so the preprocessing pipeline never has
/// to convert again; the canonical `raw_scale = 255` restores pixel units.
pub fn load_image(path: &Path) -> Result<Array3<f32>> {
    let image = image::open(path).with_context(|| format!("decode image {}", path.display()))?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let data = rgb
        .into_raw()
        .into_iter()
        .map(|value| value as f32 / 255.0)
        .collect();
    Array3::from_shape_vec((height as usize, width as usize, 3), data)
        .context("image buffer does not match its dimensions")
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    #[test]
    fn decodes_to_hwc_unit_range() {
        let mut png = RgbImage::new(4, 3);
        png.put_pixel(0, 0, Rgb([255, 0, 0]));
        png.put_pixel(3, 2, Rgb([0, 128, 255]));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        png.save(&path).unwrap();

        let array = load_image(&path).unwrap();
        assert_eq!(array.dim(), (3, 4, 3));
        assert_eq!(array[[0, 0, 0]], 1.0);
        assert_eq!(array[[0, 0, 1]], 0.0);
        assert!((array[[2, 3, 1]] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(array[[2, 3, 2]], 1.0);
    }
}
