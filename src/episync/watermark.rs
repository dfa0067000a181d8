//! Watermark overlay applied after display conversion.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ColorType, DynamicImage};

use crate::error::PluginError;

/// Placement and size of the overlay on a `width`x`height` photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
}

/// The overlay is one tenth of each target dimension (integer division),
/// inset 10 px from the bottom-right corner.
#[must_use]
pub fn watermark_geometry(width: u32, height: u32) -> WatermarkGeometry {
    let w = width / 10;
    let h = height / 10;
    WatermarkGeometry {
        width: w,
        height: h,
        x: i64::from(width) - 10 - i64::from(w),
        y: i64::from(height) - 10 - i64::from(h),
    }
}

/// Composite `watermark` onto `photo` in place.
///
/// A photo for a vertically mounted frame is stored rotated; it is turned
/// upright for compositing and turned back before saving. The photo's
/// color mode is restored before the re-encode so formats without alpha
/// (JPEG) still save.
pub fn apply(
    photo: &Path,
    watermark: &Path,
    width: u32,
    height: u32,
    horizontal: bool,
    rotation_degrees: u16,
) -> Result<(), PluginError> {
    let img = image::open(photo)?;
    let mode = img.color();

    let img = if horizontal {
        img
    } else {
        rotate_upright(img, rotation_degrees)
    };

    let mut canvas = img.to_rgba8();
    let overlay_src = image::open(watermark)?.to_rgba8();
    let geom = watermark_geometry(width, height);
    let overlay = imageops::resize(
        &overlay_src,
        geom.width.max(1),
        geom.height.max(1),
        FilterType::Triangle,
    );
    imageops::overlay(&mut canvas, &overlay, geom.x, geom.y);

    let out = restore_mode(DynamicImage::ImageRgba8(canvas), mode);
    let out = if horizontal {
        out
    } else {
        rotate_back(out, rotation_degrees)
    };
    out.save(photo)?;
    Ok(())
}

/// Turn a vertically stored photo upright for compositing.
pub fn rotate_upright(img: DynamicImage, rotation_degrees: u16) -> DynamicImage {
    if rotation_degrees == 90 {
        img.rotate90()
    } else {
        img.rotate270()
    }
}

/// Inverse of [`rotate_upright`].
pub fn rotate_back(img: DynamicImage, rotation_degrees: u16) -> DynamicImage {
    if rotation_degrees == 90 {
        img.rotate270()
    } else {
        img.rotate90()
    }
}

fn restore_mode(img: DynamicImage, mode: ColorType) -> DynamicImage {
    match mode {
        ColorType::L8 => DynamicImage::ImageLuma8(img.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(img.to_rgb8()),
        ColorType::Rgba8 => img,
        ColorType::L16 => DynamicImage::ImageLuma16(img.to_luma16()),
        ColorType::La16 => DynamicImage::ImageLumaA16(img.to_luma_alpha16()),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(img.to_rgb16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(img.to_rgba16()),
        // 32-bit float and any future modes re-encode as plain RGB.
        _ => DynamicImage::ImageRgb8(img.to_rgb8()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_uses_integer_tenths_and_fixed_inset() {
        let geom = watermark_geometry(800, 480);
        assert_eq!(geom.width, 80);
        assert_eq!(geom.height, 48);
        assert_eq!(geom.x, 800 - 10 - 80);
        assert_eq!(geom.y, 480 - 10 - 48);
    }

    #[test]
    fn geometry_truncates_odd_dimensions() {
        let geom = watermark_geometry(799, 479);
        assert_eq!(geom.width, 79);
        assert_eq!(geom.height, 47);
        assert_eq!(geom.x, 799 - 10 - 79);
        assert_eq!(geom.y, 479 - 10 - 47);
    }

    #[test]
    fn rotation_round_trips_pixels() {
        // distinct pixel per position so a wrong turn can't cancel out
        let gradient = image::RgbaImage::from_fn(40, 20, |x, y| {
            image::Rgba([x as u8, y as u8, (x + y) as u8, 255])
        });
        let img = DynamicImage::ImageRgba8(gradient);
        for rotation in [90, 270] {
            let upright = rotate_upright(img.clone(), rotation);
            assert_eq!((upright.width(), upright.height()), (20, 40));
            let restored = rotate_back(upright, rotation);
            assert_eq!((restored.width(), restored.height()), (40, 20));
            assert_eq!(restored.to_rgba8(), img.to_rgba8());
        }
    }
}
