// ============================================================================
// CANVAS-LEVEL OPERATIONS — fitting incoming rasters onto the canvas
// ============================================================================

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::canvas::{PixelBuffer, WHITE};

/// Fit `source` into a `width`×`height` canvas.
///
/// A source of the exact canvas size is taken as-is. Otherwise it is scaled
/// (up or down) to fit while keeping its aspect ratio, then composited
/// centred over an opaque white background, so the canvas size never
/// changes.
pub fn fit_to_canvas(source: &RgbaImage, width: u32, height: u32) -> PixelBuffer {
    let (sw, sh) = source.dimensions();
    if sw == width && sh == height {
        return PixelBuffer::from_rgba_image(source.clone());
    }

    let mut background = PixelBuffer::filled(width, height, WHITE).into_rgba_image();
    if sw == 0 || sh == 0 || width == 0 || height == 0 {
        return PixelBuffer::from_rgba_image(background);
    }

    let scale = (width as f64 / sw as f64).min(height as f64 / sh as f64);
    let new_w = ((sw as f64 * scale).round() as u32).clamp(1, width);
    let new_h = ((sh as f64 * scale).round() as u32).clamp(1, height);

    let scaled = if new_w == sw && new_h == sh {
        source.clone()
    } else {
        imageops::resize(source, new_w, new_h, FilterType::Triangle)
    };

    let x = (width - new_w) / 2;
    let y = (height - new_h) / 2;
    imageops::overlay(&mut background, &scaled, x as i64, y as i64);

    PixelBuffer::from_rgba_image(background)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BLACK;

    #[test]
    fn same_size_is_passed_through() {
        let src = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 4]));
        let fitted = fit_to_canvas(&src, 4, 4);
        assert_eq!(fitted.as_rgba_image(), &src);
    }

    #[test]
    fn wide_source_is_letterboxed() {
        let src = RgbaImage::from_pixel(8, 4, BLACK);
        let fitted = fit_to_canvas(&src, 8, 8);
        assert_eq!((fitted.width(), fitted.height()), (8, 8));
        // 8×4 centred vertically: rows 2..6 black, rest white
        assert_eq!(fitted.get_pixel(0, 0), Some(WHITE));
        assert_eq!(fitted.get_pixel(0, 7), Some(WHITE));
        assert_eq!(fitted.get_pixel(4, 3), Some(BLACK));
        assert_eq!(fitted.count_color(BLACK), 32);
    }

    #[test]
    fn small_source_is_scaled_up() {
        let src = RgbaImage::from_pixel(2, 2, BLACK);
        let fitted = fit_to_canvas(&src, 6, 6);
        assert_eq!(fitted.count_color(BLACK), 36);
    }

    #[test]
    fn transparent_source_shows_white_background() {
        let src = RgbaImage::from_pixel(2, 1, image::Rgba([0, 0, 0, 0]));
        let fitted = fit_to_canvas(&src, 4, 4);
        assert_eq!(fitted.count_color(WHITE), 16);
    }

    #[test]
    fn empty_source_gives_blank_canvas() {
        let fitted = fit_to_canvas(&RgbaImage::new(0, 0), 3, 3);
        assert_eq!(fitted.count_color(WHITE), 9);
    }
}
