use image::{DynamicImage, Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// COLORS
// ============================================================================

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Serialize a color as "r,g,b,a"
pub fn color_to_str(c: Rgba<u8>) -> String {
    format!("{},{},{},{}", c[0], c[1], c[2], c[3])
}

/// Parse a color from "r,g,b,a" (alpha optional, defaults to 255)
pub fn str_to_color(s: &str) -> Option<Rgba<u8>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let r = parts[0].trim().parse::<u8>().ok()?;
    let g = parts[1].trim().parse::<u8>().ok()?;
    let b = parts[2].trim().parse::<u8>().ok()?;
    let a = match parts.get(3) {
        Some(p) => p.trim().parse::<u8>().ok()?,
        None => 255,
    };
    Some(Rgba([r, g, b, a]))
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Integer canvas coordinate. May lie outside the buffer (gesture positions
/// at widget edges routinely do).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle spanned by two corner points, always stored
/// normalized (top-left <= bottom-right). Both corners are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    top_left: Point,
    bottom_right: Point,
}

impl Rect {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            top_left: Point::new(a.x.min(b.x), a.y.min(b.y)),
            bottom_right: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn top_left(&self) -> Point {
        self.top_left
    }

    pub fn bottom_right(&self) -> Point {
        self.bottom_right
    }

    pub fn left(&self) -> i32 {
        self.top_left.x
    }

    pub fn top(&self) -> i32 {
        self.top_left.y
    }

    pub fn right(&self) -> i32 {
        self.bottom_right.x
    }

    pub fn bottom(&self) -> i32 {
        self.bottom_right.y
    }

    /// Number of pixel columns covered (inclusive corners).
    pub fn width(&self) -> i64 {
        self.right() as i64 - self.left() as i64 + 1
    }

    /// Number of pixel rows covered (inclusive corners).
    pub fn height(&self) -> i64 {
        self.bottom() as i64 - self.top() as i64 + 1
    }
}

/// Stroke style: a color plus an integer width (always >= 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pen {
    pub color: Rgba<u8>,
    width: u32,
}

impl Pen {
    /// Width 0 is clamped to 1.
    pub fn new(color: Rgba<u8>, width: u32) -> Self {
        Self {
            color,
            width: width.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn with_color(self, color: Rgba<u8>) -> Self {
        Self { color, ..self }
    }

    /// Inclusive offset range of a `width`-thick band centred on a pixel.
    /// Width 1 → 0..=0, width 2 → 0..=1, width 3 → -1..=1, width 4 → -1..=2.
    pub fn extent(&self) -> (i32, i32) {
        let w = self.width.min(i32::MAX as u32) as i32;
        (-((w - 1) / 2), w / 2)
    }
}

impl Default for Pen {
    fn default() -> Self {
        Self::new(BLACK, 1)
    }
}

// ============================================================================
// PIXEL BUFFER
// ============================================================================

/// The mutable raster image: a row-major RGBA8 grid with its origin at the
/// top-left. Every access is bounds-checked; out-of-range reads yield `None`
/// and out-of-range writes are dropped.
///
/// `Clone` is a deep copy; snapshots never share storage with the live buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: RgbaImage,
}

impl PixelBuffer {
    /// New buffer filled with opaque white.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, WHITE)
    }

    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let mut buffer = Self {
            pixels: RgbaImage::new(width, height),
        };
        buffer.fill(color);
        buffer
    }

    /// Wrap externally supplied raster data, normalizing it to RGBA8.
    pub fn from_image(image: &DynamicImage) -> Self {
        Self {
            pixels: image.to_rgba8(),
        }
    }

    pub fn from_rgba_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Build from a raw RGBA byte vector. Returns `None` when the length
    /// doesn't match `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, raw: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, raw).map(|pixels| Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgba<u8>> {
        if self.contains(x, y) {
            Some(*self.pixels.get_pixel(x as u32, y as u32))
        } else {
            None
        }
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgba<u8>) {
        if self.contains(x, y) {
            self.pixels.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        self.pixels
            .par_chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&color.0));
    }

    /// Fill the inclusive span `[x0, x1] × [y0, y1]`, clipped to the buffer.
    pub fn fill_span(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
        let max_x = self.width() as i64 - 1;
        let max_y = self.height() as i64 - 1;
        let (x0, x1) = (x0.max(0), x1.min(max_x));
        let (y0, y1) = (y0.max(0), y1.min(max_y));
        if x0 > x1 || y0 > y1 {
            return;
        }
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.pixels.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    /// Number of pixels equal to `color`.
    pub fn count_color(&self, color: Rgba<u8>) -> usize {
        self.pixels
            .par_chunks_exact(4)
            .filter(|px| *px == color.0.as_slice())
            .count()
    }

    /// Number of pixels that differ from `other`, or `None` when the sizes differ.
    pub fn count_differences(&self, other: &PixelBuffer) -> Option<usize> {
        if self.width() != other.width() || self.height() != other.height() {
            return None;
        }
        Some(
            self.pixels
                .par_chunks_exact(4)
                .zip(other.pixels.par_chunks_exact(4))
                .filter(|(a, b)| a != b)
                .count(),
        )
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_opaque_white() {
        let buf = PixelBuffer::new(4, 3);
        assert_eq!(buf.width(), 4);
        assert_eq!(buf.height(), 3);
        assert_eq!(buf.count_color(WHITE), 12);
    }

    #[test]
    fn out_of_range_access_is_ignored() {
        let mut buf = PixelBuffer::new(5, 5);
        let before = buf.clone();
        for &(x, y) in &[(-1, 0), (0, -1), (5, 0), (0, 5), (i32::MIN, i32::MAX), (100, 100)] {
            assert_eq!(buf.get_pixel(x, y), None);
            buf.set_pixel(x, y, BLACK);
        }
        assert_eq!(buf, before);
    }

    #[test]
    fn clone_is_independent() {
        let mut original = PixelBuffer::new(3, 3);
        let copy = original.clone();
        original.set_pixel(1, 1, BLACK);
        original.fill(TRANSPARENT);
        assert_eq!(copy.count_color(WHITE), 9);
        assert_eq!(copy.get_pixel(1, 1), Some(WHITE));
    }

    #[test]
    fn zero_size_buffer_is_legal() {
        let mut buf = PixelBuffer::new(0, 0);
        assert!(buf.is_empty());
        buf.set_pixel(0, 0, BLACK);
        buf.fill(BLACK);
        buf.fill_span(-5, -5, 5, 5, BLACK);
        assert_eq!(buf.get_pixel(0, 0), None);
    }

    #[test]
    fn from_image_normalizes_to_rgba() {
        let gray = image::GrayImage::from_pixel(2, 2, image::Luma([128]));
        let buf = PixelBuffer::from_image(&DynamicImage::ImageLuma8(gray));
        assert_eq!(buf.get_pixel(1, 1), Some(Rgba([128, 128, 128, 255])));
    }

    #[test]
    fn rect_from_corners_normalizes() {
        let r = Rect::from_corners(Point::new(7, 2), Point::new(2, 9));
        assert_eq!(r.top_left(), Point::new(2, 2));
        assert_eq!(r.bottom_right(), Point::new(7, 9));
        assert_eq!(r.width(), 6);
        assert_eq!(r.height(), 8);
    }

    #[test]
    fn pen_width_is_clamped() {
        assert_eq!(Pen::new(BLACK, 0).width(), 1);
        assert_eq!(Pen::new(BLACK, 1).extent(), (0, 0));
        assert_eq!(Pen::new(BLACK, 4).extent(), (-1, 2));
        assert_eq!(Pen::new(BLACK, 5).extent(), (-2, 2));
    }

    #[test]
    fn color_strings() {
        assert_eq!(str_to_color("1, 2, 3, 4"), Some(Rgba([1, 2, 3, 4])));
        assert_eq!(str_to_color("10,20,30"), Some(Rgba([10, 20, 30, 255])));
        assert_eq!(str_to_color("10,20"), None);
        assert_eq!(str_to_color("300,0,0,0"), None);
        assert_eq!(color_to_str(Rgba([9, 8, 7, 6])), "9,8,7,6");
    }

    #[test]
    fn count_differences_requires_same_size() {
        let a = PixelBuffer::new(2, 2);
        let mut b = a.clone();
        b.set_pixel(0, 1, BLACK);
        assert_eq!(a.count_differences(&b), Some(1));
        assert_eq!(a.count_differences(&PixelBuffer::new(3, 2)), None);
    }
}
