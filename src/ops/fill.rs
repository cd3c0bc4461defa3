// ============================================================================
// FLOOD FILL — 4-connected exact-color region fill
// ============================================================================

use image::Rgba;

use crate::canvas::{PixelBuffer, Point};

/// Recolor the 4-connected region of the seed's color to `fill_color`.
///
/// Does nothing when the seed is outside the buffer or already has
/// `fill_color`. Uses an explicit DFS stack so large regions can't overflow
/// the call stack. A pixel is recolored before its neighbours are pushed, so
/// the target-color check on pop rejects anything already visited.
///
/// Returns the number of pixels recolored.
pub fn fill_point(buf: &mut PixelBuffer, seed: Point, fill_color: Rgba<u8>) -> usize {
    let Some(target) = buf.get_pixel(seed.x, seed.y) else {
        return 0;
    };
    if target == fill_color {
        return 0;
    }

    let width = buf.width() as i32;
    let height = buf.height() as i32;
    let mut filled = 0usize;

    let mut stack: Vec<Point> = Vec::with_capacity(4096);
    stack.push(seed);

    while let Some(p) = stack.pop() {
        if buf.get_pixel(p.x, p.y) != Some(target) {
            continue;
        }
        buf.set_pixel(p.x, p.y, fill_color);
        filled += 1;

        if p.x + 1 < width {
            stack.push(Point::new(p.x + 1, p.y));
        }
        if p.x > 0 {
            stack.push(Point::new(p.x - 1, p.y));
        }
        if p.y + 1 < height {
            stack.push(Point::new(p.x, p.y + 1));
        }
        if p.y > 0 {
            stack.push(Point::new(p.x, p.y - 1));
        }
    }

    filled
}
