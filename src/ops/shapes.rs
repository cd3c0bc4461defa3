// ============================================================================
// DRAWING ENGINE — point, line, polyline, rectangle and ellipse rasterization
// ============================================================================
//
// All primitives are stateless functions over a target `PixelBuffer` and a
// `Pen`. Coordinates may lie outside the buffer; every write is clipped.
//
// Width model: width 1 plots single pixels. Width w > 1 stamps a w×w square
// centred on each rasterized point (square caps), see `Pen::extent`.

use crate::canvas::{Pen, PixelBuffer, Point, Rect};

/// Stamp the pen footprint centred on (x, y).
#[inline]
fn stamp(buf: &mut PixelBuffer, x: i64, y: i64, pen: &Pen) {
    if pen.width() == 1 {
        if x >= i32::MIN as i64 && x <= i32::MAX as i64 && y >= i32::MIN as i64 && y <= i32::MAX as i64 {
            buf.set_pixel(x as i32, y as i32, pen.color);
        }
        return;
    }
    let (lo, hi) = pen.extent();
    buf.fill_span(
        x + lo as i64,
        y + lo as i64,
        x + hi as i64,
        y + hi as i64,
        pen.color,
    );
}

/// Mark a single point. No-op when `p` lies outside the buffer.
pub fn draw_point(buf: &mut PixelBuffer, p: Point, pen: &Pen) {
    if !buf.contains(p.x, p.y) {
        return;
    }
    stamp(buf, p.x as i64, p.y as i64, pen);
}

/// Rasterize the segment a→b, stamping the pen once per step along the
/// major axis. The minor coordinate at step `i` of `n` is `i·d/n` rounded
/// half away from `a`, so consecutive points are always 8-connected and thick
/// strokes never gap.
///
/// Steps whose stamp cannot reach the buffer are skipped in closed form, so
/// the work is bounded by the buffer size however far away the endpoints are.
pub fn draw_line(buf: &mut PixelBuffer, a: Point, b: Point, pen: &Pen) {
    if buf.is_empty() || segment_outside(buf, a, b, pen) {
        return;
    }

    let (ax, ay, bx, by) = (a.x as i64, a.y as i64, b.x as i64, b.y as i64);
    let (dx, dy) = (bx - ax, by - ay);
    let x_major = dx.abs() >= dy.abs();
    let (major0, minor0, d_major, d_minor, major_len) = if x_major {
        (ax, ay, dx, dy, buf.width() as i64)
    } else {
        (ay, ax, dy, dx, buf.height() as i64)
    };
    let n = d_major.abs();
    let m = d_minor.abs();
    let (s_major, s_minor) = (d_major.signum(), d_minor.signum());

    // Stamp centres along the major axis that can still touch the buffer
    let (lo, hi) = pen.extent();
    let (min_c, max_c) = (-(hi as i64), major_len - 1 - lo as i64);
    let (first, last) = match s_major {
        1 => ((min_c - major0).max(0), (max_c - major0).min(n)),
        -1 => ((major0 - max_c).max(0), (major0 - min_c).min(n)),
        _ => (0, 0),
    };

    for i in first..=last {
        let major = major0 + s_major * i;
        let offset = if n == 0 {
            0
        } else {
            ((2 * i as i128 * m as i128 + n as i128) / (2 * n as i128)) as i64
        };
        let minor = minor0 + s_minor * offset;
        if x_major {
            stamp(buf, major, minor, pen);
        } else {
            stamp(buf, minor, major, pen);
        }
    }
}

/// Both endpoints beyond the same buffer edge (pen margin included): nothing
/// the segment touches can be visible.
fn segment_outside(buf: &PixelBuffer, a: Point, b: Point, pen: &Pen) -> bool {
    let (lo, hi) = pen.extent();
    let min_x = -(hi as i64);
    let min_y = -(hi as i64);
    let max_x = buf.width() as i64 - 1 - lo as i64;
    let max_y = buf.height() as i64 - 1 - lo as i64;
    let (ax, ay, bx, by) = (a.x as i64, a.y as i64, b.x as i64, b.y as i64);
    (ax < min_x && bx < min_x)
        || (ay < min_y && by < min_y)
        || (ax > max_x && bx > max_x)
        || (ay > max_y && by > max_y)
}

/// Batch variant of `draw_line` sharing one pen.
pub fn draw_lines(buf: &mut PixelBuffer, segments: &[(Point, Point)], pen: &Pen) {
    for &(a, b) in segments {
        draw_line(buf, a, b, pen);
    }
}

/// Rectangle outline with mitered corners.
///
/// Each side is a band `pen.width()` thick centred on the outline and
/// extended past the corners by the half-width, so corners come out sharp.
/// A pen wider than the rectangle makes the bands overlap into the solid
/// outer box.
pub fn draw_rect(buf: &mut PixelBuffer, rect: Rect, pen: &Pen) {
    if buf.is_empty() {
        return;
    }
    let (lo, hi) = pen.extent();
    let (lo, hi) = (lo as i64, hi as i64);
    let left = rect.left() as i64;
    let top = rect.top() as i64;
    let right = rect.right() as i64;
    let bottom = rect.bottom() as i64;

    let outer_left = left + lo;
    let outer_right = right + hi;
    let outer_top = top + lo;
    let outer_bottom = bottom + hi;

    // top & bottom bands span the full outer width (covers the corners)
    buf.fill_span(outer_left, top + lo, outer_right, top + hi, pen.color);
    buf.fill_span(outer_left, bottom + lo, outer_right, bottom + hi, pen.color);
    // left & right bands
    buf.fill_span(left + lo, outer_top, left + hi, outer_bottom, pen.color);
    buf.fill_span(right + lo, outer_top, right + hi, outer_bottom, pen.color);
}

/// Outline of the ellipse inscribed in `rect`.
///
/// Sampled column-by-column and row-by-row so both the flat and the steep
/// parts of the curve are gap-free; the pen is stamped at every sample.
pub fn draw_ellipse(buf: &mut PixelBuffer, rect: Rect, pen: &Pen) {
    if buf.is_empty() {
        return;
    }
    if rect.width() == 1 || rect.height() == 1 {
        draw_line(buf, rect.top_left(), rect.bottom_right(), pen);
        return;
    }

    let left = rect.left() as i64;
    let top = rect.top() as i64;
    let right = rect.right() as i64;
    let bottom = rect.bottom() as i64;

    let cx = (left + right) as f64 / 2.0;
    let cy = (top + bottom) as f64 / 2.0;
    let rx = (right - left) as f64 / 2.0;
    let ry = (bottom - top) as f64 / 2.0;

    // Only iterate the part of the bounding box that can reach the buffer.
    let margin = pen.width() as i64;
    let x_from = left.max(-margin);
    let x_to = right.min(buf.width() as i64 + margin);
    let y_from = top.max(-margin);
    let y_to = bottom.min(buf.height() as i64 + margin);

    // The far half is mirrored from the near half so the outline stays
    // exactly symmetric regardless of rounding.
    for x in x_from..=x_to {
        let t = (x as f64 - cx) / rx;
        let dy = ry * (1.0 - t * t).max(0.0).sqrt();
        let upper = (cy - dy).round() as i64;
        stamp(buf, x, upper, pen);
        stamp(buf, x, top + bottom - upper, pen);
    }
    for y in y_from..=y_to {
        let t = (y as f64 - cy) / ry;
        let dx = rx * (1.0 - t * t).max(0.0).sqrt();
        let near = (cx - dx).round() as i64;
        stamp(buf, near, y, pen);
        stamp(buf, left + right - near, y, pen);
    }
}

/// Edges of the triangle inscribed in the box spanned by a drag from
/// `start` to `end`: apex at the middle of the start edge, base along the
/// end edge.
pub fn triangle_segments(start: Point, end: Point) -> [(Point, Point); 3] {
    let apex = Point::new(((start.x as i64 + end.x as i64) / 2) as i32, start.y);
    let base_left = Point::new(start.x, end.y);
    let base_right = Point::new(end.x, end.y);
    [(apex, base_left), (base_left, base_right), (base_right, apex)]
}
