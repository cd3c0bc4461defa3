use image::Rgba;

use crate::canvas::{Pen, PixelBuffer, Point, Rect};
use crate::components::history::{HistoryManager, MAX_UNDO};
use crate::ops::{fill, shapes};

/// The single mutation/query surface tools draw through.
///
/// Owns the current buffer exclusively. Drawing calls never snapshot on
/// their own; callers issue `save_state` before the first mutation of a
/// gesture. Readers get `&PixelBuffer` (or an owned copy via `snapshot`), so
/// no mutable alias ever escapes.
#[derive(Clone, Debug)]
pub struct CanvasModel {
    image: PixelBuffer,
    history: HistoryManager,
}

impl CanvasModel {
    /// White canvas with the default 10-step undo limit.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_capacity(width, height, MAX_UNDO)
    }

    pub fn with_capacity(width: u32, height: u32, max_undo: usize) -> Self {
        Self {
            image: PixelBuffer::new(width, height),
            history: HistoryManager::new(max_undo),
        }
    }

    /// Resume from a stored buffer and history (session files).
    pub fn from_parts(image: PixelBuffer, history: HistoryManager) -> Self {
        Self { image, history }
    }

    // -- drawing ---------------------------------------------------------

    pub fn draw_point(&mut self, point: Point, pen: &Pen) {
        shapes::draw_point(&mut self.image, point, pen);
    }

    pub fn draw_line(&mut self, from: Point, to: Point, pen: &Pen) {
        shapes::draw_line(&mut self.image, from, to, pen);
    }

    pub fn draw_lines(&mut self, lines: &[(Point, Point)], pen: &Pen) {
        shapes::draw_lines(&mut self.image, lines, pen);
    }

    pub fn draw_rect(&mut self, rect: Rect, pen: &Pen) {
        shapes::draw_rect(&mut self.image, rect, pen);
    }

    pub fn draw_ellipse(&mut self, rect: Rect, pen: &Pen) {
        shapes::draw_ellipse(&mut self.image, rect, pen);
    }

    /// Returns the number of pixels recolored.
    pub fn fill_point(&mut self, point: Point, fill_color: Rgba<u8>) -> usize {
        fill::fill_point(&mut self.image, point, fill_color)
    }

    // -- history ---------------------------------------------------------

    pub fn save_state(&mut self) {
        self.history.save_state(&self.image);
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.image)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.image)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Wipe to white at the current size (undoable).
    pub fn clear(&mut self) {
        self.save_state();
        self.image = PixelBuffer::new(self.width(), self.height());
    }

    /// Replace the whole buffer (undoable). Used for file loads, pastes and
    /// applied completion results.
    pub fn load_image(&mut self, image: PixelBuffer) {
        self.save_state();
        self.image = image;
    }

    // -- queries ---------------------------------------------------------

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    /// Owned copy of the current buffer.
    pub fn snapshot(&self) -> PixelBuffer {
        self.image.clone()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, WHITE};

    #[test]
    fn starts_white_with_empty_history() {
        let model = CanvasModel::new(4, 4);
        assert_eq!(model.image().count_color(WHITE), 16);
        assert!(!model.can_undo());
        assert!(!model.can_redo());
    }

    #[test]
    fn drawing_does_not_snapshot_by_itself() {
        let mut model = CanvasModel::new(4, 4);
        model.draw_point(Point::new(1, 1), &Pen::new(BLACK, 1));
        assert!(!model.can_undo());
    }

    #[test]
    fn save_mutate_undo_restores_exactly() {
        let mut model = CanvasModel::new(8, 8);
        let before = model.snapshot();
        model.save_state();
        model.draw_rect(
            Rect::from_corners(Point::new(1, 1), Point::new(6, 6)),
            &Pen::new(BLACK, 2),
        );
        assert_ne!(model.image(), &before);
        assert!(model.undo());
        assert_eq!(model.image(), &before);
    }

    #[test]
    fn point_undo_redo_scenario() {
        let mut model = CanvasModel::new(4, 4);
        model.save_state();
        model.draw_point(Point::new(1, 1), &Pen::new(BLACK, 1));
        model.undo();
        assert_eq!(model.image().get_pixel(1, 1), Some(WHITE));
        assert!(model.can_redo());
        model.redo();
        assert_eq!(model.image().get_pixel(1, 1), Some(BLACK));
    }

    #[test]
    fn clear_is_undoable_and_drops_redo() {
        let mut model = CanvasModel::new(3, 3);
        model.save_state();
        model.fill_point(Point::new(0, 0), BLACK);
        model.save_state();
        model.draw_point(Point::new(0, 0), &Pen::new(WHITE, 1));
        model.undo();
        assert!(model.can_redo());

        model.clear();
        assert!(!model.can_redo());
        assert_eq!(model.image().count_color(WHITE), 9);
        model.undo();
        assert_eq!(model.image().count_color(BLACK), 9);
    }

    #[test]
    fn load_image_replaces_buffer_and_can_change_size() {
        let mut model = CanvasModel::new(3, 3);
        model.load_image(PixelBuffer::filled(5, 2, BLACK));
        assert_eq!((model.width(), model.height()), (5, 2));
        model.undo();
        assert_eq!((model.width(), model.height()), (3, 3));
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut model = CanvasModel::new(3, 3);
        let shot = model.snapshot();
        model.fill_point(Point::new(1, 1), BLACK);
        assert_eq!(shot.count_color(WHITE), 9);
    }

    #[test]
    fn configured_capacity_is_honoured() {
        let mut model = CanvasModel::with_capacity(2, 2, 3);
        for _ in 0..5 {
            model.save_state();
        }
        assert_eq!(model.history().undo_len(), 3);
    }
}
