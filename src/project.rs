use std::path::PathBuf;

use image::Rgba;
use uuid::Uuid;

use crate::canvas::{BLACK, Pen, PixelBuffer, Point, WHITE};
use crate::components::history::MAX_UNDO;
use crate::components::tools::{Tool, ToolEffect, ToolStrategy};
use crate::model::CanvasModel;
use crate::ops::canvas_ops::fit_to_canvas;
use crate::settings::AppSettings;

type Listener = Box<dyn FnMut()>;

/// Single open document: the canvas plus the paint controller state that
/// drives it (active tool, colors, stroke width, change notification).
pub struct Project {
    pub id: Uuid,
    pub canvas: CanvasModel,
    tool: ToolStrategy,
    pub primary_color: Rgba<u8>,
    pub secondary_color: Rgba<u8>,
    pen_width: u32,

    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,

    /// Bumped on every canvas change
    generation: u64,
    listeners: Vec<Listener>,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32) -> Self {
        Self::with_canvas(
            format!("Untitled-{}", untitled_counter),
            CanvasModel::with_capacity(width, height, MAX_UNDO),
        )
    }

    pub fn from_settings(untitled_counter: usize, settings: &AppSettings) -> Self {
        let mut project = Self::with_canvas(
            format!("Untitled-{}", untitled_counter),
            CanvasModel::with_capacity(
                settings.canvas_width,
                settings.canvas_height,
                settings.max_undo_steps,
            ),
        );
        project.primary_color = settings.primary_color;
        project.secondary_color = settings.secondary_color;
        project.set_pen_width(settings.pen_width);
        project
    }

    pub fn from_file(path: PathBuf, canvas: CanvasModel) -> Self {
        let mut project = Self::with_canvas(String::new(), canvas);
        project.path = Some(path);
        project.update_name_from_path();
        project
    }

    fn with_canvas(name: String, canvas: CanvasModel) -> Self {
        Self {
            id: Uuid::new_v4(),
            canvas,
            tool: ToolStrategy::new(Tool::Pen),
            primary_color: BLACK,
            secondary_color: WHITE,
            pen_width: 1,
            path: None,
            is_dirty: false,
            name,
            generation: 0,
            listeners: Vec::new(),
        }
    }

    // ---- Tool / pen state --------------------------------------------------

    pub fn tool(&self) -> Tool {
        self.tool.tool()
    }

    pub fn tool_state(&self) -> &ToolStrategy {
        &self.tool
    }

    /// Switch tools. An unfinished gesture of the previous tool is dropped.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool.tool() {
            self.tool = ToolStrategy::new(tool);
        }
    }

    pub fn pen_width(&self) -> u32 {
        self.pen_width
    }

    pub fn set_pen_width(&mut self, width: u32) {
        self.pen_width = width.max(1);
    }

    /// Pen used by the active tool.
    pub fn pen(&self) -> Pen {
        let color = if self.tool().uses_secondary_color() {
            self.secondary_color
        } else {
            self.primary_color
        };
        Pen::new(color, self.pen_width)
    }

    // ---- Pointer gestures ----------------------------------------------------

    pub fn press(&mut self, pos: Point) -> ToolEffect {
        let pen = self.pen();
        let effect = self.tool.on_press(&mut self.canvas, pos, &pen);
        self.apply_effect(effect);
        effect
    }

    pub fn move_to(&mut self, pos: Point) -> ToolEffect {
        let pen = self.pen();
        let effect = self.tool.on_move(&mut self.canvas, pos, &pen);
        self.apply_effect(effect);
        effect
    }

    pub fn release(&mut self, pos: Point) -> ToolEffect {
        let pen = self.pen();
        let effect = self.tool.on_release(&mut self.canvas, pos, &pen);
        self.apply_effect(effect);
        effect
    }

    fn apply_effect(&mut self, effect: ToolEffect) {
        match effect {
            ToolEffect::None => {}
            ToolEffect::CanvasChanged => self.notify_canvas_changed(),
            ToolEffect::ColorPicked(color) => self.primary_color = color,
        }
    }

    // ---- Document commands -------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.tool.cancel();
        let changed = self.canvas.undo();
        if changed {
            self.notify_canvas_changed();
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.tool.cancel();
        let changed = self.canvas.redo();
        if changed {
            self.notify_canvas_changed();
        }
        changed
    }

    pub fn clear(&mut self) {
        self.tool.cancel();
        self.canvas.clear();
        crate::log_info!("Cleared \"{}\"", self.name);
        self.notify_canvas_changed();
    }

    /// Replace the canvas contents with `image` as-is (one undo step).
    pub fn load_image(&mut self, image: PixelBuffer) {
        self.tool.cancel();
        crate::log_info!(
            "Loading {}x{} image into \"{}\"",
            image.width(),
            image.height(),
            self.name
        );
        self.canvas.load_image(image);
        self.notify_canvas_changed();
    }

    /// Load `image` scaled and centred to the current canvas size.
    pub fn load_image_fitted(&mut self, image: &PixelBuffer) {
        let fitted = fit_to_canvas(image.as_rgba_image(), self.canvas.width(), self.canvas.height());
        self.load_image(fitted);
    }

    /// Put an inpainting result on the canvas.
    pub fn apply_completion(&mut self, result: &PixelBuffer) {
        self.load_image_fitted(result);
    }

    // ---- Change notification -----------------------------------------------

    /// Register a callback invoked after every canvas change.
    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn notify_canvas_changed(&mut self) {
        self.generation += 1;
        self.mark_dirty();
        for listener in &mut self.listeners {
            listener();
        }
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}
