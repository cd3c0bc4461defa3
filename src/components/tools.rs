use image::Rgba;

use crate::canvas::{Pen, Point, Rect};
use crate::model::CanvasModel;
use crate::ops::shapes::triangle_segments;

// ============================================================================
// TOOL SELECTION
// ============================================================================

/// Available tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Pen,
    Eraser,
    Line,
    Rectangle,
    Ellipse,
    Triangle,
    Fill,
    Eyedropper,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Eraser => "Eraser",
            Tool::Line => "Line",
            Tool::Rectangle => "Rectangle",
            Tool::Ellipse => "Ellipse",
            Tool::Triangle => "Triangle",
            Tool::Fill => "Fill",
            Tool::Eyedropper => "Eyedropper",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[
            Tool::Pen,
            Tool::Eraser,
            Tool::Line,
            Tool::Rectangle,
            Tool::Ellipse,
            Tool::Triangle,
            Tool::Fill,
            Tool::Eyedropper,
        ]
    }

    /// Case-insensitive lookup by label (plus a few short aliases).
    pub fn from_name(name: &str) -> Option<Tool> {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "rect" => return Some(Tool::Rectangle),
            "bucket" => return Some(Tool::Fill),
            "picker" | "dropper" => return Some(Tool::Eyedropper),
            _ => {}
        }
        Tool::all()
            .iter()
            .copied()
            .find(|t| t.label().to_lowercase() == name)
    }

    /// True for tools that draw with the secondary (background) color.
    pub fn uses_secondary_color(&self) -> bool {
        matches!(self, Tool::Eraser)
    }
}

// ============================================================================
// TOOL STATE MACHINES
// ============================================================================

/// Transient drag state for the deferred-commit shape tools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeDrag {
    pub start: Point,
    pub end: Point,
    /// Set by the first move; until then the release point is the end.
    pub moved: bool,
}

/// What a pointer event did, for the owner to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolEffect {
    None,
    /// The canvas was mutated; observers should re-read it.
    CanvasChanged,
    /// The eyedropper sampled this color.
    ColorPicked(Rgba<u8>),
}

/// The active tool together with its per-gesture state.
///
/// Every tool is Idle → Pressed → Idle. Freehand tools hold the last stroke
/// point while pressed; shape tools hold the drag corners and only touch the
/// canvas (one snapshot, one commit) on release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolStrategy {
    Pen { last: Option<Point> },
    Eraser { last: Option<Point> },
    Line { drag: Option<ShapeDrag> },
    Rectangle { drag: Option<ShapeDrag> },
    Ellipse { drag: Option<ShapeDrag> },
    Triangle { drag: Option<ShapeDrag> },
    Fill,
    Eyedropper { sampling: bool },
}

impl ToolStrategy {
    pub fn new(tool: Tool) -> Self {
        match tool {
            Tool::Pen => ToolStrategy::Pen { last: None },
            Tool::Eraser => ToolStrategy::Eraser { last: None },
            Tool::Line => ToolStrategy::Line { drag: None },
            Tool::Rectangle => ToolStrategy::Rectangle { drag: None },
            Tool::Ellipse => ToolStrategy::Ellipse { drag: None },
            Tool::Triangle => ToolStrategy::Triangle { drag: None },
            Tool::Fill => ToolStrategy::Fill,
            Tool::Eyedropper => ToolStrategy::Eyedropper { sampling: false },
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            ToolStrategy::Pen { .. } => Tool::Pen,
            ToolStrategy::Eraser { .. } => Tool::Eraser,
            ToolStrategy::Line { .. } => Tool::Line,
            ToolStrategy::Rectangle { .. } => Tool::Rectangle,
            ToolStrategy::Ellipse { .. } => Tool::Ellipse,
            ToolStrategy::Triangle { .. } => Tool::Triangle,
            ToolStrategy::Fill => Tool::Fill,
            ToolStrategy::Eyedropper { .. } => Tool::Eyedropper,
        }
    }

    /// True between press and release.
    pub fn is_active(&self) -> bool {
        match self {
            ToolStrategy::Pen { last } | ToolStrategy::Eraser { last } => last.is_some(),
            ToolStrategy::Line { drag }
            | ToolStrategy::Rectangle { drag }
            | ToolStrategy::Ellipse { drag }
            | ToolStrategy::Triangle { drag } => drag.is_some(),
            ToolStrategy::Fill => false,
            ToolStrategy::Eyedropper { sampling } => *sampling,
        }
    }

    /// Current drag corners of a shape tool, for live previews.
    pub fn preview(&self) -> Option<ShapeDrag> {
        match self {
            ToolStrategy::Line { drag }
            | ToolStrategy::Rectangle { drag }
            | ToolStrategy::Ellipse { drag }
            | ToolStrategy::Triangle { drag } => *drag,
            _ => None,
        }
    }

    pub fn on_press(&mut self, canvas: &mut CanvasModel, pos: Point, pen: &Pen) -> ToolEffect {
        match self {
            ToolStrategy::Pen { last } | ToolStrategy::Eraser { last } => {
                canvas.save_state();
                canvas.draw_point(pos, pen);
                *last = Some(pos);
                ToolEffect::CanvasChanged
            }
            ToolStrategy::Line { drag }
            | ToolStrategy::Rectangle { drag }
            | ToolStrategy::Ellipse { drag }
            | ToolStrategy::Triangle { drag } => {
                *drag = Some(ShapeDrag { start: pos, end: pos, moved: false });
                ToolEffect::None
            }
            ToolStrategy::Fill => {
                canvas.save_state();
                canvas.fill_point(pos, pen.color);
                ToolEffect::CanvasChanged
            }
            ToolStrategy::Eyedropper { sampling } => {
                *sampling = true;
                sample(canvas, pos)
            }
        }
    }

    pub fn on_move(&mut self, canvas: &mut CanvasModel, pos: Point, pen: &Pen) -> ToolEffect {
        match self {
            ToolStrategy::Pen { last } | ToolStrategy::Eraser { last } => match last {
                Some(from) => {
                    canvas.draw_line(*from, pos, pen);
                    *last = Some(pos);
                    ToolEffect::CanvasChanged
                }
                None => ToolEffect::None,
            },
            ToolStrategy::Line { drag }
            | ToolStrategy::Rectangle { drag }
            | ToolStrategy::Ellipse { drag }
            | ToolStrategy::Triangle { drag } => {
                if let Some(d) = drag {
                    d.end = pos;
                    d.moved = true;
                }
                ToolEffect::None
            }
            ToolStrategy::Fill => ToolEffect::None,
            ToolStrategy::Eyedropper { sampling } => {
                if *sampling {
                    sample(canvas, pos)
                } else {
                    ToolEffect::None
                }
            }
        }
    }

    /// A release without a matching press does nothing.
    pub fn on_release(&mut self, canvas: &mut CanvasModel, pos: Point, pen: &Pen) -> ToolEffect {
        let tool = self.tool();
        match self {
            ToolStrategy::Pen { last } | ToolStrategy::Eraser { last } => match last.take() {
                Some(from) => {
                    canvas.draw_line(from, pos, pen);
                    ToolEffect::CanvasChanged
                }
                None => ToolEffect::None,
            },
            ToolStrategy::Line { drag }
            | ToolStrategy::Rectangle { drag }
            | ToolStrategy::Ellipse { drag }
            | ToolStrategy::Triangle { drag } => match drag.take() {
                Some(mut d) => {
                    if !d.moved {
                        d.end = pos;
                    }
                    canvas.save_state();
                    commit_shape(canvas, tool, d, pen);
                    ToolEffect::CanvasChanged
                }
                None => ToolEffect::None,
            },
            ToolStrategy::Fill => ToolEffect::None,
            ToolStrategy::Eyedropper { sampling } => {
                *sampling = false;
                ToolEffect::None
            }
        }
    }

    /// Abandon any in-flight gesture without touching the canvas.
    pub fn cancel(&mut self) {
        *self = ToolStrategy::new(self.tool());
    }
}

fn sample(canvas: &CanvasModel, pos: Point) -> ToolEffect {
    match canvas.image().get_pixel(pos.x, pos.y) {
        Some(color) => ToolEffect::ColorPicked(color),
        None => ToolEffect::None,
    }
}

fn commit_shape(canvas: &mut CanvasModel, tool: Tool, drag: ShapeDrag, pen: &Pen) {
    match tool {
        Tool::Line => canvas.draw_line(drag.start, drag.end, pen),
        Tool::Rectangle => canvas.draw_rect(Rect::from_corners(drag.start, drag.end), pen),
        Tool::Ellipse => canvas.draw_ellipse(Rect::from_corners(drag.start, drag.end), pen),
        Tool::Triangle => canvas.draw_lines(&triangle_segments(drag.start, drag.end), pen),
        _ => {}
    }
}
