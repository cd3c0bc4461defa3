pub mod ai;
pub mod canvas_ops;
pub mod fill;
pub mod shapes;
