#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod io;
pub mod model;
pub mod ops;
pub mod project;
pub mod settings;
