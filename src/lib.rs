#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;
pub mod app;
pub mod canvas;
pub mod cli;
pub mod color;
pub mod components;
pub mod io;
pub mod ops;
pub mod project;
pub mod settings;

pub use app::{App, Effect, Event};
pub use canvas::{Point, Surface};
pub use color::Color;
pub use settings::AppSettings;
