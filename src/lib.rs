//! coordcraft: turns free-form Minecraft coordinate text into an interactive
//! 3D scene of points, paths and claimed chunks, with optional server-side
//! persistence of coordinate sets and reference curves.

pub mod api;
pub mod color;
pub mod config;
pub mod controller;
pub mod draw;
pub mod error;
pub mod hud;
pub mod logging;
pub mod model;
pub mod parser;
pub mod paths;
pub mod protocol;
pub mod scene;
pub mod stash;
pub mod text_format;
