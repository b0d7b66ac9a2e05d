//! 3D scene: camera and orbit controls, the retained scene graph, and the
//! renderer the controller drives. Actual pixel output goes through a
//! `DrawBackend` so the drawing library can be swapped out.

pub mod backend;
pub mod camera;
pub mod graph;
pub mod renderer;

pub use backend::{DrawBackend, Viewport};
pub use camera::DragMode;
pub use renderer::SceneRenderer;
