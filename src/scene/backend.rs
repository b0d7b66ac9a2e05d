use glam::Vec2;

use super::camera::Camera;
use super::graph::SceneGraph;

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Pixel position (origin top-left) to normalized device coordinates.
    pub fn to_ndc(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x / self.width * 2.0 - 1.0, -(y / self.height * 2.0 - 1.0))
    }

    /// Inverse of `to_ndc`.
    pub fn to_pixels(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// The swappable drawing collaborator: paints the retained scene as seen
/// through `camera`. Implementations hold no scene state of their own.
pub trait DrawBackend {
    type Target;

    fn draw(
        &mut self,
        target: &mut Self::Target,
        graph: &SceneGraph,
        camera: &Camera,
        viewport: Viewport,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_roundtrip_corners() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.to_ndc(0.0, 0.0), Vec2::new(-1.0, 1.0));
        assert_eq!(vp.to_ndc(800.0, 600.0), Vec2::new(1.0, -1.0));
        assert_eq!(vp.to_pixels(Vec2::ZERO), Vec2::new(400.0, 300.0));
    }
}
