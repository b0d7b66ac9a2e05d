//! Vello drawing of the retained scene graph.
//!
//! Everything is projected on the CPU with the orbit camera and painted back
//! to front as 2D shapes: grid and axes first, then chunk planes, path
//! lines, and finally the point and overlay spheres sorted by depth.

use glam::Vec3;
use vello::Scene;
use vello::kurbo::{Affine, BezPath, Circle, Line, Point, Rect, Stroke};
use vello::peniko::{Color, Fill};

use crate::color::rgb_channels;
use crate::scene::camera::Camera;
use crate::scene::graph::{Marker, SceneGraph};
use crate::scene::{DrawBackend, Viewport};

const GRID_STROKE: f64 = 1.0;
const AXIS_STROKE: f64 = 2.0;
const PATH_STROKE: f64 = 2.0;
/// Spheres never shrink below this many pixels.
const MIN_MARKER_PX: f64 = 1.5;

/// `0xRRGGBB` plus alpha to a peniko color.
pub fn hex_color(hex: u32, alpha: f32) -> Color {
    let [r, g, b] = rgb_channels(hex);
    Color::new([r, g, b, alpha])
}

#[derive(Debug, Default)]
pub struct VelloBackend;

impl DrawBackend for VelloBackend {
    type Target = Scene;

    fn draw(&mut self, scene: &mut Scene, graph: &SceneGraph, camera: &Camera, viewport: Viewport) {
        let projector = Projector { camera, viewport };

        let bg = Rect::new(0.0, 0.0, viewport.width as f64, viewport.height as f64);
        scene.fill(
            Fill::NonZero,
            Affine::IDENTITY,
            hex_color(graph.background, 1.0),
            None,
            &bg,
        );

        if let Some(grid) = &graph.grid {
            let stroke = Stroke::new(GRID_STROKE);
            for (a, b, color) in grid.lines() {
                projector.line(scene, a, b, hex_color(color, 1.0), &stroke);
            }
        }
        if let Some(axes) = &graph.axes {
            let stroke = Stroke::new(AXIS_STROKE);
            for (a, b, color) in axes.lines() {
                projector.line(scene, a, b, hex_color(color, 1.0), &stroke);
            }
        }

        for plane in &graph.chunk_planes {
            let Some(path) = projector.polygon(&plane.corners()) else {
                continue;
            };
            scene.fill(
                Fill::NonZero,
                Affine::IDENTITY,
                hex_color(plane.color, plane.opacity),
                None,
                &path,
            );
        }

        let stroke = Stroke::new(PATH_STROKE);
        for polyline in &graph.paths {
            let color = hex_color(polyline.color, 1.0);
            for pair in polyline.points.windows(2) {
                projector.line(scene, pair[0], pair[1], color, &stroke);
            }
        }

        let mut spheres: Vec<(&Marker, f32)> = graph
            .markers
            .iter()
            .chain(graph.overlay.iter())
            .map(|m| (m, camera.view_depth(m.position)))
            .filter(|(_, depth)| *depth > camera.near)
            .collect();
        spheres.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (marker, depth) in spheres {
            let Some(center) = projector.to_screen(marker.position) else {
                continue;
            };
            let radius = (projector.pixels_per_unit(depth) * marker.radius as f64).max(MIN_MARKER_PX);
            let view_dir = marker.position - camera.position;
            let [r, g, b] = graph.lighting.shade(marker, view_dir);
            scene.fill(
                Fill::NonZero,
                Affine::IDENTITY,
                Color::new([r, g, b, marker.opacity]),
                None,
                &Circle::new(center, radius),
            );
        }
    }
}

struct Projector<'a> {
    camera: &'a Camera,
    viewport: Viewport,
}

impl Projector<'_> {
    fn to_screen(&self, world: Vec3) -> Option<Point> {
        let ndc = self.camera.project(world, self.viewport.aspect())?;
        let px = self.viewport.to_pixels(ndc.truncate());
        Some(Point::new(px.x as f64, px.y as f64))
    }

    /// Screen pixels covered by one world unit at `depth`.
    fn pixels_per_unit(&self, depth: f32) -> f64 {
        let focal = self.viewport.height as f64 / 2.0 / (self.camera.fov_y_rad as f64 / 2.0).tan();
        focal / depth as f64
    }

    /// Segments with an end behind the camera are skipped.
    fn line(&self, scene: &mut Scene, a: Vec3, b: Vec3, color: Color, stroke: &Stroke) {
        let (Some(p0), Some(p1)) = (self.to_screen(a), self.to_screen(b)) else {
            return;
        };
        scene.stroke(stroke, Affine::IDENTITY, color, None, &Line::new(p0, p1));
    }

    fn polygon(&self, corners: &[Vec3]) -> Option<BezPath> {
        let mut path = BezPath::new();
        for (i, corner) in corners.iter().enumerate() {
            let p = self.to_screen(*corner)?;
            if i == 0 {
                path.move_to(p);
            } else {
                path.line_to(p);
            }
        }
        path.close_path();
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::parser;
    use crate::scene::SceneRenderer;

    #[test]
    fn hex_color_splits_channels() {
        let c = hex_color(0xff0000, 0.5);
        assert_eq!(c.components, [1.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn framed_points_project_inside_viewport() {
        let settings = Settings::default();
        let mut renderer = SceneRenderer::new(&settings);
        renderer.initialize(Viewport::new(800.0, 600.0));
        let parsed = parser::parse("[0,64,0]\n[40,70,-20]");
        renderer.render_points(&parsed.points, &parsed.path_segments, false, false, true);

        let projector = Projector {
            camera: renderer.camera(),
            viewport: renderer.viewport(),
        };
        for marker in &renderer.graph().markers {
            let p = projector.to_screen(marker.position).unwrap();
            assert!((0.0..=800.0).contains(&p.x), "x = {}", p.x);
            assert!((0.0..=600.0).contains(&p.y), "y = {}", p.y);
        }
    }

    #[test]
    fn nearer_markers_are_larger() {
        let settings = Settings::default();
        let mut renderer = SceneRenderer::new(&settings);
        renderer.initialize(Viewport::default());
        let projector = Projector {
            camera: renderer.camera(),
            viewport: renderer.viewport(),
        };
        assert!(projector.pixels_per_unit(10.0) > projector.pixels_per_unit(100.0));
    }

    #[test]
    fn draws_without_panicking() {
        let settings = Settings::default();
        let mut renderer = SceneRenderer::new(&settings);
        renderer.initialize(Viewport::default());
        let parsed = parser::parse("[0,64,0], [16,64,16]\nmine\n[0,0]");
        renderer.render_points(&parsed.points, &parsed.path_segments, true, false, true);
        renderer.render_chunks(&parsed.chunks, 80.0);

        let mut scene = Scene::new();
        VelloBackend.draw(&mut scene, renderer.graph(), renderer.camera(), renderer.viewport());
    }
}
