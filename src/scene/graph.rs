//! Retained-mode scene content.
//!
//! Each layer (points, paths, chunk planes, overlay) is replaced wholesale by
//! the renderer; nothing here is mutated piecemeal. A `DrawBackend` reads the
//! graph every frame.

use glam::Vec3;

use crate::color::rgb_channels;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: Vec3,
    pub radius: f32,
    pub color: u32,
    pub emissive: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Vec3>,
    pub color: u32,
}

/// Horizontal square centred on a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPlane {
    pub center: Vec3,
    pub size: f32,
    pub color: u32,
    pub opacity: f32,
}

impl ChunkPlane {
    pub fn corners(&self) -> [Vec3; 4] {
        let h = self.size / 2.0;
        [
            self.center + Vec3::new(-h, 0.0, -h),
            self.center + Vec3::new(h, 0.0, -h),
            self.center + Vec3::new(h, 0.0, h),
            self.center + Vec3::new(-h, 0.0, h),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundGrid {
    pub center: Vec3,
    pub size: f32,
    pub divisions: u32,
    pub center_line_color: u32,
    pub line_color: u32,
}

impl GroundGrid {
    /// Line segments `(start, end, color)`, both directions.
    pub fn lines(&self) -> Vec<(Vec3, Vec3, u32)> {
        let divisions = self.divisions.max(1);
        let step = self.size / divisions as f32;
        let half = self.size / 2.0;
        let mut out = Vec::with_capacity(2 * (divisions as usize + 1));
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            let color = if i * 2 == divisions {
                self.center_line_color
            } else {
                self.line_color
            };
            out.push((
                self.center + Vec3::new(-half, 0.0, k),
                self.center + Vec3::new(half, 0.0, k),
                color,
            ));
            out.push((
                self.center + Vec3::new(k, 0.0, -half),
                self.center + Vec3::new(k, 0.0, half),
                color,
            ));
        }
        out
    }
}

/// Red/green/blue lines along +X/+Y/+Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxesGizmo {
    pub origin: Vec3,
    pub length: f32,
}

impl AxesGizmo {
    pub fn lines(&self) -> [(Vec3, Vec3, u32); 3] {
        [
            (self.origin, self.origin + Vec3::X * self.length, 0xff0000),
            (self.origin, self.origin + Vec3::Y * self.length, 0x00ff00),
            (self.origin, self.origin + Vec3::Z * self.length, 0x0000ff),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub directional: f32,
    /// Direction *towards* the light.
    pub direction: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.6,
            directional: 0.8,
            direction: Vec3::new(100.0, 100.0, 50.0).normalize(),
        }
    }
}

impl Lighting {
    /// Lit color of a marker seen from `view_dir` (camera to marker), as
    /// linear `[r, g, b]` in 0..1. A sphere is reduced to its silhouette
    /// normal, which faces the camera.
    pub fn shade(&self, marker: &Marker, view_dir: Vec3) -> [f32; 3] {
        let normal = -view_dir.normalize_or_zero();
        let lambert = normal.dot(self.direction).max(0.0);
        let intensity = self.ambient + self.directional * lambert;
        let base = rgb_channels(marker.color);
        base.map(|c| (c * intensity + c * marker.emissive).min(1.0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub markers: Vec<Marker>,
    pub paths: Vec<Polyline>,
    pub chunk_planes: Vec<ChunkPlane>,
    pub overlay: Vec<Marker>,
    pub grid: Option<GroundGrid>,
    pub axes: Option<AxesGizmo>,
    pub lighting: Lighting,
    pub background: u32,
}

impl SceneGraph {
    pub fn replace_points(&mut self, markers: Vec<Marker>, paths: Vec<Polyline>) {
        self.markers = markers;
        self.paths = paths;
    }

    pub fn replace_chunks(&mut self, planes: Vec<ChunkPlane>) {
        self.chunk_planes = planes;
    }

    pub fn replace_overlay(&mut self, markers: Vec<Marker>) {
        self.overlay = markers;
    }

    pub fn clear_overlay(&mut self) {
        self.overlay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_lines_cover_every_division() {
        let grid = GroundGrid {
            center: Vec3::ZERO,
            size: 1024.0,
            divisions: 64,
            center_line_color: 0x444444,
            line_color: 0x222222,
        };
        let lines = grid.lines();
        assert_eq!(lines.len(), 2 * 65);
        assert_eq!(lines.iter().filter(|l| l.2 == 0x444444).count(), 2);
        // 16-block spacing.
        assert!((lines[2].0.z - lines[0].0.z - 16.0).abs() < 1e-4);
    }

    #[test]
    fn chunk_plane_corners_span_sixteen_blocks() {
        let plane = ChunkPlane {
            center: Vec3::new(8.0, 80.0, 8.0),
            size: 16.0,
            color: 0x7cb342,
            opacity: 0.3,
        };
        let [a, _, c, _] = plane.corners();
        assert_eq!(a, Vec3::new(0.0, 80.0, 0.0));
        assert_eq!(c, Vec3::new(16.0, 80.0, 16.0));
    }

    #[test]
    fn shading_stays_in_range() {
        let marker = Marker {
            position: Vec3::ZERO,
            radius: 1.25,
            color: 0xffffff,
            emissive: 0.3,
            opacity: 1.0,
        };
        let lit = Lighting::default().shade(&marker, Vec3::new(-1.0, -1.0, -0.5));
        assert!(lit.iter().all(|c| (0.0..=1.0).contains(c)));
        assert_eq!(lit, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn replacing_a_layer_leaves_others() {
        let mut graph = SceneGraph::default();
        graph.replace_chunks(vec![ChunkPlane {
            center: Vec3::ZERO,
            size: 16.0,
            color: 0,
            opacity: 0.3,
        }]);
        graph.replace_points(Vec::new(), Vec::new());
        assert_eq!(graph.chunk_planes.len(), 1);
    }
}
