//! `SceneRenderer`: owns the camera, orbit controls and the retained scene
//! graph, and exposes the operations the controller drives.
//!
//! Only `render_points` with `recenter = true`, `reset_view`, `set_top_view`
//! and the chunk-claim view move the camera; everything else leaves it where
//! the user put it.

use glam::{Vec2, Vec3};
use tracing::debug;

use super::backend::Viewport;
use super::camera::{Camera, DragMode, OrbitControls, intersect_horizontal_plane};
use super::graph::{AxesGizmo, ChunkPlane, GroundGrid, Lighting, Marker, Polyline, SceneGraph};
use crate::config::{ColorSettings, SceneSettings, Settings};
use crate::model::{CHUNK_WIDTH, Chunk, ChunkCoord, ChunkType, PathSegment, Point};
use crate::protocol::CurvePoint;

const INITIAL_CAMERA_OFFSET: f32 = 300.0;
const MARKER_EMISSIVE: f32 = 0.3;
const OVERLAY_EMISSIVE: f32 = 0.4;
const OVERLAY_OPACITY: f32 = 0.8;
const CHUNK_OPACITY: f32 = 0.3;
const GRID_CENTER_LINE: u32 = 0x444444;
const GRID_LINE: u32 = 0x222222;

pub struct SceneRenderer {
    scene: SceneSettings,
    colors: ColorSettings,
    camera: Camera,
    controls: OrbitControls,
    graph: SceneGraph,
    viewport: Viewport,
    /// Unflattened positions of the displayed points, used for framing.
    framed: Vec<Vec3>,
}

impl SceneRenderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            scene: settings.scene.clone(),
            colors: settings.colors.clone(),
            camera: Camera::new(settings.scene.fov_degrees),
            controls: OrbitControls::new(settings.scene.damping_factor),
            graph: SceneGraph::default(),
            viewport: Viewport::default(),
            framed: Vec::new(),
        }
    }

    /// Camera on the origin anchor, lighting, chunk-aligned ground grid and
    /// axes.
    pub fn initialize(&mut self, viewport: Viewport) {
        self.viewport = viewport;

        let anchor = Vec3::from(self.scene.origin_anchor);
        self.camera
            .look_at(anchor + Vec3::splat(INITIAL_CAMERA_OFFSET), anchor);
        self.controls.settle();

        self.graph.background = self.colors.background;
        self.graph.lighting = Lighting::default();
        self.graph.grid = Some(GroundGrid {
            center: anchor,
            size: self.scene.grid_size,
            divisions: self.scene.grid_divisions,
            center_line_color: GRID_CENTER_LINE,
            line_color: GRID_LINE,
        });
        self.graph.axes = Some(AxesGizmo {
            origin: anchor,
            length: self.scene.axes_length,
        });
        debug!(target: "scene", ?anchor, "Scene initialized");
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Replace all point markers and path lines.
    pub fn render_points(
        &mut self,
        points: &[Point],
        segments: &[PathSegment],
        show_path: bool,
        flatten: bool,
        recenter: bool,
    ) {
        let altitude = self.scene.reference_altitude;
        let display = |p: &Point| {
            let y = if flatten { altitude } else { p.y as f32 };
            Vec3::new(p.x as f32, y, p.z as f32)
        };

        let markers = points
            .iter()
            .map(|p| Marker {
                position: display(p),
                radius: self.scene.marker_radius,
                color: p.color_hex,
                emissive: MARKER_EMISSIVE,
                opacity: 1.0,
            })
            .collect();

        let paths = if show_path {
            segments
                .iter()
                .filter(|s| s.is_drawable())
                .filter_map(|s| points.get(s.points.clone()))
                .map(|run| Polyline {
                    points: run.iter().map(display).collect(),
                    color: match run[0].color_hex {
                        0 => self.colors.path_fallback,
                        c => c,
                    },
                })
                .collect()
        } else {
            Vec::new()
        };

        self.graph.replace_points(markers, paths);
        self.framed = points
            .iter()
            .map(|p| Vec3::new(p.x as f32, p.y as f32, p.z as f32))
            .collect();

        if recenter {
            self.center_camera_on_points();
        }
    }

    /// Replace all chunk-claim planes.
    pub fn render_chunks(&mut self, chunks: &[Chunk], y_level: f32) {
        let planes = chunks
            .iter()
            .map(|chunk| {
                let (x, z) = chunk.coord().world_center();
                ChunkPlane {
                    center: Vec3::new(x as f32, y_level, z as f32),
                    size: CHUNK_WIDTH as f32,
                    color: match chunk.chunk_type {
                        ChunkType::Mine => self.colors.mine_chunk,
                        ChunkType::Unavailable => self.colors.unavailable_chunk,
                    },
                    opacity: CHUNK_OPACITY,
                }
            })
            .collect();
        self.graph.replace_chunks(planes);
    }

    /// Replace the reference overlay with `coordinates` in `color`.
    pub fn render_overlay(&mut self, coordinates: &[CurvePoint], color: u32, flatten: bool) {
        let altitude = self.scene.reference_altitude;
        let markers = coordinates
            .iter()
            .map(|c| Marker {
                position: Vec3::new(
                    c.x as f32,
                    if flatten { altitude } else { c.y as f32 },
                    c.z as f32,
                ),
                radius: self.scene.overlay_marker_radius,
                color,
                emissive: OVERLAY_EMISSIVE,
                opacity: OVERLAY_OPACITY,
            })
            .collect();
        self.graph.replace_overlay(markers);
    }

    pub fn clear_overlay(&mut self) {
        self.graph.clear_overlay();
    }

    /// Frame the bounding box of the displayed points.
    fn center_camera_on_points(&mut self) {
        let Some(first) = self.framed.first().copied() else {
            return;
        };
        let (min, max) = self
            .framed
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let center = (min + max) / 2.0;
        let range = max - min;
        let distance = (range.max_element() * 2.0).max(self.scene.min_framing_distance);

        self.camera.look_at(center + Vec3::splat(distance), center);
        self.controls.settle();
        debug!(target: "scene", ?center, distance, "Camera framed points");
    }

    pub fn reset_view(&mut self) {
        self.center_camera_on_points();
    }

    /// Straight above the orbit target. No-op without points.
    pub fn set_top_view(&mut self) {
        if self.framed.is_empty() {
            return;
        }
        self.place_above_target();
    }

    /// Top-down view with orbit rotation locked, for claiming chunks.
    pub fn enter_chunk_claim_view(&mut self) {
        self.place_above_target();
        self.controls.enable_rotate = false;
        self.controls.end_drag();
    }

    pub fn leave_chunk_claim_view(&mut self) {
        self.controls.enable_rotate = true;
    }

    fn place_above_target(&mut self) {
        let target = self.camera.target;
        self.camera
            .look_at(target + Vec3::Y * self.scene.top_view_distance, target);
        self.controls.settle();
    }

    /// Chunk under a pixel position, projected onto the horizontal plane at
    /// the orbit target's altitude.
    pub fn pick_chunk_at(&self, screen_x: f32, screen_y: f32) -> Option<ChunkCoord> {
        let ndc = self.viewport.to_ndc(screen_x, screen_y);
        let (origin, direction) = self.camera.ray_through(ndc, self.viewport.aspect());
        let hit = intersect_horizontal_plane(origin, direction, self.camera.target.y)?;
        Some(ChunkCoord::from_world(hit.x as f64, hit.z as f64))
    }

    /// One animation frame: advance damping. Returns whether the camera moved.
    pub fn tick(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }

    // --- pointer input, forwarded from the window ---

    pub fn pointer_down(&mut self, mode: DragMode, x: f32, y: f32) -> bool {
        self.controls.begin_drag(mode, Vec2::new(x, y))
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.controls
            .drag_to(Vec2::new(x, y), self.viewport.height, &self.camera);
    }

    pub fn pointer_up(&mut self) {
        self.controls.end_drag();
    }

    pub fn wheel(&mut self, steps: f32) {
        self.controls.zoom(steps);
    }

    pub fn user_has_moved_camera(&self) -> bool {
        self.controls.user_has_moved()
    }

    pub fn rotation_enabled(&self) -> bool {
        self.controls.enable_rotate
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}
