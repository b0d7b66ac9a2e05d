//! Perspective camera and orbit controls.
//!
//! The controls keep the camera on a sphere around `Camera::target`. User
//! input accumulates spherical/pan deltas that `OrbitControls::update`
//! applies gradually when damping is enabled, so the redraw loop has to call
//! `update` once per frame for motion to settle.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};

const EPS: f32 = 1e-6;
/// Per wheel notch.
const ZOOM_BASE: f32 = 0.95;

pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov_degrees: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_rad: fov_degrees.to_radians(),
            near: 0.1,
            far: 10_000.0,
        }
    }

    /// Place the camera at `position` looking at `target`.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        // Straight-down views make `up` parallel to the view direction.
        let forward = (self.target - self.position).normalize_or_zero();
        let up = if forward.cross(self.up).length_squared() < EPS {
            Vec3::NEG_Z
        } else {
            self.up
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_rad, aspect_ratio.max(EPS), self.near, self.far)
    }

    pub fn view_projection(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// World point to NDC (`x`, `y` in -1..1, `z` depth). `None` when the
    /// point is behind the near plane.
    pub fn project(&self, world: Vec3, aspect_ratio: f32) -> Option<Vec3> {
        let clip = self.view_projection(aspect_ratio) * world.extend(1.0);
        if clip.w < self.near {
            return None;
        }
        Some(clip.truncate() / clip.w)
    }

    /// Distance from the camera along the view axis.
    pub fn view_depth(&self, world: Vec3) -> f32 {
        -(self.view_matrix().transform_point3(world).z)
    }

    /// Ray from the camera through an NDC position: `(origin, direction)`.
    pub fn ray_through(&self, ndc: Vec2, aspect_ratio: f32) -> (Vec3, Vec3) {
        let camera_to_world = self.view_matrix().inverse();
        let right = camera_to_world.x_axis.truncate();
        let up = camera_to_world.y_axis.truncate();
        let forward = -camera_to_world.z_axis.truncate();
        let half_height = (self.fov_y_rad / 2.0).tan();
        let half_width = half_height * aspect_ratio.max(EPS);
        let direction = forward + right * (ndc.x * half_width) + up * (ndc.y * half_height);
        (self.position, direction.normalize_or_zero())
    }
}

/// Intersection of a ray with the horizontal plane `y = plane_y`.
/// `None` when parallel or behind the origin.
pub fn intersect_horizontal_plane(origin: Vec3, direction: Vec3, plane_y: f32) -> Option<Vec3> {
    if direction.y.abs() < EPS {
        return None;
    }
    let t = (plane_y - origin.y) / direction.y;
    if t < 0.0 {
        return None;
    }
    Some(origin + direction * t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Orbit controller in the manner of three.js `OrbitControls`.
pub struct OrbitControls {
    pub enable_rotate: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Set on the first user interaction, never cleared.
    user_has_moved: bool,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
    drag: Option<DragMode>,
    last_pointer: Option<Vec2>,
}

impl OrbitControls {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            enable_rotate: true,
            enable_damping: true,
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            user_has_moved: false,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            drag: None,
            last_pointer: None,
        }
    }

    pub fn user_has_moved(&self) -> bool {
        self.user_has_moved
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start a drag. Returns `false` (and records nothing) when the mode is
    /// disabled.
    pub fn begin_drag(&mut self, mode: DragMode, at: Vec2) -> bool {
        if mode == DragMode::Rotate && !self.enable_rotate {
            return false;
        }
        self.drag = Some(mode);
        self.last_pointer = Some(at);
        self.user_has_moved = true;
        true
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
        self.last_pointer = None;
    }

    /// Feed pointer motion during a drag.
    pub fn drag_to(&mut self, at: Vec2, viewport_height: f32, camera: &Camera) {
        let (Some(mode), Some(last)) = (self.drag, self.last_pointer) else {
            return;
        };
        let delta = at - last;
        self.last_pointer = Some(at);
        let height = viewport_height.max(1.0);

        match mode {
            DragMode::Rotate => {
                self.delta_theta -= 2.0 * PI * delta.x / height * self.rotate_speed;
                self.delta_phi -= 2.0 * PI * delta.y / height * self.rotate_speed;
            }
            DragMode::Pan => {
                let offset = camera.position - camera.target;
                let target_distance = offset.length() * (camera.fov_y_rad / 2.0).tan();
                let view = camera.view_matrix().inverse();
                let right = view.x_axis.truncate();
                let up = view.y_axis.truncate();
                let pan_x = -2.0 * delta.x * target_distance / height * self.pan_speed;
                let pan_y = 2.0 * delta.y * target_distance / height * self.pan_speed;
                self.pan_offset += right * pan_x + up * pan_y;
            }
        }
    }

    /// Wheel input; positive `steps` zoom in.
    pub fn zoom(&mut self, steps: f32) {
        if steps == 0.0 {
            return;
        }
        self.user_has_moved = true;
        self.scale *= ZOOM_BASE.powf(steps * self.zoom_speed);
    }

    /// Drop pending motion, e.g. after the camera was placed programmatically.
    pub fn settle(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;
    }

    /// Apply pending motion to `camera`. Returns whether it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.position - camera.target;
        let radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > EPS {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.delta_theta * factor;
        phi += self.delta_phi * factor;
        phi = phi.clamp(EPS, PI - EPS);

        let min_distance = camera.near * 2.0;
        let max_distance = (camera.far * 0.9).max(min_distance);
        let radius = (radius * self.scale).clamp(min_distance, max_distance);

        let pan = self.pan_offset * factor;
        let new_target = camera.target + pan;
        let new_offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        let new_position = new_target + new_offset;

        let moved = new_position.distance_squared(camera.position) > EPS
            || new_target.distance_squared(camera.target) > EPS;

        camera.target = new_target;
        camera.position = new_position;

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        moved
    }
}
