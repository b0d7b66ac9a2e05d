//! Runtime settings for coordcraft.
//!
//! All tunables (API endpoints, scene dimensions, colors) live in a single
//! `Settings` struct that can be serialized to/from TOML. Every section is
//! `#[serde(default)]`, so a config file only needs the keys it overrides.

use std::path::Path;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Root settings container.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub app: AppSettings,
    pub scene: SceneSettings,
    pub colors: ColorSettings,
}

// --- Sub-structs ---

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub list_sets_path: String,
    pub load_set_path: String,
    pub load_demo_path: String,
    pub save_set_path: String,
    /// Updates post to the save endpoint with `coordinate_set_id` set.
    pub update_set_path: String,
    pub list_curves_path: String,
    pub load_curve_path: String,
    pub delete_curve_path: String,
    pub stash_text_path: String,
    pub clear_stash_path: String,
    pub timeout_secs: u64,
    /// Raw `Cookie` header value for an authenticated session.
    pub session_cookie: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AppSettings {
    /// `false` runs in sample mode: no save/load/update.
    pub allow_persistence: bool,
    pub demo_set_id: i64,
    pub stash_max_age_hours: i64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Altitude used by flatten mode and for chunk planes.
    pub reference_altitude: f32,
    /// Fixed point the camera looks at before anything is parsed.
    pub origin_anchor: [f32; 3],
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub axes_length: f32,
    pub marker_radius: f32,
    pub overlay_marker_radius: f32,
    pub top_view_distance: f32,
    /// Lower bound on the auto-framing distance (single-point sets).
    pub min_framing_distance: f32,
    pub damping_factor: f32,
    pub fov_degrees: f32,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ColorSettings {
    pub default_point: u32,
    pub mine_chunk: u32,
    pub unavailable_chunk: u32,
    pub overlay_odd: u32,
    pub overlay_even: u32,
    pub path_fallback: u32,
    pub background: u32,
}

// ---------------------------------------------------------------------------
// Defaults (match the original site's constants)
// ---------------------------------------------------------------------------

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            list_sets_path: "/api/list-coords.php".to_string(),
            load_set_path: "/api/load-coords.php".to_string(),
            load_demo_path: "/api/load-demo.php".to_string(),
            save_set_path: "/api/save-coords.php".to_string(),
            update_set_path: "/api/save-coords.php".to_string(),
            list_curves_path: "/api/list-curves.php".to_string(),
            load_curve_path: "/api/load-curve.php".to_string(),
            delete_curve_path: "/api/delete-curve.php".to_string(),
            stash_text_path: "/api/save-temp-coords.php".to_string(),
            clear_stash_path: "/api/clear-temp-coords.php".to_string(),
            timeout_secs: 10,
            session_cookie: None,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            allow_persistence: true,
            demo_set_id: 12,
            stash_max_age_hours: 24,
        }
    }
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            reference_altitude: 80.0,
            // (-281, 80, 487) snapped to the nearest chunk boundary.
            origin_anchor: [
                snap_to_chunk(-281.0),
                snap_to_chunk(80.0),
                snap_to_chunk(487.0),
            ],
            grid_size: 1024.0,
            grid_divisions: 64,
            axes_length: 500.0,
            marker_radius: 1.25,
            overlay_marker_radius: 0.8,
            top_view_distance: 500.0,
            min_framing_distance: 32.0,
            damping_factor: 0.05,
            fov_degrees: 75.0,
        }
    }
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            default_point: crate::color::DEFAULT_POINT_COLOR,
            mine_chunk: 0x7cb342,
            unavailable_chunk: 0xc55a5a,
            overlay_odd: 0xff00ff,
            overlay_even: 0x00ffff,
            path_fallback: 0xffaa00,
            background: 0x1a1a1a,
        }
    }
}

fn snap_to_chunk(v: f32) -> f32 {
    (v / 16.0).round() * 16.0
}

// ---------------------------------------------------------------------------
// Helper methods
// ---------------------------------------------------------------------------

impl Settings {
    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialize from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }
}

impl ApiSettings {
    /// Full URL for an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_constants() {
        let s = Settings::default();

        assert_eq!(s.scene.origin_anchor, [-288.0, 80.0, 480.0]);
        assert!((s.scene.reference_altitude - 80.0).abs() < f32::EPSILON);
        assert!((s.scene.grid_size - 1024.0).abs() < f32::EPSILON);
        assert_eq!(s.scene.grid_divisions, 64);
        assert!((s.scene.damping_factor - 0.05).abs() < f32::EPSILON);

        assert_eq!(s.colors.default_point, 0x00aaff);
        assert_eq!(s.colors.mine_chunk, 0x7cb342);
        assert_eq!(s.colors.unavailable_chunk, 0xc55a5a);

        assert!(s.app.allow_persistence);
        assert_eq!(s.app.demo_set_id, 12);
        assert_eq!(s.app.stash_max_age_hours, 24);
    }

    #[test]
    fn toml_roundtrip() {
        let original = Settings::default();
        let parsed = Settings::from_toml(&original.to_toml()).expect("roundtrip parse failed");
        assert_eq!(parsed, original);
    }

    #[test]
    fn partial_toml() {
        let partial = r#"
[api]
base_url = "https://mc.example.org/"

[app]
allow_persistence = false
"#;
        let s = Settings::from_toml(partial).expect("partial parse failed");
        assert!(!s.app.allow_persistence);
        assert_eq!(s.app.demo_set_id, 12);
        assert_eq!(
            s.api.url(&s.api.list_sets_path),
            "https://mc.example.org/api/list-coords.php"
        );
    }

    #[test]
    fn invalid_toml() {
        assert!(Settings::from_toml("this is not [[ valid toml").is_err());
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scene]\nreference_altitude = 64.0\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert!((s.scene.reference_altitude - 64.0).abs() < f32::EPSILON);
    }
}
