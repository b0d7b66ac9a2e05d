//! Persistence API wire types.
//!
//! Mirrors the JSON bodies exchanged with the coordinate-set and curve
//! endpoints. Response fields default when absent so that partial or older
//! server responses still deserialize; presence of required data is checked
//! by the client after decoding.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::{Chunk, Point};

// ---------------------------------------------------------------------------
// Coordinate sets
// ---------------------------------------------------------------------------

/// One entry of `list-coords`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SetSummary {
    #[serde(rename = "coordinate_set_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub coordinate_count: usize,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SetSummary {
    /// `"Base camp - Jan 7, 2026"`, or just the name when the date is unreadable.
    pub fn display_label(&self) -> String {
        match self.updated_at.as_deref().and_then(format_catalog_date) {
            Some(date) => format!("{} - {}", self.name, date),
            None => self.name.clone(),
        }
    }
}

fn format_catalog_date(raw: &str) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))?;
    Some(naive.format("%b %-d, %Y").to_string())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListSetsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub sets: Vec<SetSummary>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SetInfo {
    #[serde(rename = "coordinate_set_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A coordinate as stored by the backend. `color` is the color *name*.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredCoordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(rename = "segmentId", default)]
    pub segment_id: Option<usize>,
}

impl From<&Point> for StoredCoordinate {
    fn from(point: &Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            label: (!point.label.is_empty()).then(|| point.label.clone()),
            color: point.color_name.clone(),
            segment_id: Some(point.segment_id),
        }
    }
}

/// Body of `load-coords` and `load-demo`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoadSetResponse {
    #[serde(default)]
    pub success: bool,
    pub set: SetInfo,
    #[serde(default)]
    pub coordinates: Vec<StoredCoordinate>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

/// Save always creates a new set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaveSetRequest {
    pub name: String,
    pub description: String,
    pub coordinates: Vec<StoredCoordinate>,
    pub chunks: Vec<Chunk>,
}

/// Update overwrites the set named by `coordinate_set_id`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateSetRequest {
    pub coordinate_set_id: i64,
    pub name: String,
    pub description: String,
    pub coordinates: Vec<StoredCoordinate>,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct SaveSetResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "coordinate_set_id", default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub coordinates_count: usize,
    #[serde(default)]
    pub chunks_count: usize,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Curves
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CurveSummary {
    pub filename: String,
    pub display: String,
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListCurvesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub curves: Vec<CurveSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct CurvePoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoadCurveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub coordinates: Vec<CurvePoint>,
    /// `# key: value` comments from the curve file. An empty set arrives
    /// as `[]`, so this stays untyped.
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeleteCurveResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error body returned with non-success HTTP statuses.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Prefer the human message over the short error tag.
    pub fn best_message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}
