//! Core geometry types produced by the parser and consumed by the renderer.
//!
//! Points are immutable once parsed and identified by their position in
//! [`ParseResult::points`]; re-parsing always yields a fresh set.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width of a Minecraft chunk in blocks.
pub const CHUNK_WIDTH: i32 = 16;

/// A single parsed coordinate with its display annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Trailing text after the bracket, trimmed. Empty when absent.
    pub label: String,
    /// Always set; falls back to the default point color.
    pub color_hex: u32,
    /// The lower-cased color name in effect, if a color line was seen.
    pub color_name: Option<String>,
    /// Index of the top-level segment text this point came from.
    pub segment_id: usize,
}

/// A run of consecutive points sharing one `segment_id`.
///
/// Points of a segment are contiguous in [`ParseResult::points`], so the
/// segment stores the index range rather than copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub segment_id: usize,
    pub points: Range<usize>,
}

impl PathSegment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Only segments with two or more points are drawn as lines.
    pub fn is_drawable(&self) -> bool {
        self.len() >= 2
    }
}

/// Claim type of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Mine,
    Unavailable,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Mine => "mine",
            ChunkType::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = ();

    /// Exact, case-sensitive keyword match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mine" => Ok(ChunkType::Mine),
            "unavailable" => Ok(ChunkType::Unavailable),
            _ => Err(()),
        }
    }
}

/// Integer chunk coordinates (world coordinate floor-divided by 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    pub chunk_x: i32,
    pub chunk_z: i32,
}

impl ChunkCoord {
    pub fn from_world(x: f64, z: f64) -> Self {
        let w = CHUNK_WIDTH as f64;
        Self {
            chunk_x: (x / w).floor() as i32,
            chunk_z: (z / w).floor() as i32,
        }
    }

    /// World-space center of the chunk on the XZ plane.
    pub fn world_center(&self) -> (f64, f64) {
        let half = CHUNK_WIDTH as f64 / 2.0;
        (
            (self.chunk_x * CHUNK_WIDTH) as f64 + half,
            (self.chunk_z * CHUNK_WIDTH) as f64 + half,
        )
    }
}

/// A claimed chunk. Duplicates are legal and independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub chunk_type: ChunkType,
}

impl Chunk {
    pub fn coord(&self) -> ChunkCoord {
        ChunkCoord {
            chunk_x: self.chunk_x,
            chunk_z: self.chunk_z,
        }
    }
}

/// The sole output of the parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub points: Vec<Point>,
    pub path_segments: Vec<PathSegment>,
    pub chunks: Vec<Chunk>,
}

impl ParseResult {
    pub fn segment_points(&self, segment: &PathSegment) -> &[Point] {
        &self.points[segment.points.clone()]
    }

    /// `Parsed 3 points in 2 segments + 4 chunks successfully!`
    pub fn summary(&self) -> String {
        let n = self.points.len();
        let plural = if n == 1 { "" } else { "s" };
        let segments = if self.path_segments.len() > 1 {
            format!(" in {} segments", self.path_segments.len())
        } else {
            String::new()
        };
        let chunks = if self.chunks.is_empty() {
            String::new()
        } else {
            format!(" + {} chunks", self.chunks.len())
        };
        format!("Parsed {n} point{plural}{segments}{chunks} successfully!")
    }
}
