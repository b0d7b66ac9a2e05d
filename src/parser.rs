//! Tolerant line-oriented parser for coordinate text.
//!
//! Input is free-form text such as:
//!
//! ```text
//! red
//! [-278, 80, 487] spawn
//! [-250, 72, 500] farm,
//! mine
//! [-17,30][-16,30]
//! ```
//!
//! Top-level commas (outside brackets) separate path segments. Each line is
//! classified in priority order: chunk keyword, color line, chunk coordinate
//! line (while a chunk keyword is active), point line. Unrecognised lines are
//! dropped silently; the parser never fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::color::{self, DEFAULT_POINT_COLOR};
use crate::model::{Chunk, ChunkType, ParseResult, PathSegment, Point};

/// `[x, y, z] optional label`: the label runs to the next comma or newline.
static POINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*(-?[0-9]+)\s*,\s*(-?[0-9]+)\s*,\s*(-?[0-9]+)\s*\]\s*([^\n,]*)")
        .expect("point pattern is valid")
});

/// `[chunkX, chunkZ]`
static CHUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*(-?[0-9]+)\s*,\s*(-?[0-9]+)\s*\]").expect("chunk pattern is valid")
});

/// Parser settings. Only the fallback color is configurable.
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    pub default_color: u32,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            default_color: DEFAULT_POINT_COLOR,
        }
    }
}

/// Parse with the default settings.
pub fn parse(text: &str) -> ParseResult {
    Parser::default().parse(text)
}

/// State carried across lines for the whole document, not per segment.
#[derive(Debug, Clone)]
struct LineState {
    color_hex: u32,
    color_name: Option<String>,
    chunk_type: Option<ChunkType>,
}

/// How a single trimmed line is interpreted.
#[derive(Debug, PartialEq)]
enum LineKind<'a> {
    ChunkKeyword(ChunkType),
    Color(u32, String),
    /// Bracket-free text that is not a known color.
    Dropped,
    ChunkCoords(ChunkType),
    PointCoords(&'a str),
}

fn classify<'a>(line: &'a str, state: &LineState) -> LineKind<'a> {
    let trimmed = line.trim();

    if let Ok(kind) = trimmed.parse::<ChunkType>() {
        return LineKind::ChunkKeyword(kind);
    }

    if !trimmed.is_empty() && !trimmed.contains('[') {
        return match color::resolve(trimmed) {
            Some(hex) => LineKind::Color(hex, trimmed.to_lowercase()),
            None => LineKind::Dropped,
        };
    }

    match state.chunk_type {
        Some(kind) => LineKind::ChunkCoords(kind),
        None => LineKind::PointCoords(line),
    }
}

impl Parser {
    pub fn parse(&self, text: &str) -> ParseResult {
        let initial = LineState {
            color_hex: self.default_color,
            color_name: None,
            chunk_type: None,
        };

        let (_, result) = split_segments(text).into_iter().enumerate().fold(
            (initial, ParseResult::default()),
            |(state, mut result), (segment_id, segment_text)| {
                let first = result.points.len();
                let state = segment_text.split('\n').fold(state, |state, line| {
                    apply_line(state, line, segment_id, &mut result)
                });
                let last = result.points.len();
                if last > first {
                    result.path_segments.push(PathSegment {
                        segment_id,
                        points: first..last,
                    });
                }
                (state, result)
            },
        );

        result
    }
}

fn apply_line(
    mut state: LineState,
    line: &str,
    segment_id: usize,
    result: &mut ParseResult,
) -> LineState {
    match classify(line, &state) {
        LineKind::ChunkKeyword(kind) => {
            state.chunk_type = Some(kind);
        }
        LineKind::Color(hex, name) => {
            state.color_hex = hex;
            state.color_name = Some(name);
            state.chunk_type = None;
        }
        LineKind::Dropped => {}
        LineKind::ChunkCoords(kind) => {
            result.chunks.extend(scan_chunks(line, kind));
        }
        LineKind::PointCoords(line) => {
            result.points.extend(scan_points(line, &state, segment_id));
        }
    }
    state
}

fn scan_chunks(line: &str, chunk_type: ChunkType) -> impl Iterator<Item = Chunk> + '_ {
    CHUNK_RE.captures_iter(line).filter_map(move |caps| {
        Some(Chunk {
            chunk_x: caps[1].parse().ok()?,
            chunk_z: caps[2].parse().ok()?,
            chunk_type,
        })
    })
}

fn scan_points<'a>(
    line: &'a str,
    state: &'a LineState,
    segment_id: usize,
) -> impl Iterator<Item = Point> + 'a {
    POINT_RE.captures_iter(line).filter_map(move |caps| {
        Some(Point {
            x: caps[1].parse().ok()?,
            y: caps[2].parse().ok()?,
            z: caps[3].parse().ok()?,
            label: caps
                .get(4)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
            color_hex: state.color_hex,
            color_name: state.color_name.clone(),
            segment_id,
        })
    })
}

/// Split on commas that are not enclosed in brackets.
///
/// A comma counts as enclosed when the next bracket character after it is a
/// closing `]`.
pub fn split_segments(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut closes_next = vec![false; bytes.len()];
    let mut next_is_close = false;
    for i in (0..bytes.len()).rev() {
        closes_next[i] = next_is_close;
        match bytes[i] {
            b']' => next_is_close = true,
            b'[' => next_is_close = false,
            _ => {}
        }
    }

    let mut segments = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b',' && !closes_next[i] {
            segments.push(&text[start..i]);
            start = i + 1;
        }
    }
    segments.push(&text[start..]);
    segments
}
