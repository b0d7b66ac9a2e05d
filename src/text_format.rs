//! Turning stored coordinates back into editable text.
//!
//! The output is the same free-form format the parser reads: color lines
//! where the color changes, a trailing comma at each segment boundary, and
//! chunk claims laid out as a 2-D grid per claim type.

use crate::model::{Chunk, ChunkCoord, ChunkType};
use crate::protocol::StoredCoordinate;

/// Blank filler for a grid cell with no chunk, as wide as `[ X, Z]`.
const GRID_GAP: &str = "       ";

/// Rebuild coordinate text from a loaded set.
pub fn reconstruct_text(coordinates: &[StoredCoordinate], chunks: &[Chunk]) -> String {
    let mut lines = Vec::new();
    push_coordinate_lines(&mut lines, coordinates);
    push_chunk_grids(&mut lines, chunks);
    lines.join("\n")
}

fn push_coordinate_lines(lines: &mut Vec<String>, coordinates: &[StoredCoordinate]) {
    let mut current_color: Option<&str> = None;

    for (index, coord) in coordinates.iter().enumerate() {
        if let Some(color) = coord.color.as_deref().filter(|c| !c.is_empty()) {
            if current_color != Some(color) {
                if index > 0 {
                    lines.push(String::new());
                }
                lines.push(color.to_string());
                current_color = Some(color);
            }
        }

        let mut line = format!("[{}, {}, {}]", coord.x, coord.y, coord.z);
        if let Some(label) = coord.label.as_deref().filter(|l| !l.is_empty()) {
            line.push(' ');
            line.push_str(label);
        }

        let ends_segment = coordinates
            .get(index + 1)
            .is_some_and(|next| next.segment_id != coord.segment_id);
        if ends_segment {
            line.push(',');
        }

        lines.push(line);
    }
}

fn push_chunk_grids(lines: &mut Vec<String>, chunks: &[Chunk]) {
    // Claim types in first-seen order.
    let mut groups: Vec<(ChunkType, Vec<&Chunk>)> = Vec::new();
    for chunk in chunks {
        match groups.iter_mut().find(|(kind, _)| *kind == chunk.chunk_type) {
            Some((_, members)) => members.push(chunk),
            None => groups.push((chunk.chunk_type, vec![chunk])),
        }
    }

    for (kind, members) in groups {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(kind.as_str().to_string());
        lines.extend(grid_rows(&members));
    }
}

/// Rows ordered by descending Z; columns span min..=max X of the group.
fn grid_rows(members: &[&Chunk]) -> Vec<String> {
    let Some(min_x) = members.iter().map(|c| c.chunk_x).min() else {
        return Vec::new();
    };
    let max_x = members.iter().map(|c| c.chunk_x).max().unwrap_or(min_x);

    let mut rows_z: Vec<i32> = members.iter().map(|c| c.chunk_z).collect();
    rows_z.sort_unstable_by(|a, b| b.cmp(a));
    rows_z.dedup();

    rows_z
        .into_iter()
        .map(|z| {
            (min_x..=max_x)
                .map(|x| {
                    if members.iter().any(|c| c.chunk_x == x && c.chunk_z == z) {
                        format!("[{x:>2},{z:>2}]")
                    } else {
                        GRID_GAP.to_string()
                    }
                })
                .collect::<String>()
        })
        .collect()
}

/// Insert a `mine` claim into the text, inside the first `mine` section if
/// there is one, otherwise in a new section appended at the end.
pub fn insert_mine_chunk(text: &str, coord: ChunkCoord) -> String {
    let mut text = text.trim().to_string();
    let keyword = ChunkType::Mine.as_str();

    if !text.split('\n').any(|line| line.trim() == keyword) {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(keyword);
    }

    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let mut insert_at = lines.len();
    let mut in_section = false;

    for (i, line) in lines.iter().enumerate() {
        if line.trim() == keyword {
            in_section = true;
            insert_at = i + 1;
        } else if in_section && !line.trim().is_empty() && !line.contains('[') {
            break;
        } else if in_section && line.contains('[') {
            insert_at = i + 1;
        }
    }

    lines.insert(insert_at, format!("[{},{}]", coord.chunk_x, coord.chunk_z));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: i32, label: Option<&str>, color: Option<&str>, seg: usize) -> StoredCoordinate {
        StoredCoordinate {
            x,
            y: 64,
            z: 0,
            label: label.map(str::to_string),
            color: color.map(str::to_string),
            segment_id: Some(seg),
        }
    }

    #[test]
    fn color_lines_and_segment_commas() {
        let text = reconstruct_text(
            &[
                coord(1, Some("home"), Some("red"), 0),
                coord(2, None, Some("red"), 0),
                coord(3, None, Some("blue"), 1),
            ],
            &[],
        );
        assert_eq!(text, "red\n[1, 64, 0] home\n[2, 64, 0],\n\nblue\n[3, 64, 0]");
    }

    #[test]
    fn chunk_grid_pads_and_fills_gaps() {
        let chunks = [
            Chunk { chunk_x: 1, chunk_z: 5, chunk_type: ChunkType::Mine },
            Chunk { chunk_x: 3, chunk_z: 5, chunk_type: ChunkType::Mine },
            Chunk { chunk_x: 2, chunk_z: -1, chunk_type: ChunkType::Mine },
        ];
        let text = reconstruct_text(&[], &chunks);
        assert_eq!(
            text,
            format!("mine\n[ 1, 5]{GRID_GAP}[ 3, 5]\n{GRID_GAP}[ 2,-1]{GRID_GAP}")
        );
    }

    #[test]
    fn chunk_groups_keep_first_seen_order() {
        let chunks = [
            Chunk { chunk_x: 0, chunk_z: 0, chunk_type: ChunkType::Unavailable },
            Chunk { chunk_x: 0, chunk_z: 0, chunk_type: ChunkType::Mine },
        ];
        let text = reconstruct_text(&[coord(1, None, None, 0)], &chunks);
        assert_eq!(text, "[1, 64, 0]\n\nunavailable\n[ 0, 0]\n\nmine\n[ 0, 0]");
    }

    #[test]
    fn insert_creates_mine_section() {
        let text = insert_mine_chunk("[1,2,3]\n", ChunkCoord { chunk_x: -4, chunk_z: 9 });
        assert_eq!(text, "[1,2,3]\n\nmine\n[-4,9]");
    }

    #[test]
    fn insert_into_empty_text() {
        let text = insert_mine_chunk("", ChunkCoord { chunk_x: 0, chunk_z: 0 });
        assert_eq!(text, "mine\n[0,0]");
    }

    #[test]
    fn insert_appends_to_existing_section_before_next_header() {
        let text = "mine\n[1,1]\n[2,2]\nunavailable\n[5,5]";
        let updated = insert_mine_chunk(text, ChunkCoord { chunk_x: 3, chunk_z: 3 });
        assert_eq!(updated, "mine\n[1,1]\n[2,2]\n[3,3]\nunavailable\n[5,5]");
    }

    #[test]
    fn label_containing_mine_is_not_a_section() {
        let text = "[1,2,3] mineshaft";
        let updated = insert_mine_chunk(text, ChunkCoord { chunk_x: 0, chunk_z: 1 });
        assert_eq!(updated, "[1,2,3] mineshaft\n\nmine\n[0,1]");
    }
}
