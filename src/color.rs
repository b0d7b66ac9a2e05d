//! Named color lookup for color lines in coordinate text.

/// Color used for points before any color line is seen.
pub const DEFAULT_POINT_COLOR: u32 = 0x00aaff;

const COLOR_TABLE: &[(&str, u32)] = &[
    ("red", 0xff0000),
    ("dark red", 0x8b0000),
    ("green", 0x00ff00),
    ("dark green", 0x006400),
    ("blue", 0x0000ff),
    ("dark blue", 0x00008b),
    ("yellow", 0xffff00),
    ("orange", 0xffa500),
    ("purple", 0x800080),
    ("pink", 0xffc0cb),
    ("cyan", 0x00ffff),
    ("magenta", 0xff00ff),
    ("white", 0xffffff),
    ("black", 0x000000),
    ("gray", 0x808080),
    ("grey", 0x808080),
    ("brown", 0x8b4513),
    ("lime", 0x00ff00),
    ("teal", 0x008080),
    ("navy", 0x000080),
];

/// Resolve a color name (case-insensitive, exact) to a 24-bit RGB value.
pub fn resolve(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    COLOR_TABLE
        .iter()
        .find(|(known, _)| *known == lower)
        .map(|(_, hex)| *hex)
}

/// Split a 24-bit RGB value into normalised channels.
pub fn rgb_channels(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_case_insensitively() {
        assert_eq!(resolve("Red"), Some(0xff0000));
        assert_eq!(resolve("DARK GREEN"), Some(0x006400));
    }

    #[test]
    fn grey_and_gray_are_synonyms() {
        assert_eq!(resolve("gray"), resolve("grey"));
    }

    #[test]
    fn unknown_and_fuzzy_names_are_not_found() {
        assert_eq!(resolve("rd"), None);
        assert_eq!(resolve("darkred"), None);
        assert_eq!(resolve(" red"), None);
    }

    #[test]
    fn channels_split_in_rgb_order() {
        assert_eq!(rgb_channels(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(rgb_channels(0x0000ff), [0.0, 0.0, 1.0]);
    }
}
