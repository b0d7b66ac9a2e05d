//! Heads-up display drawn over the 3D view: status lines, toggles, the chunk
//! readout, catalog selections and the tail of the text buffer.
//!
//! Text is laid out with skrifa glyph metrics and drawn with vello's
//! `draw_glyphs`. Without a usable system font the HUD panels are still
//! drawn but stay empty.

use vello::kurbo::{Affine, Rect, RoundedRect};
use vello::peniko::{Color, Fill, FontData};
use vello::{Glyph, Scene};

use crate::api::Dispatcher;
use crate::controller::{Controller, StatusKind};

const FONT_SIZE: f32 = 15.0;
const LINE_HEIGHT: f64 = FONT_SIZE as f64 * 1.4;
const MARGIN: f64 = 12.0;
const PADDING: f64 = 10.0;
const PANEL_WIDTH: f64 = 460.0;
const TEXT_PREVIEW_LINES: usize = 14;

const PANEL_BG: Color = Color::new([0.0, 0.0, 0.0, 0.55]);
const TEXT_NEUTRAL: Color = Color::new([0.88, 0.88, 0.88, 1.0]);
const TEXT_DIM: Color = Color::new([0.6, 0.6, 0.6, 1.0]);
const TEXT_SUCCESS: Color = Color::new([0.49, 0.78, 0.33, 1.0]);
const TEXT_ERROR: Color = Color::new([0.91, 0.40, 0.36, 1.0]);
const TEXT_WARNING: Color = Color::new([1.0, 0.67, 0.0, 1.0]);

/// How a HUD line is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Dim,
    Success,
    Error,
    Warning,
}

impl From<StatusKind> for Tone {
    fn from(kind: StatusKind) -> Self {
        match kind {
            StatusKind::Neutral => Tone::Neutral,
            StatusKind::Success => Tone::Success,
            StatusKind::Error => Tone::Error,
        }
    }
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Neutral => TEXT_NEUTRAL,
            Tone::Dim => TEXT_DIM,
            Tone::Success => TEXT_SUCCESS,
            Tone::Error => TEXT_ERROR,
            Tone::Warning => TEXT_WARNING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudLine {
    pub text: String,
    pub tone: Tone,
}

impl HudLine {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Status panel contents, top to bottom.
pub fn status_lines<D: Dispatcher>(controller: &Controller<D>) -> Vec<HudLine> {
    let mut lines = Vec::new();
    let view = controller.view();

    lines.push(HudLine::new(
        format!(
            "Path [P]: {}   Flatten [F]: {}   Claim chunks [K]: {}",
            on_off(view.connect_path),
            on_off(view.flatten),
            on_off(view.chunk_claim)
        ),
        Tone::Dim,
    ));
    if view.chunk_claim {
        lines.push(HudLine::new(controller.chunk_readout(), Tone::Neutral));
    }

    let status = controller.status();
    for s in [&status.parse, &status.load, &status.save, &status.overlay] {
        if !s.is_empty() {
            lines.push(HudLine::new(s.text.clone(), s.kind.into()));
        }
    }
    if controller.awaiting_confirmation() {
        lines.push(HudLine::new("[Y] confirm   [N] cancel", Tone::Warning));
    }

    if controller.allow_persistence() {
        if let Some(label) = controller.update_label() {
            lines.push(HudLine::new(format!("{label} [U]"), Tone::Neutral));
        }
        if controller.has_unsaved_changes() && !controller.text().trim().is_empty() {
            lines.push(HudLine::new("\u{25cf} Unsaved changes", Tone::Warning));
        }
        let name = controller.set_name();
        lines.push(HudLine::new(
            format!("Save as [S]: {}", if name.is_empty() { "--" } else { name }),
            Tone::Dim,
        ));
        let set = controller
            .selected_set()
            .and_then(|i| controller.sets().get(i))
            .map(|s| s.display_label())
            .unwrap_or_else(|| format!("-- ({} saved)", controller.sets().len()));
        lines.push(HudLine::new(format!("Set [O]/[L]: {set}"), Tone::Dim));
    } else {
        lines.push(HudLine::new("Sample mode: sign in to save [G]", Tone::Dim));
    }

    let curve = controller
        .selected_curve()
        .and_then(|i| controller.curves().get(i))
        .map(|c| c.display.clone())
        .unwrap_or_else(|| "None".to_string());
    lines.push(HudLine::new(format!("Overlay [ / ]: {curve}"), Tone::Dim));

    lines
}

/// Last lines of the text buffer, for the editor panel.
pub fn text_preview(text: &str) -> Vec<HudLine> {
    let all: Vec<&str> = text.lines().collect();
    let skip = all.len().saturating_sub(TEXT_PREVIEW_LINES);
    let mut lines: Vec<HudLine> = all[skip..]
        .iter()
        .map(|l| HudLine::new(*l, Tone::Neutral))
        .collect();
    if skip > 0 {
        lines.insert(0, HudLine::new(format!("... {skip} more lines"), Tone::Dim));
    }
    if lines.is_empty() {
        lines.push(HudLine::new(
            "Paste coordinates with Ctrl+V, e.g. [-278, 80, 487]",
            Tone::Dim,
        ));
    }
    lines
}

pub struct Hud {
    font: Option<FontData>,
}

impl Hud {
    pub fn new(font: Option<FontData>) -> Self {
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw<D: Dispatcher>(&self, scene: &mut Scene, controller: &Controller<D>, height: f64) {
        let status = status_lines(controller);
        self.draw_panel(scene, MARGIN, MARGIN, &status);

        let preview = text_preview(controller.text());
        let preview_height = panel_height(preview.len());
        self.draw_panel(scene, MARGIN, height - MARGIN - preview_height, &preview);
    }

    fn draw_panel(&self, scene: &mut Scene, x: f64, y: f64, lines: &[HudLine]) {
        let rect = RoundedRect::from_rect(
            Rect::new(x, y, x + PANEL_WIDTH, y + panel_height(lines.len())),
            6.0,
        );
        scene.fill(Fill::NonZero, Affine::IDENTITY, PANEL_BG, None, &rect);

        let Some(font) = &self.font else {
            return;
        };
        for (i, line) in lines.iter().enumerate() {
            let baseline = y + PADDING + FONT_SIZE as f64 + i as f64 * LINE_HEIGHT;
            let glyphs = layout_line(
                &line.text,
                font,
                FONT_SIZE,
                PANEL_WIDTH - 2.0 * PADDING,
                x + PADDING,
                baseline,
            );
            let color = line.tone.color();
            scene
                .draw_glyphs(font)
                .font_size(FONT_SIZE)
                .brush(&color)
                .draw(Fill::NonZero, glyphs.into_iter());
        }
    }
}

fn panel_height(lines: usize) -> f64 {
    2.0 * PADDING + lines as f64 * LINE_HEIGHT
}

/// Position glyphs for one line of text, cut off at `max_width`.
fn layout_line(
    text: &str,
    font_data: &FontData,
    font_size: f32,
    max_width: f64,
    start_x: f64,
    baseline: f64,
) -> Vec<Glyph> {
    let Ok(font_ref) = skrifa::FontRef::from_index(font_data.data.as_ref(), font_data.index) else {
        return vec![];
    };

    use skrifa::MetadataProvider;
    let charmap = font_ref.charmap();
    let glyph_metrics = font_ref.glyph_metrics(
        skrifa::instance::Size::new(font_size),
        skrifa::instance::LocationRef::default(),
    );

    let mut glyphs = Vec::new();
    let mut x = start_x;
    for ch in text.chars() {
        let gid = charmap.map(ch).unwrap_or_default();
        let advance = glyph_metrics
            .advance_width(gid)
            .unwrap_or(font_size * 0.5) as f64;
        if x + advance > start_x + max_width {
            break;
        }
        glyphs.push(Glyph {
            id: gid.to_u32(),
            x: x as f32,
            y: baseline as f32,
        });
        x += advance;
    }
    glyphs
}

// --- Font loading ---

/// First font from `font_names` found in the usual system font directories.
fn load_system_font(font_names: &[&str]) -> Option<FontData> {
    let dirs = [
        "/System/Library/Fonts/",
        "/System/Library/Fonts/Supplemental/",
        "/Library/Fonts/",
        "/usr/share/fonts/truetype/dejavu/",
        "/usr/share/fonts/truetype/liberation/",
        "/usr/share/fonts/truetype/",
        "/usr/share/fonts/TTF/",
        "/usr/share/fonts/opentype/",
        "C:\\Windows\\Fonts\\",
    ];
    let extensions = ["ttf", "otf", "ttc"];

    for name in font_names {
        for dir in &dirs {
            for ext in &extensions {
                let path = format!("{dir}{name}.{ext}");
                if let Ok(data) = std::fs::read(&path) {
                    return Some(FontData::new(data.into(), 0));
                }
            }
        }
    }
    None
}

/// Monospace stack for coordinate text: Menlo > Consolas > DejaVu Sans Mono.
pub fn load_hud_font() -> Option<FontData> {
    load_system_font(&[
        "Menlo",
        "Monaco",
        "consola",
        "DejaVuSansMono",
        "LiberationMono-Regular",
    ])
}
