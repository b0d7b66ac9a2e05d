//! Application controller.
//!
//! Owns the text buffer, the user toggles and the bookkeeping around
//! persisted sets, and keeps the `SceneRenderer` consistent with them. The
//! controller is driven synchronously from the UI thread; persistence
//! requests go out through a `Dispatcher` and come back as `ApiEnvelope`s
//! via `handle_envelope`.
//!
//! Sub-states tracked next to the document state machine:
//! - `LoadedSet`: the persisted set bound to the text (gates Update).
//! - overlay: the reference curve drawn alongside the primary set.

pub mod document_sm;

use std::collections::HashSet;

use statig::prelude::*;
use tracing::{debug, info, warn};

use crate::api::{Action, ApiEnvelope, ApiRequest, ApiResponse, Dispatcher, Ticket};
use crate::config::Settings;
use crate::error::{ApiError, ControllerError};
use crate::model::{Chunk, ChunkCoord, ChunkType, ParseResult};
use crate::parser::Parser;
use crate::protocol::{
    CurvePoint, CurveSummary, LoadSetResponse, SaveSetRequest, SaveSetResponse, SetSummary,
    StoredCoordinate, UpdateSetRequest,
};
use crate::scene::SceneRenderer;
use crate::text_format;

use document_sm::{Document, DocumentEvent, State as DocumentState};

const UPDATE_LABEL_NAME_MAX: usize = 13;
pub const RESTORED_MESSAGE: &str = "Your coordinates have been restored!";
const DEMO_LOADED_MESSAGE: &str = "Example data loaded - save it to keep your changes!";

// ---------------------------------------------------------------------------
// Public state types
// ---------------------------------------------------------------------------

/// Display toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    pub connect_path: bool,
    pub flatten: bool,
    pub chunk_claim: bool,
}

/// A persisted set bound to the current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSet {
    pub id: i64,
    pub name: String,
    /// Point count when loaded (or last updated).
    pub original_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusKind {
    #[default]
    Neutral,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    fn neutral(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Neutral,
            text: text.into(),
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// One status line per area of the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBoard {
    pub parse: Status,
    pub save: Status,
    pub load: Status,
    pub overlay: Status,
}

/// What a successful parse-and-render did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseReport {
    pub points: usize,
    pub segments: usize,
    pub chunks: usize,
    pub recentered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Submitted,
    /// The point count dropped sharply; call `confirm_update` to proceed.
    NeedsConfirmation { message: String },
}

#[derive(Debug, Default)]
struct OverlayState {
    /// Incremented per fetched overlay; odd and even loads use different colors.
    load_count: u64,
    coordinates: Option<Vec<CurvePoint>>,
}

/// Snapshot of what a save/update submitted, applied when the reply lands.
#[derive(Debug, Clone)]
struct Submission {
    name: String,
    point_count: usize,
    text: String,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller<D: Dispatcher> {
    parser: Parser,
    renderer: SceneRenderer,
    dispatcher: D,
    document: StateMachine<Document>,

    allow_persistence: bool,
    demo_set_id: i64,
    reference_altitude: f32,
    overlay_colors: [u32; 2],

    text: String,
    set_name: String,
    view: ViewState,
    current: ParseResult,
    chunks: Vec<Chunk>,
    last_parsed_text: String,
    has_parsed: bool,

    loaded: Option<LoadedSet>,
    original_text: String,
    awaiting_confirmation: bool,
    pending_save: Option<Submission>,
    pending_update: Option<Submission>,

    overlay: OverlayState,
    sets: Vec<SetSummary>,
    selected_set: Option<usize>,
    curves: Vec<CurveSummary>,
    selected_curve: Option<usize>,
    hover: Option<ChunkCoord>,

    status: StatusBoard,
    busy: HashSet<Action>,
    generation: u64,
    bootstrapping: bool,
}

impl<D: Dispatcher> Controller<D> {
    pub fn new(settings: &Settings, renderer: SceneRenderer, dispatcher: D) -> Self {
        Self {
            parser: Parser {
                default_color: settings.colors.default_point,
            },
            renderer,
            dispatcher,
            document: Document.state_machine(),
            allow_persistence: settings.app.allow_persistence,
            demo_set_id: settings.app.demo_set_id,
            reference_altitude: settings.scene.reference_altitude,
            overlay_colors: [settings.colors.overlay_even, settings.colors.overlay_odd],
            text: String::new(),
            set_name: String::new(),
            view: ViewState::default(),
            current: ParseResult::default(),
            chunks: Vec::new(),
            last_parsed_text: String::new(),
            has_parsed: false,
            loaded: None,
            original_text: String::new(),
            awaiting_confirmation: false,
            pending_save: None,
            pending_update: None,
            overlay: OverlayState::default(),
            sets: Vec::new(),
            selected_set: None,
            curves: Vec::new(),
            selected_curve: None,
            hover: None,
            status: StatusBoard::default(),
            busy: HashSet::new(),
            generation: 0,
            bootstrapping: false,
        }
    }

    // --- accessors ---

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the text buffer (typing, paste). Does not parse.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    pub fn set_set_name(&mut self, name: impl Into<String>) {
        self.set_name = name.into();
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn current(&self) -> &ParseResult {
        &self.current
    }

    /// Chunks in memory, including claims made since the last parse.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn loaded_set(&self) -> Option<&LoadedSet> {
        self.loaded.as_ref()
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn document_state(&self) -> &DocumentState {
        self.document.state()
    }

    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut SceneRenderer {
        &mut self.renderer
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn allow_persistence(&self) -> bool {
        self.allow_persistence
    }

    pub fn is_busy(&self, action: Action) -> bool {
        self.busy.contains(&action)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.text.trim() != self.original_text
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    /// `Update <name>`, truncated for the button; `None` when nothing is loaded.
    pub fn update_label(&self) -> Option<String> {
        self.loaded.as_ref().map(|set| {
            let name = if set.name.chars().count() > UPDATE_LABEL_NAME_MAX {
                let head: String = set.name.chars().take(UPDATE_LABEL_NAME_MAX).collect();
                format!("{head}...")
            } else {
                set.name.clone()
            };
            format!("Update {name}")
        })
    }

    pub fn sets(&self) -> &[SetSummary] {
        &self.sets
    }

    pub fn selected_set(&self) -> Option<usize> {
        self.selected_set
    }

    pub fn curves(&self) -> &[CurveSummary] {
        &self.curves
    }

    pub fn selected_curve(&self) -> Option<usize> {
        self.selected_curve
    }

    pub fn overlay_load_count(&self) -> u64 {
        self.overlay.load_count
    }

    /// `Chunk: [x, z]` under the pointer in claim mode, `Chunk: --` otherwise.
    pub fn chunk_readout(&self) -> String {
        match self.hover {
            Some(c) => format!("Chunk: [{}, {}]", c.chunk_x, c.chunk_z),
            None => "Chunk: --".to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Parse and render
    // -----------------------------------------------------------------------

    /// Parse the text buffer and push the result to the renderer.
    ///
    /// The camera is recentered on the first successful parse, and afterwards
    /// only when the text changed and the user has not moved the camera.
    pub fn parse_and_render(&mut self) -> Result<ParseReport, ControllerError> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(self.fail_parse(ControllerError::EmptyInput));
        }

        let result = self.parser.parse(&text);
        if result.points.is_empty() {
            return Err(self.fail_parse(ControllerError::NoPoints));
        }

        let text_changed = text != self.last_parsed_text;
        let recenter =
            !self.has_parsed || (text_changed && !self.renderer.user_has_moved_camera());
        if text_changed {
            self.last_parsed_text = text;
            self.has_parsed = true;
        }

        self.renderer.render_points(
            &result.points,
            &result.path_segments,
            self.view.connect_path,
            self.view.flatten,
            recenter,
        );
        self.chunks = result.chunks.clone();
        self.renderer.render_chunks(&self.chunks, self.reference_altitude);

        let report = ParseReport {
            points: result.points.len(),
            segments: result.path_segments.len(),
            chunks: result.chunks.len(),
            recentered: recenter,
        };
        self.status.parse = Status::success(result.summary());
        self.current = result;
        self.document.handle(&DocumentEvent::Parsed {
            points: report.points,
        });
        debug!(target: "controller", ?report, "Rendered");
        Ok(report)
    }

    fn fail_parse(&mut self, err: ControllerError) -> ControllerError {
        self.status.parse = Status::error(err.to_string());
        self.document.handle(&DocumentEvent::Failed {
            message: err.to_string(),
        });
        err
    }

    /// Empty the text, the scene and the loaded-set binding.
    pub fn clear(&mut self) {
        self.text.clear();
        self.status.parse = Status::default();
        self.current = ParseResult::default();
        self.chunks.clear();
        self.renderer.render_points(&[], &[], false, false, false);
        self.renderer.render_chunks(&[], self.reference_altitude);
        self.loaded = None;
        self.awaiting_confirmation = false;
        self.generation += 1;
        self.document.handle(&DocumentEvent::Cleared);
    }

    pub fn set_connect_path(&mut self, on: bool) -> Result<ParseReport, ControllerError> {
        self.view.connect_path = on;
        self.parse_and_render()
    }

    /// Re-renders points and, when present, the overlay at the new altitude
    /// without advancing the overlay color.
    pub fn set_flatten(&mut self, on: bool) -> Result<ParseReport, ControllerError> {
        self.view.flatten = on;
        let report = self.parse_and_render();
        self.redraw_overlay();
        report
    }

    pub fn top_view(&mut self) {
        self.renderer.set_top_view();
    }

    pub fn reset_view(&mut self) {
        self.renderer.reset_view();
    }

    // -----------------------------------------------------------------------
    // Interactive chunk claiming
    // -----------------------------------------------------------------------

    pub fn set_chunk_claim(&mut self, on: bool) {
        if on == self.view.chunk_claim {
            return;
        }
        self.view.chunk_claim = on;
        self.hover = None;
        if on {
            self.renderer.enter_chunk_claim_view();
        } else {
            self.renderer.leave_chunk_claim_view();
        }
        info!(target: "controller", on, "Chunk claim mode");
    }

    /// Pointer motion over the scene; only tracked in claim mode.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if self.view.chunk_claim {
            self.hover = self.renderer.pick_chunk_at(x, y);
        }
    }

    /// Click in claim mode: claim the chunk under the pointer as `mine`.
    /// Returns the newly claimed chunk, or `None` if nothing changed.
    pub fn click_claim(&mut self, x: f32, y: f32) -> Option<ChunkCoord> {
        if !self.view.chunk_claim {
            return None;
        }
        let coord = self.renderer.pick_chunk_at(x, y)?;
        self.claim_chunk(coord)
    }

    pub fn claim_chunk(&mut self, coord: ChunkCoord) -> Option<ChunkCoord> {
        let already = self
            .chunks
            .iter()
            .any(|c| c.coord() == coord && c.chunk_type == ChunkType::Mine);
        if already {
            return None;
        }

        self.chunks.push(Chunk {
            chunk_x: coord.chunk_x,
            chunk_z: coord.chunk_z,
            chunk_type: ChunkType::Mine,
        });
        self.text = text_format::insert_mine_chunk(&self.text, coord);
        self.renderer.render_chunks(&self.chunks, self.reference_altitude);
        self.status.parse = Status::success(format!(
            "Claimed chunk [{}, {}]! Total: {} chunks",
            coord.chunk_x,
            coord.chunk_z,
            self.chunks.len()
        ));
        info!(target: "controller", ?coord, "Chunk claimed");
        Some(coord)
    }

    // -----------------------------------------------------------------------
    // Persistence: outbound
    // -----------------------------------------------------------------------

    fn begin(&mut self, action: Action) -> Result<Ticket, ControllerError> {
        if !self.busy.insert(action) {
            return Err(ControllerError::Busy(action));
        }
        Ok(Ticket {
            action,
            generation: self.generation,
        })
    }

    fn send(&mut self, request: ApiRequest) -> Result<(), ControllerError> {
        let ticket = self.begin(request.action())?;
        debug!(target: "controller", action = %ticket.action, generation = ticket.generation, "Dispatch");
        self.dispatcher.dispatch(ticket, request);
        Ok(())
    }

    fn require_persistence(&self) -> Result<(), ControllerError> {
        if self.allow_persistence {
            Ok(())
        } else {
            Err(ControllerError::PersistenceDisabled)
        }
    }

    /// Initial requests: curve catalog always; set catalog (then the demo if
    /// the user has nothing) with persistence, otherwise the demo directly.
    pub fn bootstrap(&mut self) {
        let mut requests = vec![ApiRequest::ListCurves];
        if self.allow_persistence {
            self.bootstrapping = true;
            requests.push(ApiRequest::ListSets);
        } else {
            requests.push(ApiRequest::LoadDemo {
                id: self.demo_set_id,
            });
        }
        for request in requests {
            if let Err(e) = self.send(request) {
                warn!(target: "controller", "Bootstrap request skipped: {}", e);
            }
        }
    }

    /// Restore text carried over from an earlier session and parse it.
    pub fn restore(&mut self, text: String) {
        self.text = text;
        if self.parse_and_render().is_ok() {
            self.status.parse = Status::success(RESTORED_MESSAGE);
        }
        if self.allow_persistence {
            if let Err(e) = self.send(ApiRequest::ClearStash) {
                warn!(target: "controller", "Could not clear server stash: {}", e);
            }
        }
        info!(target: "controller", "Restored stashed text");
    }

    /// Sample mode: hand the text to the server session before signing in.
    pub fn stash_for_sign_in(&mut self) -> Result<(), ControllerError> {
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(ControllerError::EmptyInput);
        }
        self.send(ApiRequest::StashText { text })
    }

    pub fn refresh_sets(&mut self) -> Result<(), ControllerError> {
        self.require_persistence()?;
        self.send(ApiRequest::ListSets)
    }

    pub fn select_set(&mut self, index: Option<usize>) {
        self.selected_set = index.filter(|i| *i < self.sets.len());
        self.status.load = Status::default();
    }

    /// Move the set selection by `delta`, wrapping.
    pub fn cycle_set(&mut self, delta: isize) {
        self.selected_set = cycle(self.selected_set, self.sets.len(), delta);
        self.status.load = Status::default();
    }

    /// Load the selected set. Clears any overlay first.
    pub fn load_selected_set(&mut self) -> Result<(), ControllerError> {
        self.require_persistence()?;
        let Some(set) = self.selected_set.and_then(|i| self.sets.get(i)) else {
            return Err(ControllerError::NoSetSelected);
        };
        let id = set.id;
        self.load_set(id)
    }

    pub fn load_set(&mut self, id: i64) -> Result<(), ControllerError> {
        self.require_persistence()?;
        if self.is_busy(Action::LoadSet) {
            return Err(ControllerError::Busy(Action::LoadSet));
        }

        self.clear_overlay();
        self.status.load = Status::neutral("Loading...");
        self.generation += 1;
        self.send(ApiRequest::LoadSet { id })
    }

    /// Save the current text as a new set named `name`.
    pub fn request_save(&mut self, name: &str) -> Result<(), ControllerError> {
        let result = self.submit_save(name);
        if let Err(e) = &result {
            self.status.save = Status::error(e.to_string());
        }
        result
    }

    fn submit_save(&mut self, name: &str) -> Result<(), ControllerError> {
        self.require_persistence()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ControllerError::MissingName);
        }
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(ControllerError::EmptyInput);
        }
        let parsed = self.parser.parse(&text);
        if parsed.points.is_empty() {
            return Err(ControllerError::NoPointsToSave);
        }
        if self.is_busy(Action::Save) {
            return Err(ControllerError::Busy(Action::Save));
        }

        let (coordinates, chunks) = wire_body(&parsed);
        self.pending_save = Some(Submission {
            name: name.to_string(),
            point_count: parsed.points.len(),
            text,
        });
        self.status.save = Status::neutral("Saving...");
        self.generation += 1;
        self.send(ApiRequest::SaveSet(SaveSetRequest {
            name: name.to_string(),
            description: String::new(),
            coordinates,
            chunks,
        }))
    }

    /// Overwrite the loaded set. A sharp drop in point count needs
    /// `confirm_update` first.
    pub fn request_update(&mut self) -> Result<UpdateOutcome, ControllerError> {
        let result = self.submit_update(false);
        if let Err(e) = &result {
            self.status.save = Status::error(e.to_string());
        }
        result
    }

    /// Proceed with an update that `request_update` held back.
    pub fn confirm_update(&mut self) -> Result<UpdateOutcome, ControllerError> {
        if !self.awaiting_confirmation {
            return Err(ControllerError::NothingToConfirm);
        }
        let result = self.submit_update(true);
        if let Err(e) = &result {
            self.status.save = Status::error(e.to_string());
        }
        result
    }

    pub fn cancel_update(&mut self) {
        if self.awaiting_confirmation {
            self.awaiting_confirmation = false;
            self.status.save = Status::default();
        }
    }

    fn submit_update(&mut self, confirmed: bool) -> Result<UpdateOutcome, ControllerError> {
        self.require_persistence()?;
        let Some(loaded) = self.loaded.clone() else {
            return Err(ControllerError::NoLoadedSet);
        };
        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(ControllerError::EmptyInput);
        }
        let parsed = self.parser.parse(&text);
        if parsed.points.is_empty() {
            return Err(ControllerError::NoPointsToSave);
        }

        let count = parsed.points.len();
        if !confirmed && needs_reduction_confirmation(loaded.original_count, count) {
            self.awaiting_confirmation = true;
            let message = format!(
                "Warning: You're reducing coordinates from {} to {}. This will permanently update \"{}\". Continue?",
                loaded.original_count, count, loaded.name
            );
            self.status.save = Status::error(message.clone());
            return Ok(UpdateOutcome::NeedsConfirmation { message });
        }
        if self.is_busy(Action::Update) {
            return Err(ControllerError::Busy(Action::Update));
        }

        self.awaiting_confirmation = false;
        let (coordinates, chunks) = wire_body(&parsed);
        self.pending_update = Some(Submission {
            name: loaded.name.clone(),
            point_count: count,
            text,
        });
        self.status.save = Status::neutral("Updating...");
        self.generation += 1;
        self.send(ApiRequest::UpdateSet(UpdateSetRequest {
            coordinate_set_id: loaded.id,
            name: loaded.name,
            description: String::new(),
            coordinates,
            chunks,
        }))?;
        Ok(UpdateOutcome::Submitted)
    }

    // --- overlay ---

    pub fn refresh_curves(&mut self) -> Result<(), ControllerError> {
        self.send(ApiRequest::ListCurves)
    }

    /// Select a reference curve (fetching it) or `None` to clear the overlay.
    pub fn select_curve(&mut self, index: Option<usize>) -> Result<(), ControllerError> {
        let Some(curve) = index.and_then(|i| self.curves.get(i)) else {
            self.clear_overlay();
            return Ok(());
        };
        let filename = curve.filename.clone();
        if self.is_busy(Action::LoadCurve) {
            return Err(ControllerError::Busy(Action::LoadCurve));
        }
        self.selected_curve = index;
        self.send(ApiRequest::LoadCurve { filename })
    }

    /// Step through "none" plus every curve, wrapping.
    pub fn cycle_curve(&mut self, delta: isize) -> Result<(), ControllerError> {
        let slots = self.curves.len() + 1;
        let current = self.selected_curve.map_or(0, |i| i + 1) as isize;
        let next = (current + delta).rem_euclid(slots as isize) as usize;
        self.select_curve(next.checked_sub(1))
    }

    /// Remove the overlay and its selection.
    pub fn clear_overlay(&mut self) {
        self.renderer.clear_overlay();
        self.overlay.coordinates = None;
        self.selected_curve = None;
        self.status.overlay = Status::default();
    }

    pub fn delete_current_curve(&mut self) -> Result<(), ControllerError> {
        let Some(curve) = self.selected_curve.and_then(|i| self.curves.get(i)) else {
            let err = ControllerError::NoCurveSelected;
            self.status.overlay = Status::error(err.to_string());
            return Err(err);
        };
        let filename = curve.filename.clone();
        self.send(ApiRequest::DeleteCurve { filename })?;
        self.status.overlay = Status::neutral("Deleting...");
        Ok(())
    }

    fn render_overlay(&mut self, coordinates: Vec<CurvePoint>, advance_color: bool) {
        self.renderer.clear_overlay();
        self.overlay.coordinates = None;
        if coordinates.is_empty() {
            return;
        }
        if advance_color {
            self.overlay.load_count += 1;
        }
        let color = self.overlay_colors[(self.overlay.load_count % 2) as usize];
        self.renderer
            .render_overlay(&coordinates, color, self.view.flatten);
        self.overlay.coordinates = Some(coordinates);
    }

    fn redraw_overlay(&mut self) {
        if let Some(coordinates) = self.overlay.coordinates.take() {
            self.render_overlay(coordinates, false);
        }
    }

    // -----------------------------------------------------------------------
    // Persistence: replies
    // -----------------------------------------------------------------------

    /// Apply a finished request. Replies to set requests issued before the
    /// last clear/load/save/update are discarded. Curve replies are matched
    /// against the current selection instead.
    pub fn handle_envelope(&mut self, envelope: ApiEnvelope) {
        let ApiEnvelope { ticket, result } = envelope;
        self.busy.remove(&ticket.action);

        let guarded = matches!(
            ticket.action,
            Action::LoadSet | Action::Save | Action::Update
        );
        if guarded && ticket.generation != self.generation {
            warn!(
                target: "controller",
                action = %ticket.action,
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale response"
            );
            match ticket.action {
                Action::Save => self.pending_save = None,
                Action::Update => self.pending_update = None,
                _ => {}
            }
            return;
        }

        match result {
            Ok(response) => self.apply_response(response),
            Err(err) => self.apply_failure(ticket.action, err),
        }
    }

    fn apply_response(&mut self, response: ApiResponse) {
        match response {
            ApiResponse::Sets(sets) => self.on_sets(sets),
            ApiResponse::SetLoaded { demo, body } => self.on_set_loaded(demo, body),
            ApiResponse::Saved(body) => self.on_saved(body),
            ApiResponse::Updated(body) => self.on_updated(body),
            ApiResponse::Curves(curves) => {
                info!(target: "controller", count = curves.len(), "Curve catalog");
                self.curves = curves;
                self.selected_curve = None;
            }
            ApiResponse::CurveLoaded {
                filename,
                coordinates,
            } => {
                let selected = self.selected_curve.and_then(|i| self.curves.get(i));
                if selected.map(|c| c.filename.as_str()) != Some(filename.as_str()) {
                    debug!(target: "controller", %filename, "Overlay no longer selected");
                    return;
                }
                let count = coordinates.len();
                self.render_overlay(coordinates, true);
                self.status.overlay = Status::success(format!("Overlay: {count} points"));
                info!(target: "controller", %filename, count, "Overlay loaded");
            }
            ApiResponse::CurveDeleted { filename } => self.on_curve_deleted(&filename),
            ApiResponse::Stashed => debug!(target: "controller", "Stash acknowledged"),
        }
    }

    fn apply_failure(&mut self, action: Action, err: ApiError) {
        match action {
            Action::ListSets => {
                warn!(target: "controller", "Failed to load coordinate sets: {}", err);
                self.on_sets(Vec::new());
            }
            Action::LoadSet => self.status.load = Status::error(err.to_string()),
            Action::Save => {
                self.pending_save = None;
                self.status.save = Status::error(err.to_string());
            }
            Action::Update => {
                self.pending_update = None;
                self.status.save = Status::error(err.to_string());
            }
            Action::ListCurves => {
                warn!(target: "controller", "Error loading curve list: {}", err);
            }
            Action::LoadCurve => {
                self.status.overlay = Status::error(match err {
                    ApiError::Rejected(msg) => format!("Error loading curve: {msg}"),
                    _ => "Error loading curve file".to_string(),
                });
            }
            Action::DeleteCurve => {
                self.status.overlay = Status::error(match err {
                    ApiError::Rejected(msg) => format!("Error deleting curve: {msg}"),
                    _ => "Error deleting curve file".to_string(),
                });
            }
            Action::Stash => {
                warn!(target: "controller", "Stash request failed: {}", err);
            }
        }
    }

    fn on_sets(&mut self, sets: Vec<SetSummary>) {
        info!(target: "controller", count = sets.len(), "Set catalog");
        let has_data = !sets.is_empty();
        self.sets = sets;
        self.selected_set = None;

        if std::mem::take(&mut self.bootstrapping) && !has_data && self.text.trim().is_empty() {
            let request = ApiRequest::LoadDemo {
                id: self.demo_set_id,
            };
            if let Err(e) = self.send(request) {
                warn!(target: "controller", "Demo load skipped: {}", e);
            }
        }
    }

    fn on_set_loaded(&mut self, demo: bool, body: LoadSetResponse) {
        self.text = text_format::reconstruct_text(&body.coordinates, &body.chunks);
        self.original_text = self.text.trim().to_string();
        self.awaiting_confirmation = false;

        if demo {
            self.loaded = None;
        } else {
            self.loaded = Some(LoadedSet {
                id: body.set.id,
                name: body.set.name.clone(),
                original_count: body.coordinates.len(),
            });
        }

        if let Err(e) = self.parse_and_render() {
            warn!(target: "controller", set_id = body.set.id, "Loaded set did not parse: {}", e);
        }

        self.status.load = if demo {
            Status::neutral(DEMO_LOADED_MESSAGE)
        } else {
            Status::success(format!(
                "Loaded \"{}\" with {} coordinates{}!",
                body.set.name,
                body.coordinates.len(),
                chunk_suffix(body.chunks.len())
            ))
        };
        info!(
            target: "controller",
            set_id = body.set.id,
            demo,
            "Set applied to text buffer"
        );
    }

    fn on_saved(&mut self, body: SaveSetResponse) {
        let Some(submitted) = self.pending_save.take() else {
            return;
        };
        self.status.save = Status::success(format!(
            "Saved \"{}\" with {} coordinates{}!",
            submitted.name,
            body.coordinates_count,
            chunk_suffix(body.chunks_count)
        ));
        self.set_name.clear();
        self.original_text = submitted.text;
        // Save always creates a new set; bind to it only if we know its id.
        self.loaded = body.id.map(|id| LoadedSet {
            id,
            name: submitted.name,
            original_count: submitted.point_count,
        });
    }

    fn on_updated(&mut self, body: SaveSetResponse) {
        let Some(submitted) = self.pending_update.take() else {
            return;
        };
        self.status.save = Status::success(format!(
            "Updated \"{}\" with {} coordinates{}!",
            submitted.name,
            body.coordinates_count,
            chunk_suffix(body.chunks_count)
        ));
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.original_count = submitted.point_count;
        }
        self.original_text = submitted.text;
    }

    fn on_curve_deleted(&mut self, filename: &str) {
        let Some(index) = self.curves.iter().position(|c| c.filename == filename) else {
            return;
        };
        self.curves.remove(index);
        info!(target: "controller", %filename, "Curve deleted");

        let next = if index < self.curves.len() {
            Some(index)
        } else {
            index.checked_sub(1)
        };
        match next {
            Some(i) => {
                if let Err(e) = self.select_curve(Some(i)) {
                    warn!(target: "controller", "Could not load next curve: {}", e);
                }
                self.status.overlay = Status::success("Curve deleted");
            }
            None => {
                self.clear_overlay();
                self.status.overlay = Status::success("Curve deleted (no more curves)");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// True when `new_count` is at most half of `original_count`.
pub fn needs_reduction_confirmation(original_count: usize, new_count: usize) -> bool {
    original_count > 0 && new_count * 2 <= original_count
}

fn wire_body(parsed: &ParseResult) -> (Vec<StoredCoordinate>, Vec<Chunk>) {
    (
        parsed.points.iter().map(StoredCoordinate::from).collect(),
        parsed.chunks.clone(),
    )
}

fn chunk_suffix(count: usize) -> String {
    if count > 0 {
        format!(" + {count} chunks")
    } else {
        String::new()
    }
}

fn cycle(current: Option<usize>, len: usize, delta: isize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let start = match current {
        Some(i) => i as isize + delta,
        None if delta >= 0 => 0,
        None => -1,
    };
    Some(start.rem_euclid(len as isize) as usize)
}
