//! End-to-end controller flows against a recording dispatcher.
//!
//! No network and no window: requests are captured as they are dispatched
//! and replies are fed back through `handle_envelope`, the same path the
//! desktop front end uses once per frame.

use coordcraft::api::{Action, ApiEnvelope, ApiRequest, ApiResponse, Dispatcher, Ticket};
use coordcraft::config::Settings;
use coordcraft::controller::document_sm::State as DocumentState;
use coordcraft::controller::{Controller, StatusKind, UpdateOutcome};
use coordcraft::error::{ApiError, ControllerError};
use coordcraft::model::ChunkCoord;
use coordcraft::protocol::{
    CurvePoint, CurveSummary, LoadSetResponse, SaveSetResponse, SetInfo, SetSummary,
    StoredCoordinate,
};
use coordcraft::scene::{DragMode, SceneRenderer, Viewport};

#[derive(Default)]
struct Recorder {
    sent: Vec<(Ticket, ApiRequest)>,
}

impl Dispatcher for Recorder {
    fn dispatch(&mut self, ticket: Ticket, request: ApiRequest) {
        self.sent.push((ticket, request));
    }
}

fn controller_with(allow_persistence: bool) -> Controller<Recorder> {
    let mut settings = Settings::default();
    settings.app.allow_persistence = allow_persistence;
    let mut renderer = SceneRenderer::new(&settings);
    renderer.initialize(Viewport::new(800.0, 600.0));
    Controller::new(&settings, renderer, Recorder::default())
}

fn controller() -> Controller<Recorder> {
    controller_with(true)
}

/// Most recent request dispatched for `action`.
fn last_sent(c: &Controller<Recorder>, action: Action) -> (Ticket, ApiRequest) {
    c.dispatcher()
        .sent
        .iter()
        .rev()
        .find(|(t, _)| t.action == action)
        .cloned()
        .unwrap_or_else(|| panic!("no {action:?} request was dispatched"))
}

fn respond(c: &mut Controller<Recorder>, action: Action, result: Result<ApiResponse, ApiError>) {
    let (ticket, _) = last_sent(c, action);
    c.handle_envelope(ApiEnvelope { ticket, result });
}

fn stored(n: usize) -> Vec<StoredCoordinate> {
    (0..n)
        .map(|i| StoredCoordinate {
            x: i as i32 * 10,
            y: 64,
            z: -(i as i32),
            label: None,
            color: None,
            segment_id: Some(0),
        })
        .collect()
}

fn set_body(id: i64, name: &str, n: usize) -> LoadSetResponse {
    LoadSetResponse {
        success: true,
        set: SetInfo {
            id,
            name: name.to_string(),
            description: None,
        },
        coordinates: stored(n),
        chunks: vec![],
    }
}

fn load(c: &mut Controller<Recorder>, id: i64, name: &str, n: usize) {
    c.load_set(id).unwrap();
    respond(
        c,
        Action::LoadSet,
        Ok(ApiResponse::SetLoaded {
            demo: false,
            body: set_body(id, name, n),
        }),
    );
}

fn points_text(n: usize) -> String {
    (0..n).map(|i| format!("[{},64,{}]\n", i * 10, -(i as i32))).collect()
}

fn curves(names: &[&str]) -> Vec<CurveSummary> {
    names
        .iter()
        .map(|n| CurveSummary {
            filename: format!("{n}.json"),
            display: n.to_string(),
            directory: None,
        })
        .collect()
}

fn curve_points(n: usize) -> Vec<CurvePoint> {
    (0..n as i32).map(|i| CurvePoint { x: i, y: 100, z: i }).collect()
}

// ---------------------------------------------------------------------------
// Parse and camera
// ---------------------------------------------------------------------------

#[test]
fn recenter_only_for_new_text_and_untouched_camera() {
    let mut c = controller();
    c.set_text("[0,64,0]\n[100,64,100]");
    assert!(c.parse_and_render().unwrap().recentered);

    // Same text again: leave the camera alone.
    assert!(!c.parse_and_render().unwrap().recentered);

    c.set_text("[0,64,0]\n[200,64,200]");
    assert!(c.parse_and_render().unwrap().recentered);

    // Once the user has moved the camera, new text no longer recenters.
    c.renderer_mut().pointer_down(DragMode::Rotate, 10.0, 10.0);
    c.renderer_mut().pointer_up();
    c.set_text("[5,64,5]");
    assert!(!c.parse_and_render().unwrap().recentered);
}

#[test]
fn view_toggles_rerender_without_recentering() {
    let mut c = controller();
    c.set_text("[0,64,0]\n[100,64,100]");
    assert!(c.parse_and_render().unwrap().recentered);

    assert!(!c.set_flatten(true).unwrap().recentered);
    assert!(!c.set_connect_path(false).unwrap().recentered);
    assert!(!c.set_flatten(false).unwrap().recentered);
}

#[test]
fn whitespace_only_changes_do_not_count_as_new_text() {
    let mut c = controller();
    c.set_text("[1,2,3]");
    c.parse_and_render().unwrap();
    c.set_text("  [1,2,3]\n\n");
    assert!(!c.parse_and_render().unwrap().recentered);
}

// ---------------------------------------------------------------------------
// Update confirmation
// ---------------------------------------------------------------------------

#[test]
fn halving_the_point_count_asks_for_confirmation() {
    let mut c = controller();
    load(&mut c, 4, "Rail loop", 10);
    assert_eq!(c.loaded_set().unwrap().original_count, 10);

    c.set_text(points_text(5));
    let outcome = c.request_update().unwrap();
    let UpdateOutcome::NeedsConfirmation { message } = outcome else {
        panic!("expected a confirmation prompt, got {outcome:?}");
    };
    assert_eq!(
        message,
        "Warning: You're reducing coordinates from 10 to 5. This will permanently update \"Rail loop\". Continue?"
    );
    assert!(c.dispatcher().sent.iter().all(|(t, _)| t.action != Action::Update));

    assert_eq!(c.confirm_update().unwrap(), UpdateOutcome::Submitted);
    let (_, request) = last_sent(&c, Action::Update);
    let ApiRequest::UpdateSet(body) = request else {
        panic!("expected an update request");
    };
    assert_eq!(body.coordinate_set_id, 4);
    assert_eq!(body.coordinates.len(), 5);
    assert_eq!(c.status().save.text, "Updating...");

    respond(
        &mut c,
        Action::Update,
        Ok(ApiResponse::Updated(SaveSetResponse {
            success: true,
            id: Some(4),
            coordinates_count: 5,
            chunks_count: 0,
            message: None,
        })),
    );
    assert_eq!(c.status().save.text, "Updated \"Rail loop\" with 5 coordinates!");
    assert_eq!(c.loaded_set().unwrap().original_count, 5);
    assert!(!c.has_unsaved_changes());
}

#[test]
fn modest_reduction_updates_directly() {
    let mut c = controller();
    load(&mut c, 4, "Rail loop", 10);
    c.set_text(points_text(6));
    assert_eq!(c.request_update().unwrap(), UpdateOutcome::Submitted);
    assert!(matches!(last_sent(&c, Action::Update).1, ApiRequest::UpdateSet(_)));
}

#[test]
fn cancelled_update_sends_nothing() {
    let mut c = controller();
    load(&mut c, 4, "Rail loop", 10);
    c.set_text(points_text(2));
    assert!(matches!(
        c.request_update().unwrap(),
        UpdateOutcome::NeedsConfirmation { .. }
    ));
    c.cancel_update();
    assert!(!c.awaiting_confirmation());
    assert!(c.dispatcher().sent.iter().all(|(t, _)| t.action != Action::Update));
}

#[test]
fn confirm_without_a_pending_prompt_sends_nothing() {
    let mut c = controller();
    load(&mut c, 4, "Rail loop", 10);
    c.set_text(points_text(9));
    assert!(matches!(c.confirm_update(), Err(ControllerError::NothingToConfirm)));
    assert!(c.dispatcher().sent.iter().all(|(t, _)| t.action != Action::Update));
}

#[test]
fn update_requires_a_loaded_set() {
    let mut c = controller();
    c.set_text("[1,2,3]");
    assert!(matches!(c.request_update(), Err(ControllerError::NoLoadedSet)));
}

// ---------------------------------------------------------------------------
// Load and save
// ---------------------------------------------------------------------------

#[test]
fn loading_rebuilds_text_and_binds_the_set() {
    let mut c = controller();
    load(&mut c, 9, "Northern outpost trail", 3);

    assert_eq!(c.current().points.len(), 3);
    assert_eq!(
        c.status().load.text,
        "Loaded \"Northern outpost trail\" with 3 coordinates!"
    );
    assert_eq!(c.update_label().as_deref(), Some("Update Northern outp..."));
    assert!(!c.has_unsaved_changes());

    let edited = format!("{}[7,7,7]", c.text());
    c.set_text(edited);
    assert!(c.has_unsaved_changes());
}

#[test]
fn loading_a_set_clears_the_overlay() {
    let mut c = controller();
    respond_curves(&mut c, &["spiral"]);
    c.select_curve(Some(0)).unwrap();
    respond(
        &mut c,
        Action::LoadCurve,
        Ok(ApiResponse::CurveLoaded {
            filename: "spiral.json".into(),
            coordinates: curve_points(4),
        }),
    );
    assert_eq!(c.renderer().graph().overlay.len(), 4);

    c.load_set(1).unwrap();
    assert!(c.renderer().graph().overlay.is_empty());
    assert_eq!(c.selected_curve(), None);
    assert_eq!(c.status().load.text, "Loading...");
}

#[test]
fn save_validates_name_then_text_then_points() {
    let mut c = controller();
    assert!(matches!(c.request_save("  "), Err(ControllerError::MissingName)));
    assert_eq!(c.status().save.text, "Please enter a name for this coordinate set.");

    assert!(matches!(c.request_save("Trip"), Err(ControllerError::EmptyInput)));

    c.set_text("just some notes");
    assert!(matches!(c.request_save("Trip"), Err(ControllerError::NoPointsToSave)));
    assert_eq!(c.status().save.text, "No valid coordinates found to save.");
    assert!(c.dispatcher().sent.is_empty());
}

#[test]
fn successful_save_clears_name_and_binds_new_set() {
    let mut c = controller();
    c.set_text("[1,64,1]\n[2,64,2]\nmine\n[0,0]");
    c.set_set_name("Trip");
    let name = c.set_name().to_string();
    c.request_save(&name).unwrap();
    assert_eq!(c.status().save.text, "Saving...");

    let (_, request) = last_sent(&c, Action::Save);
    let ApiRequest::SaveSet(body) = request else {
        panic!("expected a save request");
    };
    assert_eq!(body.name, "Trip");
    assert_eq!(body.coordinates.len(), 2);
    assert_eq!(body.chunks.len(), 1);

    respond(
        &mut c,
        Action::Save,
        Ok(ApiResponse::Saved(SaveSetResponse {
            success: true,
            id: Some(7),
            coordinates_count: 2,
            chunks_count: 1,
            message: None,
        })),
    );
    assert_eq!(c.status().save.text, "Saved \"Trip\" with 2 coordinates + 1 chunks!");
    assert_eq!(c.status().save.kind, StatusKind::Success);
    assert_eq!(c.set_name(), "");
    assert_eq!(c.loaded_set().map(|s| s.id), Some(7));
    assert!(!c.has_unsaved_changes());
}

#[test]
fn failed_save_changes_nothing_but_the_status() {
    let mut c = controller();
    c.set_text("[1,64,1]");
    c.set_set_name("Trip");
    c.request_save("Trip").unwrap();
    respond(
        &mut c,
        Action::Save,
        Err(ApiError::Status {
            status: 500,
            message: Some("Database unavailable".into()),
        }),
    );
    assert_eq!(c.status().save.text, "Error: Database unavailable");
    assert_eq!(c.status().save.kind, StatusKind::Error);
    assert_eq!(c.set_name(), "Trip");
    assert!(c.loaded_set().is_none());

    // The action is free again.
    c.request_save("Trip").unwrap();
}

#[test]
fn second_load_while_one_is_in_flight_is_rejected() {
    let mut c = controller();
    c.load_set(1).unwrap();
    assert!(matches!(c.load_set(2), Err(ControllerError::Busy(Action::LoadSet))));
}

#[test]
fn reply_to_a_load_issued_before_clear_is_discarded() {
    let mut c = controller();
    c.load_set(3).unwrap();
    let (ticket, _) = last_sent(&c, Action::LoadSet);

    c.clear();
    c.handle_envelope(ApiEnvelope {
        ticket,
        result: Ok(ApiResponse::SetLoaded {
            demo: false,
            body: set_body(3, "Old", 4),
        }),
    });

    assert_eq!(c.text(), "");
    assert!(c.loaded_set().is_none());
    assert!(!c.is_busy(Action::LoadSet));
}

#[test]
fn sample_mode_rejects_persistence_actions() {
    let mut c = controller_with(false);
    c.set_text("[1,2,3]");
    assert!(matches!(c.request_save("x"), Err(ControllerError::PersistenceDisabled)));
    assert!(matches!(c.load_set(1), Err(ControllerError::PersistenceDisabled)));
    assert!(c.dispatcher().sent.is_empty());
}

// ---------------------------------------------------------------------------
// Bootstrap and demo
// ---------------------------------------------------------------------------

#[test]
fn empty_catalog_and_empty_text_load_the_demo() {
    let mut c = controller();
    c.bootstrap();
    respond(&mut c, Action::ListSets, Ok(ApiResponse::Sets(vec![])));

    let (_, request) = last_sent(&c, Action::LoadSet);
    assert_eq!(request, ApiRequest::LoadDemo { id: 12 });

    respond(
        &mut c,
        Action::LoadSet,
        Ok(ApiResponse::SetLoaded {
            demo: true,
            body: set_body(12, "Demo", 4),
        }),
    );
    assert_eq!(c.current().points.len(), 4);
    assert!(c.loaded_set().is_none());
    assert_eq!(c.update_label(), None);
    assert_eq!(
        c.status().load.text,
        "Example data loaded - save it to keep your changes!"
    );
}

#[test]
fn existing_sets_skip_the_demo() {
    let mut c = controller();
    c.bootstrap();
    let sets = vec![SetSummary {
        id: 1,
        name: "Base".into(),
        description: None,
        coordinate_count: 3,
        created_at: None,
        updated_at: Some("2026-01-07 10:00:00".into()),
    }];
    respond(&mut c, Action::ListSets, Ok(ApiResponse::Sets(sets)));

    assert_eq!(c.sets().len(), 1);
    assert_eq!(c.sets()[0].display_label(), "Base - Jan 7, 2026");
    assert!(c.dispatcher().sent.iter().all(|(_, r)| !matches!(r, ApiRequest::LoadDemo { .. })));
}

#[test]
fn failed_catalog_falls_back_to_the_demo() {
    let mut c = controller();
    c.bootstrap();
    respond(
        &mut c,
        Action::ListSets,
        Err(ApiError::Rejected("You must be logged in".into())),
    );
    assert!(matches!(last_sent(&c, Action::LoadSet).1, ApiRequest::LoadDemo { .. }));
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

fn respond_curves(c: &mut Controller<Recorder>, names: &[&str]) {
    c.refresh_curves().unwrap();
    respond(c, Action::ListCurves, Ok(ApiResponse::Curves(curves(names))));
}

fn load_curve(c: &mut Controller<Recorder>, index: usize, n: usize) {
    c.select_curve(Some(index)).unwrap();
    let filename = c.curves()[index].filename.clone();
    respond(
        c,
        Action::LoadCurve,
        Ok(ApiResponse::CurveLoaded {
            filename,
            coordinates: curve_points(n),
        }),
    );
}

#[test]
fn overlay_colors_alternate_and_flatten_keeps_the_color() {
    let mut c = controller();
    respond_curves(&mut c, &["spiral", "ring"]);

    load_curve(&mut c, 0, 3);
    assert_eq!(c.overlay_load_count(), 1);
    assert_eq!(c.status().overlay.text, "Overlay: 3 points");
    let overlay = &c.renderer().graph().overlay;
    assert_eq!(overlay.len(), 3);
    assert!(overlay.iter().all(|m| m.color == 0xff00ff));

    c.set_text("[0,64,0]");
    c.set_flatten(true).unwrap();
    assert_eq!(c.overlay_load_count(), 1);
    let overlay = &c.renderer().graph().overlay;
    assert!(overlay.iter().all(|m| m.color == 0xff00ff && m.position.y == 80.0));

    load_curve(&mut c, 1, 2);
    assert_eq!(c.overlay_load_count(), 2);
    assert!(c.renderer().graph().overlay.iter().all(|m| m.color == 0x00ffff));
}

#[test]
fn curve_reply_survives_a_save_in_flight() {
    let mut c = controller();
    respond_curves(&mut c, &["spiral"]);
    c.select_curve(Some(0)).unwrap();

    c.set_text("[1,64,1]");
    c.request_save("Trip").unwrap();
    respond(
        &mut c,
        Action::LoadCurve,
        Ok(ApiResponse::CurveLoaded {
            filename: "spiral.json".into(),
            coordinates: curve_points(3),
        }),
    );
    assert_eq!(c.selected_curve(), Some(0));
    assert_eq!(c.renderer().graph().overlay.len(), 3);
}

#[test]
fn selecting_none_clears_the_overlay() {
    let mut c = controller();
    respond_curves(&mut c, &["spiral"]);
    load_curve(&mut c, 0, 3);
    c.select_curve(None).unwrap();
    assert!(c.renderer().graph().overlay.is_empty());
    assert!(c.status().overlay.is_empty());
}

#[test]
fn curve_errors_are_reported_on_the_overlay_line() {
    let mut c = controller();
    respond_curves(&mut c, &["spiral"]);

    c.select_curve(Some(0)).unwrap();
    respond(&mut c, Action::LoadCurve, Err(ApiError::Rejected("File not found".into())));
    assert_eq!(c.status().overlay.text, "Error loading curve: File not found");

    c.select_curve(Some(0)).unwrap();
    respond(
        &mut c,
        Action::LoadCurve,
        Err(ApiError::Status { status: 502, message: None }),
    );
    assert_eq!(c.status().overlay.text, "Error loading curve file");
}

#[test]
fn deleting_a_curve_moves_to_the_next_one() {
    let mut c = controller();
    respond_curves(&mut c, &["a", "b", "c"]);
    load_curve(&mut c, 1, 2);

    c.delete_current_curve().unwrap();
    assert_eq!(c.status().overlay.text, "Deleting...");
    assert_eq!(
        last_sent(&c, Action::DeleteCurve).1,
        ApiRequest::DeleteCurve { filename: "b.json".into() }
    );
    respond(
        &mut c,
        Action::DeleteCurve,
        Ok(ApiResponse::CurveDeleted { filename: "b.json".into() }),
    );

    assert_eq!(c.curves().len(), 2);
    assert_eq!(c.selected_curve(), Some(1));
    assert_eq!(c.status().overlay.text, "Curve deleted");
    assert_eq!(
        last_sent(&c, Action::LoadCurve).1,
        ApiRequest::LoadCurve { filename: "c.json".into() }
    );
}

#[test]
fn deleting_the_last_curve_clears_the_overlay() {
    let mut c = controller();
    respond_curves(&mut c, &["only"]);
    load_curve(&mut c, 0, 2);

    c.delete_current_curve().unwrap();
    respond(
        &mut c,
        Action::DeleteCurve,
        Ok(ApiResponse::CurveDeleted { filename: "only.json".into() }),
    );
    assert!(c.curves().is_empty());
    assert_eq!(c.selected_curve(), None);
    assert!(c.renderer().graph().overlay.is_empty());
    assert_eq!(c.status().overlay.text, "Curve deleted (no more curves)");
}

#[test]
fn delete_without_selection_is_an_error() {
    let mut c = controller();
    assert!(matches!(
        c.delete_current_curve(),
        Err(ControllerError::NoCurveSelected)
    ));
    assert_eq!(c.status().overlay.text, "No curve selected to delete");
}

// ---------------------------------------------------------------------------
// Chunks, clear, restore
// ---------------------------------------------------------------------------

#[test]
fn claimed_chunk_lands_in_existing_mine_section() {
    let mut c = controller();
    c.set_text("[0,64,0]\nmine\n[5,5]\nred\n[1,64,1]");
    c.parse_and_render().unwrap();

    let claimed = c.claim_chunk(ChunkCoord { chunk_x: 6, chunk_z: 5 });
    assert_eq!(claimed, Some(ChunkCoord { chunk_x: 6, chunk_z: 5 }));
    assert_eq!(c.text(), "[0,64,0]\nmine\n[5,5]\n[6,5]\nred\n[1,64,1]");
    assert_eq!(c.status().parse.text, "Claimed chunk [6, 5]! Total: 2 chunks");

    // Already claimed as mine.
    assert_eq!(c.claim_chunk(ChunkCoord { chunk_x: 5, chunk_z: 5 }), None);
}

#[test]
fn clear_resets_text_scene_and_binding() {
    let mut c = controller();
    load(&mut c, 2, "Base", 3);
    c.clear();

    assert_eq!(c.text(), "");
    assert!(c.renderer().graph().markers.is_empty());
    assert!(c.chunks().is_empty());
    assert!(c.loaded_set().is_none());
    assert_eq!(c.update_label(), None);
    assert!(matches!(c.document_state(), DocumentState::Empty {}));
    assert!(c.status().parse.is_empty());
}

#[test]
fn restore_parses_and_clears_the_server_stash() {
    let mut c = controller();
    c.restore("[1,64,1]\n[2,64,2]".to_string());
    assert_eq!(c.current().points.len(), 2);
    assert_eq!(c.status().parse.text, "Your coordinates have been restored!");
    assert_eq!(last_sent(&c, Action::Stash).1, ApiRequest::ClearStash);
}

#[test]
fn sign_in_stash_sends_trimmed_text() {
    let mut c = controller_with(false);
    c.set_text("  [1,64,1]\n");
    c.stash_for_sign_in().unwrap();
    assert_eq!(
        last_sent(&c, Action::Stash).1,
        ApiRequest::StashText { text: "[1,64,1]".into() }
    );
}
