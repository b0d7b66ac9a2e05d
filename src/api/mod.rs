//! Persistence collaborator: the HTTP endpoints that store coordinate sets
//! and reference curves.
//!
//! The controller never awaits a request. It hands an [`ApiRequest`] plus a
//! [`Ticket`] to a [`Dispatcher`], and the reply comes back later as an
//! [`ApiEnvelope`] that the UI thread drains once per frame.
//!
//! ```text
//! Controller ──dispatch(ticket, request)──► Dispatcher ──► tokio task ──► HTTP
//!     ▲                                                          │
//!     └──────────── handle_envelope ◄── poll() ◄── std mpsc ◄────┘
//! ```

pub mod client;
pub mod dispatch;

use std::fmt;

use crate::error::ApiError;
use crate::protocol::{
    CurvePoint, CurveSummary, LoadSetResponse, SaveSetRequest, SaveSetResponse, SetSummary,
    UpdateSetRequest,
};

pub use client::PersistenceClient;
pub use dispatch::TokioDispatcher;

/// User-visible action a request belongs to. At most one request per
/// action is in flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ListSets,
    LoadSet,
    Save,
    Update,
    ListCurves,
    LoadCurve,
    DeleteCurve,
    Stash,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::ListSets => "Listing saved sets",
            Action::LoadSet => "Loading",
            Action::Save => "Saving",
            Action::Update => "Updating",
            Action::ListCurves => "Listing curves",
            Action::LoadCurve => "Loading the overlay",
            Action::DeleteCurve => "Deleting",
            Action::Stash => "Stashing",
        };
        f.write_str(s)
    }
}

/// Identifies a request so its reply can be matched (or discarded as stale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub action: Action,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    ListSets,
    LoadSet { id: i64 },
    /// Public demo set, readable without a session.
    LoadDemo { id: i64 },
    SaveSet(SaveSetRequest),
    UpdateSet(UpdateSetRequest),
    ListCurves,
    LoadCurve { filename: String },
    DeleteCurve { filename: String },
    /// Server-side stash of unsaved text (survives a login redirect).
    StashText { text: String },
    ClearStash,
}

impl ApiRequest {
    pub fn action(&self) -> Action {
        match self {
            ApiRequest::ListSets => Action::ListSets,
            ApiRequest::LoadSet { .. } | ApiRequest::LoadDemo { .. } => Action::LoadSet,
            ApiRequest::SaveSet(_) => Action::Save,
            ApiRequest::UpdateSet(_) => Action::Update,
            ApiRequest::ListCurves => Action::ListCurves,
            ApiRequest::LoadCurve { .. } => Action::LoadCurve,
            ApiRequest::DeleteCurve { .. } => Action::DeleteCurve,
            ApiRequest::StashText { .. } | ApiRequest::ClearStash => Action::Stash,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Sets(Vec<SetSummary>),
    SetLoaded { demo: bool, body: LoadSetResponse },
    Saved(SaveSetResponse),
    Updated(SaveSetResponse),
    Curves(Vec<CurveSummary>),
    CurveLoaded {
        filename: String,
        coordinates: Vec<CurvePoint>,
    },
    CurveDeleted { filename: String },
    Stashed,
}

/// A finished request, delivered back to the UI thread.
#[derive(Debug)]
pub struct ApiEnvelope {
    pub ticket: Ticket,
    pub result: Result<ApiResponse, ApiError>,
}

/// Fire-and-forget request submission.
pub trait Dispatcher {
    fn dispatch(&mut self, ticket: Ticket, request: ApiRequest);
}
