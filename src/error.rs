//! Error types surfaced to the user as status text.
//!
//! The `Display` output of each variant is the exact message shown in the
//! status line, so call sites convert errors with `to_string()`.

use thiserror::Error;

use crate::api::Action;

/// Failures of the persistence collaborator.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status, with the server's message when it sent one.
    #[error("Error: {}", message.as_deref().unwrap_or("request failed"))]
    Status { status: u16, message: Option<String> },

    #[error("Error: malformed response ({0})")]
    Malformed(#[from] serde_json::Error),

    /// HTTP success but `success: false` in the body.
    #[error("Error: {0}")]
    Rejected(String),
}

/// Failures of a user-initiated controller action.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Please enter some coordinates first.")]
    EmptyInput,

    #[error("No valid coordinates found. Use format: [-278, 80, 487]")]
    NoPoints,

    #[error("No valid coordinates found to save.")]
    NoPointsToSave,

    #[error("Please enter a name for this coordinate set.")]
    MissingName,

    #[error("No coordinate set is loaded.")]
    NoLoadedSet,

    #[error("Please select a coordinate set to load.")]
    NoSetSelected,

    #[error("There is no pending update to confirm.")]
    NothingToConfirm,

    #[error("No curve selected to delete")]
    NoCurveSelected,

    #[error("Saving and loading are not available in sample mode.")]
    PersistenceDisabled,

    #[error("{0} is already in progress.")]
    Busy(Action),

    #[error(transparent)]
    Api(#[from] ApiError),
}
