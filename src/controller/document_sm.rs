//! Document state machine.
//!
//! Tracks what the text buffer last produced:
//! ```text
//! Empty ──Parsed──► Parsed { points } ──Failed──► Error { message }
//!   ▲                    │   ▲                        │
//!   └──────Cleared───────┘   └────────Parsed──────────┘
//! ```
//! All three events are handled in the `document` superstate, so every leaf
//! reacts to them the same way.

use statig::prelude::*;
use tracing::info;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// A parse produced at least one point and was rendered.
    Parsed { points: usize },
    /// A parse attempt was rejected (empty input or no points).
    Failed { message: String },
    /// Text and scene were cleared.
    Cleared,
}

// ---------------------------------------------------------------------------
// Shared storage
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Document;

// ---------------------------------------------------------------------------
// State machine implementation
// ---------------------------------------------------------------------------

#[state_machine(
    initial = "State::empty()",
    state(derive(Debug, Clone, PartialEq))
)]
impl Document {
    #[superstate]
    fn document(&mut self, event: &DocumentEvent) -> Outcome<State> {
        match event {
            DocumentEvent::Parsed { points } => {
                info!(target: "controller", points, "Document parsed");
                Transition(State::parsed(*points))
            }
            DocumentEvent::Failed { message } => {
                info!(target: "controller", "Parse failed: {}", message);
                Transition(State::error(message.clone()))
            }
            DocumentEvent::Cleared => {
                info!(target: "controller", "Document cleared");
                Transition(State::empty())
            }
        }
    }

    /// No text has been parsed since start or the last clear.
    #[state(superstate = "document")]
    fn empty(&mut self, event: &DocumentEvent) -> Outcome<State> {
        match event {
            DocumentEvent::Cleared => Handled,
            _ => Super,
        }
    }

    /// The scene shows the result of the last parse.
    #[state(superstate = "document")]
    fn parsed(&mut self, event: &DocumentEvent, points: &usize) -> Outcome<State> {
        let _ = (event, points);
        Super
    }

    /// The last parse attempt failed; the scene still shows the one before.
    #[state(superstate = "document")]
    fn error(&mut self, event: &DocumentEvent, message: &String) -> Outcome<State> {
        let _ = (event, message);
        Super
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let sm = Document.state_machine();
        assert_eq!(sm.state(), &State::empty());
    }

    #[test]
    fn parse_fail_clear_cycle() {
        let mut sm = Document.state_machine();

        sm.handle(&DocumentEvent::Parsed { points: 3 });
        assert_eq!(sm.state(), &State::parsed(3));

        sm.handle(&DocumentEvent::Failed {
            message: "No valid coordinates found.".into(),
        });
        assert_eq!(sm.state(), &State::error("No valid coordinates found.".into()));

        sm.handle(&DocumentEvent::Parsed { points: 5 });
        assert_eq!(sm.state(), &State::parsed(5));

        sm.handle(&DocumentEvent::Cleared);
        assert_eq!(sm.state(), &State::empty());
    }

    #[test]
    fn clearing_empty_stays_empty() {
        let mut sm = Document.state_machine();
        sm.handle(&DocumentEvent::Cleared);
        assert_eq!(sm.state(), &State::empty());
    }
}
