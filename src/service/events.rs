//! Push-channel events.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::Solution;

/// An event delivered to subscribers.
///
/// Serialized with a `type` tag:
///
/// ```
/// use fleetflow::service::FleetEvent;
///
/// let event = FleetEvent::progress("Starting quantum optimization", 10);
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["type"], "progress");
/// assert_eq!(json["percent"], 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    /// A new current solution.
    SolutionUpdate {
        /// The solution now in the current slot.
        solution: Arc<Solution>,
    },
    /// Milestone during a long solve.
    Progress {
        /// Human-readable stage.
        message: String,
        /// Completion, 0 to 100.
        percent: u8,
    },
}

impl FleetEvent {
    /// Creates a progress event; `percent` is clamped to 100.
    pub fn progress(message: impl Into<String>, percent: u8) -> Self {
        Self::Progress {
            message: message.into(),
            percent: percent.min(100),
        }
    }

    /// Creates a solution update.
    pub fn solution_update(solution: Arc<Solution>) -> Self {
        Self::SolutionUpdate { solution }
    }

    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SolutionUpdate { .. } => "solution_update",
            Self::Progress { .. } => "progress",
        }
    }
}
