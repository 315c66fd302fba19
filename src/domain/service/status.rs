//! ServiceStatus enum for tracking lifecycle of service instances.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle status of a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl ServiceStatus {
    /// Returns true while the instance occupies its (type, provider) slot.
    pub fn is_active(&self) -> bool {
        matches!(self, ServiceStatus::Starting | ServiceStatus::Running)
    }
}

impl StateMachine for ServiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ServiceStatus::*;
        matches!(
            (self, target),
            (Starting, Running) | (Starting, Stopping) | (Running, Stopping) | (Stopping, Stopped)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ServiceStatus::*;
        match self {
            Starting => vec![Running, Stopping],
            Running => vec![Stopping],
            Stopping => vec![Stopped],
            Stopped => vec![],
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Starting => "Starting",
            ServiceStatus::Running => "Running",
            ServiceStatus::Stopping => "Stopping",
            ServiceStatus::Stopped => "Stopped",
        };
        write!(f, "{}", s)
    }
}
