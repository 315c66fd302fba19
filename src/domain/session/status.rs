//! Connectivity status of a consumer session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Connectivity of a session as observed by its payment engine and transport.
///
/// `Disconnected` and `Failed` are terminal and trigger teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStatus {
    #[default]
    Negotiating,
    Connected,
    Disconnected,
    Failed,
}

impl StateMachine for ConnectivityStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectivityStatus::*;
        matches!(
            (self, target),
            (Negotiating, Connected)
                | (Negotiating, Disconnected)
                | (Negotiating, Failed)
                | (Connected, Disconnected)
                | (Connected, Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectivityStatus::*;
        match self {
            Negotiating => vec![Connected, Disconnected, Failed],
            Connected => vec![Disconnected, Failed],
            Disconnected | Failed => vec![],
        }
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectivityStatus::Negotiating => "Negotiating",
            ConnectivityStatus::Connected => "Connected",
            ConnectivityStatus::Disconnected => "Disconnected",
            ConnectivityStatus::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}
