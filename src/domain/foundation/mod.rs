//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, error types and the event envelope
//! that form the vocabulary of the node.

mod amount;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use amount::{Amount, UNITS_PER_TOKEN};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, topics, DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{ClientHandle, ContractAddress, Identity, ServiceId, SessionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
