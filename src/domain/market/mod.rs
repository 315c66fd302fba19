//! Market module - what a provider advertises.

mod proposal;
mod service_type;

pub use proposal::{Location, Price, ServiceProposal};
pub use service_type::ServiceType;
