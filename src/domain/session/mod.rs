//! Session domain module.
//!
//! Consumer sessions negotiated over accepted dialogs and their connectivity.
//!
//! # Events
//!
//! - `SessionCreated` - Published when a session is registered
//! - `SessionStatusChanged` - Published on each connectivity transition
//! - `SessionEnded` - Published after teardown

mod aggregate;
mod errors;
mod events;
mod status;

pub use aggregate::Session;
pub use errors::SessionError;
pub use events::{SessionCreated, SessionEnded, SessionStatusChanged};
pub use status::ConnectivityStatus;
