//! Session handlers.

mod promise_rejection_handler;
mod session_manager;

pub use promise_rejection_handler::PromiseRejectionHandler;
pub use session_manager::{CreateSessionCommand, SessionManager};
