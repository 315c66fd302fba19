//! In-process dialog transport and session channels.

mod channel;
mod transport;

pub use channel::InMemoryChannel;
pub use transport::InMemoryDialogTransport;
