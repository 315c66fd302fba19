//! Event bus adapters.
//!
//! - `InMemoryEventBus` - In-process bus with ordered, asynchronous delivery

mod in_memory;

pub use in_memory::InMemoryEventBus;
