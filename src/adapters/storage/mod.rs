//! Storage Adapters
//!
//! - **InMemorySessionStorage** - Live session store

mod in_memory_session_storage;

pub use in_memory_session_storage::InMemorySessionStorage;
