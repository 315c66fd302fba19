//! Port supplier adapters.

mod pool;

pub use pool::PortPool;
