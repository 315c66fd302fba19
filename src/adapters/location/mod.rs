//! Location resolver adapters.

mod http_resolver;
mod static_resolver;

pub use http_resolver::HttpLocationResolver;
pub use static_resolver::StaticLocationResolver;
