//! Identity adapters.

mod digest;

pub use digest::{DigestIdentityExtractor, DigestSigner};
