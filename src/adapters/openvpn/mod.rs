//! OpenVPN transport glue: client session map and login validation.

mod auth_validator;
mod client_map;

pub use auth_validator::{AuthValidator, AUTH_SIGNATURE_PREFIX};
pub use client_map::{ClientMap, ClientMapError, ClientSessionLookup};
