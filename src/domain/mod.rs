//! Domain layer containing node business rules and value types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, amounts, errors, events, state machine)
//! - `market` - Service types and the proposals advertised for them
//! - `service` - Service instance lifecycle, start options and ports
//! - `session` - Consumer sessions and their connectivity
//! - `payment` - Invoices, promises and settlement bookkeeping
//! - `registry` - Provider registration events
//! - `policy` - Access policies and their snapshot repository

pub mod foundation;
pub mod market;
pub mod payment;
pub mod policy;
pub mod registry;
pub mod service;
pub mod session;
