//! dvpn-node - Provider node of a decentralized VPN
//!
//! Runs bandwidth-sharing services, turns accepted consumer dialogs into
//! metered sessions and settles the payment promises those sessions earn.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
