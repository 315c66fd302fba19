//! Access policy handlers.

mod policy_oracle;

pub use policy_oracle::PolicyOracle;
