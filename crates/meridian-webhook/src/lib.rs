//! Meridian admission webhook for Infrastructure resources
//!
//! The webhook tracks network layout migrations: when an Infrastructure moves
//! from a single workers CIDR to per-zone subnets, the zone reusing the old
//! workers subnet is recorded in an annotation until it leaves the config.
//!
//! - [`mutator`]: the `Mutator` trait and the Infrastructure mutate chain
//! - [`layout`]: provider network layouts and the migration decision
//! - [`admission`]: axum handlers turning AdmissionReviews into JSON patches
//! - [`server`]: TLS server and webhook registration manifest

#![deny(missing_docs)]

pub mod admission;
pub mod layout;
pub mod mutator;
pub mod server;

pub use meridian_common::{Error, Result};
