//! Resource types handled by the Meridian webhook
//!
//! The `Infrastructure` extension resource is owned by the extensions API;
//! this crate only models the fields the webhook reads or mutates. Provider
//! configs embedded in it live under [`providers`].

mod infrastructure;
pub mod providers;

pub use infrastructure::{
    Infrastructure, InfrastructureSpec, InfrastructureStatus, SecretReference,
};
