//! Common types for Meridian: Infrastructure resources, provider configs, errors, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default HTTPS port for the admission webhook server
pub const DEFAULT_WEBHOOK_PORT: u16 = 10250;

/// Default directory the webhook TLS secret is mounted into
pub const DEFAULT_CERT_DIR: &str = "/etc/meridian-webhook/certs";

/// File name of the serving certificate inside the cert directory
pub const TLS_CERT_FILE: &str = "tls.crt";

/// File name of the serving key inside the cert directory
pub const TLS_KEY_FILE: &str = "tls.key";
