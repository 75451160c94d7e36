//! OpenTelemetry metrics for the admission webhook
//!
//! Instruments are no-ops until a meter provider is installed by
//! [`crate::telemetry::init_telemetry`].

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Meter};
use opentelemetry::KeyValue;

/// Global meter for Meridian metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("meridian"));

/// Counter of admission requests handled
///
/// Labels:
/// - `operation`: CREATE, UPDATE, DELETE, CONNECT
/// - `result`: allowed, patched, denied, invalid
pub static ADMISSION_REQUESTS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("meridian_admission_requests_total")
        .with_description("Total number of admission requests handled")
        .with_unit("{requests}")
        .build()
});

/// Counter of migration annotation changes applied to Infrastructure objects
///
/// Labels:
/// - `provider`: provider type (azure)
/// - `action`: track, clear
pub static MIGRATION_ANNOTATION_CHANGES: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("meridian_migration_annotation_changes_total")
        .with_description("Total number of network layout migration annotation changes")
        .with_unit("{changes}")
        .build()
});

/// Outcome of a single admission request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionResult {
    /// Allowed without changes
    Allowed,
    /// Allowed with a JSON patch
    Patched,
    /// Denied because the submitted object was rejected
    Denied,
    /// Denied because the webhook itself failed
    Error,
    /// The review itself was malformed
    Invalid,
}

impl AdmissionResult {
    /// Label value for this result
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionResult::Allowed => "allowed",
            AdmissionResult::Patched => "patched",
            AdmissionResult::Denied => "denied",
            AdmissionResult::Error => "error",
            AdmissionResult::Invalid => "invalid",
        }
    }
}

/// Record an admission request outcome
pub fn record_admission(operation: &str, result: AdmissionResult) {
    ADMISSION_REQUESTS.add(
        1,
        &[
            KeyValue::new("operation", operation.to_string()),
            KeyValue::new("result", result.as_str()),
        ],
    );
}

/// Record a migration annotation change
pub fn record_migration_annotation(provider: &'static str, action: &'static str) {
    MIGRATION_ANNOTATION_CHANGES.add(
        1,
        &[
            KeyValue::new("provider", provider),
            KeyValue::new("action", action),
        ],
    );
}
