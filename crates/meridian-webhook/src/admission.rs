//! Infrastructure mutation webhook
//!
//! Handles AdmissionReview requests for Infrastructure resources. The new
//! object is decoded, run through the configured [`Mutator`], and any
//! difference to the submitted object is returned as a JSON patch.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation},
    DynamicObject,
};
use meridian_common::crd::Infrastructure;
use meridian_common::metrics::{self, AdmissionResult};
use meridian_common::{Error, Result};
use tracing::{debug, error, info, warn};

use crate::mutator::Mutator;

/// Path the API server posts Infrastructure admission reviews to
pub const INFRASTRUCTURE_MUTATE_PATH: &str = "/webhooks/infrastructure";

/// Shared state for webhook handlers
#[derive(Clone)]
pub struct WebhookState {
    /// Mutator applied to every admitted Infrastructure
    pub mutator: Arc<dyn Mutator>,
    /// Only Infrastructure objects with this `spec.type` are mutated
    pub provider_type: String,
}

impl WebhookState {
    /// Create a new webhook state
    pub fn new(mutator: Arc<dyn Mutator>, provider_type: impl Into<String>) -> Self {
        Self {
            mutator,
            provider_type: provider_type.into(),
        }
    }
}

/// Create the webhook router
///
/// - POST /webhooks/infrastructure - mutate Infrastructure objects
/// - GET /healthz - liveness probe
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(INFRASTRUCTURE_MUTATE_PATH, post(mutate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Handle a mutating admission review for Infrastructure objects
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<AdmissionReview<DynamicObject>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let req: AdmissionRequest<DynamicObject> = match body.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            metrics::record_admission("UNKNOWN", AdmissionResult::Invalid);
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = mutate_infrastructure(&state, &req);
    Json(response.into_review())
}

/// Process a single Infrastructure admission request
pub(crate) fn mutate_infrastructure(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let uid = request.uid.clone();
    let operation = operation_label(&request.operation);

    let Some(obj) = &request.object else {
        debug!(uid = %uid, operation, "No object in request, allowing unchanged");
        metrics::record_admission(operation, AdmissionResult::Allowed);
        return AdmissionResponse::from(request);
    };

    match build_patch(state, obj, request.old_object.as_ref()) {
        Ok(None) => {
            debug!(uid = %uid, operation, name = ?obj.metadata.name, "No mutation required");
            metrics::record_admission(operation, AdmissionResult::Allowed);
            AdmissionResponse::from(request)
        }
        Ok(Some(patch)) => {
            info!(
                uid = %uid,
                operation,
                name = ?obj.metadata.name,
                namespace = ?obj.metadata.namespace,
                patch_ops = patch.0.len(),
                "Patching Infrastructure"
            );
            match AdmissionResponse::from(request).with_patch(patch) {
                Ok(response) => {
                    metrics::record_admission(operation, AdmissionResult::Patched);
                    response
                }
                Err(e) => {
                    error!(uid = %uid, error = %e, "Failed to serialize patch");
                    metrics::record_admission(operation, AdmissionResult::Denied);
                    AdmissionResponse::from(request)
                        .deny(format!("patch serialization error: {e}"))
                }
            }
        }
        Err(e) if e.is_object_error() => {
            warn!(
                uid = %uid,
                operation,
                name = ?obj.metadata.name,
                error = %e,
                "Rejecting malformed Infrastructure"
            );
            metrics::record_admission(operation, AdmissionResult::Denied);
            AdmissionResponse::from(request).deny(e.to_string())
        }
        Err(e) => {
            error!(
                uid = %uid,
                operation,
                name = ?obj.metadata.name,
                error = %e,
                "Failed to mutate Infrastructure"
            );
            metrics::record_admission(operation, AdmissionResult::Error);
            AdmissionResponse::from(request).deny(e.to_string())
        }
    }
}

/// Run the mutator and diff the result against the submitted object.
///
/// Returns `None` when the object is left unchanged.
fn build_patch(
    state: &WebhookState,
    obj: &DynamicObject,
    old_obj: Option<&DynamicObject>,
) -> Result<Option<json_patch::Patch>> {
    let original = decode_infrastructure(obj)?;
    if original.spec.type_ != state.provider_type {
        debug!(
            name = ?obj.metadata.name,
            provider = %original.spec.type_,
            "Infrastructure of another provider, skipping"
        );
        return Ok(None);
    }
    let old = old_obj.map(decode_infrastructure).transpose()?;

    let mut mutated = original.clone();
    state.mutator.mutate(&mut mutated, old.as_ref())?;

    if mutated == original {
        return Ok(None);
    }

    let before = encode_infrastructure(&original)?;
    let after = encode_infrastructure(&mutated)?;
    let patch = json_patch::diff(&before, &after);
    Ok((!patch.0.is_empty()).then_some(patch))
}

fn decode_infrastructure(obj: &DynamicObject) -> Result<Infrastructure> {
    serde_json::to_value(obj)
        .and_then(serde_json::from_value)
        .map_err(|e| Error::decode_kind("Infrastructure", e.to_string()))
}

fn encode_infrastructure(infra: &Infrastructure) -> Result<serde_json::Value> {
    serde_json::to_value(infra)
        .map_err(|e| Error::serialization_for_kind("Infrastructure", e.to_string()))
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}
