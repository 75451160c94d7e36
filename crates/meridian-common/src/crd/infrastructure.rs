//! Infrastructure extension resource
//!
//! An `Infrastructure` describes the cloud infrastructure of one shoot
//! cluster. Its `spec.providerConfig` is an opaque JSON document whose schema
//! depends on `spec.type` (see [`super::providers`]).

use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Specification for an Infrastructure
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Infrastructure",
    plural = "infrastructures",
    status = "InfrastructureStatus",
    namespaced,
    schema = "disabled",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    /// Provider type (e.g., "azure")
    #[serde(rename = "type")]
    pub type_: String,

    /// Provider-specific configuration, decoded by the provider's network layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Region the infrastructure lives in
    #[serde(default)]
    pub region: String,

    /// Reference to the cloud provider credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,
}

/// Reference to a Secret by name and namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Secret name
    pub name: String,
    /// Secret namespace
    #[serde(default)]
    pub namespace: String,
}

/// Status for an Infrastructure
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    /// Provider-specific status written by the infrastructure controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<serde_json::Value>,

    /// CIDR of the node network, once known
    #[serde(
        default,
        rename = "nodesCIDR",
        skip_serializing_if = "Option::is_none"
    )]
    pub nodes_cidr: Option<String>,

    /// Generation last processed by the infrastructure controller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Infrastructure {
    /// Returns true once a deletion timestamp has been set
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Look up an annotation value
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    /// Set an annotation, creating the annotation map if needed.
    ///
    /// Returns true if the stored value changed.
    pub fn set_annotation(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.annotation(key) == Some(value.as_str()) {
            return false;
        }
        self.annotations_mut().insert(key.to_string(), value);
        true
    }

    /// Remove an annotation, returning its previous value.
    ///
    /// The annotation map is kept (possibly empty) so only the key disappears.
    pub fn remove_annotation(&mut self, key: &str) -> Option<String> {
        self.metadata
            .annotations
            .as_mut()
            .and_then(|a| a.remove(key))
    }
}
