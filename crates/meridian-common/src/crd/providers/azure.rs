//! Azure provider configuration
//!
//! `InfrastructureConfig` of the Azure provider extension. The network
//! section comes in two layouts:
//! - non-zonal: a single `workers` CIDR shared by every zone
//! - zonal: one `zones` entry per availability zone, each with its own CIDR

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Provider type of Azure Infrastructure resources
pub const PROVIDER_TYPE: &str = "azure";

/// API version of the Azure provider config
pub const API_VERSION: &str = "azure.provider.extensions.gardener.cloud/v1alpha1";

/// Kind of the Azure infrastructure provider config
pub const INFRASTRUCTURE_CONFIG_KIND: &str = "InfrastructureConfig";

/// Annotation naming the zone whose subnet is being migrated from the workers CIDR.
///
/// The value is the decimal zone name, e.g. `"2"`.
pub const NETWORK_LAYOUT_ZONE_MIGRATION_ANNOTATION: &str =
    "migration.azure.provider.extensions.gardener.cloud/zone";

/// Azure infrastructure provider config
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureInfrastructureConfig {
    /// API version (azure.provider.extensions.gardener.cloud/v1alpha1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Resource kind (InfrastructureConfig)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Existing resource group to use instead of creating one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroup>,

    /// Network layout of the cluster
    #[serde(default)]
    pub networks: NetworkConfig,

    /// Managed identity to attach to the nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityConfig>,

    /// Whether the cluster spans availability zones
    #[serde(default)]
    pub zoned: bool,
}

impl AzureInfrastructureConfig {
    /// Create a config with type meta filled in
    pub fn new(networks: NetworkConfig, zoned: bool) -> Self {
        Self {
            api_version: Some(API_VERSION.to_string()),
            kind: Some(INFRASTRUCTURE_CONFIG_KIND.to_string()),
            networks,
            zoned,
            ..Default::default()
        }
    }
}

/// Existing Azure resource group
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    /// Resource group name
    pub name: String,
}

/// Network configuration of an Azure infrastructure
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Virtual network to create or reuse
    #[serde(default)]
    pub vnet: VNet,

    /// Worker subnet CIDR of the non-zonal layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<String>,

    /// NAT gateway for the worker subnet (non-zonal layout)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_gateway: Option<NatGatewayConfig>,

    /// Service endpoints attached to the worker subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_endpoints: Vec<String>,

    /// Per-zone subnets of the zonal layout
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<Zone>,
}

impl NetworkConfig {
    /// Network config of the non-zonal layout
    pub fn with_workers(cidr: impl Into<String>) -> Self {
        Self {
            workers: Some(cidr.into()),
            ..Default::default()
        }
    }

    /// Network config of the zonal layout
    pub fn with_zones(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            ..Default::default()
        }
    }

    /// Returns true if the config uses per-zone subnets
    pub fn is_zonal_layout(&self) -> bool {
        !self.zones.is_empty()
    }

    /// Find the zone entry with the given name
    pub fn zone(&self, name: i32) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }
}

/// Virtual network settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VNet {
    /// Name of an existing virtual network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Resource group of an existing virtual network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,

    /// CIDR of a virtual network to create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,

    /// DDoS protection plan to attach
    #[serde(
        default,
        rename = "ddosProtectionPlanID",
        skip_serializing_if = "Option::is_none"
    )]
    pub ddos_protection_plan_id: Option<String>,
}

/// NAT gateway of the non-zonal layout
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayConfig {
    /// Whether the NAT gateway is created
    #[serde(default)]
    pub enabled: bool,

    /// Idle connection timeout in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_connection_timeout_minutes: Option<i32>,

    /// Zone the NAT gateway is pinned to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<i32>,
}

/// One availability zone of the zonal layout
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Zone name, the numeric Azure availability zone
    pub name: i32,

    /// Subnet CIDR for this zone
    #[serde(default)]
    pub cidr: String,

    /// Service endpoints attached to the zone's subnet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_endpoints: Vec<String>,

    /// NAT gateway for the zone's subnet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_gateway: Option<ZonedNatGatewayConfig>,
}

impl Zone {
    /// Create a zone entry with a subnet CIDR
    pub fn new(name: i32, cidr: impl Into<String>) -> Self {
        Self {
            name,
            cidr: cidr.into(),
            ..Default::default()
        }
    }
}

/// NAT gateway of a single zone
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZonedNatGatewayConfig {
    /// Whether the NAT gateway is created
    #[serde(default)]
    pub enabled: bool,

    /// Idle connection timeout in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_connection_timeout_minutes: Option<i32>,
}

/// Managed identity settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    /// Identity name
    pub name: String,

    /// Resource group of the identity
    pub resource_group: String,

    /// Whether the identity may pull from Azure Container Registries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr_access: Option<bool>,
}
