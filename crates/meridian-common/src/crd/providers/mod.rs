//! Provider-specific configuration types embedded in `Infrastructure.spec.providerConfig`.
//!
//! Each provider module contains the config schema for its provider
//! extension:
//! - Azure (`azure.provider.extensions.gardener.cloud`)

pub mod azure;

pub use azure::{
    AzureInfrastructureConfig, IdentityConfig, NatGatewayConfig, NetworkConfig, ResourceGroup,
    VNet, Zone, ZonedNatGatewayConfig,
};
