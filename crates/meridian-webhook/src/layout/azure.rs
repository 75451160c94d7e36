//! Azure network layout
//!
//! Azure clusters can move from the non-zonal layout (one `workers` subnet)
//! to the zonal layout (one subnet per zone). One of the new zones usually
//! keeps the old workers CIDR so existing nodes stay addressable; that zone
//! is tracked in the migration annotation until it is removed from the config.

use ipnetwork::IpNetwork;
use meridian_common::crd::providers::azure::{
    AzureInfrastructureConfig, NetworkConfig, API_VERSION, INFRASTRUCTURE_CONFIG_KIND,
    NETWORK_LAYOUT_ZONE_MIGRATION_ANNOTATION, PROVIDER_TYPE,
};
use meridian_common::crd::Infrastructure;
use meridian_common::{Error, Result};
use tracing::warn;

use super::{mutate_network_layout, MigrationDecision, NetworkLayout};

/// Network layout of Azure Infrastructure resources
pub struct AzureNetworkLayout;

impl NetworkLayout for AzureNetworkLayout {
    type Config = AzureInfrastructureConfig;

    const PROVIDER_TYPE: &'static str = PROVIDER_TYPE;
    const MIGRATION_ANNOTATION: &'static str = NETWORK_LAYOUT_ZONE_MIGRATION_ANNOTATION;

    fn decode(raw: &serde_json::Value) -> Result<Self::Config> {
        let config: AzureInfrastructureConfig = serde_json::from_value(raw.clone())
            .map_err(|e| Error::decode_kind(INFRASTRUCTURE_CONFIG_KIND, e.to_string()))?;

        if let Some(api_version) = config.api_version.as_deref() {
            if api_version != API_VERSION {
                return Err(Error::validation(
                    INFRASTRUCTURE_CONFIG_KIND,
                    format!("unsupported apiVersion '{api_version}', expected '{API_VERSION}'"),
                ));
            }
        }
        if let Some(kind) = config.kind.as_deref() {
            if kind != INFRASTRUCTURE_CONFIG_KIND {
                return Err(Error::validation(
                    INFRASTRUCTURE_CONFIG_KIND,
                    format!("unexpected kind '{kind}'"),
                ));
            }
        }

        Ok(config)
    }

    fn diff(
        old: &AzureInfrastructureConfig,
        new: &AzureInfrastructureConfig,
        tracked: Option<&str>,
    ) -> MigrationDecision {
        // A tracked zone stays tracked for as long as the new config lists it
        let still_listed = tracked
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|zone| new.networks.zone(*zone).is_some());

        if same_layout(&old.networks, &new.networks) {
            return match (tracked, still_listed) {
                (Some(_), None) => MigrationDecision::Clear,
                _ => MigrationDecision::Unchanged,
            };
        }

        if let Some(zone) = still_listed {
            return MigrationDecision::Track(zone);
        }

        if let Some(zone) = migrated_zone(&old.networks, &new.networks) {
            return MigrationDecision::Track(zone);
        }

        if tracked.is_some() {
            MigrationDecision::Clear
        } else {
            MigrationDecision::Unchanged
        }
    }
}

/// Mutate function registering the Azure network layout check
pub fn network_layout_migration_mutate(
    new: &mut Infrastructure,
    old: Option<&Infrastructure>,
) -> Result<()> {
    mutate_network_layout::<AzureNetworkLayout>(new, old)
}

/// Whether two network configs describe the same subnets
fn same_layout(old: &NetworkConfig, new: &NetworkConfig) -> bool {
    old.workers == new.workers && zone_cidrs(old) == zone_cidrs(new)
}

fn zone_cidrs(networks: &NetworkConfig) -> Vec<(i32, &str)> {
    let mut zones: Vec<(i32, &str)> = networks
        .zones
        .iter()
        .map(|z| (z.name, z.cidr.as_str()))
        .collect();
    zones.sort_unstable();
    zones
}

/// Find the zone taking over the workers subnet when moving to the zonal layout.
///
/// Only a non-zonal old layout can start a migration. If several zones reuse
/// the workers CIDR the first one listed wins.
fn migrated_zone(old: &NetworkConfig, new: &NetworkConfig) -> Option<i32> {
    if old.is_zonal_layout() || !new.is_zonal_layout() {
        return None;
    }
    let workers = old.workers.as_deref()?;

    let mut matching = new
        .zones
        .iter()
        .filter(|z| same_cidr(&z.cidr, workers))
        .map(|z| z.name);
    let zone = matching.next()?;

    let others: Vec<i32> = matching.collect();
    if !others.is_empty() {
        warn!(
            workers = %workers,
            zone,
            ignored = ?others,
            "Multiple zones reuse the workers CIDR, tracking the first"
        );
    }
    Some(zone)
}

/// Compare two CIDRs by network, falling back to string equality for values
/// that do not parse. Empty values never match.
fn same_cidr(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    match (a.parse::<IpNetwork>(), b.parse::<IpNetwork>()) {
        (Ok(a), Ok(b)) => a.network() == b.network() && a.prefix() == b.prefix(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_common::crd::providers::azure::Zone;
    use meridian_common::crd::InfrastructureSpec;
    use serde_json::json;

    const WORKER_CIDR: &str = "10.0.0.0/16";
    const MIGRATION: &str = NETWORK_LAYOUT_ZONE_MIGRATION_ANNOTATION;

    fn workers_config() -> AzureInfrastructureConfig {
        AzureInfrastructureConfig::new(NetworkConfig::with_workers(WORKER_CIDR), true)
    }

    fn zones_config() -> AzureInfrastructureConfig {
        AzureInfrastructureConfig::new(
            NetworkConfig::with_zones(vec![
                Zone::new(1, "10.11.0.0/16"),
                Zone::new(2, WORKER_CIDR),
            ]),
            true,
        )
    }

    fn infrastructure_with_config(config: &AzureInfrastructureConfig) -> Infrastructure {
        let mut infra = Infrastructure::new(
            "shoot--dev--azure",
            InfrastructureSpec {
                type_: PROVIDER_TYPE.to_string(),
                region: "westeurope".to_string(),
                provider_config: Some(serde_json::to_value(config).unwrap()),
                ..Default::default()
            },
        );
        infra.metadata.namespace = Some("shoot--dev--azure".to_string());
        infra
    }

    fn add_migration_annotation(infra: &mut Infrastructure, zone: i32) {
        infra.set_annotation(MIGRATION, zone.to_string());
    }

    // =========================================================================
    // Story Tests: adding the migration annotation
    // =========================================================================

    /// Story: Moving from the workers CIDR to zones tracks the zone reusing it
    #[test]
    fn story_migrating_network_layout_tracks_reused_zone() {
        let old = infrastructure_with_config(&workers_config());
        let mut new = infrastructure_with_config(&zones_config());

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), Some("2"));
        // The old object is never touched
        assert_eq!(old.annotation(MIGRATION), None);
    }

    #[test]
    fn unchanged_workers_layout_is_noop() {
        let infra = infrastructure_with_config(&workers_config());
        let mut new = infra.clone();

        network_layout_migration_mutate(&mut new, Some(&infra)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
        assert_eq!(new, infra);
    }

    #[test]
    fn unchanged_zonal_layout_is_noop() {
        let infra = infrastructure_with_config(&zones_config());
        let mut new = infra.clone();

        network_layout_migration_mutate(&mut new, Some(&infra)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    #[test]
    fn unchanged_layout_ignores_zoned_flag() {
        let mut non_zoned = workers_config();
        non_zoned.zoned = false;
        let old = infrastructure_with_config(&non_zoned);
        let mut new = infrastructure_with_config(&workers_config());

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    /// Story: Creating an Infrastructure never adds the annotation
    #[test]
    fn story_create_is_noop() {
        let mut new = infrastructure_with_config(&zones_config());

        network_layout_migration_mutate(&mut new, None).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    /// Story: Creating an Infrastructure never removes an existing annotation
    #[test]
    fn story_create_keeps_annotation_for_unlisted_zone() {
        let mut new = infrastructure_with_config(&zones_config());
        add_migration_annotation(&mut new, 7);

        network_layout_migration_mutate(&mut new, None).unwrap();

        assert_eq!(new.annotation(MIGRATION), Some("7"));
    }

    #[test]
    fn zones_not_reusing_workers_cidr_are_not_tracked() {
        let old = infrastructure_with_config(&workers_config());
        let mut new = infrastructure_with_config(&AzureInfrastructureConfig::new(
            NetworkConfig::with_zones(vec![
                Zone::new(1, "10.11.0.0/16"),
                Zone::new(2, "10.12.0.0/16"),
            ]),
            true,
        ));

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    #[test]
    fn reused_cidr_matches_by_network() {
        let old = infrastructure_with_config(&workers_config());
        // Host bits set, same network
        let mut new = infrastructure_with_config(&AzureInfrastructureConfig::new(
            NetworkConfig::with_zones(vec![Zone::new(3, "10.0.1.0/16")]),
            true,
        ));

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), Some("3"));
    }

    #[test]
    fn first_of_several_matching_zones_is_tracked() {
        let old = infrastructure_with_config(&workers_config());
        let mut new = infrastructure_with_config(&AzureInfrastructureConfig::new(
            NetworkConfig::with_zones(vec![
                Zone::new(3, WORKER_CIDR),
                Zone::new(1, WORKER_CIDR),
            ]),
            true,
        ));

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), Some("3"));
    }

    // =========================================================================
    // Story Tests: removing the migration annotation
    // =========================================================================

    fn unnamed_zones_config(names: &[i32]) -> AzureInfrastructureConfig {
        AzureInfrastructureConfig::new(
            NetworkConfig::with_zones(names.iter().map(|n| Zone::new(*n, "")).collect()),
            true,
        )
    }

    /// Story: Once the migrated zone leaves the config the annotation goes too
    #[test]
    fn story_annotation_removed_when_zone_no_longer_used() {
        let mut old = infrastructure_with_config(&unnamed_zones_config(&[1, 2]));
        add_migration_annotation(&mut old, 1);
        let mut new = infrastructure_with_config(&unnamed_zones_config(&[2]));
        add_migration_annotation(&mut new, 1);

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
        assert_eq!(old.annotation(MIGRATION), Some("1"));
    }

    /// Story: The annotation stays while its zone is still configured
    #[test]
    fn story_annotation_kept_when_zone_still_in_use() {
        let mut infra = infrastructure_with_config(&unnamed_zones_config(&[1, 2]));
        add_migration_annotation(&mut infra, 1);

        network_layout_migration_mutate(&mut infra, None).unwrap();

        assert_eq!(infra.annotation(MIGRATION), Some("1"));
    }

    #[test]
    fn annotation_kept_on_update_while_zone_listed() {
        let mut old = infrastructure_with_config(&zones_config());
        add_migration_annotation(&mut old, 2);
        let mut changed = zones_config();
        changed.networks.zones.push(Zone::new(3, "10.13.0.0/16"));
        let mut new = infrastructure_with_config(&changed);
        add_migration_annotation(&mut new, 2);

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), Some("2"));
    }

    #[test]
    fn annotation_dropped_by_client_is_restored() {
        let mut old = infrastructure_with_config(&zones_config());
        add_migration_annotation(&mut old, 2);
        let mut changed = zones_config();
        changed.networks.zones[0].cidr = "10.21.0.0/16".to_string();
        let mut new = infrastructure_with_config(&changed);

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), Some("2"));
    }

    /// Story: A stale annotation is removed even when the layout did not change
    #[test]
    fn story_stale_annotation_cleared_on_unchanged_layout() {
        let config = AzureInfrastructureConfig::new(
            NetworkConfig::with_zones(vec![Zone::new(2, WORKER_CIDR)]),
            true,
        );
        let mut old = infrastructure_with_config(&config);
        add_migration_annotation(&mut old, 1);
        let mut new = old.clone();

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    #[test]
    fn valid_annotation_untouched_on_unchanged_layout() {
        let mut old = infrastructure_with_config(&zones_config());
        add_migration_annotation(&mut old, 2);
        let mut new = old.clone();

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new, old);
        assert_eq!(
            AzureNetworkLayout::diff(&zones_config(), &zones_config(), Some("zone-two")),
            MigrationDecision::Clear
        );
    }

    #[test]
    fn unparseable_annotation_is_cleared() {
        let old = infrastructure_with_config(&unnamed_zones_config(&[1, 2]));
        let mut new = infrastructure_with_config(&unnamed_zones_config(&[2]));
        new.set_annotation(MIGRATION, "zone-one");

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    /// Story: Running the webhook twice gives the same result as once
    #[test]
    fn story_mutation_is_idempotent() {
        let old = infrastructure_with_config(&workers_config());
        let mut once = infrastructure_with_config(&zones_config());
        network_layout_migration_mutate(&mut once, Some(&old)).unwrap();

        let mut twice = once.clone();
        network_layout_migration_mutate(&mut twice, Some(&old)).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.annotation(MIGRATION), Some("2"));
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    #[test]
    fn malformed_config_fails_without_mutation() {
        let old = infrastructure_with_config(&workers_config());
        let mut new = infrastructure_with_config(&zones_config());
        new.spec.provider_config = Some(json!({"networks": {"zones": [{"name": "one"}]}}));
        let before = new.clone();

        let err = network_layout_migration_mutate(&mut new, Some(&old)).unwrap_err();

        assert!(err.is_object_error());
        assert_eq!(err.kind(), Some(INFRASTRUCTURE_CONFIG_KIND));
        assert_eq!(new, before);
    }

    #[test]
    fn malformed_old_config_fails() {
        let mut old = infrastructure_with_config(&workers_config());
        old.spec.provider_config = Some(json!("not an object"));
        let mut new = infrastructure_with_config(&zones_config());

        assert!(network_layout_migration_mutate(&mut new, Some(&old)).is_err());
        assert_eq!(new.annotation(MIGRATION), None);
    }

    #[test]
    fn missing_provider_config_is_noop() {
        let mut old = infrastructure_with_config(&workers_config());
        old.spec.provider_config = None;
        let mut new = infrastructure_with_config(&zones_config());

        network_layout_migration_mutate(&mut new, Some(&old)).unwrap();

        assert_eq!(new.annotation(MIGRATION), None);
    }

    #[test]
    fn decode_rejects_foreign_type_meta() {
        let err = AzureNetworkLayout::decode(&json!({
            "apiVersion": "aws.provider.extensions.gardener.cloud/v1alpha1",
            "kind": "InfrastructureConfig"
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.is_object_error());
        assert!(err.to_string().contains("unsupported apiVersion"));

        let err = AzureNetworkLayout::decode(&json!({
            "apiVersion": API_VERSION,
            "kind": "ControlPlaneConfig"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unexpected kind"));
    }

    #[test]
    fn decode_accepts_missing_type_meta() {
        let config = AzureNetworkLayout::decode(&json!({
            "networks": {"workers": WORKER_CIDR}
        }))
        .unwrap();
        assert_eq!(config.networks.workers.as_deref(), Some(WORKER_CIDR));
        assert!(!config.zoned);
    }

    // =========================================================================
    // Layout comparison
    // =========================================================================

    #[test]
    fn same_layout_ignores_zone_order() {
        let zones = |cidrs: &[(i32, &str)]| {
            NetworkConfig::with_zones(cidrs.iter().map(|(n, c)| Zone::new(*n, *c)).collect())
        };
        let a = zones(&[(1, "10.1.0.0/16"), (2, "10.2.0.0/16")]);
        let b = zones(&[(2, "10.2.0.0/16"), (1, "10.1.0.0/16")]);
        assert!(same_layout(&a, &b));

        let c = zones(&[(1, "10.1.0.0/16"), (2, "10.3.0.0/16")]);
        assert!(!same_layout(&a, &c));
    }

    #[test]
    fn same_cidr_rules() {
        assert!(same_cidr("10.0.0.0/16", "10.0.0.0/16"));
        assert!(same_cidr("10.0.0.0/16", "10.0.255.1/16"));
        assert!(!same_cidr("10.0.0.0/16", "10.0.0.0/24"));
        assert!(!same_cidr("", ""));
        assert!(same_cidr("not-a-cidr", "not-a-cidr"));
        assert!(!same_cidr("not-a-cidr", "10.0.0.0/16"));
    }

    #[test]
    fn migration_needs_non_zonal_old_layout() {
        let old = NetworkConfig::with_zones(vec![Zone::new(1, WORKER_CIDR)]);
        let new = NetworkConfig::with_zones(vec![Zone::new(2, WORKER_CIDR)]);
        assert_eq!(migrated_zone(&old, &new), None);

        let old = NetworkConfig::with_workers(WORKER_CIDR);
        let new = NetworkConfig::with_workers("10.1.0.0/16");
        assert_eq!(migrated_zone(&old, &new), None);
    }
}
