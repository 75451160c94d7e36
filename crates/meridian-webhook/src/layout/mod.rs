//! Network layout migration tracking
//!
//! Providers describe how to decode their provider config and how to compare
//! two network layouts through [`NetworkLayout`]. The resulting
//! [`MigrationDecision`] is applied to the migration annotation of the new
//! Infrastructure. The annotation is recomputed on every update from the old
//! and new configs; nothing else is remembered between calls.

pub mod azure;

use meridian_common::crd::Infrastructure;
use meridian_common::metrics;
use meridian_common::Result;
use tracing::{debug, info};

pub use azure::{network_layout_migration_mutate, AzureNetworkLayout};

/// Decoding and diffing of one provider's network layout
pub trait NetworkLayout {
    /// Decoded provider config
    type Config;

    /// `spec.type` of the Infrastructure objects this layout applies to
    const PROVIDER_TYPE: &'static str;

    /// Annotation recording the zone under migration
    const MIGRATION_ANNOTATION: &'static str;

    /// Decode the provider config embedded in `spec.providerConfig`
    fn decode(raw: &serde_json::Value) -> Result<Self::Config>;

    /// Decide what the migration annotation should be after moving from `old` to `new`.
    ///
    /// `tracked` is the current annotation value, if any.
    fn diff(old: &Self::Config, new: &Self::Config, tracked: Option<&str>) -> MigrationDecision;
}

/// Outcome of comparing two network layouts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationDecision {
    /// Leave the annotation as it is
    Unchanged,
    /// Annotate the given zone as being migrated
    Track(i32),
    /// Remove the annotation
    Clear,
}

impl MigrationDecision {
    /// Apply the decision to `infra`'s `annotation`.
    ///
    /// Returns true if the annotations changed.
    pub fn apply(&self, infra: &mut Infrastructure, annotation: &str) -> bool {
        match self {
            MigrationDecision::Unchanged => false,
            MigrationDecision::Track(zone) => infra.set_annotation(annotation, zone.to_string()),
            MigrationDecision::Clear => infra.remove_annotation(annotation).is_some(),
        }
    }

    fn action(&self) -> &'static str {
        match self {
            MigrationDecision::Unchanged => "unchanged",
            MigrationDecision::Track(_) => "track",
            MigrationDecision::Clear => "clear",
        }
    }
}

/// Update the migration annotation of `new` for the layout `L`.
///
/// Creates are left untouched, as are updates where either side carries no
/// provider config. Both configs are decoded before anything is written, so
/// a decode error leaves `new` unchanged.
pub fn mutate_network_layout<L: NetworkLayout>(
    new: &mut Infrastructure,
    old: Option<&Infrastructure>,
) -> Result<()> {
    let Some(old) = old else {
        return Ok(());
    };

    let (Some(new_raw), Some(old_raw)) = (
        new.spec.provider_config.as_ref(),
        old.spec.provider_config.as_ref(),
    ) else {
        debug!(
            infrastructure = ?new.metadata.name,
            "Missing provider config, skipping network layout check"
        );
        return Ok(());
    };

    let new_config = L::decode(new_raw)?;
    let old_config = L::decode(old_raw)?;

    let tracked = new
        .annotation(L::MIGRATION_ANNOTATION)
        .or_else(|| old.annotation(L::MIGRATION_ANNOTATION))
        .map(str::to_owned);

    let decision = L::diff(&old_config, &new_config, tracked.as_deref());
    if decision.apply(new, L::MIGRATION_ANNOTATION) {
        info!(
            infrastructure = ?new.metadata.name,
            namespace = ?new.metadata.namespace,
            provider = L::PROVIDER_TYPE,
            action = decision.action(),
            zone = ?new.annotation(L::MIGRATION_ANNOTATION),
            "Updated network layout migration annotation"
        );
        metrics::record_migration_annotation(L::PROVIDER_TYPE, decision.action());
    }

    Ok(())
}
