//! Infrastructure mutators
//!
//! A [`Mutator`] rewrites the new version of an object in place, given the
//! old version on updates. [`InfrastructureMutator`] chains plain mutate
//! functions so providers can register several independent rewrites.

use meridian_common::crd::Infrastructure;
use meridian_common::Result;
use tracing::debug;

/// A function mutating the new Infrastructure, given the old one on updates
pub type MutateFn = fn(&mut Infrastructure, Option<&Infrastructure>) -> Result<()>;

/// Mutates Infrastructure objects before they are persisted
pub trait Mutator: Send + Sync {
    /// Mutate `new` in place. `old` is `None` on create.
    fn mutate(&self, new: &mut Infrastructure, old: Option<&Infrastructure>) -> Result<()>;
}

/// Runs a list of mutate functions in order
pub struct InfrastructureMutator {
    mutate_fns: Vec<MutateFn>,
}

impl InfrastructureMutator {
    /// Create a mutator running `mutate_fns` in the given order
    pub fn new(mutate_fns: Vec<MutateFn>) -> Self {
        Self { mutate_fns }
    }
}

impl Mutator for InfrastructureMutator {
    fn mutate(&self, new: &mut Infrastructure, old: Option<&Infrastructure>) -> Result<()> {
        // Objects on their way out are left alone
        if new.is_deleting() {
            debug!(
                infrastructure = ?new.metadata.name,
                "Infrastructure is being deleted, skipping mutation"
            );
            return Ok(());
        }

        for mutate in &self.mutate_fns {
            mutate(new, old)?;
        }
        Ok(())
    }
}
