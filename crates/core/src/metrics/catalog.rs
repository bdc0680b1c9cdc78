//! Registry-wide descriptor bookkeeping
//!
//! A `prometheus::Registry` accepts a collector only when none of its
//! descriptors repeats a known fully-qualified name with the same constant
//! label values, and no name comes back with different label names or help.
//! The exporter registers as one collector, so the catalog applies the same
//! rules query by query while jobs are built: a clashing query is refused on
//! its own and everything admitted stays registrable together.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use prometheus::core::Desc;
use prometheus::Registry;
use sqlpulse_domain::{Result, SqlPulseError};

use super::{DurationSummary, QueryDescriptors};

#[derive(Debug, Default)]
struct Admitted {
    ids: HashSet<u64>,
    dim_hashes: HashMap<String, u64>,
}

impl Admitted {
    /// Check `descs` against what is admitted and against each other.
    fn check(&self, descs: &[&Desc]) -> Result<()> {
        let mut batch_ids = HashSet::new();
        let mut batch_dims: HashMap<&str, u64> = HashMap::new();
        for desc in descs {
            if self.ids.contains(&desc.id) || !batch_ids.insert(desc.id) {
                return Err(clash(desc, "already exported with the same constant labels"));
            }
            let known = self
                .dim_hashes
                .get(&desc.fq_name)
                .or_else(|| batch_dims.get(desc.fq_name.as_str()))
                .copied();
            if known.is_some_and(|hash| hash != desc.dim_hash) {
                return Err(clash(desc, "already exported with different label names or help"));
            }
            batch_dims.insert(&desc.fq_name, desc.dim_hash);
        }
        Ok(())
    }

    fn accept(&mut self, descs: &[&Desc]) {
        for desc in descs {
            self.ids.insert(desc.id);
            self.dim_hashes.insert(desc.fq_name.clone(), desc.dim_hash);
        }
    }
}

fn clash(desc: &Desc, reason: &str) -> SqlPulseError {
    SqlPulseError::DescriptorRegistration(format!("{}: {reason}", desc.fq_name))
}

/// Descriptors admitted into one registry.
#[derive(Debug)]
pub struct DescriptorCatalog {
    registry: Registry,
    admitted: Mutex<Admitted>,
}

impl DescriptorCatalog {
    pub fn new(registry: Registry) -> Self {
        Self { registry, admitted: Mutex::new(Admitted::default()) }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record descriptors registered outside the catalog, such as build info.
    ///
    /// # Errors
    /// `DescriptorRegistration` when they clash with admitted descriptors.
    pub fn reserve(&self, descs: &[&Desc]) -> Result<()> {
        let mut admitted = self.admitted.lock();
        admitted.check(descs)?;
        admitted.accept(descs);
        Ok(())
    }

    /// Admit a query's value, error and duration descriptors, registering the
    /// duration summary.
    ///
    /// Nothing is admitted or registered when any of the three clashes.
    ///
    /// # Errors
    /// `DescriptorRegistration` naming the clashing metric.
    pub fn admit_query(
        &self,
        descriptors: &QueryDescriptors,
        durations: &DurationSummary,
    ) -> Result<()> {
        let descs = [&descriptors.value, &descriptors.errors, durations.descriptor()];
        let mut admitted = self.admitted.lock();
        admitted.check(&descs)?;
        self.registry.register(Box::new(durations.clone())).map_err(|err| {
            SqlPulseError::DescriptorRegistration(format!("{}: {err}", descriptors.query))
        })?;
        admitted.accept(&descs);
        Ok(())
    }
}
