//! Resolution of the active converter set.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::catalog::{self, ConverterDescriptor};
use super::error::DiscoveryError;
use super::registry::ConverterRegistry;
use crate::converter::{ConverterContext, ExternalConverter};
use crate::metrics::DISCOVERED_CONVERTERS;
use crate::process::TracingSink;

/// Descriptors selected by [`Discovery::resolve`].
///
/// A set: members appear once, in catalog order, and equality ignores order.
#[derive(Debug, Clone)]
pub struct ActiveSet<'a> {
    members: Vec<&'a ConverterDescriptor>,
}

impl<'a> ActiveSet<'a> {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|d| d.name == name)
    }

    pub fn names(&self) -> BTreeSet<&'static str> {
        self.members.iter().map(|d| d.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ConverterDescriptor> + '_ {
        self.members.iter().copied()
    }
}

impl PartialEq for ActiveSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.names() == other.names()
    }
}

impl Eq for ActiveSet<'_> {}

/// Discovery engine over a descriptor catalog.
///
/// Holds no mutable state: resolving is repeatable and safe to run
/// concurrently.
#[derive(Debug, Clone, Copy)]
pub struct Discovery<'a> {
    catalog: &'a [ConverterDescriptor],
}

impl Discovery<'static> {
    /// Discovery over the converters compiled into this build.
    pub fn builtin() -> Self {
        Self::new(catalog::builtin())
    }
}

impl<'a> Discovery<'a> {
    pub fn new(catalog: &'a [ConverterDescriptor]) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a [ConverterDescriptor] {
        self.catalog
    }

    /// Selects the active descriptors.
    ///
    /// An override decides membership verbatim and skips the probe. Without
    /// one, the descriptor's probe runs against `work_dir`. Override keys
    /// naming no catalog entry are ignored.
    pub fn resolve(&self, overrides: &HashMap<String, bool>, work_dir: &Path) -> ActiveSet<'a> {
        let mut members: Vec<&'a ConverterDescriptor> = Vec::new();

        for descriptor in self.catalog {
            if members.iter().any(|m| m.name == descriptor.name) {
                continue;
            }
            let included = match overrides.get(descriptor.name) {
                Some(&forced) => {
                    debug!(converter = descriptor.name, included = forced, "Converter overridden");
                    forced
                }
                None => {
                    let available = (descriptor.probe)(work_dir);
                    debug!(converter = descriptor.name, available, "Converter probed");
                    available
                }
            };
            if included {
                members.push(descriptor);
            }
        }

        for name in overrides.keys() {
            if !self.catalog.iter().any(|d| d.name == name.as_str()) {
                warn!(converter = %name, "Override names an unknown converter, ignoring");
            }
        }

        ActiveSet { members }
    }

    /// Rejects an empty active set.
    pub fn validate(active: ActiveSet<'a>) -> Result<ActiveSet<'a>, DiscoveryError> {
        if active.is_empty() {
            return Err(DiscoveryError::no_converters());
        }
        Ok(active)
    }

    /// Builds one converter from its descriptor.
    pub fn instantiate(
        descriptor: &ConverterDescriptor,
        context: ConverterContext,
    ) -> Result<Arc<dyn ExternalConverter>, DiscoveryError> {
        (descriptor.factory)(context).map_err(|source| DiscoveryError::Linkage {
            name: descriptor.name.to_string(),
            source,
        })
    }

    /// Resolves, validates and instantiates every active converter.
    ///
    /// Fails as a whole: no registry is returned if any step fails.
    pub fn load(
        &self,
        overrides: &HashMap<String, bool>,
        work_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<ConverterRegistry, DiscoveryError> {
        let work_dir = work_dir.into();
        let active = Self::validate(self.resolve(overrides, &work_dir))?;

        let converters = active
            .iter()
            .map(|descriptor| {
                let context = ConverterContext::new(
                    &work_dir,
                    timeout,
                    Arc::new(TracingSink::new(descriptor.name)),
                );
                Self::instantiate(descriptor, context)
            })
            .collect::<Result<Vec<_>, _>>()?;

        DISCOVERED_CONVERTERS.set(converters.len() as i64);
        info!(
            converters = ?active.names(),
            work_dir = %work_dir.display(),
            timeout_ms = timeout.as_millis() as u64,
            "External converters loaded"
        );

        Ok(ConverterRegistry::new(converters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::TEST_CATALOG;
    use crate::testing::RecordingSink;

    fn overrides(entries: &[(&str, bool)]) -> HashMap<String, bool> {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn test_resolve_uses_probes_without_overrides() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let active = discovery.resolve(&HashMap::new(), Path::new("."));
        assert_eq!(active.names(), BTreeSet::from(["alpha"]));
    }

    #[test]
    fn test_override_beats_probe() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let active = discovery.resolve(
            &overrides(&[("alpha", false), ("beta", true)]),
            Path::new("."),
        );
        assert!(!active.contains("alpha"));
        assert!(active.contains("beta"));
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_unknown_override_ignored() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let active = discovery.resolve(&overrides(&[("msword", true)]), Path::new("."));
        assert_eq!(active.names(), BTreeSet::from(["alpha"]));
    }

    #[test]
    fn test_all_excluded_is_configuration_error() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let active = discovery.resolve(
            &overrides(&[("alpha", false), ("beta", false), ("broken", false)]),
            Path::new("."),
        );
        assert!(matches!(
            Discovery::validate(active),
            Err(DiscoveryError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_passes_non_empty_set_through() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let active = discovery.resolve(&HashMap::new(), Path::new("."));
        let validated = Discovery::validate(active.clone()).unwrap();
        assert_eq!(validated, active);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let config = overrides(&[("beta", true)]);
        let first = discovery.resolve(&config, Path::new("."));
        let second = discovery.resolve(&config, Path::new("."));
        assert_eq!(first, second);
    }

    #[test]
    fn test_instantiate_failure_is_linkage_error() {
        let descriptor = &TEST_CATALOG[2];
        let context = ConverterContext::new(
            ".",
            Duration::from_secs(1),
            Arc::new(RecordingSink::new()),
        );
        let err = Discovery::instantiate(descriptor, context).err().unwrap();
        match err {
            DiscoveryError::Linkage { name, .. } => assert_eq!(name, "broken"),
            other => panic!("expected linkage error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_aborts_on_broken_factory() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let result = discovery.load(
            &overrides(&[("broken", true)]),
            ".",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(DiscoveryError::Linkage { .. })));
    }

    #[test]
    fn test_load_builds_registry() {
        let discovery = Discovery::new(&TEST_CATALOG);
        let registry = discovery
            .load(&overrides(&[("beta", true)]), ".", Duration::from_secs(1))
            .unwrap();
        assert_eq!(registry.names(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_builtin_all_excluded() {
        let all_off: HashMap<String, bool> = catalog::builtin()
            .iter()
            .map(|d| (d.name.to_string(), false))
            .collect();
        let result = Discovery::builtin().load(&all_off, ".", Duration::from_secs(1));
        assert!(matches!(result, Err(DiscoveryError::Configuration(_))));
    }
}
