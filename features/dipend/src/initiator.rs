use crate::{
    errors::DependencyError,
    lifecycle::Lifecycle,
    registry::DependencyId,
    resolver::DependencyResolver,
    store::DependencyStore,
};

/// Runs the commands that work on all registrations at once
///
/// Only needs shared access to the store, constructors may resolve other dependencies
/// of the same store while a build is running.
pub struct DiInitiator<'a> {
    store: &'a DependencyStore,
    resolver: &'a DependencyResolver,
}

impl<'a> DiInitiator<'a> {
    pub fn new(store: &'a DependencyStore, resolver: &'a DependencyResolver) -> Self {
        DiInitiator { store, resolver }
    }

    /// Build order of the store, fails with [`DependencyError::CyclicDependencies`] on a cycle
    pub fn check_for_cyclic_dependencies(
        store: &mut DependencyStore,
    ) -> Result<Vec<DependencyId>, DependencyError> {
        store.get_sorted_dependencies_ids().map(<[_]>::to_vec)
    }

    /// Resolves every singleton in `sorted_dependencies_ids`, returns how many there are
    ///
    /// Expects the order from [`DiInitiator::check_for_cyclic_dependencies`]. Stops at the first
    /// error, singletons built before the error stay memoized.
    pub fn build_singletons(
        &self,
        sorted_dependencies_ids: &[DependencyId],
    ) -> Result<usize, DependencyError> {
        tracing::debug!(
            "Building singletons of {} dependencies",
            sorted_dependencies_ids.len()
        );

        let mut built = 0;
        for dependency_id in sorted_dependencies_ids {
            let dependency_registry = self.store.get_dependency(dependency_id)?;
            if dependency_registry.lifecycle() != &Lifecycle::SINGLETON {
                continue;
            }

            self.resolver.resolve(self.store, dependency_id)?;
            built += 1;
        }

        tracing::debug!("Built {built} singletons");
        Ok(built)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        registry::{DependencyRegistry, ImplementationDetails},
        types::Instance,
    };

    fn default_resolver() -> DependencyResolver {
        let mut resolver = DependencyResolver::new();
        resolver.set_default_resolve_lifecycle_strategies();
        resolver
    }

    fn counted(
        store: &mut DependencyStore,
        id: &str,
        lifecycle: Lifecycle,
        dependencies: &[&str],
    ) -> Arc<AtomicUsize> {
        let counter = Arc::new(AtomicUsize::new(0));
        let constructed = counter.clone();

        store.add_dependency(DependencyRegistry::new(
            id.into(),
            lifecycle,
            ImplementationDetails::class(
                dependencies.iter().map(|dep| DependencyId::from(*dep)).collect(),
                move |_| {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    Ok(Instance::new(()))
                },
            ),
        ));

        counter
    }

    #[test]
    fn builds_only_singletons() {
        let mut store = DependencyStore::new();
        let logger = counted(&mut store, "logger", Lifecycle::SINGLETON, &[]);
        let request = counted(&mut store, "request", Lifecycle::TRANSIENT, &["logger"]);
        let service = counted(&mut store, "service", Lifecycle::SINGLETON, &["logger"]);
        let resolver = default_resolver();

        let sorted = DiInitiator::check_for_cyclic_dependencies(&mut store).unwrap();
        let built = DiInitiator::new(&store, &resolver)
            .build_singletons(&sorted)
            .unwrap();

        assert_eq!(built, 2);
        assert_eq!(logger.load(Ordering::SeqCst), 1);
        assert_eq!(service.load(Ordering::SeqCst), 1);
        assert_eq!(request.load(Ordering::SeqCst), 0);
        assert!(store.get_dependency(&"service".into()).unwrap().resolved_instance().is_some());
    }

    #[test]
    fn building_twice_constructs_nothing_new() {
        let mut store = DependencyStore::new();
        let logger = counted(&mut store, "logger", Lifecycle::SINGLETON, &[]);
        let resolver = default_resolver();

        let sorted = DiInitiator::check_for_cyclic_dependencies(&mut store).unwrap();
        DiInitiator::new(&store, &resolver).build_singletons(&sorted).unwrap();
        DiInitiator::new(&store, &resolver).build_singletons(&sorted).unwrap();

        assert_eq!(logger.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cycles_stop_the_build() {
        let mut store = DependencyStore::new();
        let a = counted(&mut store, "a", Lifecycle::SINGLETON, &["b"]);
        counted(&mut store, "b", Lifecycle::SINGLETON, &["a"]);

        assert!(matches!(
            DiInitiator::check_for_cyclic_dependencies(&mut store),
            Err(DependencyError::CyclicDependencies { .. })
        ));
        assert_eq!(a.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregistered_dependency_fails_the_build() {
        let mut store = DependencyStore::new();
        counted(&mut store, "repo", Lifecycle::SINGLETON, &["db"]);
        let resolver = default_resolver();

        let sorted = DiInitiator::check_for_cyclic_dependencies(&mut store).unwrap();
        let error = DiInitiator::new(&store, &resolver)
            .build_singletons(&sorted)
            .unwrap_err();

        assert!(matches!(error, DependencyError::MissingDependency { .. }));
        assert_eq!(error.dependency_ids(), &[DependencyId::from("db")]);
    }
}
