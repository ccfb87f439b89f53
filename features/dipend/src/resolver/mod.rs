use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::DependencyError,
    lifecycle::Lifecycle,
    registry::{DependencyId, DependencyRegistry},
    store::DependencyStore,
    types::Instance,
};

pub mod singleton;
pub mod transient;

pub use singleton::ResolveSingletonLifecycleStrategy;
pub use transient::ResolveTransientLifecycleStrategy;

/// Everything a lifecycle strategy gets to produce an instance
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub dependency_registry: &'a DependencyRegistry,
    /// Resolved constructor dependencies, in constructor order
    pub resolved_class_constructor_dependencies: &'a [Instance],
}

/// Decides whether an instance is reused or freshly constructed
///
/// Is implemented for any `Fn(StrategyContext) -> Result<Instance, DependencyError>`.
pub trait ResolveLifecycleStrategy: Send + Sync {
    fn execute(&self, context: StrategyContext<'_>) -> Result<Instance, DependencyError>;
}
impl<Fun> ResolveLifecycleStrategy for Fun
where
    Fun: Fn(StrategyContext<'_>) -> Result<Instance, DependencyError> + Send + Sync,
{
    fn execute(&self, context: StrategyContext<'_>) -> Result<Instance, DependencyError> {
        self(context)
    }
}

/// Produces instances by walking the constructor dependencies of a registration
#[derive(Default, Clone)]
pub struct DependencyResolver {
    strategies: HashMap<Lifecycle, Arc<dyn ResolveLifecycleStrategy>>,
}
impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("lifecycles", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DependencyResolver {
    /// A resolver without any strategy, see [`DependencyResolver::set_default_resolve_lifecycle_strategies`]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default_resolve_lifecycle_strategies(&mut self) {
        self.add_resolve_lifecycle_strategy(Lifecycle::SINGLETON, ResolveSingletonLifecycleStrategy);
        self.add_resolve_lifecycle_strategy(Lifecycle::TRANSIENT, ResolveTransientLifecycleStrategy);
    }

    /// Registers the strategy for a lifecycle, replacing any previous one
    pub fn add_resolve_lifecycle_strategy(
        &mut self,
        lifecycle: impl Into<Lifecycle>,
        strategy: impl ResolveLifecycleStrategy + 'static,
    ) {
        self.insert_resolve_lifecycle_strategy(lifecycle.into(), Arc::new(strategy));
    }

    pub(crate) fn insert_resolve_lifecycle_strategy(
        &mut self,
        lifecycle: Lifecycle,
        strategy: Arc<dyn ResolveLifecycleStrategy>,
    ) {
        if self.strategies.insert(lifecycle.clone(), strategy).is_some() {
            tracing::debug!("Replaced resolve strategy for lifecycle {lifecycle}");
        }
    }

    pub fn has_resolve_lifecycle_strategy(&self, lifecycle: &Lifecycle) -> bool {
        self.strategies.contains_key(lifecycle)
    }

    /// Resolves the dependency and, recursively, all of its constructor dependencies
    ///
    /// A pre-supplied or memoized instance is returned as is, without touching its dependencies.
    /// There is no depth guard: run [`DependencyStore::get_sorted_dependencies_ids`] first if the
    /// registrations may contain a cycle.
    pub fn resolve(
        &self,
        store: &DependencyStore,
        dependency_id: &DependencyId,
    ) -> Result<Instance, DependencyError> {
        let dependency_registry = store.get_dependency(dependency_id)?;

        if let Some(instance) = dependency_registry.resolved_instance() {
            tracing::trace!("Reusing instance of {dependency_id}");
            return Ok(instance.clone());
        }

        let resolved_class_constructor_dependencies = dependency_registry
            .implementation_details()
            .class_constructor_dependencies_ids()
            .iter()
            .map(|constructor_dependency_id| self.resolve(store, constructor_dependency_id))
            .collect::<Result<Vec<_>, _>>()?;

        self.use_lifecycle_strategy(dependency_registry, &resolved_class_constructor_dependencies)
    }

    fn use_lifecycle_strategy(
        &self,
        dependency_registry: &DependencyRegistry,
        resolved_class_constructor_dependencies: &[Instance],
    ) -> Result<Instance, DependencyError> {
        let lifecycle = dependency_registry.lifecycle();

        let Some(strategy) = self.strategies.get(lifecycle) else {
            return Err(DependencyError::InvalidLifecycle {
                dependency_ids: vec![dependency_registry.dependency_id().clone()],
                lifecycle: lifecycle.clone(),
            });
        };

        tracing::trace!(
            "Constructing {} with lifecycle {lifecycle}",
            dependency_registry.dependency_id()
        );

        strategy.execute(StrategyContext {
            dependency_registry,
            resolved_class_constructor_dependencies,
        })
    }
}
