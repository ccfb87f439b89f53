use crate::{
    errors::DependencyError,
    resolver::{ResolveLifecycleStrategy, StrategyContext},
    types::Instance,
};

/// Constructs once, then stores the instance on the registration
///
/// Later resolves find the stored instance before they reach any strategy, so the
/// constructor or builder runs exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveSingletonLifecycleStrategy;

impl ResolveLifecycleStrategy for ResolveSingletonLifecycleStrategy {
    fn execute(&self, context: StrategyContext<'_>) -> Result<Instance, DependencyError> {
        let registry = context.dependency_registry;

        if let Some(instance) = registry.resolved_instance() {
            return Ok(instance.clone());
        }

        let instance = registry.construct(context.resolved_class_constructor_dependencies)?;
        tracing::debug!(
            "Constructed singleton {} ({})",
            registry.dependency_id(),
            instance.info
        );

        Ok(registry.memoize(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lifecycle::Lifecycle,
        registry::{DependencyRegistry, ImplementationDetails},
    };

    #[test]
    fn stores_the_constructed_instance() {
        let registry = DependencyRegistry::new(
            "s".into(),
            Lifecycle::SINGLETON,
            ImplementationDetails::builder(|| Ok(Instance::new(3_i32))),
        );

        let instance = ResolveSingletonLifecycleStrategy
            .execute(StrategyContext {
                dependency_registry: &registry,
                resolved_class_constructor_dependencies: &[],
            })
            .unwrap();

        assert!(registry.resolved_instance().unwrap().ptr_eq(&instance));
    }

    #[test]
    fn failed_construction_stores_nothing() {
        let registry = DependencyRegistry::new(
            "s".into(),
            Lifecycle::SINGLETON,
            ImplementationDetails::builder(|| Err("no connection".into())),
        );

        let error = ResolveSingletonLifecycleStrategy
            .execute(StrategyContext {
                dependency_registry: &registry,
                resolved_class_constructor_dependencies: &[],
            })
            .unwrap_err();

        assert!(matches!(error, DependencyError::ConstructionFailed { .. }));
        assert!(registry.resolved_instance().is_none());
    }
}
