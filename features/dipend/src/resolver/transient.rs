use crate::{
    errors::DependencyError,
    resolver::{ResolveLifecycleStrategy, StrategyContext},
    types::Instance,
};

/// Constructs a new instance on every resolve and never stores it
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveTransientLifecycleStrategy;

impl ResolveLifecycleStrategy for ResolveTransientLifecycleStrategy {
    fn execute(&self, context: StrategyContext<'_>) -> Result<Instance, DependencyError> {
        context
            .dependency_registry
            .construct(context.resolved_class_constructor_dependencies)
    }
}
