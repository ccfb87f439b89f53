use std::sync::Arc;

use crate::{
    config::ContainerConfig,
    container::{ContainerHandle, DiContainer},
    lifecycle::Lifecycle,
    resolver::{DependencyResolver, ResolveLifecycleStrategy},
    token::Token,
};

/// Configures a [`DiContainer`] before it is created
///
/// Strategies added here win over the default ones for the same lifecycle.
///
/// # Example
/// ```rust
/// use dipend::{DiBuilder, ResolveSingletonLifecycleStrategy};
///
/// let container = DiBuilder::new()
///     .build_singletons_required(true)
///     .add_resolve_lifecycle_strategy("SCOPED", ResolveSingletonLifecycleStrategy)
///     .build();
/// assert!(!container.is_built());
/// ```
#[derive(Default)]
pub struct DiBuilder {
    config: ContainerConfig,
    strategies: Vec<(Lifecycle, Arc<dyn ResolveLifecycleStrategy>)>,
    container_token: Option<Token>,
}

impl std::fmt::Debug for DiBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiBuilder")
            .field("config", &self.config)
            .field(
                "strategies",
                &self.strategies.iter().map(|(lifecycle, _)| lifecycle).collect::<Vec<_>>(),
            )
            .field("container_token", &self.container_token)
            .finish()
    }
}

impl DiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once, e.g. with a deserialized config
    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn disable_default_resolve_lifecycle_strategies(mut self) -> Self {
        self.config.disable_default_resolve_lifecycle_strategies = true;
        self
    }

    pub fn build_singletons_required(mut self, required: bool) -> Self {
        self.config.build_singletons_required = required;
        self
    }

    pub fn add_resolve_lifecycle_strategy(
        mut self,
        lifecycle: impl Into<Lifecycle>,
        strategy: impl ResolveLifecycleStrategy + 'static,
    ) -> Self {
        self.strategies.push((lifecycle.into(), Arc::new(strategy)));
        self
    }

    /// Registers a [`ContainerHandle`] singleton under `token`
    pub fn container_token(mut self, token: Token) -> Self {
        self.container_token = Some(token);
        self
    }

    /// Registers a [`ContainerHandle`] singleton under its own type token
    pub fn with_container_handle(self) -> Self {
        self.container_token(Token::of::<ContainerHandle>())
    }

    pub fn build(self) -> DiContainer {
        let DiBuilder {
            config,
            strategies,
            container_token,
        } = self;

        let mut resolver = DependencyResolver::new();
        if !config.disable_default_resolve_lifecycle_strategies {
            resolver.set_default_resolve_lifecycle_strategies();
        }
        for (lifecycle, strategy) in strategies {
            resolver.insert_resolve_lifecycle_strategy(lifecycle, strategy);
        }

        tracing::debug!("Creating container with {config:?}");
        DiContainer::from_parts(config, resolver, container_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::DependencyError,
        resolver::{ResolveTransientLifecycleStrategy, StrategyContext},
        types::Instance,
    };

    #[test]
    fn defaults_can_be_disabled() {
        let container = DiBuilder::new()
            .disable_default_resolve_lifecycle_strategies()
            .build();

        assert!(!container.has_resolve_lifecycle_strategy(&Lifecycle::SINGLETON));
        assert!(!container.has_resolve_lifecycle_strategy(&Lifecycle::TRANSIENT));
    }

    #[test]
    fn custom_strategies_override_defaults() {
        let container = DiBuilder::new()
            .add_resolve_lifecycle_strategy(Lifecycle::SINGLETON, ResolveTransientLifecycleStrategy)
            .add_resolve_lifecycle_strategy(
                "NEVER",
                |_: StrategyContext<'_>| -> Result<Instance, DependencyError> {
                    Err(DependencyError::MissingImplementation {
                        dependency_ids: vec![],
                    })
                },
            )
            .build();

        assert!(container.has_resolve_lifecycle_strategy(&Lifecycle::SINGLETON));
        assert!(container.has_resolve_lifecycle_strategy(&Lifecycle::TRANSIENT));
        assert!(container.has_resolve_lifecycle_strategy(&Lifecycle::new("NEVER")));
    }

    #[test]
    fn config_replaces_options() {
        let config = ContainerConfig {
            disable_default_resolve_lifecycle_strategies: false,
            build_singletons_required: true,
        };

        let builder = DiBuilder::new()
            .disable_default_resolve_lifecycle_strategies()
            .config(config.clone());

        assert_eq!(builder.config, config);
        assert_eq!(builder.build().config(), &config);
    }

    #[test]
    fn container_handle_is_opt_in() {
        assert!(DiBuilder::new().build().is_empty());

        let container = DiBuilder::new()
            .container_token(Token::named("container"))
            .build();
        let handle = container
            .get_by_token::<ContainerHandle>(Token::named("container"), None)
            .unwrap();

        let upgraded = handle.upgrade().unwrap();
        assert_eq!(upgraded.len(), 1);
        assert!(upgraded.get::<ContainerHandle>().is_err());
    }
}
