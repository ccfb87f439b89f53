use std::{
    any::type_name,
    cell::{RefCell, RefMut},
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use parking_lot::{Mutex, ReentrantMutex};

use crate::{
    builder::DiBuilder,
    config::ContainerConfig,
    errors::{DependencyError, RequireError},
    initiator::DiInitiator,
    introspection::GraphData,
    lifecycle::Lifecycle,
    registration::{Class, Implementation, Registration},
    registry::{DependencyRegistry, ImplementationDetails},
    resolver::DependencyResolver,
    store::DependencyStore,
    token::{Token, TokenStore},
    types::{Injectable, Instance},
};

/// Container holding all registrations and the instances built from them
///
/// Cloning is cheap, all clones share the same registrations.
///
/// Constructors and builders may call back into the container they are resolved from.
/// Nested retrieval resolves against the registrations of the outer call, nested
/// registrations are applied once the outer call returns, and nested commands fail
/// with [`RequireError::Busy`].
#[derive(Clone)]
pub struct DiContainer(Arc<DiContainerInner>);

struct DiContainerInner {
    config: ContainerConfig,
    /// A [`ContainerHandle`] is registered under this token, again after every reset
    container_token: Option<Token>,
    /// Held for the whole call, re-entered by constructors resolving from the same thread
    state: ReentrantMutex<RefCell<ContainerState>>,
    /// Never held while user code runs
    token_store: Mutex<TokenStore>,
    /// Registrations issued from inside a constructor or builder
    deferred_registrations: Mutex<Vec<DependencyRegistry>>,
    is_built: AtomicBool,
}

struct ContainerState {
    dependency_store: DependencyStore,
    dependency_resolver: DependencyResolver,
}

/// Weak reference to a container, for dependencies that resolve lazily
///
/// Registered by containers built with [`DiBuilder::container_token`]. It does not keep
/// the container alive.
///
/// # Example
/// ```rust
/// use dipend::{ContainerHandle, DiBuilder};
///
/// let container = DiBuilder::new().with_container_handle().build();
/// let handle = container.get::<ContainerHandle>().unwrap();
/// assert!(handle.upgrade().is_some());
/// ```
#[derive(Clone)]
pub struct ContainerHandle(Weak<DiContainerInner>);

impl ContainerHandle {
    /// The container, unless every clone of it was dropped
    pub fn upgrade(&self) -> Option<DiContainer> {
        self.0.upgrade().map(DiContainer)
    }
}

impl Debug for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.0.strong_count() > 0 { "alive" } else { "dropped" };
        write!(f, "ContainerHandle({state})")
    }
}

impl Debug for DiContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.0.state.lock();
        let Ok(state) = guard.try_borrow() else {
            return f.write_str("DiContainer { .. }");
        };
        let token_store = self.0.token_store.lock();

        let mut map = f.debug_struct("DiContainer");
        for registry in state.dependency_store.dependencies() {
            let name = token_store.describe_dependency(registry.dependency_id());
            let val = if registry.resolved_instance().is_some() {
                "resolved"
            } else {
                "pending"
            };
            map.field(&name, &format_args!("{} ({val})", registry.lifecycle()));
        }
        map.finish()
    }
}

impl Default for DiContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl DiContainer {
    /// Container with the default config and strategies
    pub fn new() -> Self {
        DiBuilder::new().build()
    }

    pub fn builder() -> DiBuilder {
        DiBuilder::new()
    }

    pub(crate) fn from_parts(
        config: ContainerConfig,
        dependency_resolver: DependencyResolver,
        container_token: Option<Token>,
    ) -> Self {
        let container = Self(Arc::new(DiContainerInner {
            config,
            container_token,
            state: ReentrantMutex::new(RefCell::new(ContainerState {
                dependency_store: DependencyStore::new(),
                dependency_resolver,
            })),
            token_store: Mutex::new(TokenStore::new()),
            deferred_registrations: Mutex::new(Vec::new()),
            is_built: AtomicBool::new(false),
        }));

        container.register_container_handle();
        container
    }

    fn register_container_handle(&self) {
        if let Some(token) = &self.0.container_token {
            let handle = ContainerHandle(Arc::downgrade(&self.0));
            self.register(Registration::instance(handle).token(token.clone()));
        }
    }

    /// Mutable state for the outermost call on this thread, deferred registrations applied
    ///
    /// `None` while a constructor or builder of this container is running.
    fn exclusive<'g>(&self, state: &'g RefCell<ContainerState>) -> Option<RefMut<'g, ContainerState>> {
        let mut state = state.try_borrow_mut().ok()?;

        let deferred = std::mem::take(&mut *self.0.deferred_registrations.lock());
        if !deferred.is_empty() {
            tracing::debug!("Applying {} deferred registrations", deferred.len());
        }
        for registry in deferred {
            state.dependency_store.add_dependency(registry);
        }

        Some(state)
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.0.config
    }

    /// True once `build_singletons` succeeded, until the next `reset`
    pub fn is_built(&self) -> bool {
        self.0.is_built.load(Ordering::Acquire)
    }

    pub fn has_resolve_lifecycle_strategy(&self, lifecycle: &Lifecycle) -> bool {
        let guard = self.0.state.lock();
        let has_strategy = guard.try_borrow().is_ok_and(|state| {
            state
                .dependency_resolver
                .has_resolve_lifecycle_strategy(lifecycle)
        });
        has_strategy
    }

    /// Number of registrations
    ///
    /// Registrations deferred by a running constructor are not counted yet.
    pub fn len(&self) -> usize {
        let guard = self.0.state.lock();
        let len = match self.exclusive(&guard) {
            Some(state) => state.dependency_store.len(),
            None => guard
                .try_borrow()
                .map_or(0, |state| state.dependency_store.len()),
        };
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Registration
impl DiContainer {
    /// Adds a dependency, replacing any registration with the same token and qualifier
    ///
    /// Cycles are not checked here, see [`DiContainer::check_for_cyclic_dependencies`].
    /// Called from inside a constructor or builder, the registration is applied once the
    /// outermost call on the container returns.
    pub fn register(&self, registration: Registration) -> &Self {
        let Registration {
            lifecycle,
            token,
            qualifier,
            implementation,
        } = registration;

        let (dependency_id, implementation_details) = {
            let mut token_store = self.0.token_store.lock();

            let dependency_id = token_store.dependency_id(token, qualifier);
            let implementation_details = match implementation {
                Implementation::Class {
                    injections,
                    constructor,
                } => {
                    let dependencies_ids = injections
                        .into_iter()
                        .map(|injection| {
                            token_store.dependency_id(injection.token, injection.qualifier)
                        })
                        .collect();
                    ImplementationDetails::class(
                        dependencies_ids,
                        move |dependencies: &[Instance]| constructor(dependencies),
                    )
                }
                Implementation::Builder(builder) => {
                    ImplementationDetails::builder(move || builder())
                }
                Implementation::Instance(instance) => ImplementationDetails::instance(instance),
            };

            tracing::debug!(
                "Registering {} as {lifecycle}",
                token_store.describe_dependency(&dependency_id)
            );
            (dependency_id, implementation_details)
        };

        let registry = DependencyRegistry::new(dependency_id, lifecycle, implementation_details);

        let guard = self.0.state.lock();
        match self.exclusive(&guard) {
            Some(mut state) => state.dependency_store.add_dependency(registry),
            None => {
                tracing::debug!(
                    "Deferring registration of {} until the running resolve returns",
                    registry.dependency_id()
                );
                self.0.deferred_registrations.lock().push(registry);
            }
        }

        self
    }

    pub fn add_singleton<T: Injectable>(&self, class: Class<T>) -> &Self {
        self.register(Registration::class(Lifecycle::SINGLETON, class))
    }

    pub fn add_mapped_singleton<T: Injectable>(&self, qualifier: Token, class: Class<T>) -> &Self {
        self.register(Registration::class(Lifecycle::SINGLETON, class).qualifier(qualifier))
    }

    pub fn add_transient<T: Injectable>(&self, class: Class<T>) -> &Self {
        self.register(Registration::class(Lifecycle::TRANSIENT, class))
    }

    pub fn add_mapped_transient<T: Injectable>(&self, qualifier: Token, class: Class<T>) -> &Self {
        self.register(Registration::class(Lifecycle::TRANSIENT, class).qualifier(qualifier))
    }

    pub fn add_singleton_builder<T, F>(&self, builder: F) -> &Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(Registration::builder(Lifecycle::SINGLETON, move || {
            Ok(builder())
        }))
    }

    pub fn add_mapped_singleton_builder<T, F>(&self, qualifier: Token, builder: F) -> &Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(
            Registration::builder(Lifecycle::SINGLETON, move || Ok(builder())).qualifier(qualifier),
        )
    }

    pub fn add_transient_builder<T, F>(&self, builder: F) -> &Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(Registration::builder(Lifecycle::TRANSIENT, move || {
            Ok(builder())
        }))
    }

    pub fn add_mapped_transient_builder<T, F>(&self, qualifier: Token, builder: F) -> &Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register(
            Registration::builder(Lifecycle::TRANSIENT, move || Ok(builder())).qualifier(qualifier),
        )
    }

    /// Registers an already built value, it is handed out as is
    pub fn add_singleton_instance<T: Injectable>(&self, instance: T) -> &Self {
        self.register(Registration::instance(instance))
    }

    pub fn add_mapped_singleton_instance<T: Injectable>(&self, qualifier: Token, instance: T) -> &Self {
        self.register(Registration::instance(instance).qualifier(qualifier))
    }
}

// Retrieval
impl DiContainer {
    /// Attempts to get the dependency registered for the type `T`
    pub fn get<T: Injectable>(&self) -> Result<Arc<T>, RequireError> {
        self.get_by_token(Token::of::<T>(), None)
    }

    /// Attempts to get the dependency registered for `T` under `qualifier`
    pub fn get_mapped<T: Injectable>(&self, qualifier: Token) -> Result<Arc<T>, RequireError> {
        self.get_by_token(Token::of::<T>(), Some(qualifier))
    }

    /// Resolves any token and downcasts the instance to `T`
    pub fn get_by_token<T: Injectable>(
        &self,
        token: Token,
        qualifier: Option<Token>,
    ) -> Result<Arc<T>, RequireError> {
        self.resolve_instance(token, qualifier)?
            .downcast()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Resolves a token without downcasting
    ///
    /// Fails with [`RequireError::NotBuilt`] if the config requires `build_singletons` first.
    /// Fails if the registrations contain a cycle, even an unrelated one.
    pub fn resolve_instance(
        &self,
        token: Token,
        qualifier: Option<Token>,
    ) -> Result<Instance, RequireError> {
        let guard = self.0.state.lock();
        let dependency_id = self.0.token_store.lock().dependency_id(token, qualifier);

        // Nested calls run inside a resolve that already passed both checks
        if let Some(mut state) = self.exclusive(&guard) {
            if self.0.config.build_singletons_required && !self.is_built() {
                tracing::error!(
                    "Tried to resolve {} before building singletons",
                    self.0.token_store.lock().describe_dependency(&dependency_id)
                );
                return Err(RequireError::NotBuilt);
            }

            // Resolution recurses without a depth guard, an acyclic graph keeps it finite
            if let Err(error) = state.dependency_store.get_sorted_dependencies_ids() {
                return Err(self.describe(error));
            }
        }

        let state = guard
            .try_borrow()
            .map_err(|_| RequireError::Busy { command: "resolve" })?;

        state
            .dependency_resolver
            .resolve(&state.dependency_store, &dependency_id)
            .map_err(|error| self.describe(error))
    }

    fn describe(&self, error: DependencyError) -> RequireError {
        describe(&self.0.token_store.lock(), error)
    }
}

// Commands
impl DiContainer {
    /// Constructs every singleton in build order
    ///
    /// Constructors may retrieve other dependencies from this container while the build runs.
    pub fn build_singletons(&self) -> Result<&Self, RequireError> {
        let guard = self.0.state.lock();

        let sorted = {
            let Some(mut state) = self.exclusive(&guard) else {
                return Err(RequireError::Busy {
                    command: "build_singletons",
                });
            };
            DiInitiator::check_for_cyclic_dependencies(&mut state.dependency_store)
        }
        .map_err(|error| self.describe(error))?;

        let state = guard.try_borrow().map_err(|_| RequireError::Busy {
            command: "build_singletons",
        })?;
        let result = DiInitiator::new(&state.dependency_store, &state.dependency_resolver)
            .build_singletons(&sorted);

        match result {
            Ok(_) => {
                self.0.is_built.store(true, Ordering::Release);
                Ok(self)
            }
            Err(error) => Err(self.describe(error)),
        }
    }

    pub fn check_for_cyclic_dependencies(&self) -> Result<&Self, RequireError> {
        let guard = self.0.state.lock();
        let Some(mut state) = self.exclusive(&guard) else {
            return Err(RequireError::Busy {
                command: "check_for_cyclic_dependencies",
            });
        };

        match DiInitiator::check_for_cyclic_dependencies(&mut state.dependency_store) {
            Ok(_) => Ok(self),
            Err(error) => Err(self.describe(error)),
        }
    }

    /// Forgets every registration and token, resolve strategies are kept
    ///
    /// Instances handed out before stay valid, they are just no longer known to the container.
    /// The [`ContainerHandle`] is registered again if the container was built with one.
    pub fn reset(&self) -> Result<&Self, RequireError> {
        let guard = self.0.state.lock();
        {
            let Some(mut state) = self.exclusive(&guard) else {
                return Err(RequireError::Busy { command: "reset" });
            };

            tracing::debug!(
                "Resetting container with {} dependencies",
                state.dependency_store.len()
            );

            self.0.token_store.lock().reset();
            state.dependency_store.reset();
            self.0.is_built.store(false, Ordering::Release);
        }

        self.register_container_handle();
        Ok(self)
    }

    /// Export of the current dependency graph
    pub fn graph_data(&self) -> Result<GraphData, RequireError> {
        let guard = self.0.state.lock();
        let Some(mut state) = self.exclusive(&guard) else {
            return Err(RequireError::Busy {
                command: "graph_data",
            });
        };

        let result = GraphData::collect(&self.0.token_store.lock(), &mut state.dependency_store);
        result.map_err(|error| self.describe(error))
    }
}

/// Maps the dependency ids of an engine error back to token names
fn describe(token_store: &TokenStore, error: DependencyError) -> RequireError {
    let names = error
        .dependency_ids()
        .iter()
        .map(|dependency_id| token_store.describe_dependency(dependency_id))
        .collect::<Vec<_>>()
        .join(", ");

    RequireError::Dependency {
        names,
        source: error,
    }
}
