//! Token based dependency injection
//!
//! Dependencies are registered under a token, optionally narrowed by a qualifier token,
//! together with a lifecycle and a way to construct them. The container orders all
//! registrations topologically, detects cycles and resolves instances according to
//! their lifecycle strategy.
//!
//! ```rust
//! use std::sync::Arc;
//! use dipend::{Class, DiContainer};
//!
//! struct Logger;
//! struct Repo(Arc<Logger>);
//! struct Service(Arc<Repo>, Arc<Logger>);
//!
//! let container = DiContainer::new();
//! container
//!     .add_singleton(Class::new(|_| Ok(Logger)))
//!     .add_singleton(Class::new(|args| Ok(Repo(args.get(0)?))).inject::<Logger>())
//!     .add_transient(
//!         Class::new(|args| Ok(Service(args.get(0)?, args.get(1)?)))
//!             .inject::<Repo>()
//!             .inject::<Logger>(),
//!     );
//!
//! container.build_singletons().unwrap();
//!
//! let first = container.get::<Service>().unwrap();
//! let second = container.get::<Service>().unwrap();
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.0, &second.0));
//! ```

mod builder;
mod config;
mod container;
mod dependency_graph;
mod errors;
mod initiator;
mod introspection;
mod lifecycle;
mod registration;
mod registry;
mod store;
mod token;
mod types;

pub mod resolver;

pub use builder::DiBuilder;
pub use config::ContainerConfig;
pub use container::{ContainerHandle, DiContainer};
pub use dependency_graph::DependencyGraph;
pub use errors::{DependencyError, InjectError, RequireError};
pub use initiator::DiInitiator;
pub use introspection::{
    GraphData, GraphLink, GraphNode, GraphNodeType, MISSING_LABEL, SINGLETON_COLOR,
    TRANSIENT_COLOR,
};
pub use lifecycle::Lifecycle;
pub use registration::{Class, ConstructorArgs, Implementation, Injection, Registration};
pub use registry::{
    Builder, ClassConstructor, DependencyId, DependencyRegistry, ImplementationDetails,
    DEPENDENCY_ID_SEPARATOR,
};
pub use resolver::{
    DependencyResolver, ResolveLifecycleStrategy, ResolveSingletonLifecycleStrategy,
    ResolveTransientLifecycleStrategy, StrategyContext,
};
pub use store::DependencyStore;
pub use token::{Token, TokenRegistryEntry, TokenStore};
pub use types::{DynError, Injectable, Instance, TypeInfo};
