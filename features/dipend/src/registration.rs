use std::{any::type_name, fmt::Debug, sync::Arc};

use crate::{
    errors::InjectError,
    lifecycle::Lifecycle,
    registry::{Builder, ClassConstructor},
    token::Token,
    types::{DynError, Injectable, Instance},
};

/// A dependency requested by a constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Injection {
    pub token: Token,
    pub qualifier: Option<Token>,
}

impl Injection {
    pub fn of<T: 'static + ?Sized>() -> Self {
        Injection {
            token: Token::of::<T>(),
            qualifier: None,
        }
    }
}

/// Resolved constructor dependencies, in the order they were injected
#[derive(Debug, Clone, Copy)]
pub struct ConstructorArgs<'a> {
    instances: &'a [Instance],
}

impl<'a> ConstructorArgs<'a> {
    pub fn new(instances: &'a [Instance]) -> Self {
        ConstructorArgs { instances }
    }

    /// The argument at `index`, downcast to `T`
    pub fn get<T: Injectable>(&self, index: usize) -> Result<Arc<T>, InjectError> {
        let instance = self
            .instances
            .get(index)
            .ok_or(InjectError::ArgumentMissing { index })?;

        instance
            .downcast()
            .map_err(|actual_type| InjectError::DowncastFailed {
                index,
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    pub fn instances(&self) -> &'a [Instance] {
        self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

type TypedConstructor<T> = dyn Fn(&ConstructorArgs<'_>) -> Result<T, DynError> + Send + Sync;

/// Describes how to construct a `T` from injected dependencies
///
/// # Example
/// ```rust
/// use dipend::{Class, DiContainer};
///
/// struct Logger;
/// struct Repo {
///     logger: std::sync::Arc<Logger>,
/// }
///
/// let container = DiContainer::new();
/// container
///     .add_singleton(Class::new(|_| Ok(Logger)))
///     .add_singleton(
///         Class::new(|args| Ok(Repo { logger: args.get::<Logger>(0)? })).inject::<Logger>(),
///     );
///
/// let repo = container.get::<Repo>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&repo.logger, &container.get::<Logger>().unwrap()));
/// ```
pub struct Class<T> {
    injections: Vec<Injection>,
    constructor: Arc<TypedConstructor<T>>,
}

impl<T> Debug for Class<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("type", &type_name::<T>())
            .field("injections", &self.injections)
            .finish()
    }
}

impl<T: Injectable> Class<T> {
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&ConstructorArgs<'_>) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Class {
            injections: Vec::new(),
            constructor: Arc::new(constructor),
        }
    }

    /// Appends a dependency on the type `D`
    pub fn inject<D: 'static + ?Sized>(self) -> Self {
        self.inject_token(Token::of::<D>(), None)
    }

    /// Appends a dependency on the registration of `D` under `qualifier`
    pub fn inject_mapped<D: 'static + ?Sized>(self, qualifier: Token) -> Self {
        self.inject_token(Token::of::<D>(), Some(qualifier))
    }

    pub fn inject_token(mut self, token: Token, qualifier: Option<Token>) -> Self {
        self.injections.push(Injection { token, qualifier });
        self
    }

    pub fn injections(&self) -> &[Injection] {
        &self.injections
    }
}

/// The way a registration produces instances
pub enum Implementation {
    /// Constructed from resolved dependencies
    Class {
        injections: Vec<Injection>,
        constructor: ClassConstructor,
    },
    /// Built without dependencies
    Builder(Builder),
    /// Already built
    Instance(Instance),
}

impl Debug for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Implementation::Class { injections, .. } => {
                f.debug_struct("Class").field("injections", injections).finish()
            }
            Implementation::Builder(_) => f.write_str("Builder"),
            Implementation::Instance(instance) => instance.fmt(f),
        }
    }
}

impl<T: Injectable> From<Class<T>> for Implementation {
    fn from(class: Class<T>) -> Self {
        let Class {
            injections,
            constructor,
        } = class;

        Implementation::Class {
            injections,
            constructor: Arc::new(move |instances: &[Instance]| {
                constructor(&ConstructorArgs::new(instances)).map(Instance::new)
            }),
        }
    }
}

/// Everything needed to add one dependency to a container
#[derive(Debug)]
pub struct Registration {
    pub lifecycle: Lifecycle,
    pub token: Token,
    pub qualifier: Option<Token>,
    pub implementation: Implementation,
}

impl Registration {
    /// Registers `T` under its own type token
    pub fn class<T: Injectable>(lifecycle: impl Into<Lifecycle>, class: Class<T>) -> Self {
        Registration {
            lifecycle: lifecycle.into(),
            token: Token::of::<T>(),
            qualifier: None,
            implementation: class.into(),
        }
    }

    pub fn builder<T, F>(lifecycle: impl Into<Lifecycle>, builder: F) -> Self
    where
        T: Injectable,
        F: Fn() -> Result<T, DynError> + Send + Sync + 'static,
    {
        Registration {
            lifecycle: lifecycle.into(),
            token: Token::of::<T>(),
            qualifier: None,
            implementation: Implementation::Builder(Arc::new(move || builder().map(Instance::new))),
        }
    }

    /// Registers an existing value as a singleton
    pub fn instance<T: Injectable>(instance: T) -> Self {
        Registration {
            lifecycle: Lifecycle::SINGLETON,
            token: Token::of::<T>(),
            qualifier: None,
            implementation: Implementation::Instance(Instance::new(instance)),
        }
    }

    /// Registers under `token` instead of the type token
    pub fn token(mut self, token: Token) -> Self {
        self.token = token;
        self
    }

    pub fn qualifier(mut self, qualifier: Token) -> Self {
        self.qualifier = Some(qualifier);
        self
    }
}
