use std::{
    fmt::{Debug, Display},
    sync::{Arc, OnceLock},
};

use crate::{
    errors::DependencyError,
    lifecycle::Lifecycle,
    types::{DynError, Instance},
};

/// Joins token ids inside a dependency id
pub const DEPENDENCY_ID_SEPARATOR: char = '_';

/// Uniquely names one registration: primary token id, optionally followed by the qualifier token id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyId(String);

impl DependencyId {
    pub fn compose<I, S>(token_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut id = String::new();
        for token_id in token_ids {
            if !id.is_empty() {
                id.push(DEPENDENCY_ID_SEPARATOR);
            }
            id.push_str(token_id.as_ref());
        }
        DependencyId(id)
    }

    /// The token ids this dependency id is made of
    pub fn token_ids(&self) -> impl Iterator<Item = &str> {
        self.0.split(DEPENDENCY_ID_SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DependencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DependencyId {
    fn from(id: &str) -> Self {
        DependencyId(id.to_string())
    }
}

impl From<String> for DependencyId {
    fn from(id: String) -> Self {
        DependencyId(id)
    }
}

/// Builds an instance from its resolved constructor dependencies, in declaration order
pub type ClassConstructor =
    Arc<dyn Fn(&[Instance]) -> Result<Instance, DynError> + Send + Sync + 'static>;

/// Builds an instance without any dependencies
pub type Builder = Arc<dyn Fn() -> Result<Instance, DynError> + Send + Sync + 'static>;

/// How instances of a dependency come to be
///
/// A pre-supplied or memoized `instance` wins over everything else,
/// then the class constructor, then the builder.
pub struct ImplementationDetails {
    class_constructor: Option<ClassConstructor>,
    class_constructor_dependencies_ids: Vec<DependencyId>,
    builder: Option<Builder>,
    instance: OnceLock<Instance>,
}

impl Debug for ImplementationDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplementationDetails")
            .field("class_constructor", &self.class_constructor.is_some())
            .field(
                "class_constructor_dependencies_ids",
                &self.class_constructor_dependencies_ids,
            )
            .field("builder", &self.builder.is_some())
            .field("instance", &self.instance.get())
            .finish()
    }
}

impl ImplementationDetails {
    /// Constructor based, `dependencies_ids` are resolved and passed positionally
    pub fn class<F>(dependencies_ids: Vec<DependencyId>, constructor: F) -> Self
    where
        F: Fn(&[Instance]) -> Result<Instance, DynError> + Send + Sync + 'static,
    {
        ImplementationDetails {
            class_constructor: Some(Arc::new(constructor)),
            class_constructor_dependencies_ids: dependencies_ids,
            builder: None,
            instance: OnceLock::new(),
        }
    }

    pub fn builder<F>(builder: F) -> Self
    where
        F: Fn() -> Result<Instance, DynError> + Send + Sync + 'static,
    {
        ImplementationDetails {
            class_constructor: None,
            class_constructor_dependencies_ids: Vec::new(),
            builder: Some(Arc::new(builder)),
            instance: OnceLock::new(),
        }
    }

    pub fn instance(instance: Instance) -> Self {
        ImplementationDetails {
            class_constructor: None,
            class_constructor_dependencies_ids: Vec::new(),
            builder: None,
            instance: OnceLock::from(instance),
        }
    }

    /// A registration with no way to produce an instance, resolving it fails
    pub fn empty() -> Self {
        ImplementationDetails {
            class_constructor: None,
            class_constructor_dependencies_ids: Vec::new(),
            builder: None,
            instance: OnceLock::new(),
        }
    }

    pub fn class_constructor_dependencies_ids(&self) -> &[DependencyId] {
        &self.class_constructor_dependencies_ids
    }

    pub fn resolved_instance(&self) -> Option<&Instance> {
        self.instance.get()
    }
}

/// One registered dependency
///
/// `dependency_id` and `lifecycle` never change after creation. The instance slot is write-once,
/// see [`DependencyRegistry::memoize`].
#[derive(Debug)]
pub struct DependencyRegistry {
    dependency_id: DependencyId,
    lifecycle: Lifecycle,
    implementation_details: ImplementationDetails,
}

impl DependencyRegistry {
    pub fn new(
        dependency_id: DependencyId,
        lifecycle: impl Into<Lifecycle>,
        implementation_details: ImplementationDetails,
    ) -> Self {
        DependencyRegistry {
            dependency_id,
            lifecycle: lifecycle.into(),
            implementation_details,
        }
    }

    pub fn dependency_id(&self) -> &DependencyId {
        &self.dependency_id
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn implementation_details(&self) -> &ImplementationDetails {
        &self.implementation_details
    }

    /// Pre-supplied or memoized instance
    pub fn resolved_instance(&self) -> Option<&Instance> {
        self.implementation_details.resolved_instance()
    }

    /// Creates a new instance with the constructor, or the builder if there is no constructor
    ///
    /// Does not look at or store the instance slot.
    pub fn construct(&self, dependencies: &[Instance]) -> Result<Instance, DependencyError> {
        let details = &self.implementation_details;

        let result = match (&details.class_constructor, &details.builder) {
            (Some(constructor), _) => constructor(dependencies),
            (None, Some(builder)) => builder(),
            (None, None) => {
                return Err(DependencyError::MissingImplementation {
                    dependency_ids: vec![self.dependency_id.clone()],
                })
            }
        };

        result.map_err(|error| DependencyError::ConstructionFailed {
            dependency_ids: vec![self.dependency_id.clone()],
            error: Arc::new(error),
        })
    }

    /// Writes `instance` into the instance slot
    ///
    /// The slot is written at most once, returns whichever instance ended up stored.
    pub fn memoize(&self, instance: Instance) -> Instance {
        self.implementation_details
            .instance
            .get_or_init(|| instance)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_and_split() {
        let id = DependencyId::compose(["1f", "a0"]);

        assert_eq!(id.as_str(), "1f_a0");
        assert_eq!(id.token_ids().collect::<Vec<_>>(), vec!["1f", "a0"]);
        assert_eq!(DependencyId::compose(["7"]).as_str(), "7");
    }

    #[test]
    fn constructor_receives_dependencies_in_order() {
        let details = ImplementationDetails::class(
            vec![DependencyId::from("a"), DependencyId::from("b")],
            |deps| {
                let joined = deps
                    .iter()
                    .map(|dep| dep.downcast::<&str>().map(|s| *s))
                    .collect::<Result<Vec<_>, _>>()?
                    .join("");
                Ok(Instance::new(joined))
            },
        );
        let registry = DependencyRegistry::new("c".into(), Lifecycle::TRANSIENT, details);

        let instance = registry
            .construct(&[Instance::new("a"), Instance::new("b")])
            .unwrap();

        assert_eq!(*instance.downcast::<String>().unwrap(), "ab");
        assert!(registry.resolved_instance().is_none());
    }

    #[test]
    fn builder_is_used_without_constructor() {
        let details = ImplementationDetails::builder(|| Ok(Instance::new(7_u8)));
        let registry = DependencyRegistry::new("b".into(), Lifecycle::SINGLETON, details);

        let instance = registry.construct(&[]).unwrap();

        assert_eq!(*instance.downcast::<u8>().unwrap(), 7);
        assert!(registry
            .implementation_details()
            .class_constructor_dependencies_ids()
            .is_empty());
    }

    #[test]
    fn construct_errors_carry_the_dependency_id() {
        let failing = DependencyRegistry::new(
            "f".into(),
            Lifecycle::SINGLETON,
            ImplementationDetails::builder(|| Err("boom".into())),
        );
        let empty =
            DependencyRegistry::new("e".into(), Lifecycle::SINGLETON, ImplementationDetails::empty());

        let error = failing.construct(&[]).unwrap_err();
        assert!(matches!(error, DependencyError::ConstructionFailed { .. }));
        assert_eq!(error.dependency_ids(), &[DependencyId::from("f")]);
        assert!(error.to_string().contains("boom"));

        assert!(matches!(
            empty.construct(&[]).unwrap_err(),
            DependencyError::MissingImplementation { .. }
        ));
    }

    #[test]
    fn memoize_writes_once() {
        let registry =
            DependencyRegistry::new("m".into(), Lifecycle::SINGLETON, ImplementationDetails::empty());
        let first = Instance::new(1_u8);

        let stored = registry.memoize(first.clone());
        let again = registry.memoize(Instance::new(2_u8));

        assert!(stored.ptr_eq(&first));
        assert!(again.ptr_eq(&first));
        assert!(registry.resolved_instance().unwrap().ptr_eq(&first));
    }

    #[test]
    fn pre_supplied_instance_is_resolved() {
        let instance = Instance::new("ready");
        let registry = DependencyRegistry::new(
            "i".into(),
            Lifecycle::SINGLETON,
            ImplementationDetails::instance(instance.clone()),
        );

        assert!(registry.resolved_instance().unwrap().ptr_eq(&instance));
    }
}
