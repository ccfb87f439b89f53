use std::sync::Arc;

use thiserror::Error;

use crate::{
    lifecycle::Lifecycle,
    registry::DependencyId,
    types::DynError,
};

/// Errors raised by the dependency engine
///
/// Every variant carries the dependency ids it is about, so callers can map them back to tokens.
#[derive(Error, Debug, Clone)]
pub enum DependencyError {
    /// No registration exists for the id
    #[error("Missing dependency: {}", join_ids(.dependency_ids))]
    MissingDependency { dependency_ids: Vec<DependencyId> },

    /// None of the token ids in the dependency id are known to the token store
    #[error("Missing dependency token: {}", join_ids(.dependency_ids))]
    MissingDependencyToken { dependency_ids: Vec<DependencyId> },

    /// The dependency graph contains at least one cycle
    #[error("Cyclic dependencies detected between: {}", join_ids(.dependency_ids))]
    CyclicDependencies { dependency_ids: Vec<DependencyId> },

    /// No resolve strategy is registered for the lifecycle
    #[error("Invalid lifecycle '{lifecycle}' for: {}", join_ids(.dependency_ids))]
    InvalidLifecycle {
        dependency_ids: Vec<DependencyId>,
        lifecycle: Lifecycle,
    },

    /// The registration has neither a constructor, a builder nor an instance
    #[error("No way to create an instance of: {}", join_ids(.dependency_ids))]
    MissingImplementation { dependency_ids: Vec<DependencyId> },

    /// A constructor or builder returned an error
    #[error("Construction of '{}' failed - error: {error}", join_ids(.dependency_ids))]
    ConstructionFailed {
        dependency_ids: Vec<DependencyId>,
        error: Arc<DynError>,
    },
}

impl DependencyError {
    /// The dependency ids the error refers to
    pub fn dependency_ids(&self) -> &[DependencyId] {
        match self {
            DependencyError::MissingDependency { dependency_ids }
            | DependencyError::MissingDependencyToken { dependency_ids }
            | DependencyError::CyclicDependencies { dependency_ids }
            | DependencyError::InvalidLifecycle { dependency_ids, .. }
            | DependencyError::MissingImplementation { dependency_ids }
            | DependencyError::ConstructionFailed { dependency_ids, .. } => dependency_ids,
        }
    }
}

fn join_ids(ids: &[DependencyId]) -> String {
    ids.iter()
        .map(DependencyId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors when trying to require an instance from the container
#[derive(Error, Debug, Clone)]
pub enum RequireError {
    /// The engine failed, `names` are the token names of the affected dependencies
    #[error("{source} [{names}]")]
    Dependency {
        names: String,
        #[source]
        source: DependencyError,
    },

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// Retrieval attempted before `build_singletons` while the container requires it
    #[error("Dependency container not initialized. Call `build_singletons` before retrieving dependencies.")]
    NotBuilt,

    /// A command that rewrites the registrations was issued from inside a constructor or builder
    #[error("Dependency container is busy resolving. `{command}` cannot run from inside a constructor or builder.")]
    Busy { command: &'static str },
}

impl RequireError {
    /// The underlying engine error, if any
    pub fn dependency_error(&self) -> Option<&DependencyError> {
        match self {
            RequireError::Dependency { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors when accessing constructor arguments
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    #[error("Constructor argument {index} was not injected")]
    ArgumentMissing { index: usize },

    #[error("Constructor argument {index} has the wrong type, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        index: usize,
        required_type: &'static str,
        actual_type: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_dependency_ids() {
        let error = DependencyError::CyclicDependencies {
            dependency_ids: vec![DependencyId::from("1"), DependencyId::from("2_3")],
        };

        assert_eq!(
            error.to_string(),
            "Cyclic dependencies detected between: 1, 2_3"
        );
        assert_eq!(error.dependency_ids().len(), 2);
    }

    #[test]
    fn invalid_lifecycle_names_the_lifecycle() {
        let error = DependencyError::InvalidLifecycle {
            dependency_ids: vec![DependencyId::from("a")],
            lifecycle: Lifecycle::new("SCOPED"),
        };

        assert_eq!(error.to_string(), "Invalid lifecycle 'SCOPED' for: a");
    }
}
