use indexmap::IndexMap;

use crate::{
    dependency_graph::DependencyGraph,
    errors::DependencyError,
    registry::{DependencyId, DependencyRegistry},
};

/// Owns every registration and the cached build order
#[derive(Debug, Default)]
pub struct DependencyStore {
    dependencies: IndexMap<DependencyId, DependencyRegistry>,
    sorted_dependencies_ids_cache_invalidated: bool,
    sorted_dependencies_ids: Vec<DependencyId>,
}

impl DependencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the registration with the same id
    ///
    /// Always invalidates the build order, a replaced registration may have other dependencies.
    pub fn add_dependency(&mut self, registry: DependencyRegistry) {
        self.sorted_dependencies_ids_cache_invalidated = true;

        if let Some(replaced) = self
            .dependencies
            .insert(registry.dependency_id().clone(), registry)
        {
            tracing::debug!("Replaced registration {}", replaced.dependency_id());
        }
    }

    pub fn get_dependency(
        &self,
        dependency_id: &DependencyId,
    ) -> Result<&DependencyRegistry, DependencyError> {
        self.dependencies
            .get(dependency_id)
            .ok_or_else(|| DependencyError::MissingDependency {
                dependency_ids: vec![dependency_id.clone()],
            })
    }

    pub fn contains(&self, dependency_id: &DependencyId) -> bool {
        self.dependencies.contains_key(dependency_id)
    }

    /// Registrations in the order they were first added
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyRegistry> {
        self.dependencies.values()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Fresh graph of the current registrations
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::new(self.dependencies.values())
    }

    /// Build order of all dependencies, every dependency before its dependents
    ///
    /// Recomputed only after registrations changed. Fails if the registrations contain a cycle,
    /// the cache stays invalid in that case.
    pub fn get_sorted_dependencies_ids(&mut self) -> Result<&[DependencyId], DependencyError> {
        if self.sorted_dependencies_ids_cache_invalidated {
            tracing::debug!(
                "Sorting {} dependencies",
                self.dependencies.len()
            );

            self.sorted_dependencies_ids = self.dependency_graph().topological_sort()?;
            self.sorted_dependencies_ids_cache_invalidated = false;
        }

        Ok(&self.sorted_dependencies_ids)
    }

    /// Removes every registration, the build order becomes empty
    pub fn reset(&mut self) {
        self.dependencies.clear();
        self.sorted_dependencies_ids.clear();
        self.sorted_dependencies_ids_cache_invalidated = false;
    }
}
