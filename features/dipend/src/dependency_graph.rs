use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::{
    errors::DependencyError,
    registry::{DependencyId, DependencyRegistry},
};

/// Snapshot of the "depends on" edges between registrations
///
/// Built fresh from the registrations whenever it is needed; nodes are referenced by id only.
/// Ids that are depended upon but never registered are nodes as well.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Dependent -> its constructor dependencies, in constructor order
    edges: IndexMap<DependencyId, Vec<DependencyId>>,
    /// Number of dependents pointing at each node
    input_degree: IndexMap<DependencyId, usize>,
}

impl DependencyGraph {
    pub fn new<'a>(registries: impl IntoIterator<Item = &'a DependencyRegistry>) -> Self {
        let mut graph = DependencyGraph::default();

        for registry in registries {
            let dependency_id = registry.dependency_id();
            graph.input_degree.entry(dependency_id.clone()).or_insert(0);

            for dependency in registry
                .implementation_details()
                .class_constructor_dependencies_ids()
            {
                *graph.input_degree.entry(dependency.clone()).or_insert(0) += 1;

                graph
                    .edges
                    .entry(dependency_id.clone())
                    .or_default()
                    .push(dependency.clone());
            }
        }

        graph
    }

    /// All nodes, in the order they were first seen
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyId> {
        self.input_degree.keys()
    }

    pub fn node_count(&self) -> usize {
        self.input_degree.len()
    }

    /// `(dependent, dependency)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (&DependencyId, &DependencyId)> {
        self.edges
            .iter()
            .flat_map(|(from, to)| to.iter().map(move |to| (from, to)))
    }

    pub fn dependencies_of(&self, dependency_id: &DependencyId) -> &[DependencyId] {
        self.edges
            .get(dependency_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// How many registrations depend on the node
    pub fn input_degree(&self, dependency_id: &DependencyId) -> usize {
        self.input_degree.get(dependency_id).copied().unwrap_or(0)
    }

    /// Returns the nodes in build order, every dependency before its dependents
    ///
    /// Kahn's algorithm seeded with the nodes nothing depends on. That yields dependents first,
    /// so the result is reversed before it is returned.
    pub fn topological_sort(&self) -> Result<Vec<DependencyId>, DependencyError> {
        let mut input_degree = self.input_degree.clone();

        let mut queue = input_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| id.clone())
            .collect::<VecDeque<_>>();

        let mut sorted = Vec::with_capacity(input_degree.len());

        while let Some(current) = queue.pop_front() {
            for dependency in self.dependencies_of(&current) {
                let Some(degree) = input_degree.get_mut(dependency) else {
                    continue;
                };

                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependency.clone());
                }
            }

            sorted.push(current);
        }

        if sorted.len() != input_degree.len() {
            // Only nodes that still have dependents and dependencies themselves are part of a cycle
            let unresolved = input_degree
                .iter()
                .filter(|(id, degree)| **degree > 0 && self.edges.contains_key(*id))
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>();

            tracing::error!(
                "Cyclic dependencies detected between {} dependencies",
                unresolved.len()
            );

            return Err(DependencyError::CyclicDependencies {
                dependency_ids: unresolved,
            });
        }

        sorted.reverse();
        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lifecycle::Lifecycle, registry::ImplementationDetails, types::Instance};

    fn registry(id: &str, dependencies: &[&str]) -> DependencyRegistry {
        DependencyRegistry::new(
            id.into(),
            Lifecycle::SINGLETON,
            ImplementationDetails::class(
                dependencies.iter().map(|dep| DependencyId::from(*dep)).collect(),
                |_| Ok(Instance::new(())),
            ),
        )
    }

    fn ids(ids: &[&str]) -> Vec<DependencyId> {
        ids.iter().map(|id| DependencyId::from(*id)).collect()
    }

    #[test]
    fn input_degree_counts_dependents() {
        let registries = [
            registry("service", &["repo", "logger"]),
            registry("repo", &["logger"]),
            registry("logger", &[]),
        ];

        let graph = DependencyGraph::new(&registries);

        assert_eq!(graph.input_degree(&"service".into()), 0);
        assert_eq!(graph.input_degree(&"repo".into()), 1);
        assert_eq!(graph.input_degree(&"logger".into()), 2);
        assert_eq!(graph.dependencies_of(&"service".into()), ids(&["repo", "logger"]));
        assert_eq!(graph.edges().count(), 3);
    }

    #[test]
    fn sort_puts_dependencies_first() {
        let registries = [
            registry("service", &["repo"]),
            registry("repo", &["logger"]),
            registry("logger", &[]),
        ];

        let sorted = DependencyGraph::new(&registries).topological_sort().unwrap();

        assert_eq!(sorted, ids(&["logger", "repo", "service"]));
    }

    #[test]
    fn unregistered_dependencies_become_nodes() {
        let registries = [registry("repo", &["db"])];

        let graph = DependencyGraph::new(&registries);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.topological_sort().unwrap(), ids(&["db", "repo"]));
    }

    #[test]
    fn cycle_lists_the_nodes_on_it() {
        let registries = [
            registry("a", &["b"]),
            registry("b", &["a"]),
            registry("root", &["a"]),
        ];

        let error = DependencyGraph::new(&registries)
            .topological_sort()
            .unwrap_err();

        let DependencyError::CyclicDependencies { dependency_ids } = &error else {
            panic!("expected a cycle error, got {error:?}");
        };
        assert_eq!(dependency_ids, &ids(&["a", "b"]));
    }

    #[test]
    fn cycle_is_found_next_to_unregistered_dependencies() {
        // Sorts exactly as many nodes as there are registrations
        let registries = [
            registry("a", &["b"]),
            registry("b", &["a"]),
            registry("c", &["x"]),
            registry("d", &["y"]),
        ];

        let error = DependencyGraph::new(&registries)
            .topological_sort()
            .unwrap_err();

        assert_eq!(error.dependency_ids(), ids(&["a", "b"]));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let registries = [registry("a", &["a"])];

        let error = DependencyGraph::new(&registries)
            .topological_sort()
            .unwrap_err();

        assert_eq!(error.dependency_ids(), ids(&["a"]));
    }
}
