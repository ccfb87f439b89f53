use serde::Serialize;

use crate::{errors::DependencyError, lifecycle::Lifecycle, store::DependencyStore, token::TokenStore};

pub const SINGLETON_COLOR: &str = "#03C800";
pub const TRANSIENT_COLOR: &str = "#FF5733";

/// Label of ids that are depended upon but never registered
pub const MISSING_LABEL: &str = "Missing";

/// Read-only export of the dependency graph, for visualizing a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphData {
    /// Every dependency in build order
    pub nodes: Vec<GraphNode>,
    /// Dependent to dependency edges
    pub links: Vec<GraphLink>,
    /// Lifecycle labels and their colors
    pub types: Vec<GraphNodeType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub node: String,
    #[serde(rename = "type")]
    pub lifecycle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNodeType {
    #[serde(rename = "type")]
    pub lifecycle: String,
    pub color: &'static str,
}

impl GraphData {
    /// Names every node through the token store
    ///
    /// Fails if the registrations contain a cycle, there is no build order then.
    pub fn collect(
        token_store: &TokenStore,
        dependency_store: &mut DependencyStore,
    ) -> Result<Self, DependencyError> {
        let sorted_dependencies_ids = dependency_store.get_sorted_dependencies_ids()?.to_vec();

        let nodes = sorted_dependencies_ids
            .iter()
            .map(|dependency_id| GraphNode {
                node: token_store.describe_dependency(dependency_id),
                lifecycle: match dependency_store.get_dependency(dependency_id) {
                    Ok(registry) => registry.lifecycle().label(),
                    Err(_) => MISSING_LABEL.to_string(),
                },
            })
            .collect();

        let links = dependency_store
            .dependency_graph()
            .edges()
            .map(|(source, target)| GraphLink {
                source: token_store.describe_dependency(source),
                target: token_store.describe_dependency(target),
            })
            .collect();

        Ok(GraphData {
            nodes,
            links,
            types: vec![
                GraphNodeType {
                    lifecycle: Lifecycle::SINGLETON.label(),
                    color: SINGLETON_COLOR,
                },
                GraphNodeType {
                    lifecycle: Lifecycle::TRANSIENT.label(),
                    color: TRANSIENT_COLOR,
                },
            ],
        })
    }
}
