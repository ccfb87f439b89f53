use serde::{Deserialize, Serialize};

/// Options of a [`DiContainer`](crate::DiContainer)
///
/// Every field defaults to `false`, so a partial config deserializes fine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Start without the singleton and transient strategies
    pub disable_default_resolve_lifecycle_strategies: bool,
    /// Refuse retrieval until `build_singletons` succeeded
    pub build_singletons_required: bool,
}
