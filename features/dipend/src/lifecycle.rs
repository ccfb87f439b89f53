use std::{borrow::Cow, fmt::Display};

/// Name of the policy that decides whether instances are reused
///
/// Lifecycles are an open set: any name can be used as long as a resolve strategy is
/// registered for it, see [`crate::resolver::DependencyResolver::add_resolve_lifecycle_strategy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lifecycle(Cow<'static, str>);

impl Lifecycle {
    /// One shared instance, built on first resolve
    pub const SINGLETON: Lifecycle = Lifecycle(Cow::Borrowed("SINGLETON"));
    /// A fresh instance on every resolve
    pub const TRANSIENT: Lifecycle = Lifecycle(Cow::Borrowed("TRANSIENT"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Lifecycle(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `SINGLETON` becomes `Singleton`
    pub fn label(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Lifecycle {
    fn from(name: &'static str) -> Self {
        Lifecycle::new(name)
    }
}

impl From<String> for Lifecycle {
    fn from(name: String) -> Self {
        Lifecycle::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_ins_compare_by_name() {
        assert_eq!(Lifecycle::SINGLETON, Lifecycle::from("SINGLETON"));
        assert_eq!(Lifecycle::TRANSIENT, Lifecycle::from(String::from("TRANSIENT")));
        assert_ne!(Lifecycle::SINGLETON, Lifecycle::TRANSIENT);
    }

    #[test]
    fn label_is_capitalized() {
        assert_eq!(Lifecycle::SINGLETON.label(), "Singleton");
        assert_eq!(Lifecycle::new("request_scoped").label(), "Request_scoped");
        assert_eq!(Lifecycle::new("").label(), "");
    }
}
