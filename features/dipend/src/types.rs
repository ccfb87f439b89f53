use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

/// Error returned by user supplied constructors and builders
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Containers are shared between threads
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A type erased, shared instance produced by the container
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    /// Wraps an already shared value without cloning it
    pub fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Returns true if both handles point to the same allocation
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Type name without module paths, `my_app::db::Pool<(a::B, u8)>` becomes `Pool<(B, u8)>`
    pub fn short_name(&self) -> String {
        let mut short = String::with_capacity(self.type_name.len());
        let mut path = String::new();

        for c in self.type_name.chars() {
            if c.is_alphanumeric() || c == '_' || c == ':' {
                path.push(c);
                continue;
            }
            short.push_str(last_segment(&path));
            path.clear();
            short.push(c);
        }
        short.push_str(last_segment(&path));

        short
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod db {
        pub struct Pool<T>(pub T);
    }

    #[test]
    fn downcast_to_the_stored_type() {
        let instance = Instance::new(42_u32);

        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
        assert_eq!(instance.downcast::<i64>().unwrap_err(), "u32");
    }

    #[test]
    fn clones_share_the_allocation() {
        let instance = Instance::new(String::from("shared"));
        let other = Instance::new(String::from("shared"));

        assert!(instance.ptr_eq(&instance.clone()));
        assert!(!instance.ptr_eq(&other));
    }

    #[test]
    fn short_name_strips_module_path() {
        assert_eq!(TypeInfo::of::<db::Pool<u8>>().short_name(), "Pool<u8>");
        assert_eq!(TypeInfo::of::<u8>().short_name(), "u8");
    }

    #[test]
    fn short_name_strips_every_nested_path() {
        assert_eq!(
            TypeInfo::of::<(db::Pool<u8>, String)>().short_name(),
            "(Pool<u8>, String)"
        );
        assert_eq!(TypeInfo::of::<[db::Pool<u8>; 2]>().short_name(), "[Pool<u8>; 2]");
        assert_eq!(
            TypeInfo::of::<std::sync::Arc<dyn std::error::Error>>().short_name(),
            "Arc<dyn Error>"
        );
    }
}
