use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::errors::CoreError;

/// Identity of a requested contract (a nominal type, possibly `dyn Trait`)
///
/// Equality is decided by `TypeId` alone, so type aliases resolve to the
/// same contract as the type they name.
#[derive(Debug, Clone, Copy)]
pub struct ContractId {
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl ContractId {
    /// Create a contract ID for a type
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fully qualified path without the `dyn ` prefix or generic arguments
    pub fn path(&self) -> &'static str {
        let name = self.type_name.strip_prefix("dyn ").unwrap_or(self.type_name);
        let name = match name.find('<') {
            Some(idx) => &name[..idx],
            None => name,
        };
        // `dyn Trait + Send + Sync`
        match name.find(" +") {
            Some(idx) => &name[..idx],
            None => name,
        }
    }

    /// Last path segment, e.g. `ILogger` for `dyn app::logging::ILogger`
    pub fn simple_name(&self) -> &'static str {
        let path = self.path();
        path.rsplit("::").next().unwrap_or(path)
    }

    /// Module path, e.g. `app::logging` for `dyn app::logging::ILogger`
    pub fn module_path(&self) -> &'static str {
        let path = self.path();
        match path.rfind("::") {
            Some(idx) => &path[..idx],
            None => "",
        }
    }
}

impl PartialEq for ContractId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractId {}

impl std::hash::Hash for ContractId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A type-erased service instance.
///
/// Internally this holds an `Arc<T>` behind `dyn Any`, which keeps unsized
/// contracts (`Arc<dyn Trait>`) downcastable and preserves object identity
/// across clones.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Wrap an owned value
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value, sized or not
    pub fn from_arc<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the type this instance was created from
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the instance holds a `T`
    pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.inner.is::<Arc<T>>()
    }

    /// Recover the typed `Arc<T>`, if the instance holds a `T`
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    /// Like [`Instance::downcast`] but reporting a type mismatch
    pub fn try_downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, CoreError> {
        self.downcast::<T>().ok_or_else(|| CoreError::TypeMismatch {
            expected: std::any::type_name::<T>().to_string(),
            found: self.type_name.to_string(),
        })
    }

    /// Whether two instances share the same storage (clones of one another)
    pub fn same_object(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.type_name).finish()
    }
}

/// Positional arguments supplied at `get` time for last-mapping parameters
pub type LateArgs = [Instance];

/// Build a late-bound argument list from heterogeneous values
#[macro_export]
macro_rules! late_args {
    () => {
        ::std::vec::Vec::<$crate::container::Instance>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::container::Instance::new($value)),+]
    };
}
