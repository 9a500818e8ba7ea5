use std::any::TypeId;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::container::descriptor::ContractId;
use crate::container::scope::ServiceScope;

/// What kind of type a catalog entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Instantiable implementation with at least one initializer
    Concrete,
    /// Contract only, typically a `dyn Trait`
    Interface,
    /// Declared but not constructible on its own
    Abstract,
    /// Plain value (numbers, strings, dates, enums)
    Value,
}

impl TypeKind {
    /// Whether a type of this kind may be the target of a type binding
    pub fn is_constructible(&self) -> bool {
        matches!(self, TypeKind::Concrete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Concrete => "concrete",
            TypeKind::Interface => "interface",
            TypeKind::Abstract => "abstract",
            TypeKind::Value => "value",
        }
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability query over the declarative markers attached to types.
///
/// The engine never inspects types at runtime; everything it knows about a
/// contract or implementation comes through this trait.
pub trait TypeMarkers {
    /// Declared kind, if the type is known
    fn kind_of(&self, id: &ContractId) -> Option<TypeKind>;

    /// Lifetime marker
    fn lifetime_of(&self, id: &ContractId) -> Option<ServiceScope>;

    /// Default-implementation marker
    fn default_implementation_of(&self, id: &ContractId) -> Option<ContractId>;

    /// Last-mapping marker on the type itself
    fn is_last_mapping_type(&self, id: &ContractId) -> bool;

    /// Simple types bind by name rather than by type
    fn is_simple(&self, id: &ContractId) -> bool {
        is_builtin_simple(id) || self.kind_of(id) == Some(TypeKind::Value)
    }
}

fn builtin_simple_ids() -> [TypeId; 29] {
    [
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<String>(),
        TypeId::of::<&'static str>(),
        TypeId::of::<str>(),
        TypeId::of::<Duration>(),
        TypeId::of::<SystemTime>(),
        TypeId::of::<chrono::NaiveDate>(),
        TypeId::of::<chrono::NaiveTime>(),
        TypeId::of::<chrono::NaiveDateTime>(),
        TypeId::of::<chrono::DateTime<chrono::Utc>>(),
        TypeId::of::<chrono::DateTime<chrono::Local>>(),
        TypeId::of::<chrono::DateTime<chrono::FixedOffset>>(),
        TypeId::of::<chrono::Duration>(),
        TypeId::of::<uuid::Uuid>(),
    ]
}

/// Primitive, string, date/time and id types that never compose other services
pub fn is_builtin_simple(id: &ContractId) -> bool {
    builtin_simple_ids().contains(&id.type_id)
}
