//! Morph Type System
//!
//! The dynamic object model and the type universe the conversion engine
//! works on:
//! - [`Value`] and the shared handles ([`ObjectRef`], [`CollectionRef`], [`MapRef`])
//! - Declarative type definitions ([`TypeDef`]) collected in a [`TypeTable`]
//! - [`Accessor`], a uniform read/write handle over one named member
//! - [`TypeIntrospector`], which enumerates the accessors of a type
//!
//! Types are declared once at bootstrap. Nothing here is re-scanned per
//! conversion: the binding registry in `morph-core` scans each type once
//! and keeps the resulting accessors for the process lifetime.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod accessor;
pub mod error;
pub mod introspect;
pub mod object;
pub mod table;
pub mod ty;
pub mod value;

pub use accessor::{Accessor, AccessorKind};
pub use error::TypeError;
pub use introspect::TypeIntrospector;
pub use object::{Collection, MapObject, Object};
pub use table::TypeTable;
pub use ty::{
    builtin, Annotation, CollectionKind, Getter, Initializer, MemberDef, MemberKind, Setter,
    TypeDef, TypeId, TypeKind, TypeRole,
};
pub use value::{CollectionRef, IdentityKey, MapRef, ObjectRef, Value};

/// Result alias for type table and accessor operations
pub type TypeResult<T> = Result<T, TypeError>;
