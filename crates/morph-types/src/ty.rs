//! Type definitions
//!
//! A [`TypeDef`] is the declarative description of one type: its kind, its
//! supertypes, its role in conversions and its members. Definitions are
//! built with a small builder DSL and handed to a
//! [`TypeTable`](crate::TypeTable), which assigns the [`TypeId`].
//!
//! ```ignore
//! let point = table.define(
//!     TypeDef::class("Point")
//!         .field("x", builtin::INT)
//!         .field("y", builtin::INT),
//! )?;
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::object::Object;
use crate::value::Value;

/// Dense identifier of a type inside one [`TypeTable`](crate::TypeTable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// Build a type id from its raw index
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    /// Raw index of this id
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Builtin types present in every table
///
/// The ids are fixed: a fresh [`TypeTable`](crate::TypeTable) defines them
/// in this order before anything else.
pub mod builtin {
    use super::TypeId;

    /// Root of the hierarchy, every type is assignable to it
    pub const ANY: TypeId = TypeId(0);
    /// Boolean scalar
    pub const BOOL: TypeId = TypeId(1);
    /// 64-bit integer scalar
    pub const INT: TypeId = TypeId(2);
    /// 64-bit float scalar
    pub const FLOAT: TypeId = TypeId(3);
    /// UTF-8 string scalar
    pub const STR: TypeId = TypeId(4);
    /// Abstract collection, instantiates as a list
    pub const COLLECTION: TypeId = TypeId(5);
    /// Ordered collection
    pub const LIST: TypeId = TypeId(6);
    /// Collection without duplicates
    pub const SET: TypeId = TypeId(7);
    /// Untyped string-keyed map
    pub const MAP: TypeId = TypeId(8);

    pub(crate) const COUNT: u32 = 9;
}

/// Concrete kind of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Keeps insertion order and duplicates
    List,
    /// Keeps insertion order, ignores elements already present
    Set,
}

/// Structural kind of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Bool, int, float, str and the `any` root
    Scalar,
    /// Struct-like type with members, instantiated as an [`Object`]
    Class,
    /// Member declarations only, never instantiated
    Interface,
    /// Collection of values
    Collection(CollectionKind),
    /// String-keyed map, members are read and written by key
    Map,
}

/// Role of a type in conversions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRole {
    /// Domain or helper type
    Plain,
    /// Partial-update payload applied onto a domain type
    Mutator {
        /// Domain type this mutator fills, when declared on the type
        subject: Option<TypeId>,
    },
    /// Read-only projection built from a domain type
    Response {
        /// Domain type this response is built from, when declared on the type
        subject: Option<TypeId>,
        /// Mapping variant this response is registered under
        mapping: Option<Box<str>>,
    },
}

/// Declarative member metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// Marks the identity field used to correlate collection elements
    Identifier,
    /// Keep an unmatched source accessor in the binding metadata
    IgnoreMatch,
    /// Never written by mutation (default field guard)
    Excluded,
    /// Free-form tag for user guards and hooks
    Custom(Box<str>),
}

impl Annotation {
    /// Free-form annotation
    pub fn custom(name: impl Into<Box<str>>) -> Self {
        Annotation::Custom(name.into())
    }
}

/// Reads a computed member from an object's storage
pub type Getter = Arc<dyn Fn(&Object) -> Value + Send + Sync>;
/// Writes a computed member into an object's storage
pub type Setter = Arc<dyn Fn(&mut Object, Value) + Send + Sync>;
/// Produces the initial value of a field on instantiation
pub type Initializer = Arc<dyn Fn() -> Value + Send + Sync>;

/// Backing of a declared member
#[derive(Clone)]
pub enum MemberKind {
    /// Stored field, optionally initialized by the default constructor
    Field(Option<Initializer>),
    /// Read method
    Getter(Getter),
    /// Write method
    Setter(Setter),
}

impl fmt::Debug for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field(init) => write!(f, "Field(init: {})", init.is_some()),
            MemberKind::Getter(_) => f.write_str("Getter"),
            MemberKind::Setter(_) => f.write_str("Setter"),
        }
    }
}

/// One declared member of a type
#[derive(Debug, Clone)]
pub struct MemberDef {
    /// Logical member name
    pub name: Box<str>,
    /// Declared type (field type, getter return, setter parameter)
    pub ty: TypeId,
    /// Element type when `ty` is a container
    pub generic: Option<TypeId>,
    /// Backing of the member
    pub kind: MemberKind,
}

impl MemberDef {
    /// Stored field
    pub fn field(name: impl Into<Box<str>>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            generic: None,
            kind: MemberKind::Field(None),
        }
    }

    /// Read method
    pub fn getter<F>(name: impl Into<Box<str>>, ty: TypeId, get: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ty,
            generic: None,
            kind: MemberKind::Getter(Arc::new(get)),
        }
    }

    /// Write method
    pub fn setter<F>(name: impl Into<Box<str>>, ty: TypeId, set: F) -> Self
    where
        F: Fn(&mut Object, Value) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ty,
            generic: None,
            kind: MemberKind::Setter(Arc::new(set)),
        }
    }

    /// Set the container element type
    pub fn generic(mut self, element: TypeId) -> Self {
        self.generic = Some(element);
        self
    }

    /// Set the field initializer (ignored for methods)
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        if let MemberKind::Field(slot) = &mut self.kind {
            *slot = Some(Arc::new(init));
        }
        self
    }
}

/// Declarative description of one type
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub(crate) name: Box<str>,
    pub(crate) kind: TypeKind,
    pub(crate) supertypes: Vec<TypeId>,
    pub(crate) role: TypeRole,
    pub(crate) members: Vec<MemberDef>,
    pub(crate) annotations: FxHashMap<Box<str>, Vec<Annotation>>,
    pub(crate) constructible: bool,
}

impl TypeDef {
    fn new(name: impl Into<Box<str>>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            supertypes: Vec::new(),
            role: TypeRole::Plain,
            members: Vec::new(),
            annotations: FxHashMap::default(),
            constructible: !matches!(kind, TypeKind::Interface | TypeKind::Scalar),
        }
    }

    /// Struct-like type
    pub fn class(name: impl Into<Box<str>>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// Interface (members only, no constructor)
    pub fn interface(name: impl Into<Box<str>>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Map-shaped type; `map` is added as supertype by the table
    pub fn map(name: impl Into<Box<str>>) -> Self {
        Self::new(name, TypeKind::Map)
    }

    /// Collection type; `list` or `set` is added as supertype by the table
    pub fn collection(name: impl Into<Box<str>>, kind: CollectionKind) -> Self {
        Self::new(name, TypeKind::Collection(kind))
    }

    pub(crate) fn scalar(name: &str) -> Self {
        Self::new(name, TypeKind::Scalar)
    }

    /// Superclass
    pub fn extends(mut self, parent: TypeId) -> Self {
        self.supertypes.push(parent);
        self
    }

    /// Implemented interface
    pub fn implements(mut self, interface: TypeId) -> Self {
        self.supertypes.push(interface);
        self
    }

    /// Mark as a mutator of `subject`
    pub fn mutator_of(mut self, subject: TypeId) -> Self {
        self.role = TypeRole::Mutator {
            subject: Some(subject),
        };
        self
    }

    /// Mark as a mutator without a declared subject
    pub fn mutator(mut self) -> Self {
        self.role = TypeRole::Mutator { subject: None };
        self
    }

    /// Mark as a response built from `subject`
    pub fn response_of(mut self, subject: TypeId) -> Self {
        self.role = TypeRole::Response {
            subject: Some(subject),
            mapping: None,
        };
        self
    }

    /// Mark as a response without a declared subject
    pub fn response(mut self) -> Self {
        self.role = TypeRole::Response {
            subject: None,
            mapping: None,
        };
        self
    }

    /// Mapping variant of a response type
    pub fn mapping(mut self, mapping: impl Into<Box<str>>) -> Self {
        match &mut self.role {
            TypeRole::Response { mapping: slot, .. } => *slot = Some(mapping.into()),
            role => {
                *role = TypeRole::Response {
                    subject: None,
                    mapping: Some(mapping.into()),
                }
            }
        }
        self
    }

    /// Declare a type without default constructor
    pub fn abstract_type(mut self) -> Self {
        self.constructible = false;
        self
    }

    /// Stored field
    pub fn field(self, name: impl Into<Box<str>>, ty: TypeId) -> Self {
        self.member(MemberDef::field(name, ty))
    }

    /// Stored container field with its element type
    pub fn field_of(self, name: impl Into<Box<str>>, ty: TypeId, element: TypeId) -> Self {
        self.member(MemberDef::field(name, ty).generic(element))
    }

    /// Read method
    pub fn getter<F>(self, name: impl Into<Box<str>>, ty: TypeId, get: F) -> Self
    where
        F: Fn(&Object) -> Value + Send + Sync + 'static,
    {
        self.member(MemberDef::getter(name, ty, get))
    }

    /// Write method
    pub fn setter<F>(self, name: impl Into<Box<str>>, ty: TypeId, set: F) -> Self
    where
        F: Fn(&mut Object, Value) + Send + Sync + 'static,
    {
        self.member(MemberDef::setter(name, ty, set))
    }

    /// Any member definition
    pub fn member(mut self, member: MemberDef) -> Self {
        self.members.push(member);
        self
    }

    /// Attach an annotation to the member called `name`
    pub fn annotate(mut self, name: impl Into<Box<str>>, annotation: Annotation) -> Self {
        let list = self.annotations.entry(name.into()).or_default();
        if !list.contains(&annotation) {
            list.push(annotation);
        }
        self
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural kind
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Declared supertypes, superclass and interfaces in declaration order
    pub fn supertypes(&self) -> &[TypeId] {
        &self.supertypes
    }

    /// Conversion role
    pub fn role(&self) -> &TypeRole {
        &self.role
    }

    /// Declared members, in declaration order
    pub fn members(&self) -> &[MemberDef] {
        &self.members
    }

    /// Annotations attached to `member`
    pub fn annotations_of(&self, member: &str) -> &[Annotation] {
        self.annotations
            .get(member)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the table can build instances of this type
    pub fn is_constructible(&self) -> bool {
        self.constructible
    }

    /// True for mutator types
    pub fn is_mutator(&self) -> bool {
        matches!(self.role, TypeRole::Mutator { .. })
    }

    /// True for response types
    pub fn is_response(&self) -> bool {
        matches!(self.role, TypeRole::Response { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_members_and_role() {
        let def = TypeDef::class("BookMutator")
            .mutator_of(TypeId::from_raw(42))
            .field("name", builtin::STR)
            .field_of("tags", builtin::LIST, builtin::STR)
            .annotate("name", Annotation::Excluded)
            .annotate("name", Annotation::Excluded);

        assert_eq!(def.name(), "BookMutator");
        assert_eq!(def.members().len(), 2);
        assert_eq!(def.members()[1].generic, Some(builtin::STR));
        assert_eq!(def.annotations_of("name"), &[Annotation::Excluded]);
        assert!(def.annotations_of("tags").is_empty());
        assert!(def.is_mutator());
        assert!(def.is_constructible());
    }

    #[test]
    fn test_mapping_turns_type_into_response() {
        let def = TypeDef::class("BookShort").mapping("short");
        assert_eq!(
            def.role(),
            &TypeRole::Response {
                subject: None,
                mapping: Some("short".into())
            }
        );

        let def = TypeDef::class("BookFull")
            .response_of(TypeId::from_raw(9))
            .mapping("full");
        assert!(matches!(
            def.role(),
            TypeRole::Response { subject: Some(_), mapping: Some(m) } if &**m == "full"
        ));
    }

    #[test]
    fn test_interfaces_are_not_constructible() {
        assert!(!TypeDef::interface("Named").is_constructible());
        assert!(!TypeDef::class("Base").abstract_type().is_constructible());
        assert!(TypeDef::map("Attributes").is_constructible());
    }
}
