//! Dynamic values and shared object handles
//!
//! Scalars are stored inline. Objects, collections and maps live behind
//! reference-counted handles so that the same instance can be referenced
//! from several places of a graph and mutated in place.
//!
//! # Identity vs. equality
//!
//! - Identity: two handles point to the same allocation (`ptr_eq`)
//! - Equality: `PartialEq` compares the type and the contents, recursively,
//!   and ignores touched-field sets

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::object::{Collection, MapObject, Object};
use crate::ty::{builtin, TypeId};

/// A dynamic value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// String
    Str(String),
    /// Class instance
    Object(ObjectRef),
    /// List or set
    Collection(CollectionRef),
    /// String-keyed map
    Map(MapRef),
}

impl Value {
    /// Check if this value is null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Object(_) => "object",
            Value::Collection(_) => "collection",
            Value::Map(_) => "map",
        }
    }

    /// Runtime type of this value, `None` for null
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(builtin::BOOL),
            Value::Int(_) => Some(builtin::INT),
            Value::Float(_) => Some(builtin::FLOAT),
            Value::Str(_) => Some(builtin::STR),
            Value::Object(obj) => Some(obj.type_id()),
            Value::Collection(coll) => Some(coll.type_id()),
            Value::Map(map) => Some(map.type_id()),
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float, integers are widened
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the object handle
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the collection handle
    pub fn as_collection(&self) -> Option<&CollectionRef> {
        match self {
            Value::Collection(coll) => Some(coll),
            _ => None,
        }
    }

    /// Get the map handle
    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Key used to correlate values by identity
    ///
    /// Scalars are keyed by value, handles by allocation. Null has no key.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(IdentityKey::Bool(*b)),
            Value::Int(i) => Some(IdentityKey::Int(*i)),
            Value::Float(f) => Some(IdentityKey::Float(f.to_bits())),
            Value::Str(s) => Some(IdentityKey::Str(s.as_str().into())),
            Value::Object(obj) => Some(IdentityKey::Handle(obj.addr())),
            Value::Collection(coll) => Some(IdentityKey::Handle(coll.addr())),
            Value::Map(map) => Some(IdentityKey::Handle(map.addr())),
        }
    }

    /// Same value for scalars, same allocation for handles
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Collection(a), Value::Collection(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (a, b) => a == b,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.read(), b.read());
                    a.type_id() == b.type_id() && a.fields_eq(&b)
                }
            }
            (Value::Collection(a), Value::Collection(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.read(), b.read());
                    a.type_id() == b.type_id() && a.elements() == b.elements()
                }
            }
            (Value::Map(a), Value::Map(b)) => {
                a.ptr_eq(b) || {
                    let (a, b) = (a.read(), b.read());
                    a.type_id() == b.type_id() && a.entries_eq(&b)
                }
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(obj) => fmt::Debug::fmt(&*obj.read(), f),
            Value::Collection(coll) => fmt::Debug::fmt(&*coll.read(), f),
            Value::Map(map) => fmt::Debug::fmt(&*map.read(), f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<CollectionRef> for Value {
    fn from(coll: CollectionRef) -> Self {
        Value::Collection(coll)
    }
}

impl From<MapRef> for Value {
    fn from(map: MapRef) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Hashable identity of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// Boolean identity
    Bool(bool),
    /// Integer identity
    Int(i64),
    /// Float identity, by bit pattern
    Float(u64),
    /// String identity
    Str(Box<str>),
    /// Allocation address of a handle
    Handle(usize),
}

macro_rules! shared_handle {
    ($(#[$doc:meta])* $name:ident => $inner:ty) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name(Arc<RwLock<$inner>>);

        impl $name {
            /// Wrap a value in a new shared handle
            pub fn new(inner: $inner) -> Self {
                $name(Arc::new(RwLock::new(inner)))
            }

            /// Shared read access
            pub fn read(&self) -> RwLockReadGuard<'_, $inner> {
                self.0.read()
            }

            /// Exclusive write access
            pub fn write(&self) -> RwLockWriteGuard<'_, $inner> {
                self.0.write()
            }

            /// Check whether both handles point to the same instance
            pub fn ptr_eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }

            /// Runtime type of the referenced instance
            pub fn type_id(&self) -> TypeId {
                self.0.read().type_id()
            }

            pub(crate) fn addr(&self) -> usize {
                Arc::as_ptr(&self.0) as *const () as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(&*self.read(), f)
            }
        }
    };
}

shared_handle! {
    /// Shared handle to a class instance
    ObjectRef => Object
}

shared_handle! {
    /// Shared handle to a collection
    CollectionRef => Collection
}

shared_handle! {
    /// Shared handle to a map
    MapRef => MapObject
}

impl ObjectRef {
    /// Raw field value, `Null` when unset
    pub fn get(&self, name: &str) -> Value {
        self.read().get(name).cloned().unwrap_or_default()
    }

    /// Write a raw field
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.write().set(name, value.into());
    }

    /// Mark a field as supplied by the caller
    pub fn touch(&self, name: &str) {
        self.write().touch(name);
    }

    /// Check whether a field was supplied by the caller
    pub fn is_touched(&self, name: &str) -> bool {
        self.read().is_touched(name)
    }

    /// Touched field names, sorted
    pub fn touched(&self) -> Vec<Box<str>> {
        let obj = self.read();
        let mut names: Vec<Box<str>> = obj.touched().map(Into::into).collect();
        names.sort();
        names
    }
}

impl CollectionRef {
    /// Number of elements
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the collection has no elements
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the elements
    pub fn elements(&self) -> Vec<Value> {
        self.read().elements().to_vec()
    }

    /// Append an element, returns false if a set already held it
    pub fn push(&self, value: impl Into<Value>) -> bool {
        self.write().push(value.into())
    }
}

impl MapRef {
    /// Entry value, `Null` when absent
    pub fn get(&self, key: &str) -> Value {
        self.read().get(key).cloned().unwrap_or_default()
    }

    /// Insert or replace an entry
    pub fn insert(&self, key: &str, value: impl Into<Value>) {
        self.write().insert(key, value.into());
    }
}
