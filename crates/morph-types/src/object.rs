//! Heap instances: class objects, collections and maps

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ty::{CollectionKind, TypeId};
use crate::value::Value;

/// Class instance
///
/// Fields are stored by logical member name. The touched set records which
/// fields were supplied by the caller of a partial update.
#[derive(Clone)]
pub struct Object {
    type_id: TypeId,
    fields: FxHashMap<Box<str>, Value>,
    touched: FxHashSet<Box<str>>,
}

impl Object {
    /// Empty instance of `type_id`
    pub fn new(type_id: TypeId) -> Self {
        Self {
            type_id,
            fields: FxHashMap::default(),
            touched: FxHashSet::default(),
        }
    }

    /// Runtime type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Raw field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write a raw field
    pub fn set(&mut self, name: &str, value: Value) {
        match self.fields.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.fields.insert(name.into(), value);
            }
        }
    }

    /// Iterate raw fields, in no particular order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (&**k, v))
    }

    /// Mark a field as touched
    pub fn touch(&mut self, name: &str) {
        if !self.touched.contains(name) {
            self.touched.insert(name.into());
        }
    }

    /// Check whether a field is touched
    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    /// Iterate touched field names
    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(|k| &**k)
    }

    pub(crate) fn fields_eq(&self, other: &Object) -> bool {
        let non_null = |o: &Object| o.fields.values().filter(|v| !v.is_null()).count();
        non_null(self) == non_null(other)
            && self
                .fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .all(|(k, v)| other.fields.get(k).is_some_and(|o| o == v))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&Box<str>> = self.fields.keys().collect();
        names.sort();
        write!(f, "{} ", self.type_id)?;
        let mut map = f.debug_map();
        for name in names {
            map.entry(name, &self.fields[name]);
        }
        map.finish()
    }
}

/// List or set of values
#[derive(Clone)]
pub struct Collection {
    type_id: TypeId,
    kind: CollectionKind,
    elements: Vec<Value>,
}

impl Collection {
    /// Empty collection
    pub fn new(type_id: TypeId, kind: CollectionKind) -> Self {
        Self {
            type_id,
            kind,
            elements: Vec::new(),
        }
    }

    /// Runtime type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Concrete kind
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Elements in insertion order
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append an element
    ///
    /// A set ignores an element it already holds (scalars compared by value,
    /// handles by identity) and returns false.
    pub fn push(&mut self, value: Value) -> bool {
        if self.kind == CollectionKind::Set && self.elements.iter().any(|e| e.same(&value)) {
            return false;
        }
        self.elements.push(value);
        true
    }

    /// Keep only the elements matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&Value) -> bool) {
        self.elements.retain(keep);
    }

    /// Remove every element
    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.type_id)?;
        match self.kind {
            CollectionKind::List => f.debug_list().entries(&self.elements).finish(),
            CollectionKind::Set => f.debug_set().entries(&self.elements).finish(),
        }
    }
}

/// String-keyed map, iteration follows insertion order
#[derive(Clone)]
pub struct MapObject {
    type_id: TypeId,
    entries: IndexMap<String, Value>,
}

impl MapObject {
    /// Empty map
    pub fn new(type_id: TypeId) -> Self {
        Self {
            type_id,
            entries: IndexMap::new(),
        }
    }

    /// Runtime type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Entry value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Check whether the key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    /// Remove an entry, keeping the order of the others
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Iterate entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_eq(&self, other: &MapObject) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for MapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.type_id)?;
        f.debug_map().entries(self.entries.iter()).finish()
    }
}
