//! Type table
//!
//! Owns every [`TypeDef`] of a process and hands out dense [`TypeId`]s.
//! Types can be reserved by name before they are defined, which lets
//! mutually referencing types (a book with authors, an author with books)
//! be declared in any order.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::TypeError;
use crate::object::{Collection, MapObject, Object};
use crate::ty::{builtin, CollectionKind, MemberKind, TypeDef, TypeId, TypeKind};
use crate::value::{CollectionRef, MapRef, ObjectRef, Value};
use crate::TypeResult;

/// Registry of type definitions
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Option<Arc<TypeDef>>>,
    names: Vec<Box<str>>,
    by_name: FxHashMap<Box<str>, TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Create a table holding the builtin types
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            names: Vec::new(),
            by_name: FxHashMap::default(),
        };

        let builtins = [
            TypeDef::scalar("any"),
            TypeDef::scalar("bool"),
            TypeDef::scalar("int"),
            TypeDef::scalar("float"),
            TypeDef::scalar("str"),
            TypeDef::collection("collection", CollectionKind::List),
            TypeDef::collection("list", CollectionKind::List).extends(builtin::COLLECTION),
            TypeDef::collection("set", CollectionKind::Set).extends(builtin::COLLECTION),
            TypeDef::map("map"),
        ];
        for def in builtins {
            let id = TypeId::from_raw(table.types.len() as u32);
            table.by_name.insert(def.name.clone(), id);
            table.names.push(def.name.clone());
            table.types.push(Some(Arc::new(def)));
        }
        debug_assert_eq!(table.types.len() as u32, builtin::COUNT);

        table
    }

    /// Reserve an id for `name` without defining it yet
    ///
    /// Returns the existing id when the name is already known.
    pub fn reserve(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(None);
        self.names.push(name.into());
        self.by_name.insert(name.into(), id);
        id
    }

    /// Define a type, filling its reserved slot if there is one
    pub fn define(&mut self, mut def: TypeDef) -> TypeResult<TypeId> {
        let name = def.name.clone();
        let id = self.reserve(&name);
        if self.types[id.index()].is_some() {
            return Err(TypeError::DuplicateType {
                name: def.name.to_string(),
            });
        }

        let kind = def.kind;
        match kind {
            TypeKind::Collection(kind) if !self.has_collection_parent(&def) => {
                def.supertypes.push(match kind {
                    CollectionKind::List => builtin::LIST,
                    CollectionKind::Set => builtin::SET,
                });
            }
            TypeKind::Map if !def.supertypes.contains(&builtin::MAP) => {
                def.supertypes.push(builtin::MAP);
            }
            _ => {}
        }

        self.check_annotations(&def)?;
        self.types[id.index()] = Some(Arc::new(def));
        Ok(id)
    }

    fn has_collection_parent(&self, def: &TypeDef) -> bool {
        def.supertypes
            .iter()
            .any(|&s| matches!(self.def(s).map(TypeDef::kind), Some(TypeKind::Collection(_))))
    }

    fn check_annotations(&self, def: &TypeDef) -> TypeResult<()> {
        'names: for name in def.annotations.keys() {
            if def.members.iter().any(|m| m.name == *name) {
                continue;
            }
            let mut pending = VecDeque::from(def.supertypes.clone());
            let mut seen = FxHashSet::default();
            while let Some(ty) = pending.pop_front() {
                if !seen.insert(ty) {
                    continue;
                }
                match self.def(ty) {
                    Some(parent) => {
                        if parent.members.iter().any(|m| m.name == *name) {
                            continue 'names;
                        }
                        pending.extend(parent.supertypes.iter().copied());
                    }
                    // Forward reference: checked once the parent exists
                    None => continue 'names,
                }
            }
            return Err(TypeError::UnknownMember {
                owner: def.name.to_string(),
                member: name.to_string(),
            });
        }
        Ok(())
    }

    /// Get a type definition
    pub fn get(&self, id: TypeId) -> TypeResult<&TypeDef> {
        match self.types.get(id.index()) {
            Some(Some(def)) => Ok(def),
            Some(None) => Err(TypeError::Undefined {
                name: self.names[id.index()].to_string(),
            }),
            None => Err(TypeError::UnknownType { id: id.as_u32() }),
        }
    }

    /// Get a type definition, `None` if unknown or only reserved
    pub fn def(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.index()).and_then(|d| d.as_deref())
    }

    /// Look up a type by name
    pub fn by_name(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Type name, `"<unknown>"` for foreign ids
    pub fn name_of(&self, id: TypeId) -> &str {
        self.names.get(id.index()).map_or("<unknown>", |n| n)
    }

    /// Number of known ids, reserved ones included
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false, builtins are present
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate defined types
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> {
        self.types
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_deref().map(|d| (TypeId::from_raw(i as u32), d)))
    }

    /// Fail if a reserved type was never defined
    pub fn check_complete(&self) -> TypeResult<()> {
        match self.types.iter().position(Option::is_none) {
            Some(i) => Err(TypeError::Undefined {
                name: self.names[i].to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Supertypes of `id`, breadth-first, nearest first
    ///
    /// `id` itself is not included. Every type except `any` ends with `any`.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(id);
        let mut pending: VecDeque<TypeId> = self
            .def(id)
            .map(|d| d.supertypes.iter().copied().collect())
            .unwrap_or_default();

        while let Some(ty) = pending.pop_front() {
            if !seen.insert(ty) {
                continue;
            }
            out.push(ty);
            if let Some(def) = self.def(ty) {
                pending.extend(def.supertypes.iter().copied());
            }
        }

        if id != builtin::ANY {
            out.retain(|&t| t != builtin::ANY);
            out.push(builtin::ANY);
        }
        out
    }

    /// Check whether a value of type `from` can be stored where `to` is expected
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || to == builtin::ANY {
            return true;
        }
        // Integers widen to float
        if from == builtin::INT && to == builtin::FLOAT {
            return true;
        }
        self.ancestors(from).contains(&to)
    }

    /// Concrete collection kind, `None` for non-collections
    pub fn collection_kind(&self, id: TypeId) -> Option<CollectionKind> {
        match self.def(id)?.kind {
            TypeKind::Collection(kind) => Some(kind),
            _ => None,
        }
    }

    /// Check whether `id` is a collection type
    pub fn is_collection(&self, id: TypeId) -> bool {
        self.collection_kind(id).is_some()
    }

    /// Check whether `id` is map-shaped
    pub fn is_map(&self, id: TypeId) -> bool {
        matches!(self.def(id).map(TypeDef::kind), Some(TypeKind::Map))
    }

    /// Check whether `id` is a scalar builtin
    pub fn is_scalar(&self, id: TypeId) -> bool {
        matches!(self.def(id).map(TypeDef::kind), Some(TypeKind::Scalar))
    }

    /// Run the default constructor of `id`
    ///
    /// Fields start at their initializer or null, inherited fields first.
    /// A field redeclared by a subtype takes the subtype's initializer.
    pub fn instantiate(&self, id: TypeId) -> TypeResult<Value> {
        let def = self.get(id)?;
        if !def.constructible {
            return Err(TypeError::NoDefaultConstructor {
                name: def.name.to_string(),
            });
        }

        match def.kind {
            TypeKind::Class => {
                let mut obj = Object::new(id);
                let mut chain = self.ancestors(id);
                chain.reverse();
                chain.push(id);
                for ty in chain {
                    let Some(ty_def) = self.def(ty) else { continue };
                    for member in &ty_def.members {
                        if let MemberKind::Field(init) = &member.kind {
                            let value = init.as_ref().map(|f| f()).unwrap_or_default();
                            obj.set(&member.name, value);
                        }
                    }
                }
                Ok(Value::Object(ObjectRef::new(obj)))
            }
            TypeKind::Collection(kind) => {
                let concrete = if id == builtin::COLLECTION {
                    builtin::LIST
                } else {
                    id
                };
                Ok(Value::Collection(CollectionRef::new(Collection::new(
                    concrete, kind,
                ))))
            }
            TypeKind::Map => Ok(Value::Map(MapRef::new(MapObject::new(id)))),
            TypeKind::Interface | TypeKind::Scalar => Err(TypeError::NoDefaultConstructor {
                name: def.name.to_string(),
            }),
        }
    }

    /// Runtime type of a value, `any` for null
    pub fn runtime_type(&self, value: &Value) -> TypeId {
        value.type_id().unwrap_or(builtin::ANY)
    }
}
