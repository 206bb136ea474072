//! Decoded payload → mutator
//!
//! The reader walks a `serde_json` tree and fills a mutator instance from
//! it. Only the keys present in the payload are written and marked as
//! touched, which is what gives mutation its PATCH semantics:
//!
//! ```ignore
//! let mutator = engine.reader().read(book_mutator, &json!({"name": "X"}))?;
//! engine.mutate(&mutator, book)?; // only `name` changes
//! ```
//!
//! Wire keys are derived from logical member names by the naming strategy.
//! Unknown keys are ignored. A value whose JSON kind does not fit the
//! declared member type is dropped and its key is not marked touched, so
//! mutation leaves the domain value alone. Plain (non-mutator) class members
//! are read into fresh instances of their declared type.

use std::sync::Arc;

use morph_types::{
    builtin, Collection, CollectionKind, CollectionRef, MapObject, MapRef, TypeId,
    TypeIntrospector, TypeKind, Value,
};
use serde_json::{Map, Value as Json};
use tracing::trace;

use crate::error::ConversionError;
use crate::naming::NamingStrategy;
use crate::registry::{BindingRegistry, ClassMetadata};
use crate::ConversionResult;

/// Provides the touched keys of a decoded payload
pub trait TouchedKeys {
    /// Logical names of the members of `ty` present in `payload`
    fn touched_keys(&self, ty: TypeId, payload: &Map<String, Json>) -> Vec<String>;
}

/// Touched keys resolved through the registry and a naming strategy
pub struct NamingTouchedKeys<'a> {
    registry: &'a BindingRegistry,
    naming: &'a dyn NamingStrategy,
}

impl<'a> NamingTouchedKeys<'a> {
    /// Create a provider over `registry`
    pub fn new(registry: &'a BindingRegistry, naming: &'a dyn NamingStrategy) -> Self {
        Self { registry, naming }
    }
}

impl TouchedKeys for NamingTouchedKeys<'_> {
    fn touched_keys(&self, ty: TypeId, payload: &Map<String, Json>) -> Vec<String> {
        let Some(metadata) = self.registry.lookup_mutator(ty) else {
            return Vec::new();
        };
        metadata
            .source_accessors()
            .iter()
            .filter(|accessor| {
                let wire = self.naming.convert(accessor.name(), Some(accessor.owner()));
                payload.contains_key(&wire)
            })
            .map(|accessor| accessor.name().to_string())
            .collect()
    }
}

/// Reads decoded payloads into mutator instances
pub struct MutatorReader<'a> {
    registry: &'a BindingRegistry,
    naming: &'a dyn NamingStrategy,
    touched: Box<dyn TouchedKeys + 'a>,
}

impl<'a> MutatorReader<'a> {
    /// Create a reader using [`NamingTouchedKeys`]
    pub fn new(registry: &'a BindingRegistry, naming: &'a dyn NamingStrategy) -> Self {
        Self {
            registry,
            naming,
            touched: Box::new(NamingTouchedKeys::new(registry, naming)),
        }
    }

    /// Replace the touched key provider
    pub fn touched_keys(mut self, provider: impl TouchedKeys + 'a) -> Self {
        self.touched = Box::new(provider);
        self
    }

    /// Read a JSON object into a new instance of the mutator type `ty`
    pub fn read(&self, ty: TypeId, payload: &Json) -> ConversionResult<Value> {
        let Json::Object(fields) = payload else {
            return Err(ConversionError::UnexpectedValue {
                expected: "JSON object",
                found: json_kind(payload).to_string(),
            });
        };
        let metadata = self.metadata(ty)?;
        let mutator = self.registry.table().instantiate(ty)?;
        let Value::Object(obj) = &mutator else {
            return Err(ConversionError::UnexpectedValue {
                expected: "mutator object",
                found: mutator.kind_name().to_string(),
            });
        };

        for name in self.touched.touched_keys(ty, fields) {
            let Some(accessor) = metadata.source_accessor(&name) else {
                continue;
            };
            if !accessor.is_writable() {
                continue;
            }
            let wire = self.naming.convert(accessor.name(), Some(accessor.owner()));
            let Some(raw) = fields.get(&wire) else {
                continue;
            };
            let Some(value) =
                self.decode(accessor.declared_type(), accessor.generic_arg(), raw)?
            else {
                trace!(key = %wire, found = json_kind(raw), "undecodable value, not touched");
                continue;
            };
            accessor.set(&mutator, value)?;
            obj.touch(accessor.name());
        }
        Ok(mutator)
    }

    /// Read a JSON array into a list of mutators of type `ty`
    ///
    /// Null entries are kept as null.
    pub fn read_collection(&self, ty: TypeId, payload: &Json) -> ConversionResult<Value> {
        let Json::Array(items) = payload else {
            return Err(ConversionError::UnexpectedValue {
                expected: "JSON array",
                found: json_kind(payload).to_string(),
            });
        };
        let list = CollectionRef::new(Collection::new(builtin::LIST, CollectionKind::List));
        for item in items {
            let value = match item {
                Json::Null => Value::Null,
                other => self.read(ty, other)?,
            };
            list.push(value);
        }
        Ok(Value::Collection(list))
    }

    fn metadata(&self, ty: TypeId) -> ConversionResult<Arc<ClassMetadata>> {
        self.registry
            .lookup_mutator(ty)
            .ok_or_else(|| ConversionError::MissingBinding {
                name: self.registry.table().name_of(ty).to_string(),
            })
    }

    /// Decode one JSON value for a member declared as `ty<generic>`
    fn decode(
        &self,
        ty: TypeId,
        generic: Option<TypeId>,
        raw: &Json,
    ) -> ConversionResult<Option<Value>> {
        let table = self.registry.table();
        if raw.is_null() {
            return Ok(Some(Value::Null));
        }

        if table.is_collection(ty) {
            let Json::Array(items) = raw else {
                return Ok(None);
            };
            let collection = table.instantiate(ty)?;
            if let Some(target) = collection.as_collection() {
                let element = generic.unwrap_or(builtin::ANY);
                for item in items {
                    if let Some(value) = self.decode(element, None, item)? {
                        target.push(value);
                    }
                }
            }
            return Ok(Some(collection));
        }

        if self.registry.is_present_mutator(ty) {
            return match raw {
                Json::Object(_) => self.read(ty, raw).map(Some),
                _ => Ok(None),
            };
        }

        if table.is_map(ty) {
            let Json::Object(entries) = raw else {
                return Ok(None);
            };
            let map = table.instantiate(ty)?;
            if let Some(target) = map.as_map() {
                for (key, item) in entries {
                    target.insert(key, untyped(item));
                }
            }
            return Ok(Some(map));
        }

        if let Some(def) = table.def(ty) {
            if def.kind() == TypeKind::Class && def.is_constructible() {
                return match raw {
                    Json::Object(fields) => self.read_plain(ty, fields).map(Some),
                    _ => Ok(None),
                };
            }
        }

        Ok(match ty {
            builtin::BOOL => raw.as_bool().map(Value::Bool),
            builtin::INT => raw.as_i64().map(Value::Int),
            builtin::FLOAT => raw.as_f64().map(Value::Float),
            builtin::STR => raw.as_str().map(Value::from),
            builtin::ANY => Some(untyped(raw)),
            _ => None,
        })
    }
}

impl MutatorReader<'_> {
    /// Fill a new instance of the plain class `ty` from every matching key
    fn read_plain(&self, ty: TypeId, fields: &Map<String, Json>) -> ConversionResult<Value> {
        let table = self.registry.table();
        let instance = table.instantiate(ty)?;
        for accessor in TypeIntrospector::new(table).scan(ty)? {
            if !accessor.is_writable() {
                continue;
            }
            let wire = self.naming.convert(accessor.name(), Some(accessor.owner()));
            let Some(raw) = fields.get(&wire) else {
                continue;
            };
            if let Some(value) =
                self.decode(accessor.declared_type(), accessor.generic_arg(), raw)?
            {
                accessor.set(&instance, value)?;
            }
        }
        Ok(instance)
    }
}

/// Value of a JSON tree with no declared type
fn untyped(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => {
            let list = CollectionRef::new(Collection::new(builtin::LIST, CollectionKind::List));
            for item in items {
                list.push(untyped(item));
            }
            Value::Collection(list)
        }
        Json::Object(entries) => {
            let map = MapRef::new(MapObject::new(builtin::MAP));
            for (key, item) in entries {
                map.insert(key, untyped(item));
            }
            Value::Map(map)
        }
    }
}

fn json_kind(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
