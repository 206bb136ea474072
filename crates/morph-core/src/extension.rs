//! Extension points
//!
//! User code plugs into conversions through a handful of traits, each
//! registered against a type id on the
//! [`BindingRegistryBuilder`](crate::BindingRegistryBuilder):
//!
//! - [`MappingSelector`]: picks the mapping variant of a projection per
//!   source instance
//! - [`ContainerResolver`]: projects container-shaped values that are not
//!   registered domain types themselves
//! - [`ContextProvider`]: derives the ambient context of a projection
//! - [`MutatorHooks`]: field guards and manual filling for a mutator type
//! - [`ResponseHooks`]: manual filling of a response type
//!
//! Lookups resolve to the entry of the nearest registered ancestor of the
//! runtime type. Results are memoized per concrete type.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use morph_types::{Accessor, Annotation, TypeId, TypeTable, Value};
use rustc_hash::FxHashMap;

use crate::engine::ConversionEngine;
use crate::error::ConversionError;
use crate::ConversionResult;

/// Ambient, read-only value threaded through nested conversions
pub type Context = Arc<dyn Any + Send + Sync>;

/// Picks the mapping variant used to project an instance
pub trait MappingSelector: Send + Sync {
    /// Mapping to use for `source`, given the requested one
    fn resolve_mapping(&self, source: &Value, mapping: &str) -> String;

    /// Whether the resolved mapping applies to nested projections too
    fn propagation(&self, _source: &Value, _mapping: &str) -> bool {
        false
    }
}

/// Projects container-shaped values (collections, wrappers)
pub trait ContainerResolver: Send + Sync {
    /// Whether this resolver handles `source`
    fn claims(&self, _engine: &ConversionEngine, _source: &Value, _mapping: &str) -> bool {
        true
    }

    /// Representative element, used to pick the context provider
    fn example(&self, _source: &Value) -> Option<Value> {
        None
    }

    /// Build the projection of `source`
    fn resolve(
        &self,
        engine: &ConversionEngine,
        source: &Value,
        mapping: &str,
        context: Option<&Context>,
    ) -> ConversionResult<Value>;
}

/// Derives the projection context from the value being projected
pub trait ContextProvider: Send + Sync {
    /// Context for `source`, `None` keeps the current one
    fn map_context(&self, source: &Value) -> Option<Context>;
}

/// Per-mutator-type hooks
///
/// Every method has a default, so implementors override only what they
/// need. [`DefaultMutatorHooks`] is used for mutators without hooks.
pub trait MutatorHooks: Send + Sync {
    /// Field guard, independent of touched state
    ///
    /// The default rejects members annotated [`Annotation::Excluded`].
    fn require_process_field(
        &self,
        source: &Accessor,
        _context: Option<&Context>,
        _target: &Value,
    ) -> bool {
        !source.has_annotation(&Annotation::Excluded)
    }

    /// Guard for recursing into a nested mutator or collection
    fn require_process_nested(&self, _source: &Accessor, _received: &Value) -> bool {
        true
    }

    /// Called on a nested mutator before it fills `target`
    fn fill_parent(
        &self,
        _mutator: &Value,
        _target: &Value,
        _parent: &Value,
        _context: Option<&Context>,
    ) -> ConversionResult<()> {
        Ok(())
    }

    /// Manual filling after the structural copy
    fn fill(
        &self,
        _mutator: &Value,
        _target: &Value,
        _context: Option<&Context>,
    ) -> ConversionResult<()> {
        Ok(())
    }
}

/// Hooks used when a mutator type registers none
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMutatorHooks;

impl MutatorHooks for DefaultMutatorHooks {}

/// Per-response-type hook
pub trait ResponseHooks: Send + Sync {
    /// Manual filling of `response` after the structural copy from `source`
    fn fill(
        &self,
        response: &Value,
        source: &Value,
        engine: &ConversionEngine,
        context: Option<&Context>,
    ) -> ConversionResult<()>;
}

/// Extension entries keyed by type, resolved by nearest ancestor
pub(crate) struct ExtensionMap<T: ?Sized> {
    entries: FxHashMap<TypeId, Arc<T>>,
    cache: DashMap<TypeId, Option<Arc<T>>>,
}

impl<T: ?Sized> Default for ExtensionMap<T> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
            cache: DashMap::new(),
        }
    }
}

impl<T: ?Sized> ExtensionMap<T> {
    /// Register `entry` for `ty`, replacing a previous one
    pub(crate) fn insert(&mut self, ty: TypeId, entry: Arc<T>) -> Option<Arc<T>> {
        self.entries.insert(ty, entry)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry of `ty` or of its nearest registered ancestor
    ///
    /// Concurrent callers may both compute a missing entry. They compute the
    /// same result, the second insert is a no-op in effect.
    pub(crate) fn find(&self, table: &TypeTable, ty: TypeId) -> Option<Arc<T>> {
        if self.entries.is_empty() {
            return None;
        }
        if let Some(hit) = self.cache.get(&ty) {
            return hit.value().clone();
        }

        let found = self.entries.get(&ty).cloned().or_else(|| {
            table
                .ancestors(ty)
                .into_iter()
                .find_map(|ancestor| self.entries.get(&ancestor).cloned())
        });
        tracing::debug!(
            ty = %table.name_of(ty),
            found = found.is_some(),
            "extension lookup cached"
        );
        self.cache.insert(ty, found.clone());
        found
    }

    #[cfg(test)]
    pub(crate) fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Extension registrations of one registry
#[derive(Default)]
pub(crate) struct Extensions {
    pub(crate) selectors: ExtensionMap<dyn MappingSelector>,
    pub(crate) resolvers: ExtensionMap<dyn ContainerResolver>,
    pub(crate) contexts: ExtensionMap<dyn ContextProvider>,
    pub(crate) mutator_hooks: ExtensionMap<dyn MutatorHooks>,
    pub(crate) response_hooks: ExtensionMap<dyn ResponseHooks>,
}

/// Error helper for hooks returning plain messages
pub fn hook_error(message: impl Into<String>) -> ConversionError {
    ConversionError::Hook(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_types::TypeDef;

    struct Fixed(&'static str);

    impl MappingSelector for Fixed {
        fn resolve_mapping(&self, _source: &Value, _mapping: &str) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let mut table = TypeTable::new();
        let entity = table.define(TypeDef::class("Entity")).unwrap();
        let book = table.define(TypeDef::class("Book").extends(entity)).unwrap();
        let novel = table.define(TypeDef::class("Novel").extends(book)).unwrap();
        let point = table.define(TypeDef::class("Point")).unwrap();

        let mut map: ExtensionMap<dyn MappingSelector> = ExtensionMap::default();
        map.insert(entity, Arc::new(Fixed("entity")));
        map.insert(book, Arc::new(Fixed("book")));

        let pick = |ty| {
            map.find(&table, ty)
                .map(|s| s.resolve_mapping(&Value::Null, "common"))
        };
        assert_eq!(pick(novel).as_deref(), Some("book"));
        assert_eq!(pick(entity).as_deref(), Some("entity"));
        assert_eq!(pick(point), None);
        assert_eq!(map.cached(), 3);

        // Cached answers stay stable
        assert_eq!(pick(novel).as_deref(), Some("book"));
        assert_eq!(map.cached(), 3);
    }

    #[test]
    fn test_default_field_guard() {
        let mut table = TypeTable::new();
        let book = table
            .define(
                TypeDef::class("BookMutator")
                    .field("name", morph_types::builtin::STR)
                    .field("secret", morph_types::builtin::STR)
                    .annotate("secret", Annotation::Excluded),
            )
            .unwrap();
        let accessors = morph_types::TypeIntrospector::new(&table).scan(book).unwrap();

        let hooks = DefaultMutatorHooks;
        assert!(hooks.require_process_field(&accessors[0], None, &Value::Null));
        assert!(!hooks.require_process_field(&accessors[1], None, &Value::Null));
    }
}
