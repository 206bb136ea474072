//! Projection path: domain object → response

use morph_types::{Accessor, MapRef, TypeId, Value};
use tracing::{debug, trace};

use super::{unexpected, ConversionEngine};
use crate::error::ConversionError;
use crate::extension::Context;
use crate::registry::{BoundPair, ClassMetadata, PairShape};
use crate::ConversionResult;

/// How a projection picks its mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Selection {
    /// Entry point: the selector decides, no propagation by default
    Root,
    /// Propagated from a parent: the selector decides, propagation by default
    Propagated,
    /// The mapping is fixed, selectors are not consulted
    Declared,
}

/// Mapping state handed to nested projections
#[derive(Debug, Clone, Copy)]
struct Scope<'m> {
    mapping: &'m str,
    propagate: bool,
}

impl ConversionEngine {
    pub(super) fn project_at(
        &self,
        source: &Value,
        mapping: &str,
        context: Option<&Context>,
        selection: Selection,
        depth: usize,
    ) -> ConversionResult<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        let depth = self.descend(depth)?;
        let table = self.table();
        let source_ty = table.runtime_type(source);
        if !self.registry.is_present_response(source_ty) {
            return Err(ConversionError::UnregisteredType {
                name: table.name_of(source_ty).to_string(),
            });
        }

        let selector = match selection {
            Selection::Declared => None,
            _ => self.registry.selector_for(source_ty),
        };
        let (mapping, propagate) = match selector {
            Some(selector) => (
                selector.resolve_mapping(source, mapping),
                selector.propagation(source, mapping),
            ),
            None => (mapping.to_string(), selection == Selection::Propagated),
        };
        let metadata = self.registry.lookup_response(source_ty, &mapping);
        let Some(target_ty) = metadata.target_type() else {
            return Err(ConversionError::UnregisteredType {
                name: table.name_of(source_ty).to_string(),
            });
        };
        let response = table.instantiate(target_ty)?;
        let scope = Scope {
            mapping: &mapping,
            propagate,
        };

        match source {
            Value::Map(entries) if metadata.is_map_shaped() => {
                self.project_entries(&metadata, entries, &response, scope, context, depth)?;
            }
            _ => {
                for pair in metadata.matched() {
                    self.check_declaring(&metadata, pair, &response)?;
                    let value = pair.source.get(source)?;
                    let value = self.project_pair(pair, value, scope, context, depth)?;
                    pair.target.set(&response, value)?;
                }
            }
        }

        if let Some(hooks) = self.registry.response_hooks_for(target_ty) {
            hooks.fill(&response, source, self, context)?;
        }
        Ok(response)
    }

    fn project_pair(
        &self,
        pair: &BoundPair,
        value: Value,
        scope: Scope<'_>,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let target_ty = pair.target.declared_type();

        match &pair.shape {
            PairShape::Convertible => {
                self.project_nested(&value, target_ty, scope, context, depth)
            }
            PairShape::Collection {
                element,
                convertible,
                ..
            } => {
                let Some(items) = value.as_collection() else {
                    return Ok(value);
                };
                let projected = self.table().instantiate(target_ty)?;
                let collection = projected
                    .as_collection()
                    .ok_or_else(|| unexpected("collection", &projected))?;
                for item in items.elements() {
                    match element {
                        Some(element) if *convertible => {
                            if item.is_null() {
                                continue;
                            }
                            let item =
                                self.project_nested(&item, *element, scope, context, depth)?;
                            collection.push(item);
                        }
                        _ => {
                            collection.push(item);
                        }
                    }
                }
                Ok(projected)
            }
            PairShape::Scalar | PairShape::Map => Ok(value),
        }
    }

    /// Project a nested value that must end up assignable to `target_ty`
    fn project_nested(
        &self,
        value: &Value,
        target_ty: TypeId,
        scope: Scope<'_>,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<Value> {
        let declared = self
            .registry
            .mapping_of_response(target_ty)
            .unwrap_or(self.registry.common_mapping());
        if !scope.propagate {
            return self.project_at(value, declared, context, Selection::Declared, depth);
        }

        let projected =
            self.project_at(value, scope.mapping, context, Selection::Propagated, depth)?;
        let table = self.table();
        if projected.is_null() || table.is_assignable(table.runtime_type(&projected), target_ty) {
            return Ok(projected);
        }
        debug!(
            mapping = scope.mapping,
            fallback = declared,
            target = %table.name_of(target_ty),
            "propagated mapping does not fit the member, using its own"
        );
        self.project_at(value, declared, context, Selection::Declared, depth)
    }

    /// Fill a response from a map-shaped source
    ///
    /// Keys are looked up as declared, then through the naming strategy.
    /// Members typed as responses, or as collections of responses, are
    /// projected; other values of the wrong runtime type are left out.
    fn project_entries(
        &self,
        metadata: &ClassMetadata,
        entries: &MapRef,
        response: &Value,
        scope: Scope<'_>,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<()> {
        for accessor in metadata.target_accessors() {
            if !accessor.is_writable() {
                continue;
            }
            let value = self.pull(entries, accessor);
            if value.is_null() {
                continue;
            }
            match self.project_entry(accessor, value, scope, context, depth)? {
                Some(value) => accessor.set(response, value)?,
                None => trace!(key = accessor.name(), "map entry type mismatch, skipped"),
            }
        }
        Ok(())
    }

    fn project_entry(
        &self,
        accessor: &Accessor,
        value: Value,
        scope: Scope<'_>,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<Option<Value>> {
        let table = self.table();
        let declared = accessor.declared_type();

        if self.is_response_type(declared) && self.projectable(&value) {
            return self
                .project_nested(&value, declared, scope, context, depth)
                .map(Some);
        }

        if let (Some(element), Some(items)) = (accessor.generic_arg(), value.as_collection()) {
            if table.is_collection(declared) && self.is_response_type(element) {
                let projected = table.instantiate(declared)?;
                let collection = projected
                    .as_collection()
                    .ok_or_else(|| unexpected("collection", &projected))?;
                for item in items.elements() {
                    if !self.projectable(&item) {
                        continue;
                    }
                    collection.push(self.project_nested(&item, element, scope, context, depth)?);
                }
                return Ok(Some(projected));
            }
        }

        Ok(table
            .is_assignable(table.runtime_type(&value), declared)
            .then_some(value))
    }

    fn is_response_type(&self, ty: TypeId) -> bool {
        self.table().def(ty).is_some_and(|def| def.is_response())
    }

    /// Non-null value with a registered projection
    fn projectable(&self, value: &Value) -> bool {
        !value.is_null()
            && self
                .registry
                .is_present_response(self.table().runtime_type(value))
    }

    fn pull(&self, entries: &MapRef, accessor: &Accessor) -> Value {
        let raw = entries.get(accessor.name());
        if !raw.is_null() {
            return raw;
        }
        let wire = self
            .naming_strategy()
            .convert(accessor.name(), Some(accessor.owner()));
        entries.get(&wire)
    }
}
