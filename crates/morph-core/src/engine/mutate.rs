//! Mutation path: mutator → domain object

use std::sync::Arc;

use morph_types::{CollectionRef, TypeId, Value};
use tracing::{debug, trace};

use super::{unexpected, ConversionEngine};
use crate::error::ConversionError;
use crate::extension::{Context, DefaultMutatorHooks, MutatorHooks};
use crate::registry::{BoundPair, ClassMetadata, PairShape};
use crate::ConversionResult;

impl ConversionEngine {
    pub(super) fn mutate_at(
        &self,
        source: &Value,
        target: &Value,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<()> {
        let depth = self.descend(depth)?;
        let mutator = source
            .as_object()
            .ok_or_else(|| unexpected("mutator object", source))?;
        let source_ty = mutator.type_id();
        let metadata = self
            .registry
            .lookup_mutator(source_ty)
            .ok_or_else(|| ConversionError::MissingBinding {
                name: self.table().name_of(source_ty).to_string(),
            })?;
        if !matches!(target, Value::Object(_) | Value::Map(_)) {
            return Err(unexpected("domain object or map", target));
        }

        let hooks = self.mutator_hooks(source_ty);
        for pair in metadata.matched() {
            let name = pair.source.name();
            if !mutator.is_touched(name) {
                trace!(field = name, "untouched, skipped");
                continue;
            }
            if !hooks.require_process_field(&pair.source, context, target) {
                trace!(field = name, "rejected by field guard");
                continue;
            }
            self.check_declaring(&metadata, pair, target)?;

            let received = pair.source.get(source)?;
            let Some(value) = self.mutate_pair(pair, received, target, &*hooks, context, depth)?
            else {
                continue;
            };
            trace!(field = name, "written");
            pair.target.set(target, value)?;
        }

        hooks.fill(source, target, context)
    }

    /// Value to write for one touched pair, `None` to leave the target as is
    fn mutate_pair(
        &self,
        pair: &BoundPair,
        received: Value,
        target: &Value,
        hooks: &dyn MutatorHooks,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<Option<Value>> {
        if received.is_null() {
            // A null nested mutator leaves the member alone
            return Ok(match pair.shape {
                PairShape::Convertible => None,
                _ => Some(Value::Null),
            });
        }

        match &pair.shape {
            PairShape::Convertible => {
                if received.as_object().is_none()
                    || !hooks.require_process_nested(&pair.source, &received)
                {
                    return Ok(None);
                }
                let mut existing = pair.target.get(target)?;
                if existing.is_null() {
                    existing = self.table().instantiate(pair.target.declared_type())?;
                }
                self.mutate_nested(&received, &existing, target, context, depth)?;
                Ok(Some(existing))
            }
            PairShape::Collection {
                element,
                convertible,
                reconcile,
            } => {
                let Some(incoming) = received.as_collection() else {
                    return Ok(Some(received));
                };
                if *convertible && !hooks.require_process_nested(&pair.source, &received) {
                    return Ok(None);
                }
                match reconcile {
                    Some(reconcile) => {
                        let existing = pair.target.get(target)?;
                        let reconciled = self.reconcile(
                            incoming,
                            existing,
                            pair.target.declared_type(),
                            reconcile,
                            target,
                            context,
                            depth,
                        )?;
                        Ok(Some(reconciled))
                    }
                    None => {
                        let element = if *convertible { *element } else { None };
                        let rebuilt = self.rebuild(
                            incoming,
                            pair.target.declared_type(),
                            element,
                            target,
                            context,
                            depth,
                        )?;
                        Ok(Some(rebuilt))
                    }
                }
            }
            PairShape::Scalar | PairShape::Map => Ok(Some(received)),
        }
    }

    /// Mutate a nested mutator into `existing`, a member of `parent`
    pub(super) fn mutate_nested(
        &self,
        mutator: &Value,
        existing: &Value,
        parent: &Value,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<()> {
        let nested_ty = self.table().runtime_type(mutator);
        self.mutator_hooks(nested_ty)
            .fill_parent(mutator, existing, parent, context)?;
        self.mutate_at(mutator, existing, context, depth)
    }

    /// Build a fresh collection from `incoming`
    ///
    /// Used when the elements carry no identity to reconcile on. Mutator
    /// elements are mutated into new instances of `element`.
    fn rebuild(
        &self,
        incoming: &CollectionRef,
        collection_ty: TypeId,
        element: Option<TypeId>,
        parent: &Value,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<Value> {
        let rebuilt = self.table().instantiate(collection_ty)?;
        let collection = rebuilt
            .as_collection()
            .ok_or_else(|| unexpected("collection", &rebuilt))?;
        debug!(
            ty = %self.table().name_of(collection_ty),
            len = incoming.len(),
            "rebuilding collection without identity"
        );

        for item in incoming.elements() {
            match (element, &item) {
                (_, Value::Null) => {}
                (Some(element), Value::Object(_)) => {
                    let fresh = self.table().instantiate(element)?;
                    self.mutate_nested(&item, &fresh, parent, context, depth)?;
                    collection.push(fresh);
                }
                _ => {
                    collection.push(item);
                }
            }
        }
        Ok(rebuilt)
    }

    /// Matched target members must be declared on the built instance's type
    pub(super) fn check_declaring(
        &self,
        metadata: &ClassMetadata,
        pair: &BoundPair,
        target: &Value,
    ) -> ConversionResult<()> {
        if pair.target.is_map_entry() {
            return Ok(());
        }
        let table = self.table();
        let target_ty = table.runtime_type(target);
        let declared = pair.target.owner();
        if table.is_assignable(target_ty, declared) {
            return Ok(());
        }
        Err(ConversionError::DeclaringTypeMismatch {
            declared: pair.target.owner_name().to_string(),
            target: table.name_of(target_ty).to_string(),
            source_type: metadata
                .source_type()
                .map(|ty| table.name_of(ty))
                .unwrap_or("<unknown>")
                .to_string(),
            mapping: metadata.mapping().to_string(),
        })
    }

    fn mutator_hooks(&self, ty: TypeId) -> Arc<dyn MutatorHooks> {
        self.registry
            .mutator_hooks_for(ty)
            .unwrap_or_else(|| Arc::new(DefaultMutatorHooks))
    }
}
