//! Identity-preserving collection reconciliation
//!
//! Given the existing target collection and an incoming collection of
//! mutators, both keyed by their identity member:
//!
//! 1. Existing elements whose identity is not among the incoming ones are
//!    removed. Existing elements without identity are removed too.
//! 2. Every incoming mutator is applied to the existing element with the
//!    same identity, in place. Mutators with a null or unknown identity
//!    are applied to a new element appended to the collection.
//! 3. Incoming scalars are appended as is.
//!
//! Surviving elements keep their position and their object identity, new
//! elements follow in incoming order.

use morph_types::{Accessor, CollectionRef, IdentityKey, TypeId, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{unexpected, ConversionEngine};
use crate::extension::Context;
use crate::registry::Reconcile;
use crate::ConversionResult;

impl ConversionEngine {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn reconcile(
        &self,
        incoming: &CollectionRef,
        existing: Value,
        collection_ty: TypeId,
        reconcile: &Reconcile,
        parent: &Value,
        context: Option<&Context>,
        depth: usize,
    ) -> ConversionResult<Value> {
        let existing = match existing {
            Value::Collection(_) => existing,
            _ => self.table().instantiate(collection_ty)?,
        };
        let collection = existing
            .as_collection()
            .ok_or_else(|| unexpected("collection", &existing))?;

        let incoming = incoming.elements();
        let mut wanted = FxHashSet::default();
        for item in &incoming {
            if let Some(key) = identity_of(&reconcile.source_identity, item)? {
                wanted.insert(key);
            }
        }

        let mut by_identity: FxHashMap<IdentityKey, Value> = FxHashMap::default();
        let mut survivors = Vec::new();
        let mut removed = 0usize;
        for element in collection.elements() {
            match identity_of(&reconcile.target_identity, &element)? {
                Some(key) if wanted.contains(&key) => {
                    by_identity.entry(key).or_insert_with(|| element.clone());
                    survivors.push(element);
                }
                _ => removed += 1,
            }
        }
        {
            let mut guard = collection.write();
            guard.clear();
            for element in survivors {
                guard.push(element);
            }
        }

        let mut created = 0usize;
        for item in incoming {
            match &item {
                Value::Null => {}
                Value::Object(_) => {
                    let matched = identity_of(&reconcile.source_identity, &item)?
                        .and_then(|key| by_identity.get(&key).cloned());
                    let element = match matched {
                        Some(element) => element,
                        None => {
                            created += 1;
                            let fresh = self.table().instantiate(reconcile.target_element)?;
                            collection.push(fresh.clone());
                            fresh
                        }
                    };
                    self.mutate_nested(&item, &element, parent, context, depth)?;
                }
                _ => {
                    collection.push(item);
                }
            }
        }

        debug!(
            ty = %self.table().name_of(collection_ty),
            removed,
            created,
            len = collection.len(),
            "reconciled collection"
        );
        Ok(existing)
    }
}

/// Identity key of a collection element, `None` when it has none
fn identity_of(identity: &Accessor, element: &Value) -> ConversionResult<Option<IdentityKey>> {
    match element {
        Value::Object(_) | Value::Map(_) => Ok(identity.get(element)?.identity_key()),
        _ => Ok(None),
    }
}
