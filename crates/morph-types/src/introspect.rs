//! Type introspection
//!
//! Enumerates the accessors of a type by walking its declared supertypes
//! and interfaces. Members with the same name coming from a field, a getter
//! and a setter are merged into one logical [`Accessor`].
//!
//! # Merge rules
//!
//! - The walk is breadth-first from the scanned type, nearest first, and the
//!   first declaration seen for each slot (field, getter, setter) wins
//! - Annotations are the union over the whole chain
//! - The declaring type of the merged accessor is the nearest type
//!   declaring any of its slots
//! - Output order is root-first, then declaration order inside each type
//!
//! Types in the explode set are boundaries: neither they nor their
//! supertypes contribute members.

use std::collections::VecDeque;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::accessor::{Accessor, AccessorParts};
use crate::table::TypeTable;
use crate::ty::{Annotation, Getter, MemberKind, Setter, TypeId};
use crate::TypeResult;

#[derive(Default)]
struct Slots {
    owner: Option<TypeId>,
    field: Option<(TypeId, Option<TypeId>)>,
    getter: Option<(TypeId, Option<TypeId>, Getter)>,
    setter: Option<(TypeId, Option<TypeId>, Setter)>,
    annotations: Vec<Annotation>,
}

/// Accessor enumeration over a [`TypeTable`]
#[derive(Debug, Clone, Copy)]
pub struct TypeIntrospector<'a> {
    table: &'a TypeTable,
}

impl<'a> TypeIntrospector<'a> {
    /// Introspector over `table`
    pub fn new(table: &'a TypeTable) -> Self {
        Self { table }
    }

    /// All accessors of `ty`
    pub fn scan(&self, ty: TypeId) -> TypeResult<Vec<Accessor>> {
        self.scan_with(ty, &FxHashSet::default())
    }

    /// All accessors of `ty`, not walking into the types in `explode`
    pub fn scan_with(&self, ty: TypeId, explode: &FxHashSet<TypeId>) -> TypeResult<Vec<Accessor>> {
        let chain = self.chain(ty, explode)?;

        // Order: root-first, declaration order within a type
        let mut merged: IndexMap<Box<str>, Slots> = IndexMap::new();
        for &t in chain.iter().rev() {
            for member in self.table.get(t)?.members() {
                merged.entry(member.name.clone()).or_default();
            }
        }

        // Slots: nearest declaration wins
        for &t in &chain {
            let def = self.table.get(t)?;
            for member in def.members() {
                let Some(slots) = merged.get_mut(&member.name) else {
                    continue;
                };
                let mut used = false;
                match &member.kind {
                    MemberKind::Field(_) if slots.field.is_none() => {
                        slots.field = Some((member.ty, member.generic));
                        used = true;
                    }
                    MemberKind::Getter(get) if slots.getter.is_none() => {
                        slots.getter = Some((member.ty, member.generic, get.clone()));
                        used = true;
                    }
                    MemberKind::Setter(set) if slots.setter.is_none() => {
                        slots.setter = Some((member.ty, member.generic, set.clone()));
                        used = true;
                    }
                    _ => {}
                }
                if used && slots.owner.is_none() {
                    slots.owner = Some(t);
                }
            }
            for (name, slots) in merged.iter_mut() {
                for annotation in def.annotations_of(name) {
                    if !slots.annotations.contains(annotation) {
                        slots.annotations.push(annotation.clone());
                    }
                }
            }
        }

        let accessors = merged
            .into_iter()
            .filter_map(|(name, slots)| self.build(name, slots))
            .collect();
        Ok(accessors)
    }

    fn chain(&self, ty: TypeId, explode: &FxHashSet<TypeId>) -> TypeResult<Vec<TypeId>> {
        let mut chain = vec![ty];
        let mut seen: FxHashSet<TypeId> = FxHashSet::default();
        seen.insert(ty);
        let mut pending: VecDeque<TypeId> = self.table.get(ty)?.supertypes().iter().copied().collect();

        while let Some(t) = pending.pop_front() {
            if explode.contains(&t) || !seen.insert(t) {
                continue;
            }
            chain.push(t);
            pending.extend(self.table.get(t)?.supertypes().iter().copied());
        }
        Ok(chain)
    }

    fn build(&self, name: Box<str>, slots: Slots) -> Option<Accessor> {
        let owner = slots.owner?;
        let (declared_type, generic_arg) = slots
            .field
            .or_else(|| slots.getter.as_ref().map(|(ty, g, _)| (*ty, *g)))
            .or_else(|| slots.setter.as_ref().map(|(ty, g, _)| (*ty, *g)))?;
        let generic_arg = generic_arg
            .or_else(|| slots.getter.as_ref().and_then(|(_, g, _)| *g))
            .or_else(|| slots.setter.as_ref().and_then(|(_, g, _)| *g));

        Some(Accessor::from_parts(AccessorParts {
            name,
            declared_type,
            generic_arg,
            owner,
            owner_name: self.table.name_of(owner).into(),
            annotations: slots.annotations,
            field: slots.field.is_some(),
            getter: slots.getter.map(|(_, _, get)| get),
            setter: slots.setter.map(|(_, _, set)| set),
        }))
    }

    /// Identity accessor among `accessors`
    ///
    /// An accessor annotated [`Annotation::Identifier`] wins over one named
    /// `id`.
    pub fn identity_of(accessors: &[Accessor]) -> Option<&Accessor> {
        accessors
            .iter()
            .find(|a| a.has_annotation(&Annotation::Identifier))
            .or_else(|| accessors.iter().find(|a| a.name() == "id"))
    }

    /// Identity accessor of `ty`, if it has one
    pub fn identity(&self, ty: TypeId) -> TypeResult<Option<Accessor>> {
        let accessors = self.scan(ty)?;
        Ok(Self::identity_of(&accessors).cloned())
    }
}
