//! Accessor matching
//!
//! Decides which source and target accessors with the same logical name
//! form a bound pair. One side of every binding is the plain side (the
//! domain type), the other is the converter side (mutator or response).
//! Two accessors match when either:
//!
//! 1. They declare the same type and, for collections, the element types
//!    are equal or the converter element is registered for a subject the
//!    plain element is assignable to
//! 2. The converter-side type is itself a registered converter whose
//!    subject the plain-side type is assignable to

use morph_types::{Accessor, TypeId, TypeTable};
use rustc_hash::FxHashMap;

use crate::error::RegistryError;
use crate::RegistryResult;

/// Converter type → subjects it is registered for
pub(crate) type Subjects = FxHashMap<TypeId, Vec<TypeId>>;

pub(crate) struct Matcher<'a> {
    pub(crate) table: &'a TypeTable,
    pub(crate) subjects: &'a Subjects,
}

impl<'a> Matcher<'a> {
    /// Subject of `converter` that `plain` converts through
    ///
    /// An exact subject wins. Otherwise exactly one assignable subject must
    /// exist.
    pub(crate) fn subject_for(
        &self,
        converter: TypeId,
        plain: TypeId,
    ) -> RegistryResult<Option<TypeId>> {
        let Some(candidates) = self.subjects.get(&converter) else {
            return Ok(None);
        };
        if candidates.contains(&plain) {
            return Ok(Some(plain));
        }

        let assignable: Vec<TypeId> = candidates
            .iter()
            .copied()
            .filter(|&subject| self.table.is_assignable(plain, subject))
            .collect();
        match assignable.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            many => Err(RegistryError::AmbiguousConversion {
                plain: self.table.name_of(plain).to_string(),
                converter: self.table.name_of(converter).to_string(),
                candidates: many
                    .iter()
                    .map(|&s| self.table.name_of(s))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Whether `ty` is a registered converter
    pub(crate) fn is_converter(&self, ty: TypeId) -> bool {
        self.subjects.contains_key(&ty)
    }

    /// Rule 1: same declared type, compatible collection elements
    pub(crate) fn is_conventional_or_collection(
        &self,
        plain: &Accessor,
        converter: &Accessor,
    ) -> RegistryResult<bool> {
        if plain.declared_type() != converter.declared_type() {
            return Ok(false);
        }
        if !self.table.is_collection(plain.declared_type()) {
            return Ok(true);
        }

        match (plain.generic_arg(), converter.generic_arg()) {
            (None, None) => Ok(true),
            (Some(p), Some(c)) if p == c => Ok(true),
            (Some(p), Some(c)) => Ok(self.subject_for(c, p)?.is_some()),
            _ => Ok(false),
        }
    }

    /// Rule 2: the converter-side type knows how to convert the plain type
    pub(crate) fn is_converter_own(
        &self,
        plain: &Accessor,
        converter: &Accessor,
    ) -> RegistryResult<bool> {
        Ok(self
            .subject_for(converter.declared_type(), plain.declared_type())?
            .is_some())
    }
}
