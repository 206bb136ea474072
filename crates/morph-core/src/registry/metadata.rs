//! Binding metadata
//!
//! One [`ClassMetadata`] is computed per registered (type, mapping) pair
//! when the registry is built, and never changes afterwards.

use std::sync::Arc;

use indexmap::IndexMap;
use morph_types::{Accessor, TypeId};
use once_cell::sync::Lazy;

/// Direction of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Mutator → domain
    Mutation,
    /// Domain → response
    Projection,
}

/// Identity accessors used to reconcile a collection field
#[derive(Debug, Clone)]
pub struct Reconcile {
    /// Identity of incoming elements
    pub source_identity: Accessor,
    /// Identity of existing target elements
    pub target_identity: Accessor,
    /// Element type instantiated for new elements
    pub target_element: TypeId,
}

/// Conversion shape of a bound pair, resolved at registration time
#[derive(Debug, Clone)]
pub enum PairShape {
    /// Copied as is
    Scalar,
    /// Nested converter: recursive mutation or projection
    Convertible,
    /// Collection field
    Collection {
        /// Target-side element type
        element: Option<TypeId>,
        /// Whether elements go through a nested conversion
        convertible: bool,
        /// Identity correlation, mutation only
        reconcile: Option<Reconcile>,
    },
    /// Map-shaped value, copied as is
    Map,
}

/// A matched source → target accessor pair
#[derive(Debug, Clone)]
pub struct BoundPair {
    /// Accessor read from the source
    pub source: Accessor,
    /// Accessor written on the target
    pub target: Accessor,
    /// Precomputed conversion shape
    pub shape: PairShape,
}

/// Structural correspondence of one registered type pair
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    pub(crate) direction: Direction,
    pub(crate) source_type: Option<TypeId>,
    pub(crate) target_type: Option<TypeId>,
    pub(crate) mapping: Box<str>,
    pub(crate) matched: IndexMap<Box<str>, BoundPair>,
    pub(crate) source_accessors: Vec<Accessor>,
    pub(crate) target_accessors: Vec<Accessor>,
    pub(crate) is_map_shaped: bool,
}

static EMPTY: Lazy<Arc<ClassMetadata>> = Lazy::new(|| {
    Arc::new(ClassMetadata {
        direction: Direction::Projection,
        source_type: None,
        target_type: None,
        mapping: "".into(),
        matched: IndexMap::new(),
        source_accessors: Vec::new(),
        target_accessors: Vec::new(),
        is_map_shaped: false,
    })
});

impl ClassMetadata {
    /// Shared metadata with no bindings, returned for unregistered types
    pub fn empty() -> Arc<ClassMetadata> {
        EMPTY.clone()
    }

    /// Check whether this is the empty metadata
    pub fn is_empty(&self) -> bool {
        self.target_type.is_none()
    }

    /// Binding direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Registered source type (mutator or domain)
    pub fn source_type(&self) -> Option<TypeId> {
        self.source_type
    }

    /// Type instantiated by conversions (domain or response)
    pub fn target_type(&self) -> Option<TypeId> {
        self.target_type
    }

    /// Mapping name this metadata was registered under
    pub fn mapping(&self) -> &str {
        &self.mapping
    }

    /// Matched pairs, in source declaration order
    pub fn matched(&self) -> impl Iterator<Item = &BoundPair> {
        self.matched.values()
    }

    /// Number of matched pairs
    pub fn matched_len(&self) -> usize {
        self.matched.len()
    }

    /// Matched pair whose source accessor is called `name`
    pub fn pair(&self, name: &str) -> Option<&BoundPair> {
        self.matched.get(name)
    }

    /// Every recorded source accessor
    pub fn source_accessors(&self) -> &[Accessor] {
        &self.source_accessors
    }

    /// Every target accessor
    pub fn target_accessors(&self) -> &[Accessor] {
        &self.target_accessors
    }

    /// Recorded source accessor called `name`
    pub fn source_accessor(&self, name: &str) -> Option<&Accessor> {
        self.source_accessors.iter().find(|a| a.name() == name)
    }

    /// Whether the domain side is a map
    pub fn is_map_shaped(&self) -> bool {
        self.is_map_shaped
    }
}
