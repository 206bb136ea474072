//! Naming strategies
//!
//! Translate logical member names into the keys used by decoded payload
//! trees. The engine consults a strategy only when it crosses that
//! boundary: reading a payload into a mutator and pulling values out of a
//! map-shaped projection source.

use std::fmt;

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use morph_types::TypeId;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

/// Maps a logical member name to its wire name
pub trait NamingStrategy: Send + Sync {
    /// Wire name of `name`, a member declared on `owner` when known
    fn convert(&self, name: &str, owner: Option<TypeId>) -> String;
}

impl<F> NamingStrategy for F
where
    F: Fn(&str, Option<TypeId>) -> String + Send + Sync,
{
    fn convert(&self, name: &str, owner: Option<TypeId>) -> String {
        self(name, owner)
    }
}

/// Leaves names untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNaming;

impl NamingStrategy for IdentityNaming {
    fn convert(&self, name: &str, _owner: Option<TypeId>) -> String {
        name.to_string()
    }
}

/// Case convention of wire names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// Names are used as declared
    #[default]
    Identity,
    /// `page_count`
    SnakeCase,
    /// `pageCount`
    CamelCase,
    /// `page-count`
    KebabCase,
    /// `PageCount`
    PascalCase,
}

impl Convention {
    /// Apply the convention to `name`
    pub fn apply(self, name: &str) -> String {
        match self {
            Convention::Identity => name.to_string(),
            Convention::SnakeCase => name.to_snake_case(),
            Convention::CamelCase => name.to_lower_camel_case(),
            Convention::KebabCase => name.to_kebab_case(),
            Convention::PascalCase => name.to_upper_camel_case(),
        }
    }
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Convention::Identity => "identity",
            Convention::SnakeCase => "snake_case",
            Convention::CamelCase => "camel_case",
            Convention::KebabCase => "kebab_case",
            Convention::PascalCase => "pascal_case",
        })
    }
}

/// Converts names to a case convention
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseNaming(pub Convention);

impl NamingStrategy for CaseNaming {
    fn convert(&self, name: &str, _owner: Option<TypeId>) -> String {
        self.0.apply(name)
    }
}

/// Wraps a strategy and leaves some names untouched
///
/// A name is kept as declared when it is excluded globally, when its owner
/// type is excluded as a whole, or when it is excluded for that owner.
pub struct ExcludingNaming<N> {
    inner: N,
    names: FxHashSet<String>,
    types: FxHashSet<TypeId>,
    members: FxHashMap<TypeId, FxHashSet<String>>,
}

impl<N: NamingStrategy> ExcludingNaming<N> {
    /// Wrap `inner` with no exclusions
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            names: FxHashSet::default(),
            types: FxHashSet::default(),
            members: FxHashMap::default(),
        }
    }

    /// Keep `name` untouched on every type
    pub fn exclude_name(mut self, name: impl Into<String>) -> Self {
        self.names.insert(name.into());
        self
    }

    /// Keep every member of `owner` untouched
    pub fn exclude_type(mut self, owner: TypeId) -> Self {
        self.types.insert(owner);
        self
    }

    /// Keep `name` untouched on `owner`
    pub fn exclude_member(mut self, owner: TypeId, name: impl Into<String>) -> Self {
        self.members.entry(owner).or_default().insert(name.into());
        self
    }

    fn is_excluded(&self, name: &str, owner: Option<TypeId>) -> bool {
        if self.names.contains(name) {
            return true;
        }
        match owner {
            Some(owner) => {
                self.types.contains(&owner)
                    || self
                        .members
                        .get(&owner)
                        .is_some_and(|names| names.contains(name))
            }
            None => false,
        }
    }
}

impl<N: NamingStrategy> NamingStrategy for ExcludingNaming<N> {
    fn convert(&self, name: &str, owner: Option<TypeId>) -> String {
        if self.is_excluded(name, owner) {
            name.to_string()
        } else {
            self.inner.convert(name, owner)
        }
    }
}
