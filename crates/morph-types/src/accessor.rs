//! Accessors
//!
//! An [`Accessor`] is a read/write handle over one logical member of a type.
//! It hides whether the member is backed by a stored field, a getter/setter
//! pair or both. When a method exists it is preferred over the field.
//!
//! Accessors are built by the [`TypeIntrospector`](crate::TypeIntrospector)
//! once per type and are immutable afterwards. Cloning is cheap.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::TypeError;
use crate::ty::{Annotation, Getter, Setter, TypeId};
use crate::value::Value;
use crate::TypeResult;

/// How an accessor is backed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    /// Stored field only
    Field,
    /// Getter and/or setter only
    Method,
    /// Stored field plus at least one method
    FieldWithMethod,
}

#[derive(Clone)]
enum Backing {
    Members {
        field: bool,
        getter: Option<Getter>,
        setter: Option<Setter>,
    },
    MapEntry,
}

struct Inner {
    name: Box<str>,
    declared_type: TypeId,
    generic_arg: Option<TypeId>,
    owner: TypeId,
    owner_name: Box<str>,
    annotations: Vec<Annotation>,
    backing: Backing,
}

/// Uniform handle over one named member
#[derive(Clone)]
pub struct Accessor(Arc<Inner>);

/// Parts of an accessor collected while scanning a type
pub(crate) struct AccessorParts {
    pub(crate) name: Box<str>,
    pub(crate) declared_type: TypeId,
    pub(crate) generic_arg: Option<TypeId>,
    pub(crate) owner: TypeId,
    pub(crate) owner_name: Box<str>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) field: bool,
    pub(crate) getter: Option<Getter>,
    pub(crate) setter: Option<Setter>,
}

impl Accessor {
    pub(crate) fn from_parts(parts: AccessorParts) -> Self {
        Accessor(Arc::new(Inner {
            name: parts.name,
            declared_type: parts.declared_type,
            generic_arg: parts.generic_arg,
            owner: parts.owner,
            owner_name: parts.owner_name,
            annotations: parts.annotations,
            backing: Backing::Members {
                field: parts.field,
                getter: parts.getter,
                setter: parts.setter,
            },
        }))
    }

    /// Synthetic accessor reading and writing one entry of a map-shaped type
    pub fn map_entry(
        name: impl Into<Box<str>>,
        owner: TypeId,
        owner_name: impl Into<Box<str>>,
        declared_type: TypeId,
    ) -> Self {
        Accessor(Arc::new(Inner {
            name: name.into(),
            declared_type,
            generic_arg: None,
            owner,
            owner_name: owner_name.into(),
            annotations: Vec::new(),
            backing: Backing::MapEntry,
        }))
    }

    /// Logical member name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared type
    pub fn declared_type(&self) -> TypeId {
        self.0.declared_type
    }

    /// Element type of a container member
    pub fn generic_arg(&self) -> Option<TypeId> {
        self.0.generic_arg
    }

    /// Type declaring the member
    pub fn owner(&self) -> TypeId {
        self.0.owner
    }

    /// Name of the declaring type
    pub fn owner_name(&self) -> &str {
        &self.0.owner_name
    }

    /// Annotations attached to the member
    pub fn annotations(&self) -> &[Annotation] {
        &self.0.annotations
    }

    /// Check for an annotation
    pub fn has_annotation(&self, annotation: &Annotation) -> bool {
        self.0.annotations.contains(annotation)
    }

    /// Backing kind
    pub fn kind(&self) -> AccessorKind {
        match &self.0.backing {
            Backing::Members {
                field: true,
                getter: None,
                setter: None,
            }
            | Backing::MapEntry => AccessorKind::Field,
            Backing::Members { field: true, .. } => AccessorKind::FieldWithMethod,
            Backing::Members { field: false, .. } => AccessorKind::Method,
        }
    }

    /// True for synthetic map-entry accessors
    pub fn is_map_entry(&self) -> bool {
        matches!(self.0.backing, Backing::MapEntry)
    }

    /// Check whether the member can be read
    pub fn is_readable(&self) -> bool {
        match &self.0.backing {
            Backing::Members { field, getter, .. } => *field || getter.is_some(),
            Backing::MapEntry => true,
        }
    }

    /// Check whether the member can be written
    pub fn is_writable(&self) -> bool {
        match &self.0.backing {
            Backing::Members { field, setter, .. } => *field || setter.is_some(),
            Backing::MapEntry => true,
        }
    }

    /// Read the member from `target`
    ///
    /// Objects go through the getter when there is one, else the field.
    /// Maps are read by key. A member with no read path reads as null.
    pub fn get(&self, target: &Value) -> TypeResult<Value> {
        match target {
            Value::Object(obj) => {
                let obj = obj.read();
                let value = match &self.0.backing {
                    Backing::Members {
                        getter: Some(get), ..
                    } => get(&*obj),
                    _ => obj.get(&self.0.name).cloned().unwrap_or_default(),
                };
                Ok(value)
            }
            Value::Map(map) => Ok(map.get(&self.0.name)),
            other => Err(TypeError::NotAnObject {
                member: self.0.name.to_string(),
                found: other.kind_name(),
            }),
        }
    }

    /// Write the member on `target`
    ///
    /// Objects go through the setter when there is one, else the field.
    /// Maps are written by key.
    pub fn set(&self, target: &Value, value: Value) -> TypeResult<()> {
        match target {
            Value::Object(obj) => {
                let mut obj = obj.write();
                match &self.0.backing {
                    Backing::Members {
                        setter: Some(set), ..
                    } => set(&mut *obj, value),
                    Backing::Members { field: true, .. } | Backing::MapEntry => {
                        obj.set(&self.0.name, value)
                    }
                    Backing::Members { .. } => {
                        return Err(TypeError::ReadOnlyMember {
                            owner: self.0.owner_name.to_string(),
                            member: self.0.name.to_string(),
                        })
                    }
                }
                Ok(())
            }
            Value::Map(map) => {
                map.insert(&self.0.name, value);
                Ok(())
            }
            other => Err(TypeError::NotAnObject {
                member: self.0.name.to_string(),
                found: other.kind_name(),
            }),
        }
    }
}

impl PartialEq for Accessor {
    fn eq(&self, other: &Self) -> bool {
        self.0.owner == other.0.owner && self.0.name == other.0.name
    }
}

impl Eq for Accessor {}

impl Hash for Accessor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.owner.hash(state);
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: {}",
            self.0.owner_name, self.0.name, self.0.declared_type
        )?;
        if let Some(generic) = self.0.generic_arg {
            write!(f, "<{}>", generic)?;
        }
        Ok(())
    }
}
