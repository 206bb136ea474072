//! Type system errors

use thiserror::Error;

/// Errors raised by the type table, instantiation and accessors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// A type id that was never handed out by this table
    #[error("Unknown type id: {id}")]
    UnknownType {
        /// Raw type id
        id: u32,
    },

    /// A type that was reserved by name but never defined
    #[error("Type {name} was reserved but never defined")]
    Undefined {
        /// Reserved type name
        name: String,
    },

    /// Two definitions with the same name
    #[error("Type {name} is already defined")]
    DuplicateType {
        /// Conflicting type name
        name: String,
    },

    /// Instantiation of a type with no default constructor
    #[error("Cannot find default constructor on {name}")]
    NoDefaultConstructor {
        /// Type name
        name: String,
    },

    /// Annotation or lookup naming a member the type does not declare
    #[error("Type {owner} has no member named {member}")]
    UnknownMember {
        /// Declaring type name
        owner: String,
        /// Member name
        member: String,
    },

    /// Write through an accessor that has neither field nor setter
    #[error("Member {owner}.{member} is read-only")]
    ReadOnlyMember {
        /// Declaring type name
        owner: String,
        /// Member name
        member: String,
    },

    /// Read or write of a member on a value that has no members
    #[error("Cannot access member {member} on a {found} value")]
    NotAnObject {
        /// Member name
        member: String,
        /// Kind of value that was found instead
        found: &'static str,
    },
}
