//! Error types for registration, conversion and configuration

use morph_types::TypeError;
use thiserror::Error;

/// Configuration errors raised while registering bindings
///
/// These are fatal: they signal a wiring bug and are never retried.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    /// Type table error (unknown or undefined type)
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Registration of a pair where neither side is a converter
    #[error("Type {source_type} is neither a mutator nor a response for {target}")]
    NotConvertible {
        /// Name of the source type
        source_type: String,
        /// Name of the target type
        target: String,
    },

    /// A second response registered under the same domain type and mapping
    #[error(
        "Cannot register {response} for {domain} [{mapping}]: a response is already registered under this mapping"
    )]
    DuplicateMapping {
        /// Domain type name
        domain: String,
        /// Mapping name
        mapping: String,
        /// Response type that was rejected
        response: String,
    },

    /// A mutator type registered twice
    #[error("Mutator {mutator} is already registered")]
    DuplicateMutator {
        /// Mutator type name
        mutator: String,
    },

    /// More than one registered conversion could produce an element type
    #[error("Ambiguous conversion of {plain} through {converter}: candidates {candidates}")]
    AmbiguousConversion {
        /// Plain element type name
        plain: String,
        /// Converter element type name
        converter: String,
        /// Comma separated subject names
        candidates: String,
    },
}

/// Errors raised by a conversion call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversionError {
    /// Type table or accessor error
    #[error(transparent)]
    Type(#[from] TypeError),

    /// Projection of a type no response was registered for
    #[error("Type {name} is not registered for projection")]
    UnregisteredType {
        /// Source type name
        name: String,
    },

    /// Mutation from a type no mutator binding was registered for
    #[error("No mutation binding registered for {name}")]
    MissingBinding {
        /// Mutator type name
        name: String,
    },

    /// A matched target member declared on a type unrelated to the built instance
    #[error(
        "Cannot cast {declared} to {target} [{source_type} ({mapping})]. Have you registered two converters with the same mappings?"
    )]
    DeclaringTypeMismatch {
        /// Type declaring the target member
        declared: String,
        /// Type of the instance being built
        target: String,
        /// Source type name
        source_type: String,
        /// Active mapping name
        mapping: String,
    },

    /// A conversion entry point received a value of the wrong shape
    #[error("Expected {expected}, got {found}")]
    UnexpectedValue {
        /// Expected shape
        expected: &'static str,
        /// Shape that was found
        found: String,
    },

    /// Nesting deeper than the configured limit
    #[error("Conversion nested deeper than {max} levels")]
    DepthExceeded {
        /// Configured limit
        max: usize,
    },

    /// Failure reported by a user hook or resolver
    #[error("Hook failed: {0}")]
    Hook(String),
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
