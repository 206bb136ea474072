//! Morph Core
//!
//! Object-graph conversion between independently declared types:
//! - Binding registry (type pairs, matched accessors, mapping variants)
//! - Mutation engine (touched-field PATCH with collection reconciliation)
//! - Projection engine (mapping variants, container resolvers, hooks)
//! - Payload decoding into mutators (JSON tree with touched keys)
//! - Naming strategies and configuration

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod extension;
pub mod naming;
pub mod registry;
pub mod resolvers;

pub use config::ConversionConfig;
pub use decode::{MutatorReader, NamingTouchedKeys, TouchedKeys};
pub use engine::ConversionEngine;
pub use error::{ConfigError, ConversionError, RegistryError};
pub use extension::{
    hook_error, ContainerResolver, Context, ContextProvider, DefaultMutatorHooks, MappingSelector,
    MutatorHooks, ResponseHooks,
};
pub use naming::{CaseNaming, Convention, ExcludingNaming, IdentityNaming, NamingStrategy};
pub use registry::{
    BindingRegistry, BindingRegistryBuilder, BoundPair, ClassMetadata, Direction, PairShape,
    Reconcile, COMMON_MAPPING,
};
pub use resolvers::CollectionResolver;

/// Registration result
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Conversion result
pub type ConversionResult<T> = Result<T, ConversionError>;
