//! Conversion engine
//!
//! Two entry points over a frozen [`BindingRegistry`]:
//!
//! - [`ConversionEngine::mutate`] applies the touched fields of a mutator
//!   onto an existing domain object
//! - [`ConversionEngine::project`] builds a response from a domain object
//!
//! Conversions are synchronous, in-memory and never cache per-call state,
//! so one engine can be shared across threads. Object graphs must be
//! acyclic; `max_depth` in the configuration turns runaway nesting into an
//! error instead of a stack overflow.

mod mutate;
mod project;
mod reconcile;
mod resolve;

use std::fmt;
use std::sync::Arc;

use morph_types::{TypeTable, Value};

use crate::config::ConversionConfig;
use crate::decode::MutatorReader;
use crate::error::ConversionError;
use crate::extension::Context;
use crate::naming::NamingStrategy;
use crate::registry::BindingRegistry;
use crate::ConversionResult;

use project::Selection;

/// Mutation and projection over a binding registry
#[derive(Clone)]
pub struct ConversionEngine {
    registry: Arc<BindingRegistry>,
    naming: Arc<dyn NamingStrategy>,
    config: ConversionConfig,
    context: Option<Context>,
}

impl ConversionEngine {
    /// Create an engine with the default configuration
    pub fn new(registry: Arc<BindingRegistry>) -> Self {
        Self::with_config(registry, ConversionConfig::default())
    }

    /// Create an engine, taking the naming strategy from `config`
    pub fn with_config(registry: Arc<BindingRegistry>, config: ConversionConfig) -> Self {
        Self {
            registry,
            naming: config.naming_strategy(),
            config,
            context: None,
        }
    }

    /// Replace the naming strategy
    pub fn naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    /// Context used when a call passes none
    pub fn default_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Binding registry
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Type table of the registry
    pub fn table(&self) -> &TypeTable {
        self.registry.table()
    }

    /// Active naming strategy
    pub fn naming_strategy(&self) -> &dyn NamingStrategy {
        &*self.naming
    }

    /// Active configuration
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Reader turning decoded payloads into mutators
    pub fn reader(&self) -> MutatorReader<'_> {
        MutatorReader::new(&self.registry, &*self.naming)
    }

    /// Apply the touched fields of `source` onto `target`
    ///
    /// `target` is modified in place and handed back.
    pub fn mutate(&self, source: &Value, target: Value) -> ConversionResult<Value> {
        self.mutate_with(source, target, None)
    }

    /// [`mutate`](Self::mutate) with an explicit context for the hooks
    pub fn mutate_with(
        &self,
        source: &Value,
        target: Value,
        context: Option<&Context>,
    ) -> ConversionResult<Value> {
        let context = context.or(self.context.as_ref());
        self.mutate_at(source, &target, context, 0)?;
        Ok(target)
    }

    /// Project `source` under `mapping`
    ///
    /// Fails with [`ConversionError::UnregisteredType`] when no projection is
    /// registered for the runtime type of `source`. Null projects to null.
    pub fn project(
        &self,
        source: &Value,
        mapping: &str,
        context: Option<&Context>,
    ) -> ConversionResult<Value> {
        let context = context.or(self.context.as_ref());
        self.project_at(source, mapping, context, Selection::Root, 0)
    }

    /// Project `source`, letting container resolvers and context providers
    /// claim it first
    pub fn project_resolve(
        &self,
        source: &Value,
        mapping: &str,
        context: Option<&Context>,
    ) -> ConversionResult<Value> {
        let context = context.or(self.context.as_ref());
        self.resolve_at(source, mapping, context)
    }

    /// Nesting level after entering one more conversion
    fn descend(&self, depth: usize) -> ConversionResult<usize> {
        match self.config.max_depth {
            Some(max) if depth >= max => Err(ConversionError::DepthExceeded { max }),
            _ => Ok(depth + 1),
        }
    }
}

impl fmt::Debug for ConversionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("context", &self.context.is_some())
            .finish()
    }
}

fn unexpected(expected: &'static str, found: &Value) -> ConversionError {
    ConversionError::UnexpectedValue {
        expected,
        found: found.kind_name().to_string(),
    }
}
