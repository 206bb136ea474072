//! Binding registry
//!
//! The registry holds, for every registered (type, mapping) pair, the
//! structural correspondence between two independently declared types.
//! Registrations are collected by a [`BindingRegistryBuilder`]; metadata is
//! computed once in [`BindingRegistryBuilder::build`], after every
//! registration is known, and is read-only afterwards.
//!
//! ```ignore
//! let registry = BindingRegistry::builder(table)
//!     .register(book_mutator, book, None)?
//!     .register(book, book_response, None)?
//!     .register(book, book_short, Some("short"))?
//!     .build()?;
//! ```
//!
//! # Lookup rules
//!
//! - Mutators are looked up by their own type
//! - Responses are looked up by the domain type or its nearest registered
//!   ancestor, then by mapping name, falling back to the common mapping
//! - An unregistered type resolves to the shared empty metadata

mod matching;
mod metadata;

use std::fmt;
use std::sync::Arc;

use morph_types::{
    builtin, Accessor, Annotation, TypeId, TypeIntrospector, TypeKind, TypeRole, TypeTable,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::config::ConversionConfig;
use crate::error::RegistryError;
use crate::extension::{
    ContainerResolver, ContextProvider, Extensions, MappingSelector, MutatorHooks, ResponseHooks,
};
use crate::resolvers::CollectionResolver;
use crate::RegistryResult;

use matching::{Matcher, Subjects};
pub use metadata::{BoundPair, ClassMetadata, Direction, PairShape, Reconcile};

/// Default mapping name
pub const COMMON_MAPPING: &str = "common";

#[derive(Debug, Clone)]
struct Registration {
    direction: Direction,
    source: TypeId,
    target: TypeId,
    mapping: Box<str>,
}

/// Collects registrations and extension points
pub struct BindingRegistryBuilder {
    table: TypeTable,
    common: Box<str>,
    explode: FxHashSet<TypeId>,
    registrations: Vec<Registration>,
    response_keys: FxHashSet<(TypeId, Box<str>)>,
    mutator_keys: FxHashSet<TypeId>,
    extensions: Extensions,
}

impl BindingRegistryBuilder {
    fn new(table: TypeTable) -> Self {
        let mut extensions = Extensions::default();
        extensions
            .resolvers
            .insert(builtin::COLLECTION, Arc::new(CollectionResolver));

        Self {
            table,
            common: COMMON_MAPPING.into(),
            explode: FxHashSet::default(),
            registrations: Vec::new(),
            response_keys: FxHashSet::default(),
            mutator_keys: FxHashSet::default(),
            extensions,
        }
    }

    /// Apply the registry-related parts of a configuration
    pub fn configure(mut self, config: &ConversionConfig) -> Self {
        self.common = config.common_mapping.as_str().into();
        self
    }

    /// Set the mapping name used as fallback
    pub fn common_mapping(mut self, mapping: &str) -> Self {
        self.common = mapping.into();
        self
    }

    /// Do not scan members of `ty` or its supertypes
    pub fn explode(mut self, ty: TypeId) -> Self {
        self.explode.insert(ty);
        self
    }

    /// Register a binding, inferring its direction from the type roles
    ///
    /// A mutator `source` binds mutation onto `target`. A response `target`
    /// binds projection from `source`, under `mapping` or the mapping the
    /// response declares.
    pub fn register(
        self,
        source: TypeId,
        target: TypeId,
        mapping: Option<&str>,
    ) -> RegistryResult<Self> {
        let is_mutator = self.table.get(source)?.is_mutator();
        let is_response = self.table.get(target)?.is_response();

        if is_mutator {
            self.register_mutator(source, target)
        } else if is_response {
            self.register_response(source, target, mapping)
        } else {
            Err(RegistryError::NotConvertible {
                source_type: self.table.name_of(source).to_string(),
                target: self.table.name_of(target).to_string(),
            })
        }
    }

    /// Register mutation from `mutator` onto `domain`
    pub fn register_mutator(mut self, mutator: TypeId, domain: TypeId) -> RegistryResult<Self> {
        self.table.get(domain)?;
        let name = self.table.get(mutator)?.name();
        if !self.mutator_keys.insert(mutator) {
            return Err(RegistryError::DuplicateMutator {
                mutator: name.to_string(),
            });
        }

        self.registrations.push(Registration {
            direction: Direction::Mutation,
            source: mutator,
            target: domain,
            mapping: self.common.clone(),
        });
        Ok(self)
    }

    /// Register projection from `domain` into `response`
    pub fn register_response(
        mut self,
        domain: TypeId,
        response: TypeId,
        mapping: Option<&str>,
    ) -> RegistryResult<Self> {
        self.table.get(domain)?;
        let response_def = self.table.get(response)?;
        let declared = match response_def.role() {
            TypeRole::Response {
                mapping: Some(m), ..
            } => Some(m.clone()),
            _ => None,
        };
        let mapping: Box<str> = mapping
            .map(Into::into)
            .or(declared)
            .unwrap_or_else(|| self.common.clone());

        if !self.response_keys.insert((domain, mapping.clone())) {
            return Err(RegistryError::DuplicateMapping {
                domain: self.table.name_of(domain).to_string(),
                mapping: mapping.to_string(),
                response: response_def.name().to_string(),
            });
        }

        self.registrations.push(Registration {
            direction: Direction::Projection,
            source: domain,
            target: response,
            mapping,
        });
        Ok(self)
    }

    /// Register every type whose role names a subject
    pub fn register_declared(mut self) -> RegistryResult<Self> {
        let declared: Vec<(TypeId, TypeRole)> = self
            .table
            .iter()
            .map(|(id, def)| (id, def.role().clone()))
            .collect();

        for (id, role) in declared {
            self = match role {
                TypeRole::Mutator {
                    subject: Some(domain),
                } => self.register_mutator(id, domain)?,
                TypeRole::Response {
                    subject: Some(domain),
                    ..
                } => self.register_response(domain, id, None)?,
                _ => self,
            };
        }
        Ok(self)
    }

    /// Mapping selector for `ty` and its subtypes
    pub fn selector(mut self, ty: TypeId, selector: impl MappingSelector + 'static) -> Self {
        self.extensions.selectors.insert(ty, Arc::new(selector));
        self
    }

    /// Container resolver for `ty` and its subtypes
    pub fn resolver(mut self, ty: TypeId, resolver: impl ContainerResolver + 'static) -> Self {
        self.extensions.resolvers.insert(ty, Arc::new(resolver));
        self
    }

    /// Context provider for `ty` and its subtypes
    pub fn context_provider(
        mut self,
        ty: TypeId,
        provider: impl ContextProvider + 'static,
    ) -> Self {
        self.extensions.contexts.insert(ty, Arc::new(provider));
        self
    }

    /// Hooks for the mutator type `ty` and its subtypes
    pub fn mutator_hooks(mut self, ty: TypeId, hooks: impl MutatorHooks + 'static) -> Self {
        self.extensions.mutator_hooks.insert(ty, Arc::new(hooks));
        self
    }

    /// Fill hook for the response type `ty` and its subtypes
    pub fn response_hooks(mut self, ty: TypeId, hooks: impl ResponseHooks + 'static) -> Self {
        self.extensions.response_hooks.insert(ty, Arc::new(hooks));
        self
    }

    /// Compute every binding and freeze the registry
    pub fn build(self) -> RegistryResult<Arc<BindingRegistry>> {
        self.table.check_complete()?;

        let mut subjects = Subjects::default();
        for reg in &self.registrations {
            let (converter, plain) = match reg.direction {
                Direction::Mutation => (reg.source, reg.target),
                Direction::Projection => (reg.target, reg.source),
            };
            let entry = subjects.entry(converter).or_default();
            if !entry.contains(&plain) {
                entry.push(plain);
            }
        }

        let matcher = Matcher {
            table: &self.table,
            subjects: &subjects,
        };
        let compute = Compute {
            matcher,
            introspector: TypeIntrospector::new(&self.table),
            explode: &self.explode,
        };

        let mut mutators = FxHashMap::default();
        let mut responses: FxHashMap<TypeId, FxHashMap<Box<str>, Arc<ClassMetadata>>> =
            FxHashMap::default();
        let mut response_mappings = FxHashMap::default();

        for reg in &self.registrations {
            let metadata = Arc::new(compute.metadata(reg)?);
            info!(
                "register {} {} -> {} [{}] ({}), {} matched",
                match reg.direction {
                    Direction::Mutation => "mutation",
                    Direction::Projection => "projection",
                },
                self.table.name_of(reg.source),
                self.table.name_of(reg.target),
                reg.mapping,
                domain_suffix(&self.table, &metadata),
                metadata.matched_len(),
            );

            match reg.direction {
                Direction::Mutation => {
                    mutators.insert(reg.source, metadata);
                }
                Direction::Projection => {
                    responses
                        .entry(reg.source)
                        .or_default()
                        .insert(reg.mapping.clone(), metadata);
                    response_mappings
                        .entry(reg.target)
                        .or_insert_with(|| reg.mapping.clone());
                }
            }
        }

        Ok(Arc::new(BindingRegistry {
            table: Arc::new(self.table),
            common: self.common,
            mutators,
            responses,
            response_mappings,
            extensions: self.extensions,
        }))
    }
}

fn domain_suffix(table: &TypeTable, metadata: &ClassMetadata) -> &'static str {
    let domain = match metadata.direction {
        Direction::Mutation => metadata.target_type,
        Direction::Projection => metadata.source_type,
    };
    match domain.and_then(|d| table.def(d)).map(|d| d.kind()) {
        Some(TypeKind::Interface) => "Interface",
        Some(TypeKind::Map) => "Map",
        _ => "Pure",
    }
}

struct Compute<'a> {
    matcher: Matcher<'a>,
    introspector: TypeIntrospector<'a>,
    explode: &'a FxHashSet<TypeId>,
}

impl<'a> Compute<'a> {
    fn metadata(&self, reg: &Registration) -> RegistryResult<ClassMetadata> {
        let table = self.matcher.table;
        let sources = self.introspector.scan_with(reg.source, self.explode)?;
        let mut targets = self.introspector.scan_with(reg.target, self.explode)?;

        let domain = match reg.direction {
            Direction::Mutation => reg.target,
            Direction::Projection => reg.source,
        };
        let is_map_shaped = table.is_map(domain);

        let target_index: FxHashMap<&str, usize> = targets
            .iter()
            .enumerate()
            .map(|(i, a)| (a.name(), i))
            .collect();

        let mut matched = indexmap::IndexMap::new();
        let mut recorded = Vec::new();
        let mut synthetic = Vec::new();

        for source in &sources {
            match target_index.get(source.name()) {
                Some(&i) => {
                    let target = &targets[i];
                    if source.is_readable() && target.is_writable() {
                        if let Some(shape) = self.pair_shape(reg.direction, source, target)? {
                            matched.insert(
                                source.name().into(),
                                BoundPair {
                                    source: source.clone(),
                                    target: target.clone(),
                                    shape,
                                },
                            );
                        }
                    }
                    recorded.push(source.clone());
                }
                None if is_map_shaped && reg.direction == Direction::Mutation => {
                    let entry = Accessor::map_entry(
                        source.name(),
                        domain,
                        table.name_of(domain),
                        source.declared_type(),
                    );
                    matched.insert(
                        source.name().into(),
                        BoundPair {
                            source: source.clone(),
                            target: entry.clone(),
                            shape: PairShape::Scalar,
                        },
                    );
                    synthetic.push(entry);
                    recorded.push(source.clone());
                }
                None if is_map_shaped || source.has_annotation(&Annotation::IgnoreMatch) => {
                    recorded.push(source.clone());
                }
                None => {}
            }
        }
        targets.extend(synthetic);

        Ok(ClassMetadata {
            direction: reg.direction,
            source_type: Some(reg.source),
            target_type: Some(reg.target),
            mapping: reg.mapping.clone(),
            matched,
            source_accessors: recorded,
            target_accessors: targets,
            is_map_shaped,
        })
    }

    /// Shape of a same-name pair, `None` when the pair does not match
    fn pair_shape(
        &self,
        direction: Direction,
        source: &Accessor,
        target: &Accessor,
    ) -> RegistryResult<Option<PairShape>> {
        let (plain, converter) = match direction {
            Direction::Mutation => (target, source),
            Direction::Projection => (source, target),
        };

        if self.matcher.is_converter_own(plain, converter)? {
            return Ok(Some(PairShape::Convertible));
        }
        if !self.matcher.is_conventional_or_collection(plain, converter)? {
            return Ok(None);
        }

        let table = self.matcher.table;
        let declared = converter.declared_type();
        if table.is_collection(declared) {
            let convertible = converter
                .generic_arg()
                .is_some_and(|element| self.matcher.is_converter(element));
            let reconcile = match (direction, source.generic_arg(), target.generic_arg()) {
                (Direction::Mutation, Some(incoming), Some(existing)) if convertible => {
                    self.reconcile(incoming, existing)?
                }
                _ => None,
            };
            return Ok(Some(PairShape::Collection {
                element: target.generic_arg(),
                convertible,
                reconcile,
            }));
        }
        if table.is_map(declared) {
            return Ok(Some(PairShape::Map));
        }
        Ok(Some(PairShape::Scalar))
    }

    fn reconcile(&self, incoming: TypeId, existing: TypeId) -> RegistryResult<Option<Reconcile>> {
        let source_identity = self.introspector.identity(incoming)?;
        let target_identity = self.introspector.identity(existing)?;
        Ok(match (source_identity, target_identity) {
            (Some(source_identity), Some(target_identity)) => Some(Reconcile {
                source_identity,
                target_identity,
                target_element: existing,
            }),
            _ => None,
        })
    }
}

/// Immutable registry of bindings and extension points
pub struct BindingRegistry {
    table: Arc<TypeTable>,
    common: Box<str>,
    mutators: FxHashMap<TypeId, Arc<ClassMetadata>>,
    responses: FxHashMap<TypeId, FxHashMap<Box<str>, Arc<ClassMetadata>>>,
    response_mappings: FxHashMap<TypeId, Box<str>>,
    extensions: Extensions,
}

impl BindingRegistry {
    /// Create a registry builder over `table`
    pub fn builder(table: TypeTable) -> BindingRegistryBuilder {
        BindingRegistryBuilder::new(table)
    }

    /// Type table the bindings were computed from
    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    /// Shared handle to the type table
    pub fn shared_table(&self) -> Arc<TypeTable> {
        self.table.clone()
    }

    /// Fallback mapping name
    pub fn common_mapping(&self) -> &str {
        &self.common
    }

    /// Metadata for `source` under `mapping`
    ///
    /// Mutator types resolve to their mutation binding, anything else to a
    /// projection binding. Never fails: unknown types and mappings fall back
    /// to the common mapping, then to the empty metadata.
    pub fn lookup(&self, source: TypeId, mapping: &str) -> Arc<ClassMetadata> {
        match self.lookup_mutator(source) {
            Some(metadata) => metadata,
            None => self.lookup_response(source, mapping),
        }
    }

    /// Mutation binding registered for exactly `mutator`
    pub fn lookup_mutator(&self, mutator: TypeId) -> Option<Arc<ClassMetadata>> {
        self.mutators.get(&mutator).cloned()
    }

    /// Projection binding of `domain` under `mapping`
    pub fn lookup_response(&self, domain: TypeId, mapping: &str) -> Arc<ClassMetadata> {
        let Some(variants) = self.nearest(&self.responses, domain) else {
            debug!(ty = %self.table.name_of(domain), "no projection registered");
            return ClassMetadata::empty();
        };
        if let Some(metadata) = variants.get(mapping) {
            return metadata.clone();
        }

        debug!(
            ty = %self.table.name_of(domain),
            mapping,
            fallback = %self.common,
            "mapping not registered, using fallback"
        );
        variants
            .get(&self.common)
            .cloned()
            .unwrap_or_else(ClassMetadata::empty)
    }

    /// Whether `ty` or an ancestor has a projection binding
    pub fn is_present_response(&self, ty: TypeId) -> bool {
        self.nearest(&self.responses, ty).is_some()
    }

    /// Whether `ty` itself has a mutation binding
    pub fn is_present_mutator(&self, ty: TypeId) -> bool {
        self.mutators.contains_key(&ty)
    }

    /// Mapping a response type was registered under
    pub fn mapping_of_response(&self, response: TypeId) -> Option<&str> {
        self.response_mappings.get(&response).map(|m| &**m)
    }

    /// Mapping names registered for `domain`, sorted
    pub fn mappings(&self, domain: TypeId) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .nearest(&self.responses, domain)
            .map(|variants| variants.keys().map(|k| &**k).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Mapping selector for `ty`
    pub fn selector_for(&self, ty: TypeId) -> Option<Arc<dyn MappingSelector>> {
        self.extensions.selectors.find(&self.table, ty)
    }

    /// Container resolver for `ty`
    pub fn resolver_for(&self, ty: TypeId) -> Option<Arc<dyn ContainerResolver>> {
        self.extensions.resolvers.find(&self.table, ty)
    }

    /// Context provider for `ty`
    pub fn context_provider_for(&self, ty: TypeId) -> Option<Arc<dyn ContextProvider>> {
        self.extensions.contexts.find(&self.table, ty)
    }

    /// Hooks for the mutator type `ty`
    pub fn mutator_hooks_for(&self, ty: TypeId) -> Option<Arc<dyn MutatorHooks>> {
        self.extensions.mutator_hooks.find(&self.table, ty)
    }

    /// Fill hook for the response type `ty`
    pub fn response_hooks_for(&self, ty: TypeId) -> Option<Arc<dyn ResponseHooks>> {
        self.extensions.response_hooks.find(&self.table, ty)
    }

    fn nearest<'m, V>(&self, map: &'m FxHashMap<TypeId, V>, ty: TypeId) -> Option<&'m V> {
        if let Some(hit) = map.get(&ty) {
            return Some(hit);
        }
        self.table
            .ancestors(ty)
            .into_iter()
            .find_map(|ancestor| map.get(&ancestor))
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("common", &self.common)
            .field("mutators", &self.mutators.len())
            .field("responses", &self.responses.len())
            .field("selectors", &self.extensions.selectors.len())
            .field("resolvers", &self.extensions.resolvers.len())
            .finish()
    }
}
