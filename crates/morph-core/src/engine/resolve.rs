//! Container resolver and context provider dispatch

use morph_types::Value;
use tracing::trace;

use super::project::Selection;
use super::ConversionEngine;
use crate::extension::Context;
use crate::ConversionResult;

impl ConversionEngine {
    pub(super) fn resolve_at(
        &self,
        source: &Value,
        mapping: &str,
        context: Option<&Context>,
    ) -> ConversionResult<Value> {
        if source.is_null() {
            return Ok(Value::Null);
        }
        let source_ty = self.table().runtime_type(source);

        if let Some(resolver) = self.registry.resolver_for(source_ty) {
            if resolver.claims(self, source, mapping) {
                trace!(ty = %self.table().name_of(source_ty), "claimed by container resolver");
                // The example picks the provider, the provider sees the whole container
                let example = resolver.example(source);
                let derived = self.derive_context(example.as_ref().unwrap_or(source), source);
                return resolver.resolve(self, source, mapping, derived.as_ref().or(context));
            }
        }

        let derived = self.derive_context(source, source);
        self.project_at(source, mapping, derived.as_ref().or(context), Selection::Root, 0)
    }

    /// Context from the provider registered for the type of `by`, fed `source`
    fn derive_context(&self, by: &Value, source: &Value) -> Option<Context> {
        let ty = self.table().runtime_type(by);
        self.registry
            .context_provider_for(ty)
            .and_then(|provider| provider.map_context(source))
    }
}
