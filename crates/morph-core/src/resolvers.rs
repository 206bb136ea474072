//! Builtin container resolvers

use morph_types::{Collection, CollectionRef, Value};

use crate::engine::ConversionEngine;
use crate::extension::{Context, ContainerResolver};
use crate::ConversionResult;

/// Projects collections of registered domain objects element by element
///
/// Registered for `collection` by default, so it covers lists, sets and
/// every user collection type. Null elements are dropped; the result keeps
/// the source collection type.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionResolver;

impl ContainerResolver for CollectionResolver {
    fn claims(&self, engine: &ConversionEngine, source: &Value, _mapping: &str) -> bool {
        let Some(items) = source.as_collection() else {
            return false;
        };
        let table = engine.table();
        items
            .read()
            .elements()
            .iter()
            .filter(|item| !item.is_null())
            .all(|item| {
                engine
                    .registry()
                    .is_present_response(table.runtime_type(item))
            })
    }

    fn example(&self, source: &Value) -> Option<Value> {
        source
            .as_collection()?
            .read()
            .elements()
            .iter()
            .find(|item| !item.is_null())
            .cloned()
    }

    fn resolve(
        &self,
        engine: &ConversionEngine,
        source: &Value,
        mapping: &str,
        context: Option<&Context>,
    ) -> ConversionResult<Value> {
        let Some(items) = source.as_collection() else {
            return Ok(source.clone());
        };
        let (type_id, kind) = {
            let items = items.read();
            (items.type_id(), items.kind())
        };

        let projected = CollectionRef::new(Collection::new(type_id, kind));
        for item in items.elements() {
            if item.is_null() {
                continue;
            }
            projected.push(engine.project(&item, mapping, context)?);
        }
        Ok(Value::Collection(projected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BindingRegistry;
    use morph_types::{builtin, CollectionKind, TypeDef, TypeTable};

    #[test]
    fn test_claims_only_registered_elements() {
        let mut table = TypeTable::new();
        let tag = table
            .define(TypeDef::class("Tag").field("label", builtin::STR))
            .unwrap();
        table
            .define(
                TypeDef::class("TagResponse")
                    .response_of(tag)
                    .field("label", builtin::STR),
            )
            .unwrap();
        let registry = BindingRegistry::builder(table)
            .register_declared()
            .unwrap()
            .build()
            .unwrap();
        let engine = ConversionEngine::new(registry);

        let tags = CollectionRef::new(Collection::new(builtin::SET, CollectionKind::Set));
        let first = engine.table().instantiate(tag).unwrap();
        first.as_object().unwrap().set("label", "rust");
        tags.push(Value::Null);
        tags.push(first.clone());
        let tags = Value::Collection(tags);

        let resolver = CollectionResolver;
        assert!(resolver.claims(&engine, &tags, "common"));
        assert!(resolver.example(&tags).unwrap().same(&first));

        let projected = resolver.resolve(&engine, &tags, "common", None).unwrap();
        let projected = projected.as_collection().unwrap();
        assert_eq!(projected.read().kind(), CollectionKind::Set);
        assert_eq!(projected.len(), 1);
        assert_eq!(
            projected.elements()[0].as_object().unwrap().get("label"),
            Value::from("rust")
        );

        let mixed = CollectionRef::new(Collection::new(builtin::LIST, CollectionKind::List));
        mixed.push(1);
        assert!(!resolver.claims(&engine, &Value::Collection(mixed), "common"));
    }
}
