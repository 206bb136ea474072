//! One engine shared by many threads
//!
//! Extension lookups for runtime types first seen during a conversion are
//! memoized; every thread must observe the same results.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::*;
use morph_core::{
    BindingRegistry, Context, ContextProvider, ConversionEngine, ConversionResult, ResponseHooks,
};
use morph_types::{TypeDef, TypeTable, Value};
use pretty_assertions::assert_eq;

const THREADS: usize = 8;
const ROUNDS: usize = 50;

struct Shelf;

impl ContextProvider for Shelf {
    fn map_context(&self, source: &Value) -> Option<Context> {
        let count = match source {
            Value::Collection(items) => items.len(),
            _ => 1,
        };
        Some(Arc::new(format!("shelf-of-{count}")))
    }
}

struct Label;

impl ResponseHooks for Label {
    fn fill(
        &self,
        response: &Value,
        source: &Value,
        engine: &ConversionEngine,
        context: Option<&Context>,
    ) -> ConversionResult<()> {
        let shelf = context
            .and_then(|c| c.downcast_ref::<String>())
            .map(String::as_str)
            .unwrap_or("none");
        let ty = engine.table().runtime_type(source);
        let label = format!("{} on {}", engine.table().name_of(ty), shelf);
        if let Some(obj) = response.as_object() {
            obj.set("summary", label);
        }
        Ok(())
    }
}

#[test]
fn test_shared_engine_across_threads() {
    init_tracing();
    let mut table = TypeTable::new();
    let ids = declare(&mut table);
    let novel = table
        .define(TypeDef::class("Novel").extends(ids.book))
        .unwrap();
    let essay = table
        .define(TypeDef::class("Essay").extends(ids.book))
        .unwrap();
    let registry = BindingRegistry::builder(table)
        .context_provider(ids.book, Shelf)
        .response_hooks(ids.book_response, Label)
        .register_declared()
        .unwrap()
        .build()
        .unwrap();
    let m = Model {
        engine: ConversionEngine::new(registry),
        ids,
    };

    let novel = m.new_object(novel, &[("name", "Dune".into())]);
    let essay = m.new_object(essay, &[("name", "Walden".into())]);
    let both = list(vec![novel.clone(), essay.clone()]);

    let barrier = Barrier::new(THREADS);
    let results: Vec<Vec<String>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = &m.engine;
                let barrier = &barrier;
                let (novel, essay, both) = (&novel, &essay, &both);
                scope.spawn(move || {
                    barrier.wait();
                    let mut seen = Vec::new();
                    for _ in 0..ROUNDS {
                        for source in [novel, essay] {
                            let response = engine.project_resolve(source, "common", None).unwrap();
                            seen.push(summary(&response));
                        }
                        let projected = engine.project_resolve(both, "common", None).unwrap();
                        seen.extend(elements(&projected).iter().map(summary));
                    }
                    seen
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected: Vec<String> = (0..ROUNDS)
        .flat_map(|_| {
            [
                "Novel on shelf-of-1",
                "Essay on shelf-of-1",
                "Novel on shelf-of-2",
                "Essay on shelf-of-2",
            ]
        })
        .map(str::to_string)
        .collect();
    for seen in &results {
        assert_eq!(seen, &expected);
    }
}

fn summary(response: &Value) -> String {
    field(response, "summary").as_str().unwrap_or_default().to_string()
}
