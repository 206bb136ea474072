//! Integration tests for the mutation path
//!
//! Tests cover:
//! - Touched-field PATCH semantics
//! - Nested mutators and field guards
//! - Identity-preserving collection reconciliation
//! - Hooks, map-shaped domains and the depth guard

mod common;

use std::sync::Arc;

use common::*;
use morph_core::{
    hook_error, BindingRegistry, Context, ConversionConfig, ConversionEngine, ConversionError,
    ConversionResult, MutatorHooks,
};
use morph_types::{builtin, TypeDef, TypeTable, Value};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

// ============================================================================
// Touched fields
// ============================================================================

#[test]
fn test_untouched_fields_are_preserved() {
    let m = model();
    let first = m.author(1, "Ann", "A");
    let book = m.book("Old", "111", 300, vec![first.clone()]);
    let authors = field(&book, "authors");

    let mutator = m.mutator(
        m.ids.book_mutator,
        &[("name", "X".into()), ("page_count", 10.into())],
    );
    let book = m.engine.mutate(&mutator, book).unwrap();

    assert_eq!(field(&book, "name"), Value::from("X"));
    assert_eq!(field(&book, "page_count"), Value::Int(10));
    assert_eq!(field(&book, "isbn"), Value::from("111"));
    assert!(field(&book, "authors").same(&authors));
    assert!(elements(&authors)[0].same(&first));
}

#[test]
fn test_default_initialized_value_is_not_written() {
    let m = model();
    let book = m.book("Old", "111", 300, vec![]);

    // page_count starts at 0 on the mutator but was never touched
    let mutator = m.mutator(m.ids.book_mutator, &[("name", "New".into())]);
    assert_eq!(field(&mutator, "page_count"), Value::Int(0));

    let book = m.engine.mutate(&mutator, book).unwrap();
    assert_eq!(field(&book, "page_count"), Value::Int(300));
    assert_eq!(field(&book, "name"), Value::from("New"));
}

#[test]
fn test_touched_null_clears_scalar() {
    let m = model();
    let book = m.book("Old", "111", 300, vec![]);
    let mutator = m.mutator(m.ids.book_mutator, &[("isbn", Value::Null)]);

    let book = m.engine.mutate(&mutator, book).unwrap();
    assert_eq!(field(&book, "isbn"), Value::Null);
    assert_eq!(field(&book, "name"), Value::from("Old"));
}

#[test]
fn test_excluded_field_is_never_written() {
    let m = model();
    let book = m.book("Old", "111", 300, vec![]);
    let mutator = m.mutator(
        m.ids.book_mutator,
        &[("internal_code", "HACKED".into()), ("name", "New".into())],
    );

    let book = m.engine.mutate(&mutator, book).unwrap();
    assert_eq!(field(&book, "internal_code"), Value::from("B-1"));
    assert_eq!(field(&book, "name"), Value::from("New"));
}

#[test]
fn test_scalar_collection_is_copied() {
    let m = model();
    let book = m.book("Old", "111", 300, vec![]);
    let tags = list(vec!["new".into(), "tags".into()]);
    let mutator = m.mutator(m.ids.book_mutator, &[("tags", tags.clone())]);

    let book = m.engine.mutate(&mutator, book).unwrap();
    let written = field(&book, "tags");
    assert!(!written.same(&tags));
    assert_eq!(elements(&written), vec![Value::from("new"), Value::from("tags")]);
}

// ============================================================================
// Nested mutators
// ============================================================================

#[test]
fn test_nested_mutator_updates_in_place() {
    let m = model();
    let author = m.author(1, "Ann", "A");
    let location = field(&author, "location");

    let point = m.mutator(m.ids.point_mutator, &[("x", 9.into())]);
    let mutator = m.mutator(m.ids.author_mutator, &[("location", point)]);
    let author = m.engine.mutate(&mutator, author).unwrap();

    let updated = field(&author, "location");
    assert!(updated.same(&location));
    assert_eq!(field(&updated, "x"), Value::Int(9));
    assert_eq!(field(&updated, "y"), Value::Int(2));
}

#[test]
fn test_nested_mutator_instantiates_missing_target() {
    let m = model();
    let author = m.author(1, "Ann", "A");
    author.as_object().unwrap().set("location", Value::Null);

    let point = m.mutator(m.ids.point_mutator, &[("x", 4.into()), ("y", 5.into())]);
    let mutator = m.mutator(m.ids.author_mutator, &[("location", point)]);
    let author = m.engine.mutate(&mutator, author).unwrap();

    let created = field(&author, "location");
    assert_eq!(created.type_id(), Some(m.ids.point));
    assert_eq!(field(&created, "x"), Value::Int(4));
    assert_eq!(field(&created, "y"), Value::Int(5));
}

#[test]
fn test_null_nested_mutator_leaves_member() {
    let m = model();
    let author = m.author(1, "Ann", "A");
    let location = field(&author, "location");

    let mutator = m.mutator(m.ids.author_mutator, &[("location", Value::Null)]);
    let author = m.engine.mutate(&mutator, author).unwrap();
    assert!(field(&author, "location").same(&location));
}

// ============================================================================
// Collection reconciliation
// ============================================================================

#[test]
fn test_reconcile_preserves_identity() {
    let m = model();
    let first = m.author(1, "Ann", "A");
    let second = m.author(2, "Bob", "B");
    let book = m.book("Old", "111", 300, vec![first, second.clone()]);
    let authors = field(&book, "authors");

    let incoming = list(vec![
        m.mutator(m.ids.author_mutator, &[("id", 2.into()), ("name", "new".into())]),
        m.mutator(m.ids.author_mutator, &[("id", 3.into()), ("name", "fresh".into())]),
    ]);
    let mutator = m.mutator(m.ids.book_mutator, &[("authors", incoming)]);
    let book = m.engine.mutate(&mutator, book).unwrap();

    let reconciled = field(&book, "authors");
    assert!(reconciled.same(&authors));
    let items = elements(&reconciled);
    assert_eq!(items.len(), 2);

    assert!(items[0].same(&second));
    assert_eq!(field(&items[0], "name"), Value::from("new"));
    assert_eq!(field(&items[0], "extra"), Value::from("B"));

    assert_eq!(field(&items[1], "id"), Value::Int(3));
    assert_eq!(field(&items[1], "name"), Value::from("fresh"));
    assert_eq!(field(&items[1], "extra"), Value::Null);
}

#[test]
fn test_reconcile_null_identity_is_always_new() {
    let m = model();
    let book = m.book("Old", "111", 300, vec![m.author(1, "Ann", "A")]);

    let incoming = list(vec![
        m.mutator(m.ids.author_mutator, &[("name", "anonymous".into())]),
        Value::Null,
    ]);
    let mutator = m.mutator(m.ids.book_mutator, &[("authors", incoming)]);
    let book = m.engine.mutate(&mutator, book).unwrap();

    let items = elements(&field(&book, "authors"));
    assert_eq!(items.len(), 1);
    assert_eq!(field(&items[0], "id"), Value::Null);
    assert_eq!(field(&items[0], "name"), Value::from("anonymous"));
}

#[test]
fn test_reconcile_creates_missing_collection() {
    let m = model();
    let book = m.new_object(m.ids.book, &[("name", "Empty".into())]);

    let incoming = list(vec![m.mutator(
        m.ids.author_mutator,
        &[("id", 7.into()), ("name", "Cid".into())],
    )]);
    let mutator = m.mutator(m.ids.book_mutator, &[("authors", incoming)]);
    let book = m.engine.mutate(&mutator, book).unwrap();

    let authors = field(&book, "authors");
    assert_eq!(authors.type_id(), Some(builtin::LIST));
    let items = elements(&authors);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].type_id(), Some(m.ids.author));
    assert_eq!(field(&items[0], "id"), Value::Int(7));
}

#[test]
fn test_collection_without_identity_is_rebuilt() {
    let m = model();
    let old_mark = m.point(0, 0);
    let book = m.new_object(m.ids.book, &[("marks", list(vec![old_mark.clone()]))]);

    let incoming = list(vec![
        m.mutator(m.ids.point_mutator, &[("x", 1.into()), ("y", 1.into())]),
        m.mutator(m.ids.point_mutator, &[("x", 2.into())]),
    ]);
    let mutator = m.mutator(m.ids.book_mutator, &[("marks", incoming)]);
    let book = m.engine.mutate(&mutator, book).unwrap();

    let marks = elements(&field(&book, "marks"));
    assert_eq!(marks.len(), 2);
    assert!(!marks[0].same(&old_mark));
    assert_eq!(marks[0], m.point(1, 1));
    assert_eq!(field(&marks[1], "x"), Value::Int(2));
    assert_eq!(field(&marks[1], "y"), Value::Null);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_binding() {
    let m = model();
    let book = m.book("Old", "111", 300, vec![]);
    let not_a_mutator = m.book("Other", "222", 1, vec![]);

    let err = m.engine.mutate(&not_a_mutator, book).unwrap_err();
    assert_eq!(
        err,
        ConversionError::MissingBinding {
            name: "Book".to_string()
        }
    );
}

#[test]
fn test_declaring_type_mismatch() {
    let m = model();
    let author = m.author(1, "Ann", "A");
    let mutator = m.mutator(m.ids.book_mutator, &[("name", "X".into())]);

    let err = m.engine.mutate(&mutator, author).unwrap_err();
    assert_eq!(
        err,
        ConversionError::DeclaringTypeMismatch {
            declared: "Book".to_string(),
            target: "Author".to_string(),
            source_type: "BookMutator".to_string(),
            mapping: "common".to_string(),
        }
    );
}

#[test]
fn test_depth_guard() {
    let config = ConversionConfig {
        max_depth: Some(1),
        ..ConversionConfig::default()
    };
    let m = model_with(config, |builder, _| builder);
    let book = m.book("Old", "111", 300, vec![]);

    let flat = m.mutator(m.ids.book_mutator, &[("name", "X".into())]);
    assert!(m.engine.mutate(&flat, book.clone()).is_ok());

    let author = m.mutator(m.ids.author_mutator, &[("id", 1.into())]);
    let nested = m.mutator(m.ids.book_mutator, &[("authors", list(vec![author]))]);
    assert_eq!(
        m.engine.mutate(&nested, book).unwrap_err(),
        ConversionError::DepthExceeded { max: 1 }
    );
}

// ============================================================================
// Hooks
// ============================================================================

struct AuthorHooks {
    parents: Arc<Mutex<Vec<String>>>,
}

impl MutatorHooks for AuthorHooks {
    fn fill_parent(
        &self,
        _mutator: &Value,
        _target: &Value,
        parent: &Value,
        _context: Option<&Context>,
    ) -> ConversionResult<()> {
        let name = parent
            .as_object()
            .and_then(|p| p.get("name").as_str().map(str::to_string))
            .unwrap_or_default();
        self.parents.lock().push(name);
        Ok(())
    }

    fn fill(
        &self,
        _mutator: &Value,
        target: &Value,
        context: Option<&Context>,
    ) -> ConversionResult<()> {
        let editor = context
            .and_then(|c| c.downcast_ref::<String>())
            .ok_or_else(|| hook_error("editor context missing"))?;
        target
            .as_object()
            .ok_or_else(|| hook_error("author expected"))?
            .set("extra", format!("edited by {}", editor));
        Ok(())
    }
}

#[test]
fn test_hooks_receive_parent_and_context() {
    let parents = Arc::new(Mutex::new(Vec::new()));
    let hooks = AuthorHooks {
        parents: parents.clone(),
    };
    let m = model_with(ConversionConfig::default(), move |builder, ids| {
        builder.mutator_hooks(ids.author_mutator, hooks)
    });
    let book = m.book("Dune", "111", 300, vec![m.author(1, "Ann", "A")]);

    let incoming = list(vec![m.mutator(
        m.ids.author_mutator,
        &[("id", 1.into()), ("name", "Anne".into())],
    )]);
    let mutator = m.mutator(m.ids.book_mutator, &[("authors", incoming)]);
    let context: Context = Arc::new("alice".to_string());
    let book = m.engine.mutate_with(&mutator, book, Some(&context)).unwrap();

    let author = &elements(&field(&book, "authors"))[0];
    assert_eq!(field(author, "name"), Value::from("Anne"));
    assert_eq!(field(author, "extra"), Value::from("edited by alice"));
    assert_eq!(*parents.lock(), vec!["Dune".to_string()]);

    // Without context the hook fails and the error surfaces unchanged
    let again = m.mutator(m.ids.author_mutator, &[("name", "Ann".into())]);
    assert_eq!(
        m.engine.mutate(&again, m.author(1, "Ann", "A")).unwrap_err(),
        ConversionError::Hook("editor context missing".to_string())
    );
}

struct Frozen;

impl MutatorHooks for Frozen {
    fn require_process_field(
        &self,
        source: &morph_types::Accessor,
        _context: Option<&Context>,
        _target: &Value,
    ) -> bool {
        source.name() != "isbn"
    }

    fn require_process_nested(&self, source: &morph_types::Accessor, _received: &Value) -> bool {
        source.name() != "authors"
    }
}

#[test]
fn test_custom_guards() {
    let m = model_with(ConversionConfig::default(), |builder, ids| {
        builder.mutator_hooks(ids.book_mutator, Frozen)
    });
    let author = m.author(1, "Ann", "A");
    let book = m.book("Old", "111", 300, vec![author.clone()]);

    let mutator = m.mutator(
        m.ids.book_mutator,
        &[
            ("isbn", "999".into()),
            ("name", "New".into()),
            ("authors", list(vec![])),
        ],
    );
    let book = m.engine.mutate(&mutator, book).unwrap();
    assert_eq!(field(&book, "isbn"), Value::from("111"));
    assert_eq!(field(&book, "name"), Value::from("New"));
    assert!(elements(&field(&book, "authors"))[0].same(&author));
}

// ============================================================================
// Map-shaped domain
// ============================================================================

#[test]
fn test_map_shaped_domain_receives_entries() {
    init_tracing();
    let mut table = TypeTable::new();
    let attributes = table.define(TypeDef::map("Attributes")).unwrap();
    let mutator_ty = table
        .define(
            TypeDef::class("AttributesMutator")
                .mutator_of(attributes)
                .field("color", builtin::STR)
                .field("size", builtin::INT),
        )
        .unwrap();
    let registry = BindingRegistry::builder(table)
        .register_declared()
        .unwrap()
        .build()
        .unwrap();
    let engine = ConversionEngine::new(registry);

    let target = engine.table().instantiate(attributes).unwrap();
    target.as_map().unwrap().insert("size", 3);
    let mutator = engine.table().instantiate(mutator_ty).unwrap();
    let obj = mutator.as_object().unwrap();
    obj.set("color", "red");
    obj.touch("color");

    let target = engine.mutate(&mutator, target).unwrap();
    let map = target.as_map().unwrap();
    assert_eq!(map.get("color"), Value::from("red"));
    assert_eq!(map.get("size"), Value::Int(3));
    assert_eq!(map.read().len(), 2);
}
