//! Shared fixture for the integration tests
//!
//! Book / Author / Point domain model with mutators and responses:
//!
//! ```text
//! Book    { name, isbn, page_count, internal_code, tags: [str], marks: [Point], authors: [Author] }
//! Author  { id, name, birth_date, extra, location: Point }
//! Point   { x, y }
//! ```

#![allow(dead_code)]

use morph_core::{BindingRegistry, BindingRegistryBuilder, ConversionConfig, ConversionEngine};
use morph_types::{
    builtin, Annotation, Collection, CollectionKind, CollectionRef, MemberDef, TypeDef, TypeId,
    TypeTable, Value,
};
use serde_json::Value as Json;

/// Type ids of the fixture model
#[derive(Debug, Clone, Copy)]
pub struct Ids {
    pub point: TypeId,
    pub author: TypeId,
    pub book: TypeId,
    pub point_mutator: TypeId,
    pub author_mutator: TypeId,
    pub book_mutator: TypeId,
    pub point_response: TypeId,
    pub author_response: TypeId,
    pub book_response: TypeId,
    pub book_short: TypeId,
}

pub struct Model {
    pub engine: ConversionEngine,
    pub ids: Ids,
}

pub fn declare(table: &mut TypeTable) -> Ids {
    let point = table
        .define(
            TypeDef::class("Point")
                .field("x", builtin::INT)
                .field("y", builtin::INT),
        )
        .unwrap();
    let author = table
        .define(
            TypeDef::class("Author")
                .field("id", builtin::INT)
                .field("name", builtin::STR)
                .field("birth_date", builtin::STR)
                .field("extra", builtin::STR)
                .field("location", point),
        )
        .unwrap();
    let book = table
        .define(
            TypeDef::class("Book")
                .field("name", builtin::STR)
                .field("isbn", builtin::STR)
                .field("page_count", builtin::INT)
                .field("internal_code", builtin::STR)
                .field_of("tags", builtin::LIST, builtin::STR)
                .field_of("marks", builtin::LIST, point)
                .field_of("authors", builtin::LIST, author),
        )
        .unwrap();

    let point_mutator = table
        .define(
            TypeDef::class("PointMutator")
                .mutator_of(point)
                .field("x", builtin::INT)
                .field("y", builtin::INT),
        )
        .unwrap();
    let author_mutator = table
        .define(
            TypeDef::class("AuthorMutator")
                .mutator_of(author)
                .field("id", builtin::INT)
                .field("name", builtin::STR)
                .field("birth_date", builtin::STR)
                .field("location", point_mutator),
        )
        .unwrap();
    let book_mutator = table
        .define(
            TypeDef::class("BookMutator")
                .mutator_of(book)
                .field("name", builtin::STR)
                .field("isbn", builtin::STR)
                .member(MemberDef::field("page_count", builtin::INT).init(|| Value::Int(0)))
                .field("internal_code", builtin::STR)
                .annotate("internal_code", Annotation::Excluded)
                .field_of("tags", builtin::LIST, builtin::STR)
                .field_of("marks", builtin::LIST, point_mutator)
                .field_of("authors", builtin::LIST, author_mutator),
        )
        .unwrap();

    let point_response = table
        .define(
            TypeDef::class("PointResponse")
                .response_of(point)
                .field("x", builtin::INT)
                .field("y", builtin::INT),
        )
        .unwrap();
    let author_response = table
        .define(
            TypeDef::class("AuthorResponse")
                .response_of(author)
                .field("id", builtin::INT)
                .field("name", builtin::STR)
                .field("location", point_response),
        )
        .unwrap();
    let book_response = table
        .define(
            TypeDef::class("BookResponse")
                .response_of(book)
                .field("name", builtin::STR)
                .field("isbn", builtin::STR)
                .field("page_count", builtin::INT)
                .field_of("tags", builtin::LIST, builtin::STR)
                .field_of("authors", builtin::LIST, author_response)
                .field("summary", builtin::STR),
        )
        .unwrap();
    let book_short = table
        .define(
            TypeDef::class("BookShort")
                .response_of(book)
                .mapping("short")
                .field("name", builtin::STR),
        )
        .unwrap();

    Ids {
        point,
        author,
        book,
        point_mutator,
        author_mutator,
        book_mutator,
        point_response,
        author_response,
        book_response,
        book_short,
    }
}

pub fn model() -> Model {
    model_with(ConversionConfig::default(), |builder, _| builder)
}

pub fn model_with(
    config: ConversionConfig,
    configure: impl FnOnce(BindingRegistryBuilder, &Ids) -> BindingRegistryBuilder,
) -> Model {
    init_tracing();
    let mut table = TypeTable::new();
    let ids = declare(&mut table);
    let builder = BindingRegistry::builder(table)
        .configure(&config)
        .register_declared()
        .unwrap();
    let registry = configure(builder, &ids).build().unwrap();
    Model {
        engine: ConversionEngine::with_config(registry, config),
        ids,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

impl Model {
    pub fn table(&self) -> &TypeTable {
        self.engine.table()
    }

    pub fn new_object(&self, ty: TypeId, fields: &[(&str, Value)]) -> Value {
        let value = self.table().instantiate(ty).unwrap();
        let obj = value.as_object().unwrap();
        for (name, field) in fields {
            obj.set(name, field.clone());
        }
        value
    }

    /// Mutator with every given field set and touched
    pub fn mutator(&self, ty: TypeId, fields: &[(&str, Value)]) -> Value {
        let value = self.new_object(ty, fields);
        let obj = value.as_object().unwrap();
        for (name, _) in fields {
            obj.touch(name);
        }
        value
    }

    pub fn point(&self, x: i64, y: i64) -> Value {
        self.new_object(self.ids.point, &[("x", x.into()), ("y", y.into())])
    }

    pub fn author(&self, id: i64, name: &str, extra: &str) -> Value {
        self.new_object(
            self.ids.author,
            &[
                ("id", id.into()),
                ("name", name.into()),
                ("extra", extra.into()),
                ("location", self.point(1, 2)),
            ],
        )
    }

    pub fn book(&self, name: &str, isbn: &str, page_count: i64, authors: Vec<Value>) -> Value {
        self.new_object(
            self.ids.book,
            &[
                ("name", name.into()),
                ("isbn", isbn.into()),
                ("page_count", page_count.into()),
                ("internal_code", "B-1".into()),
                ("tags", list(vec!["classic".into()])),
                ("authors", list(authors)),
            ],
        )
    }

    pub fn read(&self, ty: TypeId, payload: &Json) -> Value {
        self.engine.reader().read(ty, payload).unwrap()
    }
}

pub fn list(items: Vec<Value>) -> Value {
    let collection = CollectionRef::new(Collection::new(builtin::LIST, CollectionKind::List));
    for item in items {
        collection.push(item);
    }
    Value::Collection(collection)
}

/// Field `name` of an object value
pub fn field(value: &Value, name: &str) -> Value {
    value.as_object().unwrap().get(name)
}

/// Elements of a collection value
pub fn elements(value: &Value) -> Vec<Value> {
    value.as_collection().unwrap().elements()
}
