//! Model schemas.
//!
//! Every type that crosses the wire implements [`ApiSchema`] and describes
//! itself as a JSON Schema. Named models register once in a
//! [`SchemaRegistry`] and are referenced by `$ref` everywhere else; the
//! registry becomes `components.schemas` of the OpenAPI document.
//!
//! The same schemas drive query binding (see [`Query`](crate::Query)), so
//! what the document says a parameter is and how it is decoded cannot drift
//! apart.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// JSON Schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// JSON Schema definition (the OpenAPI 3.0 subset this service needs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Schema format (e.g. `"date"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "enum")]
    pub enum_values: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "additionalProperties")]
    pub additional_properties: Option<bool>,
}

impl Schema {
    fn typed(schema_type: SchemaType) -> Self {
        Self { schema_type: Some(schema_type), ..Default::default() }
    }

    pub fn string() -> Self { Self::typed(SchemaType::String) }
    pub fn integer() -> Self { Self::typed(SchemaType::Integer) }
    pub fn number() -> Self { Self::typed(SchemaType::Number) }
    pub fn boolean() -> Self { Self::typed(SchemaType::Boolean) }
    pub fn object() -> Self { Self::typed(SchemaType::Object) }

    pub fn array(items: Schema) -> Self {
        Self { items: Some(Box::new(items)), ..Self::typed(SchemaType::Array) }
    }

    pub fn reference(name: &str) -> Self {
        Self { reference: Some(format!("#/components/schemas/{name}")), ..Default::default() }
    }

    /// A string restricted to a closed set of values.
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_values: values.into_iter().map(|v| serde_json::Value::String(v.into())).collect(),
            ..Self::string()
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_owned());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Forbid properties the schema does not name.
    pub fn closed(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }

    /// Adds an optional property.
    pub fn property(mut self, name: &str, schema: Schema) -> Self {
        self.properties.insert(name.to_owned(), schema);
        self
    }

    /// Adds a required property.
    pub fn required_property(mut self, name: &str, schema: Schema) -> Self {
        self.required.push(name.to_owned());
        self.property(name, schema)
    }

    pub fn is_array(&self) -> bool {
        self.schema_type == Some(SchemaType::Array)
    }

    /// Name of the component this schema points at, if it is a `$ref`.
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference.as_deref()?.strip_prefix("#/components/schemas/")
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Named model schemas, in first-registration order.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
    names: HashMap<&'static str, String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its readable name (once) and returns a `$ref` to it.
    ///
    /// Two distinct types with the same short name get `Name`, `Name2`, … in
    /// registration order.
    pub fn named<T: ?Sized>(&mut self, build: impl FnOnce(&mut Self) -> Schema) -> Schema {
        let identity = type_name::<T>();
        if let Some(name) = self.names.get(identity) {
            return Schema::reference(name);
        }

        let base = schema_name::<T>();
        let mut name = base.clone();
        let mut n = 2;
        while self.schemas.contains_key(&name) {
            name = format!("{base}{n}");
            n += 1;
        }

        // Placeholder first, so self-referencing models terminate.
        self.names.insert(identity, name.clone());
        self.schemas.insert(name.clone(), Schema::default());
        let schema = build(self);
        self.schemas.insert(name.clone(), schema);
        Schema::reference(&name)
    }

    /// Follows a `$ref` to the registered schema; other schemas pass through.
    pub fn resolve(&self, schema: Schema) -> Schema {
        match schema.referenced_name().and_then(|name| self.schemas.get(name)) {
            Some(found) => found.clone(),
            None => schema,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn into_schemas(self) -> IndexMap<String, Schema> {
        self.schemas
    }
}

// ── Naming ────────────────────────────────────────────────────────────────────

static TYPE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_:]+").expect("type path pattern is valid"));

/// Readable, OpenAPI-safe component name for `T`.
///
/// Module paths are stripped from every path segment of the type name and
/// generic punctuation becomes `_`: `alloc::vec::Vec<carlot::model::Car>`
/// reads `Vec_Car_`.
pub fn schema_name<T: ?Sized>() -> String {
    readable_name(type_name::<T>())
}

fn readable_name(raw: &str) -> String {
    let stripped = TYPE_PATH.replace_all(raw, |caps: &regex::Captures<'_>| {
        caps[0].rsplit("::").next().unwrap_or_default().to_owned()
    });
    stripped
        .replace(", ", "_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

// ── ApiSchema ─────────────────────────────────────────────────────────────────

/// A type that can describe its wire shape.
///
/// Named models register themselves via [`SchemaRegistry::named`] and return
/// the `$ref`; primitives and parameter structs return inline schemas.
pub trait ApiSchema {
    fn schema(registry: &mut SchemaRegistry) -> Schema;
}

impl ApiSchema for String {
    fn schema(_: &mut SchemaRegistry) -> Schema { Schema::string() }
}

impl ApiSchema for bool {
    fn schema(_: &mut SchemaRegistry) -> Schema { Schema::boolean() }
}

impl ApiSchema for i64 {
    fn schema(_: &mut SchemaRegistry) -> Schema { Schema::integer().with_format("int64") }
}

impl ApiSchema for u32 {
    fn schema(_: &mut SchemaRegistry) -> Schema { Schema::integer().with_format("int32") }
}

impl ApiSchema for f64 {
    fn schema(_: &mut SchemaRegistry) -> Schema { Schema::number().with_format("double") }
}

impl ApiSchema for NaiveDate {
    fn schema(_: &mut SchemaRegistry) -> Schema { Schema::string().with_format("date") }
}

impl<T: ApiSchema> ApiSchema for Option<T> {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        let inner = T::schema(registry);
        if inner.reference.is_some() {
            // `$ref` siblings are ignored by OpenAPI 3.0; nullability lives on the property.
            inner
        } else {
            inner.nullable()
        }
    }
}

impl<T: ApiSchema> ApiSchema for Vec<T> {
    fn schema(registry: &mut SchemaRegistry) -> Schema {
        Schema::array(T::schema(registry))
    }
}
