// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Logic for parsing and interacting with schemas in Avro format.

mod name;
mod parser;

pub use name::{Name, Names, NamespaceRef};

use crate::{AvroResult, error::Details};
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use std::sync::Arc;
use strum_macros::EnumDiscriminants;

/// Immutable description of one node of an Avro schema.
///
/// Composite types refer to their children through [`Arc`]s so a parsed schema can be shared by
/// any number of decoders at the same time.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(AvroTypeKind), derive(Hash, strum_macros::Display))]
pub enum AvroType {
    /// A `null` Avro type.
    Null,
    /// A `boolean` Avro type.
    Boolean,
    /// An `int` Avro type.
    Int,
    /// A `long` Avro type.
    Long,
    /// A `float` Avro type.
    Float,
    /// A `double` Avro type.
    Double,
    /// A `bytes` Avro type.
    Bytes,
    /// A `string` Avro type.
    String,
    /// A `record` Avro type.
    Record(RecordType),
    /// An `enum` Avro type.
    Enum(EnumType),
    /// An `array` Avro type, holding the type of its items.
    Array(Arc<AvroType>),
    /// A `map` Avro type, holding the type of its values. Keys are always strings.
    Map(Arc<AvroType>),
    /// A `union` Avro type, holding its members in declaration order.
    Union(Vec<Arc<AvroType>>),
    /// A `fixed` Avro type.
    Fixed(FixedType),
    /// A reference to a named `record`, `enum` or `fixed` defined elsewhere in the schema.
    Ref { name: Name },
}

impl AvroType {
    /// The tag of this type.
    pub fn kind(&self) -> AvroTypeKind {
        AvroTypeKind::from(self)
    }

    /// The full name of a named type.
    pub fn name(&self) -> Option<&Name> {
        match self {
            AvroType::Record(RecordType { name, .. })
            | AvroType::Enum(EnumType { name, .. })
            | AvroType::Fixed(FixedType { name, .. })
            | AvroType::Ref { name } => Some(name),
            _ => None,
        }
    }
}

/// A `record` type: an ordered list of named fields.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct RecordType {
    pub name: Name,
    pub doc: Option<String>,
    #[builder(default)]
    pub fields: Vec<RecordField>,
}

/// A field of a [`RecordType`].
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct RecordField {
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub ty: Arc<AvroType>,
}

/// An `enum` type: an ordered list of symbols.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumType {
    pub name: Name,
    pub symbols: Vec<String>,
}

/// A `fixed` type: an exact amount of raw bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedType {
    pub name: Name,
    pub size: usize,
}

/// A parsed schema document.
///
/// Holds the root [`AvroType`] together with every named type that was defined while parsing, so
/// [`AvroType::Ref`]s (including recursive ones) can be resolved when decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    root: Arc<AvroType>,
    names: Names,
}

impl Schema {
    /// Create a schema from a root type without named references.
    pub fn new(root: AvroType) -> Self {
        Self::with_names(Arc::new(root), Names::new())
    }

    pub(crate) fn with_names(root: Arc<AvroType>, names: Names) -> Self {
        Self { root, names }
    }

    /// Create a `Schema` from a string representing a JSON Avro schema.
    pub fn parse_str(input: &str) -> AvroResult<Self> {
        let value = serde_json::from_str(input).map_err(Details::ParseSchemaJson)?;
        Self::parse(&value)
    }

    /// Create a `Schema` from a `serde_json::Value` representing a JSON Avro schema.
    pub fn parse(value: &serde_json::Value) -> AvroResult<Self> {
        parser::Parser::default().parse_document(value)
    }

    /// The root type of the document.
    pub fn root(&self) -> &Arc<AvroType> {
        &self.root
    }

    /// All named types defined by the document.
    pub fn names(&self) -> &Names {
        &self.names
    }

    /// Look up the definition behind a [`AvroType::Ref`], other types are returned as is.
    ///
    /// The name table only ever holds definitions, so a single lookup is enough.
    pub fn resolve<'a>(&'a self, ty: &'a Arc<AvroType>) -> AvroResult<&'a Arc<AvroType>> {
        match ty.as_ref() {
            AvroType::Ref { name } => Ok(self
                .names
                .get(name)
                .ok_or_else(|| Details::SchemaResolutionError(name.to_string()))?),
            _ => Ok(ty),
        }
    }
}

/// Types are written back as JSON with full names, so the output can be parsed again without
/// any enclosing namespace.
impl Serialize for AvroType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AvroType::Ref { name } => serializer.serialize_str(name.fullname()),
            AvroType::Null => serializer.serialize_str("null"),
            AvroType::Boolean => serializer.serialize_str("boolean"),
            AvroType::Int => serializer.serialize_str("int"),
            AvroType::Long => serializer.serialize_str("long"),
            AvroType::Float => serializer.serialize_str("float"),
            AvroType::Double => serializer.serialize_str("double"),
            AvroType::Bytes => serializer.serialize_str("bytes"),
            AvroType::String => serializer.serialize_str("string"),
            AvroType::Array(items) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items.as_ref())?;
                map.end()
            }
            AvroType::Map(values) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", values.as_ref())?;
                map.end()
            }
            AvroType::Union(members) => {
                let mut seq = serializer.serialize_seq(Some(members.len()))?;
                for member in members {
                    seq.serialize_element(member.as_ref())?;
                }
                seq.end()
            }
            AvroType::Record(RecordType { name, doc, fields }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "record")?;
                map.serialize_entry("name", name.fullname())?;
                if let Some(doc) = doc {
                    map.serialize_entry("doc", doc)?;
                }
                map.serialize_entry("fields", fields)?;
                map.end()
            }
            AvroType::Enum(EnumType { name, symbols }) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "enum")?;
                map.serialize_entry("name", name.fullname())?;
                map.serialize_entry("symbols", symbols)?;
                map.end()
            }
            AvroType::Fixed(FixedType { name, size }) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "fixed")?;
                map.serialize_entry("name", name.fullname())?;
                map.serialize_entry("size", size)?;
                map.end()
            }
        }
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", self.ty.as_ref())?;
        map.end()
    }
}

impl From<AvroType> for Schema {
    fn from(root: AvroType) -> Self {
        Self::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_is_the_tag() {
        assert_eq!(AvroType::Long.kind(), AvroTypeKind::Long);
        assert_eq!(
            AvroType::Array(Arc::new(AvroType::Int)).kind(),
            AvroTypeKind::Array
        );
        assert_eq!(AvroTypeKind::Union.to_string(), "Union");
    }

    #[test]
    fn record_builder() {
        let record = RecordType::builder()
            .name(Name::new("Pair").unwrap())
            .fields(vec![
                RecordField::builder().name("a").ty(AvroType::Long).build(),
                RecordField::builder().name("b").ty(AvroType::String).build(),
            ])
            .build();
        assert_eq!(record.fields[1].name, "b");
        assert_eq!(record.fields[1].ty.kind(), AvroTypeKind::String);
        assert_eq!(record.doc, None);
    }

    #[test]
    fn serialized_schema_parses_back() {
        let input = r#"{
            "type": "record",
            "name": "Node",
            "namespace": "list",
            "doc": "A linked list",
            "fields": [
                {"name": "value", "type": {"type": "enum", "name": "Color", "symbols": ["RED"]}},
                {"name": "id", "type": {"type": "fixed", "name": "Id", "size": 4}},
                {"name": "tags", "type": {"type": "map", "values": {"type": "array", "items": "string"}}},
                {"name": "next", "type": ["null", "Node"]}
            ]
        }"#;
        let schema = Schema::parse_str(input).unwrap();
        let json = serde_json::to_value(schema.root().as_ref()).unwrap();
        assert_eq!(json["name"], "list.Node");
        assert_eq!(json["fields"][1]["type"]["name"], "list.Id");
        assert_eq!(json["fields"][3]["type"], serde_json::json!(["null", "list.Node"]));

        let reparsed = Schema::parse(&json).unwrap();
        assert_eq!(reparsed.root(), schema.root());
    }

    #[test]
    fn primitives_serialize_as_strings() {
        assert_eq!(serde_json::to_string(&AvroType::Long).unwrap(), r#""long""#);
        assert_eq!(
            serde_json::to_string(&AvroType::Array(Arc::new(AvroType::Null))).unwrap(),
            r#"{"type":"array","items":"null"}"#
        );
    }

    #[test]
    fn resolve_unknown_reference() {
        let schema = Schema::new(AvroType::Null);
        let dangling = Arc::new(AvroType::Ref {
            name: Name::new("Missing").unwrap(),
        });
        assert!(matches!(
            schema.resolve(&dangling).map_err(crate::Error::into_details),
            Err(Details::SchemaResolutionError(name)) if name == "Missing"
        ));
    }
}
