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

use crate::AvroResult;
use crate::error::Details;
use crate::schema::{
    AvroType, AvroTypeKind, EnumType, FixedType, Name, Names, NamespaceRef, RecordField,
    RecordType, Schema,
};
use crate::util::MapHelper;
use crate::validator::validate_simple_name;
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
pub(crate) struct Parser {
    /// Named types whose definition is complete
    parsed_schemas: Names,
    /// Used to resolve cyclic references, i.e. when a
    /// field's type is a reference to its record's type
    resolving_schemas: HashSet<Name>,
}

impl Parser {
    /// Parse a whole schema document, keeping the named types for reference resolution.
    pub(super) fn parse_document(mut self, value: &Value) -> AvroResult<Schema> {
        let root = self.parse(value, None)?;
        Ok(Schema::with_names(root, self.parsed_schemas))
    }

    /// Create an `AvroType` from a `serde_json::Value` representing a JSON Avro schema.
    fn parse(
        &mut self,
        value: &Value,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        match *value {
            Value::String(ref t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            Value::Object(ref data) => self.parse_complex(data, enclosing_namespace),
            Value::Array(ref data) => self.parse_union(data, enclosing_namespace),
            _ => Err(Details::ParseSchemaFromValidJson.into()),
        }
    }

    /// Parse a string as a primitive type or reference to an already known named type.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let primitive = match name {
            "null" => AvroType::Null,
            "boolean" => AvroType::Boolean,
            "int" => AvroType::Int,
            "long" => AvroType::Long,
            "double" => AvroType::Double,
            "float" => AvroType::Float,
            "bytes" => AvroType::Bytes,
            "string" => AvroType::String,
            _ => return self.fetch_schema_ref(name, enclosing_namespace),
        };
        Ok(Arc::new(primitive))
    }

    /// Given a name, produce a reference to a parsed or currently resolving named type.
    ///
    /// A name without namespace is first looked up in the enclosing namespace and then in the
    /// null namespace.
    fn fetch_schema_ref(
        &mut self,
        name: &str,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let candidates = [
            Name::new_with_enclosing_namespace(name, enclosing_namespace),
            Name::new(name),
        ];
        for candidate in candidates.into_iter().flatten() {
            if self.parsed_schemas.contains_key(&candidate)
                || self.resolving_schemas.contains(&candidate)
            {
                return Ok(Arc::new(AvroType::Ref { name: candidate }));
            }
        }
        Err(Details::ParsePrimitive(name.to_string()).into())
    }

    /// Parse a `serde_json::Value` representing a complex Avro type.
    ///
    /// Avro supports "recursive" definition of types.
    /// e.g: `{"type": {"type": "string"}}`
    fn parse_complex(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let Some(type_value) = complex.get("type") else {
            return Err(Details::GetComplexTypeField.into());
        };

        if let Some(logical_type) = complex.string("logicalType") {
            debug!("Ignoring logical type '{logical_type}', decoding the underlying type");
        }

        match type_value {
            Value::String(t) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "array" => {
                    let items = complex.get("items").ok_or(Details::GetArrayItemsField)?;
                    Ok(Arc::new(AvroType::Array(
                        self.parse(items, enclosing_namespace)?,
                    )))
                }
                "map" => {
                    let values = complex.get("values").ok_or(Details::GetMapValuesField)?;
                    Ok(Arc::new(AvroType::Map(
                        self.parse(values, enclosing_namespace)?,
                    )))
                }
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                other => self.parse_known_schema(other, enclosing_namespace),
            },
            Value::Object(data) => self.parse_complex(data, enclosing_namespace),
            Value::Array(variants) => self.parse_union(variants, enclosing_namespace),
            other => Err(Details::GetComplexType(other.clone()).into()),
        }
    }

    /// Reserve a full name for a definition that is about to be parsed.
    fn register_resolving(&mut self, name: &Name) -> AvroResult<()> {
        if self.parsed_schemas.contains_key(name) || !self.resolving_schemas.insert(name.clone()) {
            return Err(Details::NameCollision(name.to_string()).into());
        }
        Ok(())
    }

    fn register_parsed(&mut self, name: Name, ty: AvroType) -> Arc<AvroType> {
        let ty = Arc::new(ty);
        self.resolving_schemas.remove(&name);
        self.parsed_schemas.insert(name, Arc::clone(&ty));
        ty
    }

    fn parse_record(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        debug!("Going to parse record schema: {:?}", &fully_qualified_name);
        self.register_resolving(&fully_qualified_name)?;

        let fields_json = complex
            .get("fields")
            .and_then(|fields| fields.as_array())
            .ok_or(Details::GetRecordFieldsJson)?;

        let mut fields = Vec::with_capacity(fields_json.len());
        let mut seen = HashSet::with_capacity(fields_json.len());
        for field in fields_json {
            let field = field
                .as_object()
                .ok_or(Details::GetNameFieldFromRecord)?;
            let name = field.name().ok_or(Details::GetNameFieldFromRecord)?;
            validate_simple_name(&name)?;
            if !seen.insert(name.clone()) {
                return Err(Details::FieldNameDuplicate(name).into());
            }
            let type_value = field
                .get("type")
                .ok_or_else(|| Details::GetRecordFieldTypeField(name.clone()))?;
            let ty = self.parse(type_value, fully_qualified_name.namespace())?;
            fields.push(RecordField { name, ty });
        }

        let record = RecordType {
            name: fully_qualified_name.clone(),
            doc: complex.string("doc"),
            fields,
        };
        Ok(self.register_parsed(fully_qualified_name, AvroType::Record(record)))
    }

    fn parse_enum(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.register_resolving(&fully_qualified_name)?;

        let symbols_json = complex
            .get("symbols")
            .ok_or(Details::GetEnumSymbolsField)?
            .as_array()
            .ok_or(Details::GetEnumSymbols)?;

        let mut symbols = Vec::with_capacity(symbols_json.len());
        for symbol in symbols_json {
            let symbol = symbol.as_str().ok_or(Details::GetEnumSymbols)?;
            validate_simple_name(symbol)?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(Details::EnumSymbolDuplicate(symbol.to_string()).into());
            }
            symbols.push(symbol.to_string());
        }

        let ty = AvroType::Enum(EnumType {
            name: fully_qualified_name.clone(),
            symbols,
        });
        Ok(self.register_parsed(fully_qualified_name, ty))
    }

    fn parse_fixed(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.register_resolving(&fully_qualified_name)?;

        let size_value = complex.get("size").ok_or(Details::GetFixedSizeField)?;
        let size = size_value
            .as_u64()
            .and_then(|size| usize::try_from(size).ok())
            .ok_or_else(|| Details::GetFixedSizeFieldPositive(size_value.clone()))?;

        let ty = AvroType::Fixed(FixedType {
            name: fully_qualified_name.clone(),
            size,
        });
        Ok(self.register_parsed(fully_qualified_name, ty))
    }

    /// Parse a JSON array into a union.
    ///
    /// Unions may not directly contain another union, and may contain at most one member of each
    /// unnamed type and of each full name.
    fn parse_union(
        &mut self,
        items: &[Value],
        enclosing_namespace: NamespaceRef,
    ) -> AvroResult<Arc<AvroType>> {
        let mut variants = Vec::with_capacity(items.len());
        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            let variant = self.parse(item, enclosing_namespace)?;
            if variant.kind() == AvroTypeKind::Union {
                return Err(Details::GetNestedUnion.into());
            }
            let key = match variant.name() {
                Some(name) => name.fullname().to_string(),
                None => variant.kind().to_string(),
            };
            if !seen.insert(key) {
                return Err(Details::GetUnionDuplicate(variant.kind()).into());
            }
            variants.push(variant);
        }
        Ok(Arc::new(AvroType::Union(variants)))
    }
}
