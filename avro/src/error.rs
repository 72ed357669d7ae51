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

use crate::{schema::AvroTypeKind, types::ValueKind};
use std::{error::Error as _, fmt};

/// Errors encountered while parsing schemas, decoding or encoding Avro data.
///
/// To inspect the details of the error use [`details`](Self::details) or [`into_details`](Self::into_details)
/// to get a [`Details`] which contains more precise error information.
///
/// See [`Details`] for all possible errors.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// Whether this error was raised by a decoder that ran out of input.
    ///
    /// Starvation during feeding is never an error, this is only returned by `finish` calls.
    pub fn is_truncated_input(&self) -> bool {
        matches!(*self.details, Details::TruncatedInput { .. })
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

#[derive(thiserror::Error)]
pub enum Details {
    #[error("Invalid u8 for bool: {0}")]
    BoolValue(u8),

    #[error("Invalid utf-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Integer overflow when decoding integral value")]
    IntegerOverflow,

    #[error("Value {1} does not fit into an Avro int")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Negative length prefix: {0}")]
    NegativeLength(i64),

    #[error("Block count {0} does not fit into usize")]
    ConvertI64ToUsize(#[source] std::num::TryFromIntError, i64),

    #[error("Union index {index} out of bounds: {num_variants}")]
    GetUnionVariant { index: i64, num_variants: usize },

    #[error("Enum index {index} out of bounds: {num_symbols}")]
    GetEnumUnknownIndexValue { index: i32, num_symbols: usize },

    #[error("Expected a {expected} value from a child decoder, got {found:?}")]
    UnexpectedChildValue {
        expected: AvroTypeKind,
        found: ValueKind,
    },

    #[error("Not enough bytes buffered: requested {requested}, available {available}")]
    ConsumePastWindow { requested: usize, available: usize },

    #[error(
        "Input ended with {buffered} unconsumed byte(s) and {pending} value decoder(s) still in progress"
    )]
    TruncatedInput { buffered: usize, pending: usize },

    #[error("A {0} value consumed no bytes while input remains, the stream cannot advance")]
    ZeroWidthDatum(AvroTypeKind),

    #[error("Buffering {requested} bytes would exceed the configured limit of {limit} bytes")]
    BufferLimit { requested: usize, limit: usize },

    #[error("Cannot publish an unfinished {0} value")]
    NodeNotDone(AvroTypeKind),

    #[error("The parser failed earlier and cannot be used anymore")]
    ParserPoisoned,

    #[error("Unresolved named type: {0}")]
    SchemaResolutionError(String),

    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Must be a JSON string, object or array")]
    ParseSchemaFromValidJson,

    #[error("Unknown primitive type: {0}")]
    ParsePrimitive(String),

    #[error("No `type` in complex type")]
    GetComplexTypeField,

    #[error("Unknown complex type: {0}")]
    GetComplexType(serde_json::Value),

    #[error("No `name` field")]
    GetNameField,

    #[error("No `name` in record field")]
    GetNameFieldFromRecord,

    #[error("No `type` in record field '{0}'")]
    GetRecordFieldTypeField(String),

    #[error("No `fields` in record")]
    GetRecordFieldsJson,

    #[error("Duplicate field name '{0}' in record")]
    FieldNameDuplicate(String),

    #[error("No `symbols` field in enum")]
    GetEnumSymbolsField,

    #[error("Unable to parse `symbols` in enum")]
    GetEnumSymbols,

    #[error("Duplicate enum symbol {0}")]
    EnumSymbolDuplicate(String),

    #[error("No `items` in array")]
    GetArrayItemsField,

    #[error("No `values` in map")]
    GetMapValuesField,

    #[error("Fixed schema `size` value must be a positive integer: {0}")]
    GetFixedSizeFieldPositive(serde_json::Value),

    #[error("Fixed schema has no `size`")]
    GetFixedSizeField,

    #[error("Two named schemas defined for same fullname: {0}")]
    NameCollision(String),

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types: {0}")]
    GetUnionDuplicate(AvroTypeKind),

    #[error("Invalid name '{0}'. It must match the regex '{1}'")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid Avro header magic: {0:?}")]
    HeaderMagic(Vec<u8>),

    #[error("No `avro.schema` in the container file metadata")]
    GetHeaderSchema,

    #[error("Codec '{0}' is not supported/enabled")]
    CodecNotSupported(String),

    #[error("Failed to decompress with deflate")]
    DeflateDecompress(#[source] std::io::Error),

    #[error("Block sync marker does not match the header sync marker")]
    SyncMarkerMismatch,

    #[error("Block header announced {expected} objects but {actual} were decoded")]
    BlockCountMismatch { expected: usize, actual: usize },

    #[error("Block header announced {count} objects but its data only holds {size} byte(s)")]
    BlockCountTooLarge { count: usize, size: usize },

    #[error("Block data has {0} trailing byte(s) after the announced objects")]
    TrailingBlockBytes(usize),

    #[error("Can only encode value type {value_kind:?} as one of {supported_schema:?}")]
    EncodeValueAsSchemaError {
        value_kind: ValueKind,
        supported_schema: Vec<AvroTypeKind>,
    },

    #[error("No value for record field '{0}'")]
    RecordFieldMissing(String),

    #[error("Failed to convert JSON to string")]
    ConvertJsonToString(#[source] serde_json::Error),

    #[error("JSON number {0} could not be converted into an Avro value as it's too large")]
    ConvertF64ToJson(f64),

    #[error("Failed to write bytes")]
    WriteBytes(#[source] std::io::Error),
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}
