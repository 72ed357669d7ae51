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

//! Logic for encoding [`Value`]s into the Avro binary format.

pub mod container;

use crate::{
    AvroResult,
    error::Details,
    schema::{AvroType, AvroTypeKind, EnumType, FixedType, Names, RecordType, Schema},
    types::{Value, ValueKind},
    util::{zig_i32, zig_i64},
};
use log::error;
use std::{collections::HashMap, io::Write};

/// Encode a `Value` of the root type of `schema` into a new buffer.
///
/// The value is checked against the type while it is written.
pub fn encode(value: &Value, schema: &Schema) -> AvroResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_to(value, schema.root(), schema.names(), &mut buffer)?;
    Ok(buffer)
}

pub(crate) fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(
    s: &B,
    mut writer: W,
) -> AvroResult<usize> {
    let bytes = s.as_ref();
    let written = encode_long(bytes.len() as i64, &mut writer)?;
    write_raw(bytes, writer).map(|n| n + written)
}

pub(crate) fn encode_long<W: Write>(i: i64, writer: W) -> AvroResult<usize> {
    zig_i64(i, writer)
}

pub(crate) fn encode_int<W: Write>(i: i32, writer: W) -> AvroResult<usize> {
    zig_i32(i, writer)
}

fn write_raw<W: Write>(bytes: &[u8], mut writer: W) -> AvroResult<usize> {
    writer.write_all(bytes).map_err(Details::WriteBytes)?;
    Ok(bytes.len())
}

fn mismatch(value: &Value, supported_schema: Vec<AvroTypeKind>) -> crate::Error {
    Details::EncodeValueAsSchemaError {
        value_kind: ValueKind::from(value),
        supported_schema,
    }
    .into()
}

/// Encode `value` as a value of `ty`, returning the amount of bytes written.
///
/// References are resolved through `names`. For unions the first member the value can be
/// encoded as is selected. Arrays and maps are written as a single block.
pub fn encode_to<W: Write>(
    value: &Value,
    ty: &AvroType,
    names: &Names,
    writer: &mut W,
) -> AvroResult<usize> {
    match (ty, value) {
        (AvroType::Ref { name }, _) => {
            let resolved = names
                .get(name)
                .ok_or_else(|| Details::SchemaResolutionError(name.to_string()))?;
            encode_to(value, resolved, names, writer)
        }
        (AvroType::Union(members), _) => {
            let mut union_buffer: Vec<u8> = Vec::new();
            for (index, member) in members.iter().enumerate() {
                encode_long(index as i64, &mut union_buffer)?;
                match encode_to(value, member, names, &mut union_buffer) {
                    Ok(_) => return write_raw(&union_buffer, writer),
                    //undo any partial encoding
                    Err(_) => union_buffer.clear(),
                }
            }
            Err(mismatch(value, members.iter().map(|m| m.kind()).collect()))
        }
        (AvroType::Null, Value::Null) => Ok(0),
        (AvroType::Boolean, Value::Boolean(b)) => write_raw(&[u8::from(*b)], writer),
        (AvroType::Int, Value::Int(i)) => encode_int(*i, writer),
        (AvroType::Long, Value::Long(i)) => encode_long(*i, writer),
        (AvroType::Float, Value::Float(x)) => write_raw(&x.to_le_bytes(), writer),
        (AvroType::Double, Value::Double(x)) => write_raw(&x.to_le_bytes(), writer),
        (AvroType::Bytes, Value::Bytes(bytes)) => encode_bytes(bytes, writer),
        (AvroType::String, Value::String(s)) => encode_bytes(s, writer),
        (AvroType::Fixed(FixedType { size, .. }), Value::Fixed(n, bytes))
            if n == size && bytes.len() == *size =>
        {
            write_raw(bytes, writer)
        }
        (AvroType::Enum(EnumType { symbols, .. }), Value::Enum(i, s))
            if symbols.get(*i as usize) == Some(s) =>
        {
            encode_int(*i as i32, writer)
        }
        (AvroType::Enum(EnumType { symbols, .. }), Value::String(s)) => {
            match symbols.iter().position(|item| item == s) {
                Some(index) => encode_int(index as i32, writer),
                None => {
                    error!("Invalid symbol string {s:?}.");
                    Err(mismatch(value, vec![AvroTypeKind::String]))
                }
            }
        }
        (AvroType::Array(items_ty), Value::Array(items)) => {
            let mut written = 0;
            if !items.is_empty() {
                written += encode_long(items.len() as i64, &mut *writer)?;
                for item in items {
                    written += encode_to(item, items_ty, names, writer)?;
                }
            }
            Ok(written + write_raw(&[0u8], writer)?)
        }
        (AvroType::Map(values_ty), Value::Map(entries)) => {
            let mut written = 0;
            if !entries.is_empty() {
                written += encode_long(entries.len() as i64, &mut *writer)?;
                for (key, value) in entries {
                    written += encode_bytes(key, &mut *writer)?;
                    written += encode_to(value, values_ty, names, writer)?;
                }
            }
            Ok(written + write_raw(&[0u8], writer)?)
        }
        (AvroType::Record(RecordType { fields, .. }), Value::Record(value_fields)) => {
            let lookup: HashMap<&str, &Value> = value_fields
                .iter()
                .map(|(name, value)| (name.as_str(), value))
                .collect();
            let mut written = 0;
            for field in fields {
                let value = lookup
                    .get(field.name.as_str())
                    .ok_or_else(|| Details::RecordFieldMissing(field.name.clone()))?;
                written += encode_to(value, &field.ty, names, writer)?;
            }
            Ok(written)
        }
        _ => Err(mismatch(value, vec![ty.kind()])),
    }
}
