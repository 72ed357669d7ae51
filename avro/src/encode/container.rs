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

//! Writing Object Container Files.

use super::{encode_bytes, encode_long, encode_to};
use crate::{
    AvroResult,
    codec::Codec,
    container::{MAGIC, SYNC_SIZE},
    error::Details,
    schema::{AvroType, Schema},
    types::Value,
};
use std::{collections::HashMap, sync::Arc};

/// The default amount of values written per block.
pub const DEFAULT_OBJECTS_PER_BLOCK: usize = 100;

/// Write `values` as a complete Object Container File.
///
/// Values are grouped in blocks of `objects_per_block` (at least one) values.
///
/// ```
/// # use avro_incremental::{Codec, DeflateSettings, Schema, encode::container::write_container, types::Value};
/// let schema = Schema::parse_str(r#""string""#)?;
/// let file = write_container()
///     .schema(&schema)
///     .values(&[Value::from("a"), Value::from("b")])
///     .codec(Codec::Deflate(DeflateSettings::default()))
///     .objects_per_block(1)
///     .call()?;
/// assert!(file.starts_with(b"Obj\x01"));
/// # Ok::<(), avro_incremental::Error>(())
/// ```
#[bon::builder]
pub fn write_container(
    schema: &Schema,
    values: &[Value],
    #[builder(default = Codec::Null)] codec: Codec,
    #[builder(default = DEFAULT_OBJECTS_PER_BLOCK)] objects_per_block: usize,
    #[builder(default = generate_sync_marker())] marker: [u8; SYNC_SIZE],
    #[builder(default)] user_metadata: HashMap<String, Vec<u8>>,
) -> AvroResult<Vec<u8>> {
    let mut buffer = MAGIC.to_vec();
    write_header(schema, codec, marker, user_metadata, &mut buffer)?;

    let mut block = Vec::new();
    for objects in values.chunks(objects_per_block.max(1)) {
        block.clear();
        for value in objects {
            encode_to(value, schema.root(), schema.names(), &mut block)?;
        }
        codec.compress(&mut block);
        encode_long(objects.len() as i64, &mut buffer)?;
        encode_bytes(&block, &mut buffer)?;
        buffer.extend_from_slice(&marker);
    }
    Ok(buffer)
}

fn write_header(
    schema: &Schema,
    codec: Codec,
    marker: [u8; SYNC_SIZE],
    user_metadata: HashMap<String, Vec<u8>>,
    buffer: &mut Vec<u8>,
) -> AvroResult<()> {
    let schema_bytes = serde_json::to_string(schema.root().as_ref())
        .map_err(Details::ConvertJsonToString)?
        .into_bytes();

    let mut metadata: HashMap<String, Value> = user_metadata
        .into_iter()
        .map(|(key, value)| (key, Value::Bytes(value)))
        .collect();
    metadata.insert("avro.schema".to_string(), Value::Bytes(schema_bytes));
    if codec != Codec::Null {
        metadata.insert("avro.codec".to_string(), codec.into());
    }

    let meta_type = AvroType::Map(Arc::new(AvroType::Bytes));
    encode_to(
        &Value::Map(metadata),
        &meta_type,
        schema.names(),
        &mut *buffer,
    )?;
    buffer.extend_from_slice(&marker);
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn generate_sync_marker() -> [u8; SYNC_SIZE] {
    rand::random()
}

#[cfg(target_arch = "wasm32")]
fn generate_sync_marker() -> [u8; SYNC_SIZE] {
    let mut marker = [0_u8; SYNC_SIZE];
    std::iter::repeat_with(quad_rand::rand)
        .take(4)
        .flat_map(|i| i.to_be_bytes())
        .enumerate()
        .for_each(|(i, n)| marker[i] = n);
    marker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContainerParser, codec::DeflateSettings};
    use pretty_assertions::assert_eq;

    #[test]
    fn blocks_hold_at_most_the_requested_objects() {
        let schema = Schema::parse_str(r#""int""#).unwrap();
        let values: Vec<Value> = (0..5).map(Value::Int).collect();
        let file = write_container()
            .schema(&schema)
            .values(&values)
            .objects_per_block(2)
            .call()
            .unwrap();

        let mut parser = ContainerParser::new();
        assert_eq!(parser.feed(&file).unwrap(), values);
        assert_eq!(parser.blocks_decoded(), 3);
        parser.finish().unwrap();
    }

    #[test]
    fn deflate_header_names_the_codec() {
        let schema = Schema::parse_str(r#""int""#).unwrap();
        let file = write_container()
            .schema(&schema)
            .values(&[Value::Int(1)])
            .codec(Codec::Deflate(DeflateSettings::default()))
            .call()
            .unwrap();

        let mut parser = ContainerParser::new();
        assert_eq!(parser.feed(&file).unwrap(), vec![Value::Int(1)]);
        assert!(matches!(
            parser.header().map(|h| h.codec),
            Some(Codec::Deflate(_))
        ));
    }

    #[test]
    fn markers_differ_between_files() {
        assert_ne!(generate_sync_marker(), generate_sync_marker());
    }
}
