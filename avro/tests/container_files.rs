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
//! Reading Object Container Files fed in arbitrary chunks.

use avro_incremental::{
    Codec, ContainerParser, DeflateSettings, Details, Error, Schema,
    encode::container::write_container, types::Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

type TestResult = anyhow::Result<()>;

const EVENT_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "Event",
    "namespace": "test.events",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["OPEN", "CLOSE"]}},
        {"name": "payload", "type": ["null", "bytes"]},
        {"name": "labels", "type": {"type": "map", "values": "string"}}
    ]
}
"#;

fn events(n: i64) -> Vec<Value> {
    (0..n)
        .map(|id| {
            let kind = if id % 2 == 0 {
                Value::Enum(0, "OPEN".into())
            } else {
                Value::Enum(1, "CLOSE".into())
            };
            let payload = if id % 3 == 0 {
                Value::Null
            } else {
                Value::Bytes(vec![id as u8; id as usize])
            };
            Value::Record(vec![
                ("id".into(), Value::Long(id)),
                ("kind".into(), kind),
                ("payload".into(), payload),
                (
                    "labels".into(),
                    Value::Map([("n".to_string(), Value::String(id.to_string()))].into()),
                ),
            ])
        })
        .collect()
}

fn read_in_chunks(file: &[u8], chunk_size: usize) -> Result<Vec<Value>, Error> {
    let mut parser = ContainerParser::new();
    let mut values = Vec::new();
    for chunk in file.chunks(chunk_size) {
        parser.feed_with(chunk, |value| values.push(value))?;
    }
    parser.finish()?;
    Ok(values)
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(64)]
#[case(usize::MAX)]
fn deflate_file_in_any_chunking(#[case] chunk_size: usize) -> TestResult {
    let schema = Schema::parse_str(EVENT_SCHEMA)?;
    let values = events(20);
    let file = write_container()
        .schema(&schema)
        .values(&values)
        .codec(Codec::Deflate(DeflateSettings::default()))
        .objects_per_block(3)
        .call()?;

    assert_eq!(read_in_chunks(&file, chunk_size)?, values);
    Ok(())
}

#[test]
fn null_codec_file_with_metadata() -> TestResult {
    let schema = Schema::parse_str(EVENT_SCHEMA)?;
    let values = events(50);
    let file = write_container()
        .schema(&schema)
        .values(&values)
        .user_metadata([("origin".to_string(), b"tests".to_vec())].into())
        .call()?;

    let mut parser = ContainerParser::new();
    let (head, tail) = file.split_at(file.len() / 2);
    let mut decoded = parser.feed(head)?;
    let header = parser.header().expect("the header is shorter than half the file");
    assert_eq!(header.codec, Codec::Null);
    assert_eq!(header.schema.as_ref(), &schema);
    assert_eq!(header.metadata.get("origin"), Some(&b"tests".to_vec()));

    decoded.extend(parser.feed(tail)?);
    assert_eq!(decoded, values);
    assert_eq!(parser.blocks_decoded(), 1);
    parser.finish()?;
    Ok(())
}

#[test]
fn values_of_a_null_schema() -> TestResult {
    let schema = Schema::parse_str(r#""null""#)?;
    let values = vec![Value::Null; 4];
    let file = write_container()
        .schema(&schema)
        .values(&values)
        .objects_per_block(3)
        .call()?;
    assert_eq!(read_in_chunks(&file, 5)?, values);
    Ok(())
}

#[test]
fn corrupted_sync_marker() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let mut file = write_container()
        .schema(&schema)
        .values(&[Value::Long(1), Value::Long(2)])
        .objects_per_block(1)
        .marker([0x5a; 16])
        .call()?;
    let last = file.len() - 1;
    file[last] ^= 0xff;

    let mut parser = ContainerParser::new();
    let mut decoded = Vec::new();
    let result = parser.feed_with(&file, |value| decoded.push(value));
    assert!(matches!(
        result.map_err(Error::into_details),
        Err(Details::SyncMarkerMismatch)
    ));
    // the first block was complete and valid
    assert_eq!(decoded, vec![Value::Long(1)]);
    assert!(matches!(
        parser.finish().map_err(Error::into_details),
        Err(Details::ParserPoisoned)
    ));
    Ok(())
}

#[test]
fn file_cut_inside_a_block() -> TestResult {
    let schema = Schema::parse_str(r#""string""#)?;
    let file = write_container()
        .schema(&schema)
        .values(&[Value::from("complete"), Value::from("cut")])
        .objects_per_block(1)
        .call()?;

    let mut parser = ContainerParser::new();
    let decoded = parser.feed(&file[..file.len() - 4])?;
    assert_eq!(decoded, vec![Value::from("complete")]);
    assert!(parser.finish().unwrap_err().is_truncated_input());
    Ok(())
}
