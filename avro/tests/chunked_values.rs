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
//! Decoding streams of values fed in arbitrary chunks.

use avro_incremental::{AvroParser, Details, Error, ParseStatus, Schema, types::Value};
use hex_literal::hex;
use pretty_assertions::assert_eq;
use rstest::rstest;

type TestResult = anyhow::Result<()>;

const PAIR_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "Pair",
    "fields": [
        {"name": "a", "type": "long"},
        {"name": "b", "type": "string"}
    ]
}
"#;

const LINKED_LIST_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "Node",
    "fields": [
        {"name": "value", "type": "int"},
        {"name": "next", "type": ["null", "Node"]}
    ]
}
"#;

const MIXED_SCHEMA: &str = r#"
{
    "type": "record",
    "name": "Mixed",
    "namespace": "test",
    "fields": [
        {"name": "flag", "type": "boolean"},
        {"name": "ratio", "type": "double"},
        {"name": "tags", "type": {"type": "array", "items": "string"}},
        {"name": "counts", "type": {"type": "map", "values": "int"}},
        {"name": "suit", "type": {"type": "enum", "name": "Suit", "symbols": ["HEARTS", "SPADES"]}},
        {"name": "id", "type": {"type": "fixed", "name": "Id", "size": 3}},
        {"name": "note", "type": ["null", "string"]}
    ]
}
"#;

fn pair(a: i64, b: &str) -> Value {
    Value::Record(vec![("a".into(), Value::Long(a)), ("b".into(), b.into())])
}

fn decode_all(schema: &Schema, chunks: &[&[u8]]) -> Result<Vec<Value>, Error> {
    let mut parser = AvroParser::new(schema.clone());
    let mut values = Vec::new();
    for chunk in chunks {
        values.extend(parser.feed(chunk)?);
    }
    parser.finish()?;
    Ok(values)
}

/// Two mixed records followed by a third one with an empty array and map.
fn mixed_stream() -> Vec<u8> {
    [
        // flag, ratio 1.5, two tags, one count, SPADES, id, "x"
        &hex!("01 000000000000f83f 04 02 61 04 62 63 00 02 02 6b 54 00 02 010203 02 02 78")[..],
        // flag, ratio 0.0, empty tags, empty counts, HEARTS, id, null
        &hex!("00 0000000000000000 00 00 00 ffeedd 00")[..],
    ]
    .concat()
}

fn mixed_values() -> Vec<Value> {
    vec![
        Value::Record(vec![
            ("flag".into(), Value::Boolean(true)),
            ("ratio".into(), Value::Double(1.5)),
            ("tags".into(), Value::Array(vec!["a".into(), "bc".into()])),
            ("counts".into(), Value::Map([("k".to_string(), Value::Int(42))].into())),
            ("suit".into(), Value::Enum(1, "SPADES".into())),
            ("id".into(), Value::Fixed(3, vec![1, 2, 3])),
            ("note".into(), "x".into()),
        ]),
        Value::Record(vec![
            ("flag".into(), Value::Boolean(false)),
            ("ratio".into(), Value::Double(0.0)),
            ("tags".into(), Value::Array(vec![])),
            ("counts".into(), Value::Map(Default::default())),
            ("suit".into(), Value::Enum(0, "HEARTS".into())),
            ("id".into(), Value::Fixed(3, vec![0xff, 0xee, 0xdd])),
            ("note".into(), Value::Null),
        ]),
    ]
}

#[test]
fn record_split_inside_the_string() -> TestResult {
    let schema = Schema::parse_str(PAIR_SCHEMA)?;
    let mut parser = AvroParser::new(schema);

    assert!(parser.feed(&hex!("d8 04 04 68"))?.is_empty());
    assert!(!parser.is_idle());
    assert_eq!(parser.feed(&hex!("69"))?, vec![pair(300, "hi")]);
    assert!(parser.is_idle());
    parser.finish()?;
    Ok(())
}

#[test]
fn several_values_in_one_chunk() -> TestResult {
    let schema = Schema::parse_str(PAIR_SCHEMA)?;
    let values = decode_all(&schema, &[&hex!("d8 04 04 68 69 01 00")])?;
    assert_eq!(values, vec![pair(300, "hi"), pair(-1, "")]);
    Ok(())
}

#[test]
fn array_with_two_blocks() -> TestResult {
    let schema = Schema::parse_str(r#"{"type": "array", "items": "int"}"#)?;
    let values = decode_all(&schema, &[&hex!("04 02 04 02 06 00")])?;
    assert_eq!(
        values,
        vec![Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])]
    );
    Ok(())
}

#[test]
fn negative_block_count_skips_the_byte_size() -> TestResult {
    let schema = Schema::parse_str(r#"{"type": "array", "items": "int"}"#)?;
    // count -2, byte size 2, items 1 and 2, end
    let encoded = hex!("03 04 02 04 00");
    for split in 0..=encoded.len() {
        let (head, tail) = encoded.split_at(split);
        assert_eq!(
            decode_all(&schema, &[head, tail])?,
            vec![Value::Array(vec![Value::Int(1), Value::Int(2)])]
        );
    }
    Ok(())
}

#[test]
fn union_of_null_and_string() -> TestResult {
    let schema = Schema::parse_str(r#"["null", "string"]"#)?;
    let values = decode_all(&schema, &[&hex!("00 02 04 68 69")])?;
    assert_eq!(values, vec![Value::Null, "hi".into()]);
    Ok(())
}

#[test]
fn enum_index_out_of_range() -> TestResult {
    let schema =
        Schema::parse_str(r#"{"type": "enum", "name": "E", "symbols": ["A", "B", "C"]}"#)?;
    let mut parser = AvroParser::new(schema);
    assert!(matches!(
        parser.feed(&hex!("0a")).map_err(Error::into_details),
        Err(Details::GetEnumUnknownIndexValue {
            index: 5,
            num_symbols: 3
        })
    ));
    assert!(parser.is_poisoned());
    Ok(())
}

#[test]
fn union_index_out_of_range() -> TestResult {
    let schema = Schema::parse_str(r#"["null", "string"]"#)?;
    let mut parser = AvroParser::new(schema);
    assert!(matches!(
        parser.feed(&hex!("04")).map_err(Error::into_details),
        Err(Details::GetUnionVariant {
            index: 2,
            num_variants: 2
        })
    ));
    Ok(())
}

#[test]
fn every_split_point_yields_the_same_values() -> TestResult {
    let schema = Schema::parse_str(MIXED_SCHEMA)?;
    let encoded = mixed_stream();
    for split in 0..=encoded.len() {
        let (head, tail) = encoded.split_at(split);
        assert_eq!(decode_all(&schema, &[head, tail])?, mixed_values(), "split at {split}");
    }
    Ok(())
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
#[case(8)]
#[case(1024)]
fn fixed_chunk_sizes_yield_the_same_values(#[case] chunk_size: usize) -> TestResult {
    let schema = Schema::parse_str(MIXED_SCHEMA)?;
    let encoded = mixed_stream();
    let chunks: Vec<&[u8]> = encoded.chunks(chunk_size).collect();
    assert_eq!(decode_all(&schema, &chunks)?, mixed_values());
    Ok(())
}

#[test]
fn single_byte_feeds_report_progress() -> TestResult {
    let schema = Schema::parse_str(PAIR_SCHEMA)?;
    let mut parser = AvroParser::new(schema);
    let encoded = hex!("d8 04 04 68 69");

    let mut values = Vec::new();
    for byte in &encoded[..encoded.len() - 1] {
        let status = parser.feed_with(&[*byte], |value| values.push(value))?;
        assert_eq!(status, ParseStatus::NeedMore);
    }
    let status = parser.feed_with(&encoded[encoded.len() - 1..], |value| values.push(value))?;
    assert_eq!(status, ParseStatus::Idle);
    assert_eq!(values, vec![pair(300, "hi")]);
    assert_eq!(parser.values_decoded(), 1);
    Ok(())
}

#[test]
fn finish_in_the_middle_of_a_value() -> TestResult {
    let schema = Schema::parse_str(PAIR_SCHEMA)?;
    let mut parser = AvroParser::new(schema);
    assert!(parser.feed(&hex!("d8 04 04 68"))?.is_empty());

    let err = parser.finish().unwrap_err();
    assert!(err.is_truncated_input());
    Ok(())
}

#[test]
fn finish_after_a_partial_varint() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let mut parser = AvroParser::new(schema);
    assert!(parser.feed(&hex!("80 80"))?.is_empty());
    assert!(parser.finish().unwrap_err().is_truncated_input());
    Ok(())
}

#[test]
fn errors_poison_the_parser() -> TestResult {
    let schema = Schema::parse_str(r#""boolean""#)?;
    let mut parser = AvroParser::new(schema);
    assert_eq!(parser.feed(&hex!("01"))?, vec![Value::Boolean(true)]);
    assert!(matches!(
        parser.feed(&hex!("02")).map_err(Error::into_details),
        Err(Details::BoolValue(2))
    ));
    assert!(matches!(
        parser.feed(&hex!("00")).map_err(Error::into_details),
        Err(Details::ParserPoisoned)
    ));
    Ok(())
}

#[test]
fn overlong_varint() -> TestResult {
    let schema = Schema::parse_str(r#""long""#)?;
    let mut parser = AvroParser::new(schema);
    assert!(matches!(
        parser.feed(&[0xff; 11]).map_err(Error::into_details),
        Err(Details::IntegerOverflow)
    ));
    Ok(())
}

#[test]
fn invalid_utf8_string() -> TestResult {
    let schema = Schema::parse_str(r#""string""#)?;
    let mut parser = AvroParser::new(schema);
    assert!(matches!(
        parser.feed(&hex!("04 c3 28")).map_err(Error::into_details),
        Err(Details::ConvertToUtf8(_))
    ));
    Ok(())
}

#[test]
fn recursive_linked_list() -> TestResult {
    let schema = Schema::parse_str(LINKED_LIST_SCHEMA)?;
    // 1 -> 2 -> null, split in the middle of the second node
    let values = decode_all(&schema, &[&hex!("02 02 04"), &hex!("00")])?;
    let expected = Value::Record(vec![
        ("value".into(), Value::Int(1)),
        (
            "next".into(),
            Value::Record(vec![
                ("value".into(), Value::Int(2)),
                ("next".into(), Value::Null),
            ]),
        ),
    ]);
    assert_eq!(values, vec![expected]);
    Ok(())
}

#[test]
fn deep_nesting_is_not_limited_by_the_call_stack() -> TestResult {
    const DEPTH: usize = 1_000;
    let schema = Schema::parse_str(LINKED_LIST_SCHEMA)?;
    let mut encoded = hex!("00 02").repeat(DEPTH - 1);
    encoded.extend_from_slice(&hex!("00 00"));

    let mut parser = AvroParser::new(schema);
    assert!(parser.feed(&encoded[..encoded.len() - 1])?.is_empty());
    // a record and a union per node, plus the branch index of the last union
    assert_eq!(parser.depth(), 2 * DEPTH + 1);
    let values = parser.feed(&encoded[encoded.len() - 1..])?;
    parser.finish()?;

    let mut node = &values[0];
    let mut length = 1;
    while let Some(next @ Value::Record(_)) = node.field("next") {
        node = next;
        length += 1;
    }
    assert_eq!(length, DEPTH);
    Ok(())
}
