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

//! Incremental reader for Avro Object Container Files.
//!
//! The framing of the file (magic, header and block headers) is decoded by the same node
//! machinery as the values, so a file can be fed in chunks of any size.
//!
//! ```
//! # use avro_incremental::{ContainerParser, Schema, encode::container::write_container, types::Value};
//! let schema = Schema::parse_str(r#""long""#)?;
//! let values = [Value::Long(1), Value::Long(2)];
//! let file = write_container().schema(&schema).values(&values).call()?;
//!
//! let mut parser = ContainerParser::new();
//! let mut decoded = Vec::new();
//! for chunk in file.chunks(3) {
//!     decoded.extend(parser.feed(chunk)?);
//! }
//! parser.finish()?;
//! assert_eq!(decoded, values);
//! # Ok::<(), avro_incremental::Error>(())
//! ```

use crate::{
    AvroResult,
    codec::Codec,
    error::Details,
    parser::{AvroParserState, ParseStatus},
    schema::{AvroType, AvroTypeKind, FixedType, Name, Names, RecordField, RecordType, Schema},
    types::{Value, ValueKind},
    util::safe_len,
};
use log::{debug, warn};
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

/// The four bytes every Object Container File starts with.
pub const MAGIC: [u8; 4] = [b'O', b'b', b'j', 1];
/// The size of the marker separating the blocks.
pub const SYNC_SIZE: usize = 16;

fn fixed(name: &str, size: usize) -> Arc<AvroType> {
    Arc::new(AvroType::Fixed(FixedType {
        name: Name::new_unchecked(name),
        size,
    }))
}

fn record(name: &str, fields: Vec<(&str, Arc<AvroType>)>) -> Arc<AvroType> {
    Arc::new(AvroType::Record(
        RecordType::builder()
            .name(Name::new_unchecked(name))
            .fields(
                fields
                    .into_iter()
                    .map(|(name, ty)| RecordField::builder().name(name).ty(ty).build())
                    .collect(),
            )
            .build(),
    ))
}

static MAGIC_TYPE: LazyLock<Arc<AvroType>> =
    LazyLock::new(|| fixed("org.apache.avro.file.Magic", MAGIC.len()));

static HEADER_TYPE: LazyLock<Arc<AvroType>> = LazyLock::new(|| {
    record(
        "org.apache.avro.file.Header",
        vec![
            ("meta", Arc::new(AvroType::Map(Arc::new(AvroType::Bytes)))),
            ("sync", fixed("org.apache.avro.file.Sync", SYNC_SIZE)),
        ],
    )
});

/// `size` followed by `data` is exactly how `bytes` are encoded.
static BLOCK_TYPE: LazyLock<Arc<AvroType>> = LazyLock::new(|| {
    record(
        "org.apache.avro.file.Block",
        vec![
            ("count", Arc::new(AvroType::Long)),
            ("data", Arc::new(AvroType::Bytes)),
            ("sync", fixed("org.apache.avro.file.Sync", SYNC_SIZE)),
        ],
    )
});

/// The header of an Object Container File.
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    /// The schema of every value in the file, from `avro.schema`.
    pub schema: Arc<Schema>,
    /// The codec of the blocks, from `avro.codec`.
    pub codec: Codec,
    pub sync: [u8; SYNC_SIZE],
    /// All metadata entries that are not reserved by Avro.
    pub metadata: HashMap<String, Vec<u8>>,
}

fn unexpected(expected: AvroTypeKind, found: &Value) -> crate::Error {
    Details::UnexpectedChildValue {
        expected,
        found: ValueKind::from(found),
    }
    .into()
}

/// Split a decoded frame record into its field values.
fn frame_fields<const N: usize>(value: Value) -> AvroResult<[Value; N]> {
    match value {
        Value::Record(fields) if fields.len() == N => {
            let values: Vec<Value> = fields.into_iter().map(|(_, v)| v).collect();
            values
                .try_into()
                .map_err(|_| Details::UnexpectedChildValue {
                    expected: AvroTypeKind::Record,
                    found: ValueKind::Record,
                }
                .into())
        }
        other => Err(unexpected(AvroTypeKind::Record, &other)),
    }
}

fn sync_marker(value: Value) -> AvroResult<[u8; SYNC_SIZE]> {
    match value {
        Value::Fixed(SYNC_SIZE, bytes) => bytes.try_into().map_err(|_| {
            Details::UnexpectedChildValue {
                expected: AvroTypeKind::Fixed,
                found: ValueKind::Fixed,
            }
            .into()
        }),
        other => Err(unexpected(AvroTypeKind::Fixed, &other)),
    }
}

fn create_header(value: Value) -> AvroResult<ContainerHeader> {
    let [meta, sync] = frame_fields(value)?;
    let sync = sync_marker(sync)?;
    let map = match meta {
        Value::Map(map) => map,
        other => return Err(unexpected(AvroTypeKind::Map, &other)),
    };

    let mut schema = None;
    let mut codec = None;
    let mut metadata = HashMap::new();
    for (key, value) in map {
        let value = match value {
            Value::Bytes(value) => value,
            other => return Err(unexpected(AvroTypeKind::Bytes, &other)),
        };
        match key.as_str() {
            "avro.schema" => {
                let json: serde_json::Value =
                    serde_json::from_slice(&value).map_err(Details::ParseSchemaJson)?;
                schema = Some(Schema::parse(&json)?);
            }
            "avro.codec" => codec = Some(Codec::from_metadata(&value)?),
            // Only needed for compressing
            "avro.codec.compression_level" => {}
            _ => {
                if key.starts_with("avro.") {
                    warn!("Ignoring unknown metadata key: {key}");
                }
                metadata.insert(key, value);
            }
        }
    }

    let schema = schema.ok_or(Details::GetHeaderSchema)?;
    let codec = codec.unwrap_or(Codec::Null);
    debug!(
        "Read container header with codec {} and {} user metadata entries",
        <&str>::from(codec),
        metadata.len()
    );
    Ok(ContainerHeader {
        schema: Arc::new(schema),
        codec,
        sync,
        metadata,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Magic,
    Header,
    Blocks,
}

/// Decodes an Object Container File fed in chunks of any size.
///
/// Like [`AvroParser`](crate::AvroParser), the parser is poisoned by the first error.
#[derive(Debug)]
pub struct ContainerParser {
    phase: Phase,
    /// Decodes the framing: magic, header and block headers including their data.
    frames: AvroParserState,
    header: Option<ContainerHeader>,
    blocks_decoded: u64,
    poisoned: bool,
}

impl Default for ContainerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerParser {
    pub fn new() -> Self {
        let frames = Schema::with_names(BLOCK_TYPE.clone(), Names::new());
        Self {
            phase: Phase::Magic,
            frames: AvroParserState::new(Arc::new(frames)),
            header: None,
            blocks_decoded: 0,
            poisoned: false,
        }
    }

    /// The header, once it has been read completely.
    pub fn header(&self) -> Option<&ContainerHeader> {
        self.header.as_ref()
    }

    /// The amount of blocks decoded so far.
    pub fn blocks_decoded(&self) -> u64 {
        self.blocks_decoded
    }

    /// Feed a chunk, handing every value it completes to `sink`.
    ///
    /// Values are only produced once their whole block has arrived.
    pub fn feed_with<F>(&mut self, chunk: &[u8], mut sink: F) -> AvroResult<ParseStatus>
    where
        F: FnMut(Value),
    {
        if self.poisoned {
            return Err(Details::ParserPoisoned.into());
        }
        let result = self.feed_inner(chunk, &mut sink);
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Feed a chunk and collect the values it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> AvroResult<Vec<Value>> {
        let mut values = Vec::new();
        self.feed_with(chunk, |value| values.push(value))?;
        Ok(values)
    }

    fn feed_inner(
        &mut self,
        chunk: &[u8],
        sink: &mut impl FnMut(Value),
    ) -> AvroResult<ParseStatus> {
        self.frames.fill(chunk);
        loop {
            if self.frames.depth() == 0 {
                let frame = match self.phase {
                    Phase::Magic => &MAGIC_TYPE,
                    Phase::Header => &HEADER_TYPE,
                    Phase::Blocks if self.frames.buffered() == 0 => {
                        return Ok(ParseStatus::Idle);
                    }
                    Phase::Blocks => &BLOCK_TYPE,
                };
                self.frames.begin(frame)?;
            }
            let Some(value) = self.frames.run()? else {
                return Ok(ParseStatus::NeedMore);
            };
            match self.phase {
                Phase::Magic => {
                    match value {
                        Value::Fixed(_, magic) if magic == MAGIC => {}
                        Value::Fixed(_, magic) => return Err(Details::HeaderMagic(magic).into()),
                        other => return Err(unexpected(AvroTypeKind::Fixed, &other)),
                    }
                    self.phase = Phase::Header;
                }
                Phase::Header => {
                    self.header = Some(create_header(value)?);
                    self.phase = Phase::Blocks;
                }
                Phase::Blocks => self.read_block(value, sink)?,
            }
        }
    }

    fn read_block(&mut self, value: Value, sink: &mut impl FnMut(Value)) -> AvroResult<()> {
        let Some(header) = &self.header else {
            return Err(Details::GetHeaderSchema.into());
        };
        let [count, data, sync] = frame_fields(value)?;
        let count = match count {
            Value::Long(count) => safe_len(
                usize::try_from(count).map_err(|e| Details::ConvertI64ToUsize(e, count))?,
            )?,
            other => return Err(unexpected(AvroTypeKind::Long, &other)),
        };
        let mut data = match data {
            Value::Bytes(data) => data,
            other => return Err(unexpected(AvroTypeKind::Bytes, &other)),
        };
        if sync_marker(sync)? != header.sync {
            return Err(Details::SyncMarkerMismatch.into());
        }

        header.codec.decompress(&mut data)?;
        let mut state = AvroParserState::new(header.schema.clone());
        state.fill(&data);
        let root = header.schema.root();
        for decoded in 0..count {
            state.begin(root)?;
            match state.run()? {
                // a schema that reads any byte reads at least one per object
                Some(_) if decoded == 0 && state.total_consumed() > 0 && count > data.len() => {
                    return Err(Details::BlockCountTooLarge {
                        count,
                        size: data.len(),
                    }
                    .into());
                }
                Some(value) => sink(value),
                None => {
                    return Err(Details::BlockCountMismatch {
                        expected: count,
                        actual: decoded,
                    }
                    .into());
                }
            }
        }
        if state.buffered() > 0 {
            return Err(Details::TrailingBlockBytes(state.buffered()).into());
        }

        self.blocks_decoded += 1;
        debug!("Decoded block {} with {count} objects", self.blocks_decoded);
        Ok(())
    }

    /// Declare the end of the input.
    ///
    /// Fails with [`Details::TruncatedInput`] if the header or a block is incomplete.
    pub fn finish(self) -> AvroResult<()> {
        if self.poisoned {
            return Err(Details::ParserPoisoned.into());
        }
        if self.phase != Phase::Blocks || self.frames.depth() > 0 {
            return Err(Details::TruncatedInput {
                buffered: self.frames.buffered(),
                pending: self.frames.depth(),
            }
            .into());
        }
        Ok(())
    }
}
