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

//! The driver feeding byte chunks to the decoding stack.
//!
//! ```
//! # use avro_incremental::{AvroParser, ParseStatus, Schema, types::Value};
//! let schema = Schema::parse_str(r#"["null", "string"]"#)?;
//! let mut parser = AvroParser::new(schema);
//!
//! // A null, then a string split over two chunks.
//! assert_eq!(parser.feed(&[0x00, 0x02, 0x04, b'h'])?, vec![Value::Null]);
//! assert!(!parser.is_idle());
//! assert_eq!(parser.feed(b"i")?, vec![Value::String("hi".into())]);
//! parser.finish()?;
//! # Ok::<(), avro_incremental::Error>(())
//! ```

mod state;

pub use state::{AvroParserState, ByteWindow};

use crate::{
    AvroResult,
    error::Details,
    schema::{AvroType, Schema},
    types::Value,
};
use log::debug;
use std::sync::Arc;

/// Whether the parser is between values or in the middle of one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseStatus {
    /// All fed bytes were consumed and no value is in progress.
    Idle,
    /// A value is in progress and waits for more bytes.
    NeedMore,
}

/// Options for an [`AvroParser`].
#[derive(bon::Builder, Clone, Debug, Default)]
pub struct ParserOptions {
    /// The maximum amount of bytes that may be buffered without being consumed.
    pub max_buffered_bytes: Option<usize>,
}

/// Decodes a stream of concatenated values of one schema, fed in chunks of any size.
///
/// A value split over several chunks is resumed exactly where the previous chunk ended.
/// Once any call fails the parser is poisoned and every later call returns
/// [`Details::ParserPoisoned`].
#[derive(Debug)]
pub struct AvroParser {
    state: AvroParserState,
    root: Arc<AvroType>,
    options: ParserOptions,
    /// Position in the stream where the value in progress started.
    root_started_at: u64,
    values_decoded: u64,
    poisoned: bool,
}

impl AvroParser {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_options(schema, ParserOptions::default())
    }

    pub fn with_options(schema: impl Into<Arc<Schema>>, options: ParserOptions) -> Self {
        let schema = schema.into();
        let root = schema.root().clone();
        Self {
            state: AvroParserState::new(schema),
            root,
            options,
            root_started_at: 0,
            values_decoded: 0,
            poisoned: false,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.state.schema()
    }

    /// Feed a chunk, handing every value it completes to `sink`.
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
        if let Some(limit) = self.options.max_buffered_bytes {
            let requested = self.state.buffered() + chunk.len();
            if requested > limit {
                return Err(Details::BufferLimit { requested, limit }.into());
            }
        }
        self.state.fill(chunk);

        loop {
            if self.state.depth() == 0 {
                if self.state.buffered() == 0 {
                    return Ok(ParseStatus::Idle);
                }
                self.root_started_at = self.state.total_consumed();
                self.state.begin(&self.root)?;
            }
            match self.state.run()? {
                Some(value) => {
                    if self.state.total_consumed() == self.root_started_at {
                        return Err(Details::ZeroWidthDatum(self.root.kind()).into());
                    }
                    self.values_decoded += 1;
                    sink(value);
                }
                None => return Ok(ParseStatus::NeedMore),
            }
        }
    }

    /// Declare the end of the input.
    ///
    /// Fails with [`Details::TruncatedInput`] if a value is still in progress.
    pub fn finish(self) -> AvroResult<()> {
        if self.poisoned {
            return Err(Details::ParserPoisoned.into());
        }
        if !self.is_idle() {
            return Err(Details::TruncatedInput {
                buffered: self.state.buffered(),
                pending: self.state.depth(),
            }
            .into());
        }
        debug!("Finished after decoding {} value(s)", self.values_decoded);
        Ok(())
    }

    /// Whether no value is in progress.
    pub fn is_idle(&self) -> bool {
        self.state.depth() == 0 && self.state.buffered() == 0
    }

    /// The amount of bytes fed but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.state.buffered()
    }

    /// The amount of nodes on the decoding stack.
    pub fn depth(&self) -> usize {
        self.state.depth()
    }

    /// The amount of top-level values decoded so far.
    pub fn values_decoded(&self) -> u64 {
        self.values_decoded
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
