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

use super::{expect_long, expect_string};
use crate::{
    AvroResult,
    decode::{LONG, Progress, STRING, SchemaNode},
    error::Details,
    schema::{AvroType, Schema},
    types::Value,
    util::safe_len,
};
use log::trace;
use std::{collections::HashMap, sync::Arc};

/// Upper bound for preallocating the items of a block.
const MAX_PREALLOCATED_ITEMS: usize = 1024;

#[derive(Debug)]
enum BlockPhase {
    /// Next up is the item count of a block.
    Count,
    /// A negative count was read, next up is the byte size of the block.
    ByteSize { count: usize },
    /// `remaining` items (or map entries) are left in the current block.
    Items { remaining: usize },
    /// The key of a map entry was read, next up is its value.
    Value { key: String, remaining: usize },
    Done,
}

#[derive(Debug)]
enum Collected {
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
}

/// Decoder for the block encoded `array` and `map` types.
///
/// Each block starts with a `long` count, a count of zero ends the sequence. A
/// negative count is followed by the size of the block in bytes, which is read
/// and ignored, and the absolute value is the number of items.
#[derive(Debug)]
pub(crate) struct BlockNode {
    item: Arc<AvroType>,
    phase: BlockPhase,
    /// Whether the child that was last handed out has not published yet.
    awaiting: bool,
    collected: Collected,
}

impl BlockNode {
    pub(crate) fn array(items: Arc<AvroType>) -> Self {
        Self::new(items, Collected::Array(Vec::new()))
    }

    pub(crate) fn map(values: Arc<AvroType>) -> Self {
        Self::new(values, Collected::Map(HashMap::new()))
    }

    fn new(item: Arc<AvroType>, collected: Collected) -> Self {
        Self {
            item,
            phase: BlockPhase::Count,
            awaiting: false,
            collected,
        }
    }

    pub(crate) fn progress(&mut self, schema: &Schema) -> AvroResult<Progress> {
        if self.awaiting {
            return Ok(Progress::Advanced);
        }
        let child = match self.phase {
            BlockPhase::Done => return Ok(Progress::Advanced),
            BlockPhase::Count | BlockPhase::ByteSize { .. } => SchemaNode::new(&LONG, schema)?,
            BlockPhase::Items { remaining: 0 } => {
                self.phase = BlockPhase::Count;
                SchemaNode::new(&LONG, schema)?
            }
            BlockPhase::Items { .. } => match self.collected {
                Collected::Array(_) => SchemaNode::new(&self.item, schema)?,
                Collected::Map(_) => SchemaNode::new(&STRING, schema)?,
            },
            BlockPhase::Value { .. } => SchemaNode::new(&self.item, schema)?,
        };
        self.awaiting = true;
        Ok(Progress::Child(child))
    }

    pub(crate) fn child_published(&mut self, value: Value) -> AvroResult<()> {
        self.awaiting = false;
        self.phase = match std::mem::replace(&mut self.phase, BlockPhase::Done) {
            BlockPhase::Count => self.start_block(expect_long(value)?)?,
            BlockPhase::ByteSize { count } => {
                trace!("Ignoring block size of {} bytes", expect_long(value)?);
                BlockPhase::Items { remaining: count }
            }
            BlockPhase::Items { remaining } => match &mut self.collected {
                Collected::Array(items) => {
                    items.push(value);
                    BlockPhase::Items {
                        remaining: remaining - 1,
                    }
                }
                Collected::Map(_) => BlockPhase::Value {
                    key: expect_string(value)?,
                    remaining,
                },
            },
            BlockPhase::Value { key, remaining } => {
                if let Collected::Map(entries) = &mut self.collected {
                    entries.insert(key, value);
                }
                BlockPhase::Items {
                    remaining: remaining - 1,
                }
            }
            BlockPhase::Done => BlockPhase::Done,
        };
        Ok(())
    }

    fn start_block(&mut self, raw: i64) -> AvroResult<BlockPhase> {
        if raw == 0 {
            return Ok(BlockPhase::Done);
        }
        let count = usize::try_from(raw.unsigned_abs())
            .map_err(|e| Details::ConvertI64ToUsize(e, raw))?;
        let reserve = safe_len(count)?.min(MAX_PREALLOCATED_ITEMS);
        match &mut self.collected {
            Collected::Array(items) => items.reserve(reserve),
            Collected::Map(entries) => entries.reserve(reserve),
        }
        if raw < 0 {
            Ok(BlockPhase::ByteSize { count })
        } else {
            Ok(BlockPhase::Items { remaining: count })
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        matches!(self.phase, BlockPhase::Done)
    }

    pub(crate) fn into_value(self) -> Value {
        match self.collected {
            Collected::Array(items) => Value::Array(items),
            Collected::Map(entries) => Value::Map(entries),
        }
    }
}
