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

use crate::{
    AvroResult,
    decode::{Progress, SchemaNode},
    error::Details,
    schema::{AvroType, Schema},
    types::Value,
};
use log::trace;
use oval::Buffer;
use std::{fmt, sync::Arc};

const INITIAL_CAPACITY: usize = 2 * 1024;

/// The bytes that were fed but not consumed yet.
///
/// Readers look at [`data`](Self::data) and then [`consume`](Self::consume) what they used.
pub struct ByteWindow {
    buffer: Buffer,
    consumed: u64,
}

impl Default for ByteWindow {
    fn default() -> Self {
        Self {
            buffer: Buffer::with_capacity(INITIAL_CAPACITY),
            consumed: 0,
        }
    }
}

impl fmt::Debug for ByteWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteWindow")
            .field("available", &self.available())
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl ByteWindow {
    /// Append a chunk, shifting away consumed bytes and growing the buffer if it does not fit.
    pub fn fill(&mut self, chunk: &[u8]) {
        if chunk.len() > self.buffer.available_space() {
            self.buffer.shift();
            let needed = self.buffer.available_data() + chunk.len();
            if needed > self.buffer.capacity() {
                self.buffer.grow(needed.max(self.buffer.capacity() * 2));
            }
        }
        self.buffer.space()[..chunk.len()].copy_from_slice(chunk);
        self.buffer.fill(chunk.len());
    }

    /// The unconsumed bytes.
    pub fn data(&self) -> &[u8] {
        self.buffer.data()
    }

    pub fn available(&self) -> usize {
        self.buffer.available_data()
    }

    /// Consume exactly `n` bytes.
    pub fn consume(&mut self, n: usize) -> AvroResult<()> {
        let available = self.available();
        if n > available {
            return Err(Details::ConsumePastWindow {
                requested: n,
                available,
            }
            .into());
        }
        self.buffer.consume(n);
        self.consumed += n as u64;
        Ok(())
    }

    /// The amount of bytes consumed since the window was created.
    pub fn total_consumed(&self) -> u64 {
        self.consumed
    }
}

/// The shared mutable context of a decoding pass.
///
/// Holds the stack of active [`SchemaNode`]s, the top being the only node allowed to make
/// progress, and the [`ByteWindow`] they read from.
#[derive(Debug)]
pub struct AvroParserState {
    schema: Arc<Schema>,
    stack: Vec<SchemaNode>,
    window: ByteWindow,
}

impl AvroParserState {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            stack: Vec::new(),
            window: ByteWindow::default(),
        }
    }

    /// The schema used to resolve named references.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn push(&mut self, node: SchemaNode) {
        self.stack.push(node);
    }

    pub fn pop(&mut self) -> Option<SchemaNode> {
        self.stack.pop()
    }

    /// The amount of nodes on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The amount of bytes fed but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.window.available()
    }

    pub fn total_consumed(&self) -> u64 {
        self.window.total_consumed()
    }

    pub fn consume(&mut self, n: usize) -> AvroResult<()> {
        self.window.consume(n)
    }

    pub fn fill(&mut self, chunk: &[u8]) {
        self.window.fill(chunk);
    }

    /// Start decoding a value of `ty`.
    pub fn begin(&mut self, ty: &Arc<AvroType>) -> AvroResult<()> {
        let node = SchemaNode::new(ty, &self.schema)?;
        node.add(self)
    }

    /// Let the node on top of the stack make progress.
    pub(crate) fn progress_top(&mut self) -> AvroResult<Progress> {
        match self.stack.last_mut() {
            Some(node) => node.progress(&mut self.window, &self.schema),
            None => Ok(Progress::Advanced),
        }
    }

    /// Drive the stack until the bottom node publishes its value or the top node is starved.
    ///
    /// Returns `Ok(None)` if more bytes are needed, all progress is kept on the stack.
    pub fn run(&mut self) -> AvroResult<Option<Value>> {
        while let Some(top) = self.stack.last() {
            if top.is_done() {
                let Some(node) = self.stack.pop() else {
                    break;
                };
                trace!("Publishing {} node from depth {}", node.kind(), self.stack.len());
                let value = node.publish()?;
                match self.stack.last_mut() {
                    Some(parent) => parent.child_published(value)?,
                    None => return Ok(Some(value)),
                }
            } else if top.can_progress(&self.window) {
                if let Progress::Child(child) = self.progress_top()? {
                    child.add(self)?;
                }
            } else {
                trace!(
                    "{} node at depth {} needs more bytes",
                    top.kind(),
                    self.stack.len()
                );
                break;
            }
        }
        Ok(None)
    }
}
