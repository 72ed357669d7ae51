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

//! Resumable decoders for every node of a schema.
//!
//! A [`SchemaNode`] decodes exactly one value of one [`AvroType`]. Nodes never block and never
//! fail because input is missing: they take whatever bytes the [`ByteWindow`] holds and keep
//! their partial progress until more bytes arrive.
//!
//! There are two kinds of nodes:
//!
//! - *simple* nodes (`null`, `boolean`, `int`, `long`, `float`, `double`, `bytes`, `string` and
//!   `fixed`) consume bytes directly,
//! - *composite* nodes (`record`, `enum`, `array`, `map` and `union`) never consume bytes. They
//!   hand out child nodes through [`Progress::Child`] and receive their results through
//!   [`SchemaNode::child_published`].
//!
//! Nodes are driven by an [`AvroParserState`], which keeps them on an explicit stack so that
//! arbitrarily deep (and recursive) schemas are decoded without recursion:
//!
//! ```
//! # use avro_incremental::{Schema, parser::AvroParserState, types::Value};
//! # use std::sync::Arc;
//! let schema = Arc::new(Schema::parse_str(r#"{"type": "array", "items": "int"}"#)?);
//! let mut state = AvroParserState::new(schema.clone());
//!
//! state.begin(schema.root())?;
//! state.fill(&[0x04, 0x02]);
//! // The array has two items but only one has arrived.
//! assert_eq!(state.run()?, None);
//!
//! state.fill(&[0x04, 0x00]);
//! assert_eq!(
//!     state.run()?,
//!     Some(Value::Array(vec![Value::Int(1), Value::Int(2)]))
//! );
//! # Ok::<(), avro_incremental::Error>(())
//! ```
//!
//! [`AvroParserState`]: crate::parser::AvroParserState

mod bytes;
mod complex;
mod primitive;

use crate::{
    AvroResult,
    error::Details,
    parser::{AvroParserState, ByteWindow},
    schema::{AvroType, AvroTypeKind, FixedType, Schema},
    types::{Value, ValueKind},
};
use bytes::BytesNode;
use complex::{EnumNode, block::BlockNode, record::RecordNode, union::UnionNode};
use log::trace;
use primitive::{FixedWidthNode, VarintNode, decode_bool};
use std::sync::{Arc, LazyLock};

/// The type of block counts and union indexes.
static LONG: LazyLock<Arc<AvroType>> = LazyLock::new(|| Arc::new(AvroType::Long));
/// The type of enum indexes.
static INT: LazyLock<Arc<AvroType>> = LazyLock::new(|| Arc::new(AvroType::Int));
/// The type of map keys.
static STRING: LazyLock<Arc<AvroType>> = LazyLock::new(|| Arc::new(AvroType::String));

/// The outcome of a call to [`SchemaNode::progress`].
#[derive(Debug)]
#[must_use]
pub enum Progress {
    /// The node consumed bytes or changed state. Check [`SchemaNode::is_done`] to see if it is
    /// finished.
    Advanced,
    /// A composite node needs the value of this child before it can continue.
    Child(SchemaNode),
}

#[derive(Debug)]
enum Inner {
    Null,
    Boolean(FixedWidthNode<1>),
    Int(VarintNode),
    Long(VarintNode),
    Float(FixedWidthNode<4>),
    Double(FixedWidthNode<8>),
    Bytes(BytesNode),
    String(BytesNode),
    Fixed(BytesNode),
    Enum(EnumNode),
    Union(UnionNode),
    Array(BlockNode),
    Map(BlockNode),
    Record(RecordNode),
}

/// A stateful decoder for one value of one [`AvroType`].
///
/// See the [module documentation](self) for the contract between nodes and the parser state.
#[derive(Debug)]
pub struct SchemaNode {
    ty: Arc<AvroType>,
    inner: Inner,
}

impl SchemaNode {
    /// Create a node decoding `ty`.
    ///
    /// References to named types are resolved through `schema` here, the node is bound to the
    /// definition.
    pub fn new(ty: &Arc<AvroType>, schema: &Schema) -> AvroResult<Self> {
        let ty = schema.resolve(ty)?.clone();
        let inner = match ty.as_ref() {
            AvroType::Null => Inner::Null,
            AvroType::Boolean => Inner::Boolean(FixedWidthNode::default()),
            AvroType::Int => Inner::Int(VarintNode::default()),
            AvroType::Long => Inner::Long(VarintNode::default()),
            AvroType::Float => Inner::Float(FixedWidthNode::default()),
            AvroType::Double => Inner::Double(FixedWidthNode::default()),
            AvroType::Bytes => Inner::Bytes(BytesNode::default()),
            AvroType::String => Inner::String(BytesNode::default()),
            AvroType::Fixed(FixedType { size, .. }) => {
                Inner::Fixed(BytesNode::with_length(*size)?)
            }
            AvroType::Enum(_) => Inner::Enum(EnumNode::new(ty.clone())),
            AvroType::Union(_) => Inner::Union(UnionNode::new(ty.clone())),
            AvroType::Array(items) => Inner::Array(BlockNode::array(items.clone())),
            AvroType::Map(values) => Inner::Map(BlockNode::map(values.clone())),
            AvroType::Record(_) => Inner::Record(RecordNode::new(ty.clone())),
            AvroType::Ref { name } => {
                return Err(Details::SchemaResolutionError(name.to_string()).into());
            }
        };
        Ok(Self { ty, inner })
    }

    /// The type this node decodes.
    pub fn ty(&self) -> &Arc<AvroType> {
        &self.ty
    }

    pub fn kind(&self) -> AvroTypeKind {
        self.ty.kind()
    }

    /// Whether this node orchestrates children instead of consuming bytes.
    pub fn is_composite(&self) -> bool {
        matches!(
            self.inner,
            Inner::Enum(_) | Inner::Union(_) | Inner::Array(_) | Inner::Map(_) | Inner::Record(_)
        )
    }

    /// Push this node onto the stack of `state`.
    ///
    /// A composite node immediately hands out its first child, which is pushed as well, and so
    /// on until a simple node (or a finished composite) is on top.
    pub fn add(self, state: &mut AvroParserState) -> AvroResult<()> {
        let mut next = Some(self);
        while let Some(node) = next.take() {
            let composite = node.is_composite();
            trace!("Pushing {} node at depth {}", node.kind(), state.depth());
            state.push(node);
            if composite && let Progress::Child(child) = state.progress_top()? {
                next = Some(child);
            }
        }
        Ok(())
    }

    /// Whether a call to [`progress`](Self::progress) would move this node forward.
    ///
    /// Simple nodes need at least one byte (all of them for fixed width types), composite nodes
    /// can always progress.
    pub fn can_progress(&self, window: &ByteWindow) -> bool {
        match &self.inner {
            Inner::Null => true,
            Inner::Boolean(node) => node.can_progress(window),
            Inner::Int(node) | Inner::Long(node) => node.can_progress(window),
            Inner::Float(node) => node.can_progress(window),
            Inner::Double(node) => node.can_progress(window),
            Inner::Bytes(node) | Inner::String(node) | Inner::Fixed(node) => {
                node.can_progress(window)
            }
            _ => true,
        }
    }

    /// Consume bytes from `window` or, for composite nodes, ask for the next child.
    pub fn progress(&mut self, window: &mut ByteWindow, schema: &Schema) -> AvroResult<Progress> {
        match &mut self.inner {
            Inner::Null => {}
            Inner::Boolean(node) => node.progress(window)?,
            Inner::Int(node) | Inner::Long(node) => node.progress(window)?,
            Inner::Float(node) => node.progress(window)?,
            Inner::Double(node) => node.progress(window)?,
            Inner::Bytes(node) | Inner::String(node) | Inner::Fixed(node) => {
                node.progress(window)?
            }
            Inner::Enum(node) => return node.progress(schema),
            Inner::Union(node) => return node.progress(schema),
            Inner::Array(node) | Inner::Map(node) => return node.progress(schema),
            Inner::Record(node) => return node.progress(schema),
        }
        Ok(Progress::Advanced)
    }

    pub fn is_done(&self) -> bool {
        match &self.inner {
            Inner::Null => true,
            Inner::Boolean(node) => node.is_done(),
            Inner::Int(node) | Inner::Long(node) => node.is_done(),
            Inner::Float(node) => node.is_done(),
            Inner::Double(node) => node.is_done(),
            Inner::Bytes(node) | Inner::String(node) | Inner::Fixed(node) => node.is_done(),
            Inner::Enum(node) => node.is_done(),
            Inner::Union(node) => node.is_done(),
            Inner::Array(node) | Inner::Map(node) => node.is_done(),
            Inner::Record(node) => node.is_done(),
        }
    }

    /// Hand the value of a finished child to this composite node.
    pub fn child_published(&mut self, value: Value) -> AvroResult<()> {
        match &mut self.inner {
            Inner::Enum(node) => node.child_published(value),
            Inner::Union(node) => node.child_published(value),
            Inner::Array(node) | Inner::Map(node) => node.child_published(value),
            Inner::Record(node) => node.child_published(value),
            _ => Err(Details::UnexpectedChildValue {
                expected: self.ty.kind(),
                found: ValueKind::from(&value),
            }
            .into()),
        }
    }

    /// Consume the finished node and produce its value.
    pub fn publish(self) -> AvroResult<Value> {
        let kind = self.kind();
        let not_done = || crate::Error::from(Details::NodeNotDone(kind));
        if !self.is_done() {
            return Err(not_done());
        }
        match self.inner {
            Inner::Null => Ok(Value::Null),
            Inner::Boolean(node) => {
                let [byte] = node.bytes().ok_or_else(not_done)?;
                decode_bool(byte).map(Value::Boolean)
            }
            Inner::Int(node) => node.int().map(Value::Int),
            Inner::Long(node) => Ok(Value::Long(node.long())),
            Inner::Float(node) => node
                .bytes()
                .map(|b| Value::Float(f32::from_le_bytes(b)))
                .ok_or_else(not_done),
            Inner::Double(node) => node
                .bytes()
                .map(|b| Value::Double(f64::from_le_bytes(b)))
                .ok_or_else(not_done),
            Inner::Bytes(node) => Ok(Value::Bytes(node.into_data())),
            Inner::String(node) => String::from_utf8(node.into_data())
                .map(Value::String)
                .map_err(|e| Details::ConvertToUtf8(e).into()),
            Inner::Fixed(node) => {
                let data = node.into_data();
                Ok(Value::Fixed(data.len(), data))
            }
            Inner::Enum(node) => node.into_value().ok_or_else(not_done),
            Inner::Union(node) => node.into_value().ok_or_else(not_done),
            Inner::Array(node) | Inner::Map(node) => Ok(node.into_value()),
            Inner::Record(node) => Ok(node.into_value()),
        }
    }
}
