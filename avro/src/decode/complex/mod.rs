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

//! Composite nodes.
//!
//! These never touch the byte window themselves. Every integer they need (enum and union
//! indexes, block counts) is read by a child node and handed back through `child_published`.

pub(crate) mod block;
pub(crate) mod record;
pub(crate) mod union;

use super::{INT, Progress, SchemaNode};
use crate::{
    AvroResult,
    error::Details,
    schema::{AvroType, AvroTypeKind, EnumType, Schema},
    types::{Value, ValueKind},
};
use std::sync::Arc;

fn unexpected(expected: AvroTypeKind, found: &Value) -> crate::Error {
    Details::UnexpectedChildValue {
        expected,
        found: ValueKind::from(found),
    }
    .into()
}

pub(crate) fn expect_long(value: Value) -> AvroResult<i64> {
    match value {
        Value::Long(n) => Ok(n),
        other => Err(unexpected(AvroTypeKind::Long, &other)),
    }
}

pub(crate) fn expect_int(value: Value) -> AvroResult<i32> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(unexpected(AvroTypeKind::Int, &other)),
    }
}

pub(crate) fn expect_string(value: Value) -> AvroResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(unexpected(AvroTypeKind::String, &other)),
    }
}

/// Decoder for an `enum`: an `int` index into the symbols.
#[derive(Debug)]
pub(crate) struct EnumNode {
    ty: Arc<AvroType>,
    value: Option<(u32, String)>,
    awaiting_index: bool,
}

impl EnumNode {
    pub(crate) fn new(ty: Arc<AvroType>) -> Self {
        Self {
            ty,
            value: None,
            awaiting_index: false,
        }
    }

    fn symbols(&self) -> &[String] {
        match self.ty.as_ref() {
            AvroType::Enum(EnumType { symbols, .. }) => symbols,
            _ => &[],
        }
    }

    pub(crate) fn progress(&mut self, schema: &Schema) -> AvroResult<Progress> {
        if self.value.is_some() || self.awaiting_index {
            return Ok(Progress::Advanced);
        }
        self.awaiting_index = true;
        Ok(Progress::Child(SchemaNode::new(&INT, schema)?))
    }

    pub(crate) fn child_published(&mut self, value: Value) -> AvroResult<()> {
        let index = expect_int(value)?;
        let num_symbols = self.symbols().len();
        let symbol = usize::try_from(index)
            .ok()
            .and_then(|i| self.symbols().get(i))
            .cloned()
            .ok_or(Details::GetEnumUnknownIndexValue { index, num_symbols })?;
        self.value = Some((index.unsigned_abs(), symbol));
        self.awaiting_index = false;
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn into_value(self) -> Option<Value> {
        self.value.map(|(index, symbol)| Value::Enum(index, symbol))
    }
}
