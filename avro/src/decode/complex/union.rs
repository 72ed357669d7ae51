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

use super::expect_long;
use crate::{
    AvroResult,
    decode::{LONG, Progress, SchemaNode},
    error::Details,
    schema::{AvroType, Schema},
    types::Value,
};
use std::sync::Arc;

#[derive(Debug)]
enum UnionPhase {
    /// The branch index has not been requested yet.
    Start,
    AwaitingIndex,
    Branch(usize),
    AwaitingBranch,
    Done(Value),
}

/// Decoder for a `union`: a `long` branch index followed by the value of that branch.
///
/// The published value is the branch value itself, unions have no wrapper in [`Value`].
#[derive(Debug)]
pub(crate) struct UnionNode {
    ty: Arc<AvroType>,
    phase: UnionPhase,
}

impl UnionNode {
    pub(crate) fn new(ty: Arc<AvroType>) -> Self {
        Self {
            ty,
            phase: UnionPhase::Start,
        }
    }

    fn variants(&self) -> &[Arc<AvroType>] {
        match self.ty.as_ref() {
            AvroType::Union(variants) => variants,
            _ => &[],
        }
    }

    pub(crate) fn progress(&mut self, schema: &Schema) -> AvroResult<Progress> {
        match self.phase {
            UnionPhase::Start => {
                self.phase = UnionPhase::AwaitingIndex;
                Ok(Progress::Child(SchemaNode::new(&LONG, schema)?))
            }
            UnionPhase::Branch(index) => {
                let child = match self.variants().get(index) {
                    Some(variant) => SchemaNode::new(variant, schema)?,
                    None => {
                        return Err(Details::GetUnionVariant {
                            index: index as i64,
                            num_variants: self.variants().len(),
                        }
                        .into());
                    }
                };
                self.phase = UnionPhase::AwaitingBranch;
                Ok(Progress::Child(child))
            }
            UnionPhase::AwaitingIndex | UnionPhase::AwaitingBranch | UnionPhase::Done(_) => {
                Ok(Progress::Advanced)
            }
        }
    }

    pub(crate) fn child_published(&mut self, value: Value) -> AvroResult<()> {
        match self.phase {
            UnionPhase::AwaitingIndex => {
                let index = expect_long(value)?;
                let num_variants = self.variants().len();
                let branch = usize::try_from(index)
                    .ok()
                    .filter(|i| *i < num_variants)
                    .ok_or(Details::GetUnionVariant {
                        index,
                        num_variants,
                    })?;
                self.phase = UnionPhase::Branch(branch);
            }
            _ => self.phase = UnionPhase::Done(value),
        }
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        matches!(self.phase, UnionPhase::Done(_))
    }

    pub(crate) fn into_value(self) -> Option<Value> {
        match self.phase {
            UnionPhase::Done(value) => Some(value),
            _ => None,
        }
    }
}
