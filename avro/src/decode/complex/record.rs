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
    schema::{AvroType, RecordField, RecordType, Schema},
    types::Value,
};
use std::sync::Arc;

/// Decoder for a `record`, one child per field in declaration order.
#[derive(Debug)]
pub(crate) struct RecordNode {
    ty: Arc<AvroType>,
    values: Vec<(String, Value)>,
    done: bool,
}

impl RecordNode {
    pub(crate) fn new(ty: Arc<AvroType>) -> Self {
        let capacity = match ty.as_ref() {
            AvroType::Record(RecordType { fields, .. }) => fields.len(),
            _ => 0,
        };
        Self {
            ty,
            values: Vec::with_capacity(capacity),
            done: false,
        }
    }

    fn fields(&self) -> &[RecordField] {
        match self.ty.as_ref() {
            AvroType::Record(RecordType { fields, .. }) => fields,
            _ => &[],
        }
    }

    pub(crate) fn progress(&mut self, schema: &Schema) -> AvroResult<Progress> {
        match self.fields().get(self.values.len()) {
            Some(field) => Ok(Progress::Child(SchemaNode::new(&field.ty, schema)?)),
            None => {
                self.done = true;
                Ok(Progress::Advanced)
            }
        }
    }

    pub(crate) fn child_published(&mut self, value: Value) -> AvroResult<()> {
        if let Some(field) = self.fields().get(self.values.len()) {
            let name = field.name.clone();
            self.values.push((name, value));
        }
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    pub(crate) fn into_value(self) -> Value {
        Value::Record(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Name;
    use pretty_assertions::assert_eq;

    #[test]
    fn fields_are_requested_in_order() {
        let ty = Arc::new(AvroType::Record(
            RecordType::builder()
                .name(Name::new("Pair").unwrap())
                .fields(vec![
                    RecordField::builder().name("a").ty(AvroType::Long).build(),
                    RecordField::builder().name("b").ty(AvroType::String).build(),
                ])
                .build(),
        ));
        let schema = Schema::new(AvroType::Null);
        let mut node = RecordNode::new(ty);

        let Progress::Child(child) = node.progress(&schema).unwrap() else {
            panic!("Expected a child for field `a`");
        };
        assert_eq!(child.kind(), crate::schema::AvroTypeKind::Long);
        node.child_published(Value::Long(300)).unwrap();

        let Progress::Child(child) = node.progress(&schema).unwrap() else {
            panic!("Expected a child for field `b`");
        };
        assert_eq!(child.kind(), crate::schema::AvroTypeKind::String);
        node.child_published("hi".into()).unwrap();

        assert!(!node.is_done());
        assert!(matches!(node.progress(&schema).unwrap(), Progress::Advanced));
        assert!(node.is_done());
        assert_eq!(
            node.into_value(),
            Value::Record(vec![
                ("a".into(), Value::Long(300)),
                ("b".into(), "hi".into())
            ])
        );
    }

    #[test]
    fn empty_record() {
        let ty = Arc::new(AvroType::Record(
            RecordType::builder()
                .name(Name::new("Empty").unwrap())
                .build(),
        ));
        let mut node = RecordNode::new(ty);
        assert!(matches!(
            node.progress(&Schema::new(AvroType::Null)).unwrap(),
            Progress::Advanced
        ));
        assert!(node.is_done());
        assert_eq!(node.into_value(), Value::Record(vec![]));
    }
}
