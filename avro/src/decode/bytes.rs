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

use super::primitive::VarintNode;
use crate::{AvroResult, error::Details, parser::ByteWindow, util::safe_len};

/// Decoder for `bytes`, `string` and `fixed`.
///
/// `bytes` and `string` start with a length prefix, `fixed` knows its length
/// from the schema. The payload is copied out of the window as it arrives.
#[derive(Debug, Default)]
pub(crate) struct BytesNode {
    length: Option<usize>,
    length_reader: VarintNode,
    data: Vec<u8>,
}

impl BytesNode {
    /// A node for a `fixed` of `size` bytes.
    pub(crate) fn with_length(size: usize) -> AvroResult<Self> {
        Ok(Self {
            length: Some(safe_len(size)?),
            ..Default::default()
        })
    }

    pub(crate) fn can_progress(&self, window: &ByteWindow) -> bool {
        self.is_done() || window.available() > 0
    }

    pub(crate) fn progress(&mut self, window: &mut ByteWindow) -> AvroResult<()> {
        let length = match self.length {
            Some(length) => length,
            None => {
                self.length_reader.progress(window)?;
                if !self.length_reader.is_done() {
                    return Ok(());
                }
                let raw = self.length_reader.long();
                if raw < 0 {
                    return Err(Details::NegativeLength(raw).into());
                }
                let length = usize::try_from(raw).map_err(|e| Details::ConvertI64ToUsize(e, raw))?;
                let length = safe_len(length)?;
                self.data.reserve(length.min(window.available()));
                self.length = Some(length);
                length
            }
        };

        let wanted = length - self.data.len();
        let taken = wanted.min(window.available());
        self.data.extend_from_slice(&window.data()[..taken]);
        window.consume(taken)?;
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.length.is_some_and(|length| self.data.len() == length)
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn payload_split_over_chunks() {
        let mut window = ByteWindow::default();
        let mut node = BytesNode::default();

        window.fill(&[0x0A, b'h', b'e']);
        node.progress(&mut window).unwrap();
        assert!(!node.is_done());
        assert!(!node.can_progress(&window));

        window.fill(b"llo!");
        node.progress(&mut window).unwrap();
        assert!(node.is_done());
        assert_eq!(window.data(), b"!");
        assert_eq!(node.into_data(), b"hello");
    }

    #[test]
    fn empty_payload() {
        let mut window = ByteWindow::default();
        window.fill(&[0x00]);
        let mut node = BytesNode::default();
        node.progress(&mut window).unwrap();
        assert!(node.is_done());
        assert!(node.into_data().is_empty());
    }

    #[test]
    fn zero_sized_fixed_is_done_immediately() {
        let node = BytesNode::with_length(0).unwrap();
        assert!(node.is_done());
        assert!(node.can_progress(&ByteWindow::default()));
    }

    #[test]
    fn negative_length() {
        let mut window = ByteWindow::default();
        window.fill(&[0x01]);
        assert!(matches!(
            BytesNode::default()
                .progress(&mut window)
                .map_err(crate::Error::into_details),
            Err(Details::NegativeLength(-1))
        ));
    }

    #[test]
    fn length_above_allocation_limit() {
        let mut encoded = Vec::new();
        crate::util::zig_i64(1 << 40, &mut encoded).unwrap();
        let mut window = ByteWindow::default();
        window.fill(&encoded);
        assert!(matches!(
            BytesNode::default()
                .progress(&mut window)
                .map_err(crate::Error::into_details),
            Err(Details::MemoryAllocation { .. })
        ));
    }
}
