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
    error::Details,
    parser::ByteWindow,
    util::{MAX_VARINT_LEN, zag},
};

/// Decoder for a zig-zag encoded variable length integer.
///
/// The bits collected so far are kept between calls, so a varint split over
/// several chunks is assembled without rereading any byte.
#[derive(Debug, Default)]
pub(crate) struct VarintNode {
    value: u64,
    shift: u32,
    done: bool,
}

impl VarintNode {
    pub(crate) fn can_progress(&self, window: &ByteWindow) -> bool {
        window.available() > 0
    }

    pub(crate) fn progress(&mut self, window: &mut ByteWindow) -> AvroResult<()> {
        let mut read = 0;
        for &byte in window.data() {
            // the tenth byte only has room for the top bit of a u64
            if self.shift >= MAX_VARINT_LEN * 7 || (self.shift == 63 && byte & 0x7E != 0) {
                return Err(Details::IntegerOverflow.into());
            }
            self.value |= u64::from(byte & 0x7F) << self.shift;
            self.shift += 7;
            read += 1;
            if byte & 0x80 == 0 {
                self.done = true;
                break;
            }
        }
        window.consume(read)?;
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// The decoded `long`.
    pub(crate) fn long(&self) -> i64 {
        zag(self.value)
    }

    /// The decoded `int`, failing if the value does not fit.
    pub(crate) fn int(&self) -> AvroResult<i32> {
        let long = self.long();
        i32::try_from(long).map_err(|e| Details::ZagI32(e, long).into())
    }
}

/// Decoder for the types with a fixed width encoding: `boolean`, `float` and `double`.
///
/// These are only read once all `N` bytes are buffered.
#[derive(Debug, Default)]
pub(crate) struct FixedWidthNode<const N: usize> {
    bytes: Option<[u8; N]>,
}

impl<const N: usize> FixedWidthNode<N> {
    pub(crate) fn can_progress(&self, window: &ByteWindow) -> bool {
        self.bytes.is_some() || window.available() >= N
    }

    pub(crate) fn progress(&mut self, window: &mut ByteWindow) -> AvroResult<()> {
        if self.bytes.is_none()
            && let Some(&bytes) = window.data().first_chunk::<N>()
        {
            window.consume(N)?;
            self.bytes = Some(bytes);
        }
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.bytes.is_some()
    }

    pub(crate) fn bytes(&self) -> Option<[u8; N]> {
        self.bytes
    }
}

pub(crate) fn decode_bool(byte: u8) -> AvroResult<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Details::BoolValue(other).into()),
    }
}
