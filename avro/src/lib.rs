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

//! A resumable decoder for binary **[Apache Avro](https://avro.apache.org/)** data that arrives
//! in chunks of arbitrary size.
//!
//! Bytes are pushed into a parser as they arrive, for example from a socket or a file read in
//! pieces. A value that is split over several chunks is suspended at the exact byte where the
//! chunk ended and resumed when the next chunk is fed, so no byte is ever read twice and no
//! chunking of the input changes the decoded values.
//!
//! There are two entry points:
//!
//! 1. [`AvroParser`] decodes a stream of concatenated values of one [`Schema`].
//! 2. [`ContainerParser`] decodes an Object Container File, reading the schema and codec from
//!    its header.
//!
//! ```
//! use avro_incremental::{AvroParser, Schema, types::Value};
//!
//! let schema = Schema::parse_str(
//!     r#"{"type": "record", "name": "R", "fields": [
//!         {"name": "a", "type": "long"},
//!         {"name": "b", "type": "string"}
//!     ]}"#,
//! )?;
//! let mut parser = AvroParser::new(schema);
//!
//! assert!(parser.feed(&[0xd8, 0x04, 0x04])?.is_empty());
//! let values = parser.feed(b"hi")?;
//! assert_eq!(values[0].field("a"), Some(&Value::Long(300)));
//! assert_eq!(values[0].field("b"), Some(&Value::String("hi".into())));
//! parser.finish()?;
//! # Ok::<(), avro_incremental::Error>(())
//! ```
//!
//! Values can be written back with [`encode::encode`] and
//! [`write_container`](encode::container::write_container), which is mostly useful to produce
//! test input.
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.
//!
//! The MSRV may be bumped in minor releases.

pub mod codec;
pub mod container;
pub mod decode;
pub mod encode;
pub mod error;
pub mod parser;
pub mod schema;
pub mod types;
pub mod util;
mod validator;

pub use codec::{Codec, DeflateSettings};
pub use container::{ContainerHeader, ContainerParser};
pub use error::{Details, Error};
pub use parser::{AvroParser, ParseStatus, ParserOptions};
pub use schema::{AvroType, AvroTypeKind, Schema};
pub use util::max_allocation_bytes;

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
