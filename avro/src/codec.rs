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

//! Compression codecs for the blocks of an Object Container File.

use crate::{AvroResult, error::Details, types::Value};
use std::str::FromStr;
use strum_macros::{EnumString, IntoStaticStr};

/// Settings for the `Deflate` codec.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct DeflateSettings {
    compression_level: miniz_oxide::deflate::CompressionLevel,
}

impl DeflateSettings {
    pub fn new(compression_level: miniz_oxide::deflate::CompressionLevel) -> Self {
        DeflateSettings { compression_level }
    }

    fn compression_level(&self) -> u8 {
        self.compression_level as u8
    }
}

impl Default for DeflateSettings {
    /// Default compression level is `miniz_oxide::deflate::CompressionLevel::DefaultCompression`.
    fn default() -> Self {
        Self::new(miniz_oxide::deflate::CompressionLevel::DefaultCompression)
    }
}

/// The compression codec used to compress blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum Codec {
    /// The `Null` codec simply passes through data uncompressed.
    Null,
    /// The `Deflate` codec writes the data block using the deflate algorithm
    /// as specified in RFC 1951, and typically implemented using the zlib library.
    /// Note that this format (unlike the "zlib format" in RFC 1950) does not have a checksum.
    Deflate(DeflateSettings),
}

impl Codec {
    /// Parse the value of the `avro.codec` metadata entry.
    pub(crate) fn from_metadata(value: &[u8]) -> AvroResult<Self> {
        let name = String::from_utf8(value.to_vec()).map_err(Details::ConvertToUtf8)?;
        Codec::from_str(&name).map_err(|_| Details::CodecNotSupported(name).into())
    }

    /// Compress a stream of bytes in-place.
    pub fn compress(self, stream: &mut Vec<u8>) {
        match self {
            Codec::Null => (),
            Codec::Deflate(settings) => {
                let compressed =
                    miniz_oxide::deflate::compress_to_vec(stream, settings.compression_level());
                *stream = compressed;
            }
        }
    }

    /// Decompress a stream of bytes in-place.
    pub fn decompress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        *stream = match self {
            Codec::Null => return Ok(()),
            Codec::Deflate(_settings) => {
                miniz_oxide::inflate::decompress_to_vec(stream).map_err(|e| {
                    use miniz_oxide::inflate::TINFLStatus::*;
                    use std::io::{Error, ErrorKind};
                    let err = match e.status {
                        FailedCannotMakeProgress | NeedsMoreInput => {
                            Error::from(ErrorKind::UnexpectedEof)
                        }
                        Adler32Mismatch | Failed => Error::from(ErrorKind::InvalidData),
                        status => Error::other(format!("Unexpected inflate status {status:?}")),
                    };
                    Details::DeflateDecompress(err)
                })?
            }
        };
        Ok(())
    }
}

impl From<Codec> for Value {
    fn from(codec: Codec) -> Self {
        Value::Bytes(<&str>::from(codec).as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INPUT: &[u8] = b"theanswertolifetheuniverseandeverythingis42theanswertolifetheuniverseandeverythingis4theanswertolifetheuniverseandeverythingis2";

    #[test]
    fn null_compress_and_decompress() {
        let codec = Codec::Null;
        let mut stream = INPUT.to_vec();
        codec.compress(&mut stream);
        assert_eq!(INPUT, stream.as_slice());
        codec.decompress(&mut stream).unwrap();
        assert_eq!(INPUT, stream.as_slice());
    }

    #[test]
    fn deflate_compress_and_decompress() {
        let codec = Codec::Deflate(DeflateSettings::default());
        let mut stream = INPUT.to_vec();
        codec.compress(&mut stream);
        assert_ne!(INPUT, stream.as_slice());
        assert!(INPUT.len() > stream.len());
        codec.decompress(&mut stream).unwrap();
        assert_eq!(INPUT, stream.as_slice());
    }

    #[test]
    fn codec_names() {
        assert_eq!(<&str>::from(Codec::Null), "null");
        assert_eq!(<&str>::from(Codec::Deflate(DeflateSettings::default())), "deflate");
        assert_eq!(Codec::from_metadata(b"null").unwrap(), Codec::Null);
        assert!(matches!(
            Codec::from_metadata(b"snappy").map_err(crate::Error::into_details),
            Err(Details::CodecNotSupported(name)) if name == "snappy"
        ));
    }

    #[test]
    fn corrupt_deflate_stream() {
        let mut stream = vec![0xFF, 0xFF, 0xFF];
        assert!(matches!(
            Codec::Deflate(DeflateSettings::default())
                .decompress(&mut stream)
                .map_err(crate::Error::into_details),
            Err(Details::DeflateDecompress(_))
        ));
    }
}
