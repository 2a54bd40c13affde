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

//! A schema-driven encoder and decoder for the **[Apache Avro](https://avro.apache.org/)**
//! binary format, meant to sit under an object mapper.
//!
//! The mapper walks its objects and calls the [`AvroEncoder`] once per key and once per value,
//! in whatever order it likes. The encoder buffers the values and writes them in the order the
//! [`Schema`] demands. On the way back the [`AvroDecoder`] resolves the type of every read from
//! the schema, walks records with a field cursor and arrays and maps with a stack of block
//! contexts, and can skip any value without losing its place in the stream.
//!
//! The encoder also works without a schema, writing record keys sorted. A decoder without a
//! schema only reads scalars, each as the type asked for. Walking records, skipping values and
//! generic reads need a schema and fail with [`Details::NoSchema`](error::Details::NoSchema).
//!
//! ```
//! # use avro_serde::{from_avro_bytes, to_avro_bytes, schema::{RecordField, Schema}};
//! let schema = Schema::record("Person".try_into()?)
//!     .fields(vec![
//!         RecordField::builder().name("name").schema(Schema::string()).build(),
//!         RecordField::builder().name("age").schema(Schema::int()).build(),
//!     ])
//!     .build()?;
//!
//! let bytes = to_avro_bytes(&schema, |encoder| {
//!     encoder.encode_key("age")?;
//!     encoder.encode_int(23)?;
//!     encoder.encode_key("name")?;
//!     encoder.encode_string("foo")
//! })?;
//! assert_eq!(bytes, [6, 102, 111, 111, 46]);
//!
//! let (name, age) = from_avro_bytes(&schema, &bytes, |decoder| {
//!     decoder.decode_key()?;
//!     let name = decoder.decode_string()?;
//!     decoder.decode_key()?;
//!     Ok((name, decoder.decode_int()?))
//! })?;
//! assert_eq!((name.as_str(), age), ("foo", 23));
//! # Ok::<(), avro_serde::Error>(())
//! ```
//!
//! # MSRV
//!
//! The current MSRV is 1.88.0.
//!
//! The MSRV may be bumped in minor releases.

pub mod bigdecimal;
pub mod config;
pub mod decode;
pub mod decoder;
pub mod duration;
pub mod encode;
pub mod encoder;
pub mod error;
pub mod schema;
pub mod types;
pub mod util;

pub use crate::bigdecimal::BigDecimal;
pub use config::Config;
pub use decoder::AvroDecoder;
pub use duration::Duration;
pub use encoder::AvroEncoder;
pub use error::Error;
pub use schema::Schema;
pub use uuid::Uuid;

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;

/// Encodes one value of `schema` into a new buffer.
///
/// `write` receives a root encoder, which is finished once `write` returns.
///
/// # Errors
/// Returns the first error of `write` or of finishing the encoder.
pub fn to_avro_bytes<F>(schema: &Schema, write: F) -> AvroResult<Vec<u8>>
where
    F: FnOnce(&mut AvroEncoder<'_, '_>) -> AvroResult<()>,
{
    let mut bytes = Vec::new();
    let mut encoder = AvroEncoder::with_schema(&mut bytes, schema);
    write(&mut encoder)?;
    encoder.finish_structure()?;
    Ok(bytes)
}

/// Decodes one value of `schema` from `bytes` with `read`.
///
/// # Errors
/// Returns the first error of `read`.
pub fn from_avro_bytes<T, F>(schema: &Schema, bytes: &[u8], read: F) -> AvroResult<T>
where
    F: FnOnce(&mut AvroDecoder<'_, &[u8]>) -> AvroResult<T>,
{
    let mut decoder = AvroDecoder::with_schema(bytes, schema);
    read(&mut decoder)
}
