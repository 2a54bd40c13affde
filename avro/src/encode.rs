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

//! The write half of the primitive codec.
//!
//! Every function writes the raw Avro binary encoding of one value and returns the number of
//! bytes written.

use crate::{
    AvroResult,
    error::Details,
    util::{zig_i32, zig_i64},
};
use std::io::Write;

pub fn encode_boolean<W: Write>(b: bool, mut writer: W) -> AvroResult<usize> {
    writer
        .write_all(&[u8::from(b)])
        .map_err(Details::WriteBytes)?;
    Ok(1)
}

pub fn encode_int<W: Write>(i: i32, writer: W) -> AvroResult<usize> {
    zig_i32(i, writer)
}

pub fn encode_long<W: Write>(i: i64, writer: W) -> AvroResult<usize> {
    zig_i64(i, writer)
}

pub fn encode_float<W: Write>(f: f32, mut writer: W) -> AvroResult<usize> {
    writer
        .write_all(&f.to_le_bytes())
        .map_err(Details::WriteBytes)?;
    Ok(4)
}

pub fn encode_double<W: Write>(d: f64, mut writer: W) -> AvroResult<usize> {
    writer
        .write_all(&d.to_le_bytes())
        .map_err(Details::WriteBytes)?;
    Ok(8)
}

/// Writes a `long` length prefix followed by the bytes.
pub fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(
    s: &B,
    mut writer: W,
) -> AvroResult<usize> {
    let bytes = s.as_ref();
    let prefix = encode_long(bytes.len() as i64, &mut writer)?;
    writer.write_all(bytes).map_err(Details::WriteBytes)?;
    Ok(prefix + bytes.len())
}

/// Writes a string as its UTF-8 bytes with a length prefix.
pub fn encode_str<W: Write>(s: &str, writer: W) -> AvroResult<usize> {
    encode_bytes(s, writer)
}

/// Writes the bytes of a `fixed` without any length prefix.
pub fn encode_fixed<W: Write>(bytes: &[u8], mut writer: W) -> AvroResult<usize> {
    writer.write_all(bytes).map_err(Details::WriteBytes)?;
    Ok(bytes.len())
}

/// Writes the position of an enum symbol.
pub fn encode_enum<W: Write>(index: usize, writer: W) -> AvroResult<usize> {
    encode_long(index as i64, writer)
}

/// Writes the position of the union variant the following value belongs to.
pub fn encode_union_index<W: Write>(index: usize, writer: W) -> AvroResult<usize> {
    encode_long(index as i64, writer)
}

/// Writes the item count that starts an array or map block.
pub fn encode_block_count<W: Write>(count: usize, writer: W) -> AvroResult<usize> {
    encode_long(count as i64, writer)
}

/// Writes the empty block that terminates an array or map.
pub fn encode_block_end<W: Write>(writer: W) -> AvroResult<usize> {
    encode_long(0, writer)
}
