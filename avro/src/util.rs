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

use crate::{AvroResult, error::Details};
use std::io::{Read, Write};
use std::sync::{
    Once,
    atomic::{AtomicUsize, Ordering},
};

/// Maximum number of bytes that can be allocated when decoding
/// Avro-encoded values. This is a protection against ill-formed
/// data, whose length field might be interpreted as enormous.
/// See max_allocation_bytes to change this limit.
pub const DEFAULT_MAX_ALLOCATION_BYTES: usize = 512 * 1024 * 1024;
static MAX_ALLOCATION_BYTES: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_ALLOCATION_BYTES);
static MAX_ALLOCATION_BYTES_ONCE: Once = Once::new();

/// Set a new maximum number of bytes that can be allocated when decoding data.
/// Once called, the limit cannot be changed.
///
/// **NOTE** This function must be called before decoding **any** data. The
/// library leverages [`std::sync::Once`](https://doc.rust-lang.org/std/sync/struct.Once.html)
/// to set the limit either when calling this method, or when decoding for
/// the first time.
pub fn max_allocation_bytes(num_bytes: usize) -> usize {
    MAX_ALLOCATION_BYTES_ONCE.call_once(|| {
        MAX_ALLOCATION_BYTES.store(num_bytes, Ordering::Release);
    });
    MAX_ALLOCATION_BYTES.load(Ordering::Acquire)
}

pub fn safe_len(len: usize) -> AvroResult<usize> {
    let max_bytes = max_allocation_bytes(DEFAULT_MAX_ALLOCATION_BYTES);

    if len <= max_bytes {
        Ok(len)
    } else {
        Err(Details::MemoryAllocation {
            desired: len,
            maximum: max_bytes,
        }
        .into())
    }
}

pub fn zig_i32<W: Write>(n: i32, writer: W) -> AvroResult<usize> {
    zig_i64(n as i64, writer)
}

pub fn zig_i64<W: Write>(n: i64, writer: W) -> AvroResult<usize> {
    encode_variable(((n << 1) ^ (n >> 63)) as u64, writer)
}

pub fn zag_i32<R: Read>(reader: &mut R) -> AvroResult<i32> {
    let i = zag_i64(reader)?;
    i32::try_from(i).map_err(|e| Details::ZagI32(e, i).into())
}

pub fn zag_i64<R: Read>(reader: &mut R) -> AvroResult<i64> {
    let z = decode_variable(reader)?;
    Ok(if z & 0x1 == 0 {
        (z >> 1) as i64
    } else {
        !(z >> 1) as i64
    })
}

fn encode_variable<W: Write>(mut z: u64, mut writer: W) -> AvroResult<usize> {
    let mut buffer = [0u8; 10];
    let mut i: usize = 0;
    loop {
        if z <= 0x7F {
            buffer[i] = (z & 0x7F) as u8;
            i += 1;
            break;
        } else {
            buffer[i] = (0x80 | (z & 0x7F)) as u8;
            i += 1;
            z >>= 7;
        }
    }
    writer
        .write_all(&buffer[..i])
        .map_err(Details::WriteBytes)?;
    Ok(i)
}

fn decode_variable<R: Read>(reader: &mut R) -> AvroResult<u64> {
    let mut i = 0u64;
    let mut buf = [0u8; 1];

    let mut j = 0;
    loop {
        if j > 9 {
            // if j * 7 > 64
            return Err(Details::IntegerOverflow.into());
        }
        reader
            .read_exact(&mut buf[..])
            .map_err(Details::ReadVariableIntegerBytes)?;
        i |= (u64::from(buf[0] & 0x7F)) << (j * 7);
        if (buf[0] >> 7) == 0 {
            break;
        } else {
            j += 1;
        }
    }

    Ok(i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    type TestResult = anyhow::Result<()>;

    #[rstest]
    #[case(0, &[0])]
    #[case(-1, &[1])]
    #[case(1, &[2])]
    #[case(-64, &[127])]
    #[case(64, &[128, 1])]
    #[case(i32::MAX as i64, &[254, 255, 255, 255, 15])]
    #[case(i32::MAX as i64 + 1, &[128, 128, 128, 128, 16])]
    #[case(i32::MIN as i64, &[255, 255, 255, 255, 15])]
    #[case(i32::MIN as i64 - 1, &[129, 128, 128, 128, 16])]
    #[case(i64::MAX, &[254, 255, 255, 255, 255, 255, 255, 255, 255, 1])]
    #[case(i64::MIN, &[255, 255, 255, 255, 255, 255, 255, 255, 255, 1])]
    fn test_zig_i64(#[case] value: i64, #[case] expected: &[u8]) -> TestResult {
        let mut s = Vec::new();
        let written = zig_i64(value, &mut s)?;
        assert_eq!(s, expected);
        assert_eq!(written, expected.len());
        assert_eq!(zag_i64(&mut &s[..])?, value);
        Ok(())
    }

    #[test]
    fn test_zig_i32() -> TestResult {
        let mut a = Vec::new();
        let mut b = Vec::new();
        zig_i32(42i32, &mut a)?;
        zig_i64(42i64, &mut b)?;
        assert_eq!(a, b);

        for n in [0, -1, 1, 10, -10, 300, i32::MAX, i32::MIN] {
            let mut s = Vec::new();
            zig_i32(n, &mut s)?;
            assert_eq!(zag_i32(&mut &s[..])?, n);
        }
        Ok(())
    }

    #[test]
    fn test_zag_i32_out_of_range() -> TestResult {
        let mut s = Vec::new();
        zig_i64(i32::MAX as i64 + 1, &mut s)?;
        let error = zag_i32(&mut &s[..]).unwrap_err();
        assert!(matches!(error.details(), Details::ZagI32(_, v) if *v == i32::MAX as i64 + 1));
        Ok(())
    }

    #[test]
    fn test_overflow() {
        let causes_left_shift_overflow: &[u8] = &[0xe1; 11];
        assert!(matches!(
            decode_variable(&mut &*causes_left_shift_overflow)
                .unwrap_err()
                .details(),
            Details::IntegerOverflow
        ));
    }

    #[test]
    fn test_truncated_varint() {
        let truncated: &[u8] = &[0x80, 0x80];
        assert!(matches!(
            zag_i64(&mut &*truncated).unwrap_err().details(),
            Details::ReadVariableIntegerBytes(_)
        ));
    }

    #[test]
    fn test_safe_len() -> TestResult {
        assert_eq!(42usize, safe_len(42usize)?);
        assert!(safe_len(1024 * 1024 * 1024).is_err());
        Ok(())
    }
}
