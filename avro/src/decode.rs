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

//! The read half of the primitive codec, plus generic decoding and skipping of a whole value
//! described by a [`Schema`].

use crate::{
    AvroResult,
    bigdecimal::{decimal_from_bytes, decimal_from_str},
    duration::Duration,
    error::Details,
    schema::{LogicalType, NativeType, Schema, SchemaType, UnionSchema},
    types::Value,
    util::{safe_len, zag_i32, zag_i64},
};
use log::trace;
use num_bigint::BigInt;
use std::{
    collections::HashMap,
    io::{self, ErrorKind, Read},
};
use uuid::Uuid;

pub fn decode_boolean<R: Read>(reader: &mut R) -> AvroResult<bool> {
    let mut buf = [0u8; 1];
    reader
        .read_exact(&mut buf[..])
        .map_err(Details::ReadBoolean)?;
    match buf[0] {
        0u8 => Ok(false),
        1u8 => Ok(true),
        other => Err(Details::BoolValue(other).into()),
    }
}

pub fn decode_int<R: Read>(reader: &mut R) -> AvroResult<i32> {
    zag_i32(reader)
}

pub fn decode_long<R: Read>(reader: &mut R) -> AvroResult<i64> {
    zag_i64(reader)
}

pub fn decode_float<R: Read>(reader: &mut R) -> AvroResult<f32> {
    let mut buf = [0u8; std::mem::size_of::<f32>()];
    reader
        .read_exact(&mut buf[..])
        .map_err(Details::ReadFloat)?;
    Ok(f32::from_le_bytes(buf))
}

pub fn decode_double<R: Read>(reader: &mut R) -> AvroResult<f64> {
    let mut buf = [0u8; std::mem::size_of::<f64>()];
    reader
        .read_exact(&mut buf[..])
        .map_err(Details::ReadDouble)?;
    Ok(f64::from_le_bytes(buf))
}

/// Reads a length prefix, rejecting negative and oversized lengths.
pub fn decode_len<R: Read>(reader: &mut R) -> AvroResult<usize> {
    let len = zag_i64(reader)?;
    let len = usize::try_from(len).map_err(|_| Details::NegativeLength(len))?;
    safe_len(len)
}

pub fn decode_bytes<R: Read>(reader: &mut R) -> AvroResult<Vec<u8>> {
    let len = decode_len(reader)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(Details::ReadBytes)?;
    Ok(buf)
}

pub fn decode_string<R: Read>(reader: &mut R) -> AvroResult<String> {
    let bytes = decode_bytes(reader)?;
    String::from_utf8(bytes).map_err(|e| Details::ConvertToUtf8(e).into())
}

pub fn decode_fixed<R: Read>(reader: &mut R, size: usize) -> AvroResult<Vec<u8>> {
    let mut buf = vec![0u8; safe_len(size)?];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Details::ReadFixed(e, size))?;
    Ok(buf)
}

/// Reads an enum symbol index and checks it against the number of symbols.
pub fn decode_enum_index<R: Read>(reader: &mut R, num_symbols: usize) -> AvroResult<usize> {
    let index = zag_i32(reader)?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < num_symbols)
        .ok_or_else(|| Details::EnumIndex { index, num_symbols }.into())
}

/// Reads a union branch index and returns the position and schema of the branch.
pub fn decode_union_index<'s, R: Read>(
    reader: &mut R,
    union: &'s UnionSchema,
) -> AvroResult<(usize, &'s Schema)> {
    let index = zag_i32(reader)?;
    let variant = union.variant(index)?;
    // `variant` already rejected negative indexes
    Ok((index as usize, variant))
}

/// The header of one block of an array or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Number of items in the block. Zero terminates the array or map.
    pub count: u64,
    /// Size in bytes of the block, when the writer announced it with a negative count.
    pub byte_size: Option<u64>,
}

impl BlockHeader {
    pub fn is_end(&self) -> bool {
        self.count == 0
    }
}

pub fn decode_block_header<R: Read>(reader: &mut R) -> AvroResult<BlockHeader> {
    let raw = zag_i64(reader)?;
    let header = if raw < 0 {
        let size = zag_i64(reader)?;
        let byte_size = u64::try_from(size).map_err(|_| Details::NegativeLength(size))?;
        BlockHeader {
            count: raw.unsigned_abs(),
            byte_size: Some(byte_size),
        }
    } else {
        BlockHeader {
            count: raw as u64,
            byte_size: None,
        }
    };
    trace!("Read block header {header:?}");
    Ok(header)
}

/// Discards exactly `len` bytes.
pub fn skip_bytes<R: Read>(reader: &mut R, len: u64) -> AvroResult<()> {
    let skipped =
        io::copy(&mut reader.by_ref().take(len), &mut io::sink()).map_err(Details::ReadBytes)?;
    if skipped < len {
        return Err(Details::ReadBytes(ErrorKind::UnexpectedEof.into()).into());
    }
    Ok(())
}

/// Reads the 12 bytes of a `duration`.
pub fn decode_duration<R: Read>(reader: &mut R) -> AvroResult<Duration> {
    let mut buf = [0u8; Duration::SIZE];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Details::ReadFixed(e, Duration::SIZE))?;
    Ok(Duration::from(buf))
}

pub(crate) fn char_from_int(i: i32) -> AvroResult<char> {
    let code = i as u32;
    char::from_u32(code).ok_or_else(|| Details::InvalidChar(code).into())
}

pub(crate) fn uuid_from_slice(bytes: &[u8]) -> AvroResult<Uuid> {
    Uuid::from_slice(bytes).map_err(|e| Details::ParseUuid(e).into())
}

pub(crate) fn uuid_from_str(s: &str) -> AvroResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| Details::ParseUuid(e).into())
}

/// Interprets the raw bytes of a `bytes` or `fixed` value according to the annotations of its
/// schema.
fn bytes_value(schema: &Schema, bytes: Vec<u8>, fixed_size: Option<usize>) -> AvroResult<Value> {
    Ok(match (schema.logical_type, schema.native_type) {
        (Some(LogicalType::Decimal { scale, .. }), _) => {
            Value::Decimal(decimal_from_bytes(&bytes, scale))
        }
        (Some(LogicalType::Uuid), _) => Value::Uuid(uuid_from_slice(&bytes)?),
        (_, Some(NativeType::BigInteger)) => {
            Value::BigInteger(BigInt::from_signed_bytes_be(&bytes))
        }
        (_, Some(NativeType::BigDecimal)) => {
            let s = String::from_utf8(bytes).map_err(Details::ConvertToUtf8)?;
            Value::Decimal(decimal_from_str(&s)?)
        }
        _ => match fixed_size {
            Some(size) => Value::Fixed(size, bytes),
            None => Value::Bytes(bytes),
        },
    })
}

/// Decodes one complete value described by `schema`.
pub fn decode_value<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    match &schema.ty {
        SchemaType::Null => Ok(Value::Null),
        SchemaType::Boolean => decode_boolean(reader).map(Value::Boolean),
        SchemaType::Int => {
            let i = decode_int(reader)?;
            Ok(match (schema.logical_type, schema.native_type) {
                (Some(LogicalType::Date), _) => Value::Date(i),
                (Some(LogicalType::TimeMillis), _) => Value::TimeMillis(i),
                (_, Some(NativeType::Char)) => Value::Char(char_from_int(i)?),
                _ => Value::Int(i),
            })
        }
        SchemaType::Long => {
            let l = decode_long(reader)?;
            Ok(match schema.logical_type {
                Some(LogicalType::TimeMicros) => Value::TimeMicros(l),
                Some(LogicalType::TimestampMillis) => Value::TimestampMillis(l),
                Some(LogicalType::TimestampMicros) => Value::TimestampMicros(l),
                _ => Value::Long(l),
            })
        }
        SchemaType::Float => decode_float(reader).map(Value::Float),
        SchemaType::Double => decode_double(reader).map(Value::Double),
        SchemaType::Bytes => {
            let bytes = decode_bytes(reader)?;
            bytes_value(schema, bytes, None)
        }
        SchemaType::String => {
            let s = decode_string(reader)?;
            Ok(match (schema.logical_type, schema.native_type) {
                (Some(LogicalType::Uuid), _) => Value::Uuid(uuid_from_str(&s)?),
                (_, Some(NativeType::BigDecimal)) => Value::Decimal(decimal_from_str(&s)?),
                _ => Value::String(s),
            })
        }
        SchemaType::Fixed(fixed) => {
            if schema.logical_type == Some(LogicalType::Duration) {
                return decode_duration(reader).map(Value::Duration);
            }
            let bytes = decode_fixed(reader, fixed.size)?;
            bytes_value(schema, bytes, Some(fixed.size))
        }
        SchemaType::Enum(e) => {
            let index = decode_enum_index(reader, e.symbols.len())?;
            Ok(Value::Enum(index as u32, e.symbols[index].clone()))
        }
        SchemaType::Union(union) => {
            let (index, variant) = decode_union_index(reader, union)?;
            let value = decode_value(variant, reader)?;
            Ok(Value::Union(index as u32, Box::new(value)))
        }
        SchemaType::Array(array) => {
            let mut items = Vec::new();
            decode_blocks(reader, |reader| {
                items.push(decode_value(&array.items, reader)?);
                Ok(())
            })?;
            Ok(Value::Array(items))
        }
        SchemaType::Map(map) => {
            let mut entries = HashMap::new();
            decode_blocks(reader, |reader| {
                let key = decode_string(reader)?;
                let value = decode_value(&map.values, reader)?;
                entries.insert(key, value);
                Ok(())
            })?;
            Ok(Value::Map(entries))
        }
        SchemaType::Record(record) => {
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                fields.push((field.name.clone(), decode_value(&field.schema, reader)?));
            }
            Ok(Value::Record(fields))
        }
    }
}

/// The item count of a block, with the items seen so far bounded by the allocation limit.
fn block_len(header: &BlockHeader, seen: usize) -> AvroResult<usize> {
    let count = usize::try_from(header.count).unwrap_or(usize::MAX);
    safe_len(seen.saturating_add(count))?;
    Ok(count)
}

/// Calls `item` once per item of an array or map until the terminating block.
fn decode_blocks<R: Read>(
    reader: &mut R,
    mut item: impl FnMut(&mut R) -> AvroResult<()>,
) -> AvroResult<()> {
    let mut seen = 0;
    loop {
        let header = decode_block_header(reader)?;
        if header.is_end() {
            return Ok(());
        }
        let count = block_len(&header, seen)?;
        for _ in 0..count {
            item(reader)?;
        }
        seen += count;
    }
}

/// Reads and discards one complete value described by `schema`.
///
/// Blocks announced with their byte size are skipped without looking at their items.
pub fn skip_value<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<()> {
    match &schema.ty {
        SchemaType::Null => Ok(()),
        SchemaType::Boolean => decode_boolean(reader).map(drop),
        SchemaType::Int | SchemaType::Long | SchemaType::Enum(_) => zag_i64(reader).map(drop),
        SchemaType::Float => skip_bytes(reader, 4),
        SchemaType::Double => skip_bytes(reader, 8),
        SchemaType::Bytes | SchemaType::String => {
            let len = decode_len(reader)?;
            skip_bytes(reader, len as u64)
        }
        SchemaType::Fixed(fixed) => skip_bytes(reader, fixed.size as u64),
        SchemaType::Union(union) => {
            let (_, variant) = decode_union_index(reader, union)?;
            skip_value(variant, reader)
        }
        SchemaType::Array(array) => skip_blocks(reader, |reader| skip_value(&array.items, reader)),
        SchemaType::Map(map) => skip_blocks(reader, |reader| {
            let len = decode_len(reader)?;
            skip_bytes(reader, len as u64)?;
            skip_value(&map.values, reader)
        }),
        SchemaType::Record(record) => record
            .fields
            .iter()
            .try_for_each(|field| skip_value(&field.schema, reader)),
    }
}

pub(crate) fn skip_blocks<R: Read>(
    reader: &mut R,
    mut item: impl FnMut(&mut R) -> AvroResult<()>,
) -> AvroResult<()> {
    let mut seen = 0;
    loop {
        let header = decode_block_header(reader)?;
        if header.is_end() {
            return Ok(());
        }
        match header.byte_size {
            Some(size) => skip_bytes(reader, size)?,
            None => {
                let count = block_len(&header, seen)?;
                for _ in 0..count {
                    item(reader)?;
                }
                seen += count;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode_block_count, encode_block_end, encode_long, encode_str};
    use crate::schema::{Name, RecordField};
    use hex_literal::hex;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    type TestResult = anyhow::Result<()>;

    #[test]
    fn test_decode_primitives() -> TestResult {
        let mut input: &[u8] = &[1, 20, 6, 102, 111, 111, 0, 0x00, 0x40, 0x03, 0x45];
        assert!(decode_boolean(&mut input)?);
        assert_eq!(decode_int(&mut input)?, 10);
        assert_eq!(decode_string(&mut input)?, "foo");
        assert_eq!(decode_string(&mut input)?, "");
        assert_eq!(decode_float(&mut input)?, 2100.0);
        assert!(input.is_empty());
        Ok(())
    }

    #[rstest]
    #[case(&[2])]
    #[case(&[0xFF])]
    fn test_invalid_boolean(#[case] mut input: &[u8]) {
        assert!(matches!(
            decode_boolean(&mut input).unwrap_err().details(),
            Details::BoolValue(_)
        ));
    }

    #[test]
    fn test_negative_length() {
        let mut input: &[u8] = &[1];
        assert!(matches!(
            decode_bytes(&mut input).unwrap_err().details(),
            Details::NegativeLength(-1)
        ));
    }

    #[test]
    fn test_truncated_string() {
        let mut input: &[u8] = &[6, 102];
        let error = decode_string(&mut input).unwrap_err();
        assert!(matches!(error.details(), Details::ReadBytes(_)));
        assert!(error.is_framing());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut input: &[u8] = &hex!("04 c3 28");
        assert!(matches!(
            decode_string(&mut input).unwrap_err().details(),
            Details::ConvertToUtf8(_)
        ));
    }

    #[test]
    fn test_enum_index_out_of_range() {
        let mut input: &[u8] = &[8];
        assert!(matches!(
            decode_enum_index(&mut input, 4).unwrap_err().details(),
            Details::EnumIndex {
                index: 4,
                num_symbols: 4
            }
        ));
    }

    #[test]
    fn test_negative_block_count() -> TestResult {
        // -2 items in 4 bytes
        let mut input: &[u8] = &[3, 8];
        assert_eq!(
            decode_block_header(&mut input)?,
            BlockHeader {
                count: 2,
                byte_size: Some(4)
            }
        );
        Ok(())
    }

    #[test]
    fn test_decode_int_array() -> TestResult {
        let schema = Schema::array(Schema::int()).build();
        let mut input: &[u8] = &[12, 4, 6, 10, 2, 10, 18, 0];
        let value = decode_value(&schema, &mut input)?;
        assert_eq!(
            value,
            Value::Array([2, 3, 5, 1, 5, 9].into_iter().map(Value::Int).collect())
        );
        Ok(())
    }

    #[test]
    fn test_huge_block_of_nulls_is_rejected() -> TestResult {
        let schema = Schema::array(Schema::null()).build();
        let mut buf = Vec::new();
        encode_long(1 << 62, &mut buf)?;

        let error = decode_value(&schema, &mut &buf[..]).unwrap_err();
        assert!(matches!(error.details(), Details::MemoryAllocation { .. }));
        let error = skip_value(&schema, &mut &buf[..]).unwrap_err();
        assert!(matches!(error.details(), Details::MemoryAllocation { .. }));
        Ok(())
    }

    #[test]
    fn test_skip_sized_block_without_reading_items() -> TestResult {
        let schema = Schema::array(Schema::string()).build();
        let mut buf = Vec::new();
        encode_long(-2, &mut buf)?;
        encode_long(8, &mut buf)?;
        encode_str("foo", &mut buf)?;
        encode_str("bar", &mut buf)?;
        encode_block_count(1, &mut buf)?;
        encode_str("x", &mut buf)?;
        encode_block_end(&mut buf)?;
        buf.push(42);

        let mut input = &buf[..];
        skip_value(&schema, &mut input)?;
        assert_eq!(input, [42]);
        Ok(())
    }

    #[test]
    fn test_skip_matches_decode() -> TestResult {
        let color = Schema::r#enum(Name::new("color")?, vec!["GREEN", "BLUE", "RED", "YELLOW"])
            .build()?;
        let schema = Schema::record(Name::new("Salamander")?)
            .fields(vec![
                RecordField::builder().name("name").schema(Schema::string()).build(),
                RecordField::builder()
                    .name("tags")
                    .schema(Schema::map(Schema::long()).build())
                    .build(),
                RecordField::builder().name("color").schema(color).build(),
                RecordField::builder()
                    .name("nickname")
                    .schema(Schema::union(vec![Schema::null(), Schema::string()])?)
                    .build(),
                RecordField::builder().name("salary").schema(Schema::double()).build(),
            ])
            .build()?;
        let mut buf = Vec::new();
        encode_str("ali", &mut buf)?;
        encode_block_count(1, &mut buf)?;
        encode_str("k", &mut buf)?;
        encode_long(7, &mut buf)?;
        encode_block_end(&mut buf)?;
        encode_long(2, &mut buf)?;
        encode_long(1, &mut buf)?;
        encode_str("al", &mut buf)?;
        buf.extend_from_slice(&2.5f64.to_le_bytes());

        let mut decoded = &buf[..];
        let value = decode_value(&schema, &mut decoded)?;
        assert!(decoded.is_empty());
        let Value::Record(fields) = value else {
            panic!("Expected a record");
        };
        assert_eq!(fields[2], ("color".to_string(), Value::Enum(2, "RED".to_string())));

        let mut skipped = &buf[..];
        skip_value(&schema, &mut skipped)?;
        assert!(skipped.is_empty());
        Ok(())
    }
}
