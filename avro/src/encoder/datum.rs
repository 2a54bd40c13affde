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

use super::pending::{PendingWrite, deferred};
use crate::{
    AvroResult,
    bigdecimal::{
        decimal_from_str, decimal_to_bytes, decimal_to_fixed, decimal_to_plain_string,
        sign_extend,
    },
    decode::uuid_from_str,
    duration::Duration,
    encode::{
        encode_boolean, encode_bytes, encode_double, encode_fixed, encode_float, encode_int,
        encode_long, encode_union_index,
    },
    error::Details,
    schema::{LogicalType, NativeType, Schema, SchemaKind, SchemaType},
};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use std::io::Write;
use uuid::Uuid;

/// A scalar handed to the encoder, before it is checked against a schema.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Datum {
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    BigInteger(BigInt),
    BigDecimal(BigDecimal),
    Uuid(Uuid),
    Duration(Duration),
}

/// The wire-level value a [`Datum`] turns into once its schema is known.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Primitive {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Fixed(Vec<u8>),
}

impl Primitive {
    fn write(self, writer: &mut dyn Write) -> AvroResult<usize> {
        match self {
            Primitive::Null => Ok(0),
            Primitive::Boolean(b) => encode_boolean(b, writer),
            Primitive::Int(i) => encode_int(i, writer),
            Primitive::Long(l) => encode_long(l, writer),
            Primitive::Float(f) => encode_float(f, writer),
            Primitive::Double(d) => encode_double(d, writer),
            Primitive::Bytes(bytes) => encode_bytes(&bytes, writer),
            Primitive::Fixed(bytes) => encode_fixed(&bytes, writer),
        }
    }
}

/// A checked value: which union branch it takes, if any, and what it writes.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Resolved {
    pub(super) union_index: Option<usize>,
    pub(super) kind: SchemaKind,
    pub(super) primitive: Primitive,
}

impl Resolved {
    pub(super) fn into_pending<'s>(self) -> PendingWrite<'s> {
        let Resolved {
            union_index,
            kind,
            primitive,
        } = self;
        PendingWrite::new(
            kind,
            deferred(move |writer| {
                let mut written = 0;
                if let Some(index) = union_index {
                    written += encode_union_index(index, &mut *writer)?;
                }
                Ok(written + primitive.write(writer)?)
            }),
        )
    }
}

impl Datum {
    pub(super) fn operation(&self) -> &'static str {
        match self {
            Datum::Null => "encode_null",
            Datum::Boolean(_) => "encode_boolean",
            Datum::Byte(_) => "encode_byte",
            Datum::Short(_) => "encode_short",
            Datum::Char(_) => "encode_char",
            Datum::Int(_) => "encode_int",
            Datum::Long(_) => "encode_long",
            Datum::Float(_) => "encode_float",
            Datum::Double(_) => "encode_double",
            Datum::String(_) => "encode_string",
            Datum::Bytes(_) => "encode_bytes",
            Datum::BigInteger(_) => "encode_big_integer",
            Datum::BigDecimal(_) => "encode_big_decimal",
            Datum::Uuid(_) => "encode_uuid",
            Datum::Duration(_) => "encode_duration",
        }
    }

    /// The kind a value is written as when no schema is known.
    fn natural_kind(&self) -> SchemaKind {
        match self {
            Datum::Null => SchemaKind::Null,
            Datum::Boolean(_) => SchemaKind::Boolean,
            Datum::Byte(_) | Datum::Short(_) | Datum::Char(_) | Datum::Int(_) => SchemaKind::Int,
            Datum::Long(_) => SchemaKind::Long,
            Datum::Float(_) => SchemaKind::Float,
            Datum::Double(_) => SchemaKind::Double,
            Datum::String(_) | Datum::BigDecimal(_) | Datum::Uuid(_) => SchemaKind::String,
            Datum::Bytes(_) | Datum::BigInteger(_) => SchemaKind::Bytes,
            Datum::Duration(_) => SchemaKind::Fixed,
        }
    }

    fn into_schemaless(self) -> Primitive {
        match self {
            Datum::Null => Primitive::Null,
            Datum::Boolean(b) => Primitive::Boolean(b),
            Datum::Byte(b) => Primitive::Int(i32::from(b)),
            Datum::Short(s) => Primitive::Int(i32::from(s)),
            Datum::Char(c) => Primitive::Int(c as i32),
            Datum::Int(i) => Primitive::Int(i),
            Datum::Long(l) => Primitive::Long(l),
            Datum::Float(f) => Primitive::Float(f),
            Datum::Double(d) => Primitive::Double(d),
            Datum::String(s) => Primitive::Bytes(s.into_bytes()),
            Datum::Bytes(bytes) => Primitive::Bytes(bytes),
            Datum::BigInteger(i) => Primitive::Bytes(i.to_signed_bytes_be()),
            Datum::BigDecimal(d) => Primitive::Bytes(decimal_to_plain_string(&d).into_bytes()),
            Datum::Uuid(uuid) => Primitive::Bytes(uuid.to_string().into_bytes()),
            Datum::Duration(d) => Primitive::Fixed(<[u8; Duration::SIZE]>::from(d).to_vec()),
        }
    }

    /// Whether a value of this type may be written with `schema`, ignoring the value itself.
    fn accepts(&self, schema: &Schema) -> bool {
        let logical = schema.logical_type;
        let native = schema.native_type;
        match (self, &schema.ty) {
            (Datum::Null, SchemaType::Null) | (Datum::Boolean(_), SchemaType::Boolean) => true,
            (Datum::Byte(_) | Datum::Short(_), SchemaType::Int) => {
                logical.is_none() && native != Some(NativeType::Char)
            }
            (Datum::Char(_), SchemaType::Int) => {
                logical.is_none() && matches!(native, None | Some(NativeType::Char))
            }
            (Datum::Int(_), SchemaType::Int) => native != Some(NativeType::Char),
            (Datum::Byte(_) | Datum::Short(_) | Datum::Int(_), SchemaType::Long) => {
                logical.is_none()
            }
            (Datum::Long(_), SchemaType::Long) => true,
            (Datum::Float(_), SchemaType::Float | SchemaType::Double) => true,
            (Datum::Double(_), SchemaType::Double) => true,
            (Datum::String(_), SchemaType::String | SchemaType::Enum(_)) => true,
            (Datum::Bytes(_), SchemaType::Bytes | SchemaType::Fixed(_)) => {
                logical.is_none() && native.is_none()
            }
            (Datum::BigInteger(_), SchemaType::Bytes | SchemaType::Fixed(_)) => {
                logical.is_none() && matches!(native, None | Some(NativeType::BigInteger))
            }
            (Datum::BigDecimal(_), SchemaType::Bytes | SchemaType::Fixed(_)) => {
                matches!(logical, Some(LogicalType::Decimal { .. }))
                    || native == Some(NativeType::BigDecimal)
            }
            (Datum::BigDecimal(_), SchemaType::String) => logical.is_none(),
            (Datum::Uuid(_), SchemaType::String) => {
                matches!(logical, None | Some(LogicalType::Uuid)) && native.is_none()
            }
            (Datum::Uuid(_), SchemaType::Fixed(fixed)) => {
                fixed.size == 16 && matches!(logical, None | Some(LogicalType::Uuid))
            }
            (Datum::Duration(_), SchemaType::Fixed(fixed)) => {
                fixed.size == Duration::SIZE && matches!(logical, None | Some(LogicalType::Duration))
            }
            _ => false,
        }
    }

    /// Converts an accepted value into what `schema` stores on the wire.
    fn convert(self, schema: &Schema) -> AvroResult<Primitive> {
        let operation = self.operation();
        let native = schema.native_type;
        Ok(match (self, &schema.ty) {
            (Datum::Null, _) => Primitive::Null,
            (Datum::Boolean(b), _) => Primitive::Boolean(b),
            (Datum::Byte(b), SchemaType::Int) => Primitive::Int(in_native_range(b.into(), native)?),
            (Datum::Short(s), SchemaType::Int) => {
                Primitive::Int(in_native_range(s.into(), native)?)
            }
            (Datum::Int(i), SchemaType::Int) => Primitive::Int(in_native_range(i.into(), native)?),
            (Datum::Char(c), SchemaType::Int) => Primitive::Int(c as i32),
            (Datum::Byte(b), SchemaType::Long) => Primitive::Long(b.into()),
            (Datum::Short(s), SchemaType::Long) => Primitive::Long(s.into()),
            (Datum::Int(i), SchemaType::Long) => Primitive::Long(i.into()),
            (Datum::Long(l), _) => Primitive::Long(l),
            (Datum::Float(f), SchemaType::Double) => Primitive::Double(f.into()),
            (Datum::Float(f), _) => Primitive::Float(f),
            (Datum::Double(d), _) => Primitive::Double(d),
            (Datum::String(symbol), SchemaType::Enum(e)) => {
                let index = e.index_of(&symbol).ok_or_else(|| Details::EnumSymbol {
                    symbol,
                    name: e.name.fullname(),
                })?;
                Primitive::Int(index as i32)
            }
            (Datum::String(s), _) => {
                if schema.logical_type == Some(LogicalType::Uuid) {
                    uuid_from_str(&s)?;
                } else if native == Some(NativeType::BigDecimal) {
                    decimal_from_str(&s)?;
                }
                Primitive::Bytes(s.into_bytes())
            }
            (Datum::Bytes(bytes), SchemaType::Fixed(fixed)) => {
                Primitive::Fixed(check_fixed_size(bytes, fixed.size)?)
            }
            (Datum::Bytes(bytes), _) => Primitive::Bytes(bytes),
            (Datum::BigInteger(i), SchemaType::Fixed(fixed)) => {
                let raw = i.to_signed_bytes_be();
                Primitive::Fixed(sign_extend(&raw, i.sign() == Sign::Minus, fixed.size)?)
            }
            (Datum::BigInteger(i), _) => Primitive::Bytes(i.to_signed_bytes_be()),
            (Datum::BigDecimal(d), ty) => match (schema.logical_type, ty) {
                (Some(LogicalType::Decimal { precision, scale }), SchemaType::Fixed(fixed)) => {
                    Primitive::Fixed(decimal_to_fixed(&d, precision, scale, fixed.size)?)
                }
                (Some(LogicalType::Decimal { precision, scale }), _) => {
                    Primitive::Bytes(decimal_to_bytes(&d, precision, scale)?)
                }
                (_, SchemaType::Fixed(fixed)) => Primitive::Fixed(check_fixed_size(
                    decimal_to_plain_string(&d).into_bytes(),
                    fixed.size,
                )?),
                _ => Primitive::Bytes(decimal_to_plain_string(&d).into_bytes()),
            },
            (Datum::Uuid(uuid), SchemaType::Fixed(_)) => Primitive::Fixed(uuid.as_bytes().to_vec()),
            (Datum::Uuid(uuid), _) => Primitive::Bytes(uuid.to_string().into_bytes()),
            (Datum::Duration(d), _) => Primitive::Fixed(<[u8; Duration::SIZE]>::from(d).to_vec()),
            (_, _) => {
                return Err(Details::SchemaMismatch {
                    operation,
                    expected: schema.kind(),
                }
                .into());
            }
        })
    }

    /// Checks the value against the expected schema, picking a union branch if needed.
    pub(super) fn resolve(self, schema: Option<&Schema>) -> AvroResult<Resolved> {
        let Some(schema) = schema else {
            return Ok(Resolved {
                union_index: None,
                kind: self.natural_kind(),
                primitive: self.into_schemaless(),
            });
        };
        if let SchemaType::Union(union) = &schema.ty {
            let Some((index, branch)) = union.find(|branch| self.accepts(branch)) else {
                return Err(Details::NoUnionBranch(self.natural_kind()).into());
            };
            return Ok(Resolved {
                union_index: Some(index),
                kind: branch.kind(),
                primitive: self.convert(branch)?,
            });
        }
        if !self.accepts(schema) {
            return Err(Details::SchemaMismatch {
                operation: self.operation(),
                expected: schema.kind(),
            }
            .into());
        }
        Ok(Resolved {
            union_index: None,
            kind: schema.kind(),
            primitive: self.convert(schema)?,
        })
    }
}

fn in_native_range(value: i64, native: Option<NativeType>) -> AvroResult<i32> {
    let in_range = match native {
        Some(NativeType::Byte) => i8::try_from(value).is_ok(),
        Some(NativeType::Short) => i16::try_from(value).is_ok(),
        _ => i32::try_from(value).is_ok(),
    };
    if !in_range {
        return Err(Details::NativeRange {
            value,
            native: native.unwrap_or(NativeType::Int),
        }
        .into());
    }
    Ok(value as i32)
}

fn check_fixed_size(bytes: Vec<u8>, size: usize) -> AvroResult<Vec<u8>> {
    if bytes.len() != size {
        return Err(Details::FixedSize {
            expected: size,
            actual: bytes.len(),
        }
        .into());
    }
    Ok(bytes)
}
