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

use crate::schema::{LogicalType, NativeType, SchemaKind};
use std::{error::Error as _, fmt};

/// Errors encountered while encoding or decoding Avro data.
///
/// To inspect the details of the error use [`details`](Self::details) or [`into_details`](Self::into_details)
/// to get a [`Details`] which contains more precise error information.
///
/// See [`Details`] for all possible errors.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// Whether the error leaves the underlying byte stream at an unknown position.
    ///
    /// Framing and I/O errors are fatal for the whole value being decoded.
    pub fn is_framing(&self) -> bool {
        matches!(
            *self.details,
            Details::ReadVariableIntegerBytes(_)
                | Details::IntegerOverflow
                | Details::ZagI32(..)
                | Details::BoolValue(_)
                | Details::ReadBoolean(_)
                | Details::ReadBytes(_)
                | Details::ReadFloat(_)
                | Details::ReadDouble(_)
                | Details::ReadFixed(..)
                | Details::NegativeLength(_)
                | Details::MemoryAllocation { .. }
                | Details::ConvertToUtf8(_)
                | Details::EnumIndex { .. }
                | Details::UnionIndex { .. }
        )
    }

    /// Whether the error was caused by a call that does not match the schema.
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(
            *self.details,
            Details::SchemaMismatch { .. }
                | Details::NativeTypeMismatch { .. }
                | Details::MissingField(_)
                | Details::UnknownField(_)
                | Details::EnumSymbol { .. }
                | Details::FixedSize { .. }
                | Details::DecimalPrecision { .. }
                | Details::DecimalScale { .. }
                | Details::NoUnionBranch(_)
        )
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum Details {
    #[error("Cannot read variable integer bytes")]
    ReadVariableIntegerBytes(#[source] std::io::Error),

    #[error("Overflow when decoding integer value")]
    IntegerOverflow,

    #[error("Value {1} does not fit into an int")]
    ZagI32(#[source] std::num::TryFromIntError, i64),

    #[error("Invalid u8 for bool: {0}")]
    BoolValue(u8),

    #[error("Failed to read boolean bytes")]
    ReadBoolean(#[source] std::io::Error),

    #[error("Failed to read bytes")]
    ReadBytes(#[source] std::io::Error),

    #[error("Failed to read float")]
    ReadFloat(#[source] std::io::Error),

    #[error("Failed to read double")]
    ReadDouble(#[source] std::io::Error),

    #[error("Failed to read {1} bytes of fixed")]
    ReadFixed(#[source] std::io::Error, usize),

    #[error("Length prefix must not be negative, got {0}")]
    NegativeLength(i64),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Failed to convert bytes to a UTF-8 string")]
    ConvertToUtf8(#[source] std::string::FromUtf8Error),

    #[error("Enum symbol index {index} is out of bounds for {num_symbols} symbols")]
    EnumIndex { index: i32, num_symbols: usize },

    #[error("Union branch index {index} is out of bounds for {num_variants} variants")]
    UnionIndex { index: i32, num_variants: usize },

    #[error("Value {value} is out of range for {native}")]
    NativeRange { value: i64, native: NativeType },

    #[error("Failed to write bytes")]
    WriteBytes(#[source] std::io::Error),

    #[error("Failed to flush the underlying writer")]
    Flush(#[source] std::io::Error),

    #[error("Invalid schema name {0}. It must match the regex '{1}'")]
    InvalidSchemaName(String, &'static str),

    #[error("Invalid namespace {0}. It must match the regex '{1}'")]
    InvalidNamespace(String, &'static str),

    #[error("Invalid field name {0}")]
    FieldName(String),

    #[error("Duplicate field name {0}")]
    FieldNameDuplicate(String),

    #[error("Invalid enum symbol name {0}")]
    EnumSymbolName(String),

    #[error("Duplicate enum symbol {0}")]
    EnumSymbolDuplicate(String),

    #[error("Unions may not directly contain a union")]
    GetNestedUnion,

    #[error("Unions cannot contain duplicate types, found at least two {0}")]
    GetUnionDuplicate(SchemaKind),

    #[error("Logical type {logical} cannot annotate a schema of kind {kind}")]
    LogicalTypeMismatch {
        logical: LogicalType,
        kind: SchemaKind,
    },

    #[error("Native type {native} cannot annotate a schema of kind {kind}")]
    NativeTypeMismatch { native: NativeType, kind: SchemaKind },

    #[error("Decimal precision must be at least 1 and not smaller than scale {scale}, got {precision}")]
    DecimalMetadata { precision: usize, scale: usize },

    #[error("Decimal value needs {digits} digits but the schema only allows {precision}")]
    DecimalPrecision { digits: u64, precision: usize },

    #[error("Decimal value has scale {actual} which does not fit the schema scale {scale}")]
    DecimalScale { scale: usize, actual: i64 },

    #[error("Cannot sign extend a {needed} byte value into {requested} bytes")]
    SignExtend { requested: usize, needed: usize },

    #[error("Fixed size mismatch, expected: {expected}, got: {actual}")]
    FixedSize { expected: usize, actual: usize },

    #[error("Failed to parse a uuid")]
    ParseUuid(#[source] uuid::Error),

    #[error("Failed to parse a decimal")]
    ParseBigDecimal(#[source] bigdecimal::ParseBigDecimalError),

    #[error("Unicode scalar value expected, got {0}")]
    InvalidChar(u32),

    #[error("No schema is registered for type {0}")]
    SchemaNotFound(String),

    #[error("Cannot {operation}: the schema expects a value of kind {expected}")]
    SchemaMismatch {
        operation: &'static str,
        expected: SchemaKind,
    },

    #[error("No union variant accepts a value of kind {0}")]
    NoUnionBranch(SchemaKind),

    #[error("Symbol {symbol} is not one of the symbols of enum {name}")]
    EnumSymbol { symbol: String, name: String },

    #[error("Missing field in record: {0}")]
    MissingField(String),

    #[error("The record schema has no field named {0}")]
    UnknownField(String),

    #[error("Key {0} was given without a value")]
    KeyWithoutValue(String),

    #[error("A value inside a record or map must be preceded by a key")]
    ValueWithoutKey,

    #[error("Array items cannot have keys")]
    KeyInArray,

    #[error("The structure for {0} was never finished")]
    UnfinishedStructure(String),

    #[error("The encoder cannot be used after an error")]
    EncoderPoisoned,

    #[error("The decoder cannot be used after an error")]
    DecoderPoisoned,

    #[error("The decoder was already finished")]
    DecoderClosed,

    #[error("Not in an array context")]
    NotInArrayContext,

    #[error("There is no current field, decode_key must be called first")]
    NoCurrentField,

    #[error("The value of field {0} was not consumed before the next key")]
    FieldValueNotConsumed(String),

    #[error("The array has no more items")]
    ArrayExhausted,

    #[error("Block still holds {0} unread items")]
    UnconsumedItems(u64),

    #[error("No schema is available to resolve the expected type")]
    NoSchema,

    #[error("Expected a record schema to decode an object, found {0}")]
    ExpectedRecord(SchemaKind),

    #[error("Nesting depth exceeds the configured maximum of {0}")]
    MaxDepthExceeded(usize),
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn debug_appends_the_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let error = Error::new(Details::ReadVariableIntegerBytes(io));
        assert_eq!(
            format!("{error:?}"),
            "Error { details: Cannot read variable integer bytes: eof }"
        );
        assert!(error.is_framing());
        assert!(!error.is_schema_mismatch());
    }

    #[test]
    fn display_is_transparent() {
        let error: Error = Details::MissingField("age".to_string()).into();
        assert_eq!(error.to_string(), "Missing field in record: age");
        assert!(error.is_schema_mismatch());
        assert!(matches!(error.into_details(), Details::MissingField(name) if name == "age"));
    }
}
