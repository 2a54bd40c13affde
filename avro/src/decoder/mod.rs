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

//! Logic for decoding values one call at a time, driven by a schema.
//!
//! ```
//! # use avro_serde::{AvroDecoder, schema::{RecordField, Schema}};
//! let schema = Schema::record("Person".try_into()?)
//!     .fields(vec![
//!         RecordField::builder().name("name").schema(Schema::string()).build(),
//!         RecordField::builder()
//!             .name("scores")
//!             .schema(Schema::array(Schema::int()).build())
//!             .build(),
//!     ])
//!     .build()?;
//!
//! let bytes: &[u8] = &[6, 102, 111, 111, 4, 2, 4, 0];
//! let mut decoder = AvroDecoder::with_schema(bytes, &schema);
//! assert_eq!(decoder.decode_key()?.as_deref(), Some("name"));
//! assert_eq!(decoder.decode_string()?, "foo");
//! assert_eq!(decoder.decode_key()?.as_deref(), Some("scores"));
//! let scores = decoder.decode_array()?;
//! let mut sum = 0;
//! while scores.has_next_array_value()? {
//!     sum += scores.decode_int()?;
//! }
//! scores.finish_structure(false)?;
//! assert_eq!(sum, 3);
//! assert_eq!(decoder.decode_key()?, None);
//! decoder.finish_structure(false)?;
//! # Ok::<(), avro_serde::Error>(())
//! ```

mod block;
mod tee;

use crate::{
    AvroResult, Config, Error,
    bigdecimal::{BigDecimal, decimal_from_bytes, decimal_from_str, decimal_to_plain_string},
    decode::{self as codec, char_from_int, uuid_from_slice, uuid_from_str},
    duration::Duration,
    error::Details,
    schema::{
        LogicalType, NativeType, RecordSchema, Schema, SchemaKind, SchemaProvider, SchemaType,
    },
    types::Value,
};
use block::{BlockContext, BlockKind};
use log::{debug, trace};
use num_bigint::BigInt;
use std::{
    cell::Cell,
    io::{Cursor, Read},
    rc::Rc,
};
use tee::TeeReader;
use uuid::Uuid;

/// Where the value about to be read comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// The branch of a union whose index was already read.
    Branch,
    /// The claimed item of the innermost array or map.
    Item,
    /// The record field under the cursor.
    Field,
    /// The schema of the decoder itself.
    Root,
}

fn mismatch(operation: &'static str, schema: &Schema) -> Error {
    Details::SchemaMismatch {
        operation,
        expected: schema.kind(),
    }
    .into()
}

/// Decodes values from the Avro binary format.
///
/// The type of the next value is resolved from, in order: the union branch read by a
/// [`decode_null`](Self::decode_null) that returned `false`, the item schema of the innermost
/// array or map, the record field under the cursor and finally the schema of the decoder.
/// A union found this way has its branch index read first.
///
/// Without a schema every value is read as the type of the call.
///
/// Nested records are read by child decoders borrowing the reader, see
/// [`decode_object`](Self::decode_object). Once an operation fails, the decoder and every
/// decoder sharing its reader are poisoned.
pub struct AvroDecoder<'s, R: Read> {
    reader: R,
    provider: &'s dyn SchemaProvider,
    config: Config,
    schema: Option<&'s Schema>,
    root: bool,
    cursor: Option<usize>,
    field_consumed: bool,
    blocks: Vec<BlockContext<'s>>,
    union_branch: Option<&'s Schema>,
    depth: usize,
    closed: bool,
    poisoned: Rc<Cell<bool>>,
}

impl<'s, R: Read> AvroDecoder<'s, R> {
    /// Creates a decoder without schema.
    pub fn new(reader: R) -> Self {
        Self::root(reader, None)
    }

    /// Creates a decoder reading values of `schema`.
    ///
    /// When `schema` is a record the decoder walks its fields with [`decode_key`](Self::decode_key).
    pub fn with_schema(reader: R, schema: &'s Schema) -> Self {
        Self::root(reader, Some(schema))
    }

    fn root(reader: R, schema: Option<&'s Schema>) -> Self {
        Self {
            reader,
            provider: &(),
            config: Config::default(),
            schema,
            root: true,
            cursor: None,
            field_consumed: false,
            blocks: Vec::new(),
            union_branch: None,
            depth: 0,
            closed: false,
            poisoned: Rc::new(Cell::new(false)),
        }
    }

    /// Sets the provider used to look up the schemas of objects read with a type name.
    pub fn provider(mut self, provider: &'s dyn SchemaProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> Option<&'s Schema> {
        self.schema
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn record(&self) -> Option<&'s RecordSchema> {
        self.schema.and_then(Schema::as_record)
    }

    fn check(&self) -> AvroResult<()> {
        if self.poisoned.get() {
            return Err(Details::DecoderPoisoned.into());
        }
        if self.closed {
            return Err(Details::DecoderClosed.into());
        }
        Ok(())
    }

    fn guard<T>(&mut self, op: impl FnOnce(&mut Self) -> AvroResult<T>) -> AvroResult<T> {
        self.check()?;
        op(self).inspect_err(|_| self.poisoned.set(true))
    }

    fn check_depth(&self) -> AvroResult<()> {
        if self.depth + self.blocks.len() >= self.config.max_depth {
            return Err(Details::MaxDepthExceeded(self.config.max_depth).into());
        }
        Ok(())
    }

    /// Finds the schema of the next value without consuming it.
    fn peek(&mut self) -> AvroResult<(Source, Option<&'s Schema>)> {
        if let Some(branch) = self.union_branch {
            return Ok((Source::Branch, Some(branch)));
        }
        if let Some(block) = self.blocks.last_mut() {
            match block.kind {
                BlockKind::Array => {
                    if !block.claim(&mut self.reader)? {
                        return Err(Details::ArrayExhausted.into());
                    }
                }
                BlockKind::Map => {
                    if !block.claimed || block.key.is_none() {
                        return Err(Details::ValueWithoutKey.into());
                    }
                }
            }
            return Ok((Source::Item, block.item_schema));
        }
        if let Some(record) = self.record() {
            return match self.cursor {
                None if self.root => Ok((Source::Root, self.schema)),
                Some(index) if !self.field_consumed => record
                    .fields
                    .get(index)
                    .map(|field| (Source::Field, Some(&field.schema)))
                    .ok_or_else(|| Details::NoCurrentField.into()),
                _ => Err(Details::NoCurrentField.into()),
            };
        }
        Ok((Source::Root, self.schema))
    }

    fn commit(&mut self, source: Source) {
        match source {
            Source::Branch => self.union_branch = None,
            Source::Item => {
                if let Some(block) = self.blocks.last_mut() {
                    block.consume();
                }
            }
            Source::Field => self.field_consumed = true,
            Source::Root => {
                if let Some(record) = self.record() {
                    // the whole record was read at once
                    self.cursor = Some(record.fields.len());
                    self.field_consumed = true;
                }
            }
        }
    }

    /// Consumes the next value position and returns its schema as declared.
    fn take_slot(&mut self) -> AvroResult<Option<&'s Schema>> {
        let (source, schema) = self.peek()?;
        self.commit(source);
        Ok(schema)
    }

    /// Consumes the next value position, reading the branch index if its schema is a union.
    fn resolve(&mut self) -> AvroResult<Option<&'s Schema>> {
        match self.take_slot()? {
            Some(Schema {
                ty: SchemaType::Union(union),
                ..
            }) => {
                let (index, branch) = codec::decode_union_index(&mut self.reader, union)?;
                trace!("Union branch {index} selected");
                Ok(Some(branch))
            }
            schema => Ok(schema),
        }
    }

    /// Advances to the next record field, or reads the key of the next map entry.
    ///
    /// Returns `None` once the fields or the entries are exhausted.
    ///
    /// # Errors
    /// Fails with [`Details::FieldValueNotConsumed`] if the value of the previous key was not
    /// read.
    pub fn decode_key(&mut self) -> AvroResult<Option<String>> {
        self.guard(|this| {
            if let Some(block) = this.blocks.last_mut() {
                return match block.kind {
                    BlockKind::Array => Err(Details::KeyInArray.into()),
                    BlockKind::Map => block.read_key(&mut this.reader),
                };
            }
            let record = this.record().ok_or(Details::NoSchema)?;
            if let Some(index) = this.cursor
                && !this.field_consumed
                && let Some(field) = record.fields.get(index)
            {
                return Err(Details::FieldValueNotConsumed(field.name.clone()).into());
            }
            let next = this.cursor.map_or(0, |index| index + 1);
            this.cursor = Some(next);
            this.field_consumed = false;
            Ok(record.fields.get(next).map(|field| field.name.clone()))
        })
    }

    /// Reads a `null` if that is what comes next.
    ///
    /// Returns `false` without consuming anything if the next value is not `null`. For a
    /// nullable union the branch index is read either way and the next call reads the value
    /// of the branch. Without a schema a `null` cannot be told apart and `false` is returned.
    pub fn decode_null(&mut self) -> AvroResult<bool> {
        self.guard(|this| {
            let (source, schema) = this.peek()?;
            let Some(schema) = schema else {
                return Ok(false);
            };
            match &schema.ty {
                SchemaType::Null => {
                    this.commit(source);
                    Ok(true)
                }
                SchemaType::Union(union) => {
                    this.commit(source);
                    let (_, branch) = codec::decode_union_index(&mut this.reader, union)?;
                    if branch.kind() == SchemaKind::Null {
                        return Ok(true);
                    }
                    this.union_branch = Some(branch);
                    Ok(false)
                }
                _ => Ok(false),
            }
        })
    }

    pub fn decode_boolean(&mut self) -> AvroResult<bool> {
        self.guard(|this| match this.resolve()? {
            None => codec::decode_boolean(&mut this.reader),
            Some(schema) if schema.kind() == SchemaKind::Boolean => {
                codec::decode_boolean(&mut this.reader)
            }
            Some(schema) => Err(mismatch("decode_boolean", schema)),
        })
    }

    /// Reads an `int` to be narrowed by the caller.
    fn decode_narrow(&mut self, operation: &'static str) -> AvroResult<i64> {
        let value = match self.resolve()? {
            None => codec::decode_int(&mut self.reader)?,
            Some(schema)
                if schema.kind() == SchemaKind::Int
                    && schema.native_type != Some(NativeType::Char) =>
            {
                codec::decode_int(&mut self.reader)?
            }
            Some(schema) => return Err(mismatch(operation, schema)),
        };
        Ok(i64::from(value))
    }

    pub fn decode_byte(&mut self) -> AvroResult<i8> {
        self.guard(|this| {
            let value = this.decode_narrow("decode_byte")?;
            i8::try_from(value).map_err(|_| {
                Details::NativeRange {
                    value,
                    native: NativeType::Byte,
                }
                .into()
            })
        })
    }

    pub fn decode_short(&mut self) -> AvroResult<i16> {
        self.guard(|this| {
            let value = this.decode_narrow("decode_short")?;
            i16::try_from(value).map_err(|_| {
                Details::NativeRange {
                    value,
                    native: NativeType::Short,
                }
                .into()
            })
        })
    }

    pub fn decode_char(&mut self) -> AvroResult<char> {
        self.guard(|this| match this.resolve()? {
            None => char_from_int(codec::decode_int(&mut this.reader)?),
            Some(schema)
                if schema.kind() == SchemaKind::Int
                    && matches!(schema.native_type, None | Some(NativeType::Char)) =>
            {
                char_from_int(codec::decode_int(&mut this.reader)?)
            }
            Some(schema) => Err(mismatch("decode_char", schema)),
        })
    }

    pub fn decode_int(&mut self) -> AvroResult<i32> {
        self.guard(|this| match this.resolve()? {
            None => codec::decode_int(&mut this.reader),
            Some(schema) if schema.kind() == SchemaKind::Int => codec::decode_int(&mut this.reader),
            Some(schema) => Err(mismatch("decode_int", schema)),
        })
    }

    /// Reads a `long`, or an `int` widened to a `long`.
    pub fn decode_long(&mut self) -> AvroResult<i64> {
        self.guard(|this| match this.resolve()?.map(|schema| (schema.kind(), schema)) {
            None | Some((SchemaKind::Long, _)) => codec::decode_long(&mut this.reader),
            Some((SchemaKind::Int, _)) => codec::decode_int(&mut this.reader).map(i64::from),
            Some((_, schema)) => Err(mismatch("decode_long", schema)),
        })
    }

    pub fn decode_float(&mut self) -> AvroResult<f32> {
        self.guard(|this| match this.resolve()? {
            None => codec::decode_float(&mut this.reader),
            Some(schema) if schema.kind() == SchemaKind::Float => {
                codec::decode_float(&mut this.reader)
            }
            Some(schema) => Err(mismatch("decode_float", schema)),
        })
    }

    /// Reads a `double`, or an `int`, `long` or `float` widened to a `double`.
    pub fn decode_double(&mut self) -> AvroResult<f64> {
        self.guard(|this| {
            let resolved = this.resolve()?;
            let reader = &mut this.reader;
            match resolved.map(|schema| (schema.kind(), schema)) {
                None | Some((SchemaKind::Double, _)) => codec::decode_double(reader),
                Some((SchemaKind::Float, _)) => codec::decode_float(reader).map(f64::from),
                Some((SchemaKind::Int, _)) => codec::decode_int(reader).map(f64::from),
                Some((SchemaKind::Long, _)) => codec::decode_long(reader).map(|l| l as f64),
                Some((_, schema)) => Err(mismatch("decode_double", schema)),
            }
        })
    }

    /// Reads a string.
    ///
    /// Enum symbols, numbers, booleans, uuids and decimals are accepted and returned in their
    /// textual form.
    pub fn decode_string(&mut self) -> AvroResult<String> {
        self.guard(|this| {
            let Some(schema) = this.resolve()? else {
                return codec::decode_string(&mut this.reader);
            };
            let reader = &mut this.reader;
            match (&schema.ty, schema.logical_type) {
                (SchemaType::String, _) => codec::decode_string(reader),
                (SchemaType::Enum(e), _) => {
                    let index = codec::decode_enum_index(reader, e.symbols.len())?;
                    Ok(e.symbols[index].clone())
                }
                (SchemaType::Int, _) => {
                    let i = codec::decode_int(reader)?;
                    if schema.native_type == Some(NativeType::Char) {
                        return Ok(char_from_int(i)?.to_string());
                    }
                    Ok(i.to_string())
                }
                (SchemaType::Long, _) => Ok(codec::decode_long(reader)?.to_string()),
                (SchemaType::Float, _) => Ok(codec::decode_float(reader)?.to_string()),
                (SchemaType::Double, _) => Ok(codec::decode_double(reader)?.to_string()),
                (SchemaType::Boolean, _) => Ok(codec::decode_boolean(reader)?.to_string()),
                (SchemaType::Fixed(_), Some(LogicalType::Uuid)) => {
                    Ok(uuid_from_slice(&codec::decode_fixed(reader, 16)?)?.to_string())
                }
                (SchemaType::Bytes, Some(LogicalType::Decimal { scale, .. })) => {
                    let decimal = decimal_from_bytes(&codec::decode_bytes(reader)?, scale);
                    Ok(decimal_to_plain_string(&decimal))
                }
                (SchemaType::Fixed(fixed), Some(LogicalType::Decimal { scale, .. })) => {
                    let decimal = decimal_from_bytes(&codec::decode_fixed(reader, fixed.size)?, scale);
                    Ok(decimal_to_plain_string(&decimal))
                }
                (SchemaType::Bytes, _) if schema.native_type == Some(NativeType::BigDecimal) => {
                    codec::decode_string(reader)
                }
                _ => Err(mismatch("decode_string", schema)),
            }
        })
    }

    /// Reads the content of a `bytes` or a `fixed`.
    pub fn decode_bytes(&mut self) -> AvroResult<Vec<u8>> {
        self.guard(|this| {
            let Some(schema) = this.resolve()? else {
                return codec::decode_bytes(&mut this.reader);
            };
            match &schema.ty {
                SchemaType::Bytes | SchemaType::String => codec::decode_bytes(&mut this.reader),
                SchemaType::Fixed(fixed) => codec::decode_fixed(&mut this.reader, fixed.size),
                _ => Err(mismatch("decode_bytes", schema)),
            }
        })
    }

    pub fn decode_big_integer(&mut self) -> AvroResult<BigInt> {
        self.guard(|this| {
            let Some(schema) = this.resolve()? else {
                return Ok(BigInt::from_signed_bytes_be(&codec::decode_bytes(
                    &mut this.reader,
                )?));
            };
            let reader = &mut this.reader;
            match &schema.ty {
                SchemaType::Bytes => Ok(BigInt::from_signed_bytes_be(&codec::decode_bytes(reader)?)),
                SchemaType::Fixed(fixed) => Ok(BigInt::from_signed_bytes_be(&codec::decode_fixed(
                    reader, fixed.size,
                )?)),
                SchemaType::Int => codec::decode_int(reader).map(BigInt::from),
                SchemaType::Long => codec::decode_long(reader).map(BigInt::from),
                _ => Err(mismatch("decode_big_integer", schema)),
            }
        })
    }

    /// Reads a decimal from a `decimal` logical type, or from its textual form in a `string` or
    /// a `bytes`.
    pub fn decode_big_decimal(&mut self) -> AvroResult<BigDecimal> {
        self.guard(|this| {
            let Some(schema) = this.resolve()? else {
                return decimal_from_str(&codec::decode_string(&mut this.reader)?);
            };
            let reader = &mut this.reader;
            match (&schema.ty, schema.logical_type) {
                (SchemaType::Bytes, Some(LogicalType::Decimal { scale, .. })) => {
                    Ok(decimal_from_bytes(&codec::decode_bytes(reader)?, scale))
                }
                (SchemaType::Fixed(fixed), Some(LogicalType::Decimal { scale, .. })) => Ok(
                    decimal_from_bytes(&codec::decode_fixed(reader, fixed.size)?, scale),
                ),
                (SchemaType::String | SchemaType::Bytes, _) => {
                    decimal_from_str(&codec::decode_string(reader)?)
                }
                (SchemaType::Fixed(fixed), _)
                    if schema.native_type == Some(NativeType::BigDecimal) =>
                {
                    let bytes = codec::decode_fixed(reader, fixed.size)?;
                    let text = String::from_utf8(bytes).map_err(Details::ConvertToUtf8)?;
                    decimal_from_str(&text)
                }
                (SchemaType::Int, _) => codec::decode_int(reader).map(BigDecimal::from),
                (SchemaType::Long, _) => codec::decode_long(reader).map(BigDecimal::from),
                _ => Err(mismatch("decode_big_decimal", schema)),
            }
        })
    }

    pub fn decode_uuid(&mut self) -> AvroResult<Uuid> {
        self.guard(|this| {
            let Some(schema) = this.resolve()? else {
                return uuid_from_str(&codec::decode_string(&mut this.reader)?);
            };
            match &schema.ty {
                SchemaType::String => uuid_from_str(&codec::decode_string(&mut this.reader)?),
                SchemaType::Fixed(fixed) if fixed.size == 16 => {
                    uuid_from_slice(&codec::decode_fixed(&mut this.reader, 16)?)
                }
                _ => Err(mismatch("decode_uuid", schema)),
            }
        })
    }

    pub fn decode_duration(&mut self) -> AvroResult<Duration> {
        self.guard(|this| match this.resolve()? {
            None => codec::decode_duration(&mut this.reader),
            Some(Schema {
                ty: SchemaType::Fixed(fixed),
                ..
            }) if fixed.size == Duration::SIZE => codec::decode_duration(&mut this.reader),
            Some(schema) => Err(mismatch("decode_duration", schema)),
        })
    }

    /// Reads the next value, whatever its type.
    pub fn decode_arbitrary(&mut self) -> AvroResult<Value> {
        self.guard(|this| {
            let schema = this.take_slot()?.ok_or(Details::NoSchema)?;
            codec::decode_value(schema, &mut this.reader)
        })
    }

    /// Reads the next value as a JSON tree.
    pub fn decode_node(&mut self) -> AvroResult<serde_json::Value> {
        self.decode_arbitrary().map(serde_json::Value::from)
    }

    /// Reads and discards the next value.
    pub fn skip_value(&mut self) -> AvroResult<()> {
        self.guard(|this| {
            let schema = this.take_slot()?.ok_or(Details::NoSchema)?;
            codec::skip_value(schema, &mut this.reader)
        })
    }

    /// Copies the raw bytes of the next value and returns an independent decoder over them.
    ///
    /// The returned decoder has the schema of the value as its root.
    pub fn decode_buffer(&mut self) -> AvroResult<AvroDecoder<'s, Cursor<Vec<u8>>>> {
        let (schema, bytes) = self.guard(|this| {
            let schema = this.resolve()?.ok_or(Details::NoSchema)?;
            let mut tee = TeeReader::new(&mut this.reader);
            codec::skip_value(schema, &mut tee)?;
            Ok((schema, tee.into_captured()))
        })?;
        trace!("Buffered {} bytes of a {} value", bytes.len(), schema.kind());
        Ok(AvroDecoder::with_schema(Cursor::new(bytes), schema)
            .provider(self.provider)
            .config(self.config))
    }

    /// Starts reading a nested record.
    ///
    /// The schema of the record is the one `provider` knows as `type_name`, otherwise the
    /// schema expected at the current position. The returned decoder walks the fields with
    /// its own cursor and reads from the same reader, so it must be finished before this
    /// decoder is used again.
    pub fn decode_object(
        &mut self,
        type_name: Option<&str>,
    ) -> AvroResult<AvroDecoder<'s, &mut dyn Read>> {
        let schema = self.guard(|this| {
            this.check_depth()?;
            let provider = this.provider;
            let named = type_name.and_then(|name| provider.schema(name));
            let slot = this.resolve()?;
            let schema = named.or(slot).ok_or_else(|| match type_name {
                Some(name) => Details::SchemaNotFound(name.to_string()),
                None => Details::NoSchema,
            })?;
            if schema.kind() != SchemaKind::Record {
                return Err(Details::ExpectedRecord(schema.kind()).into());
            }
            Ok(schema)
        })?;
        debug!(
            "Starting record {}",
            schema.name().map(|n| n.fullname()).unwrap_or_default()
        );
        let depth = self.depth + self.blocks.len() + 1;
        let reader: &mut dyn Read = &mut self.reader;
        Ok(AvroDecoder {
            reader,
            provider: self.provider,
            config: self.config,
            schema: Some(schema),
            root: false,
            cursor: None,
            field_consumed: false,
            blocks: Vec::new(),
            union_branch: None,
            depth,
            closed: false,
            poisoned: Rc::clone(&self.poisoned),
        })
    }

    fn open_block(&mut self, kind: BlockKind, operation: &'static str) -> AvroResult<()> {
        self.check_depth()?;
        let item_schema = match self.resolve()? {
            Some(schema) => match (&schema.ty, kind) {
                (SchemaType::Array(array), BlockKind::Array) => Some(array.items.as_ref()),
                (SchemaType::Map(map), BlockKind::Map) => Some(map.values.as_ref()),
                _ => return Err(mismatch(operation, schema)),
            },
            None => None,
        };
        let block = BlockContext::open(kind, item_schema, &mut self.reader)?;
        debug!(
            "Starting {kind:?} at depth {}, first block has {} items",
            self.depth + self.blocks.len() + 1,
            block.remaining
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Starts reading an array. Items are claimed with
    /// [`has_next_array_value`](Self::has_next_array_value).
    pub fn decode_array(&mut self) -> AvroResult<&mut Self> {
        self.guard(|this| this.open_block(BlockKind::Array, "decode_array"))?;
        Ok(self)
    }

    /// Starts reading a map. Entries are walked with [`decode_key`](Self::decode_key).
    pub fn decode_map(&mut self) -> AvroResult<&mut Self> {
        self.guard(|this| this.open_block(BlockKind::Map, "decode_map"))?;
        Ok(self)
    }

    /// Claims the next item of the innermost array or map.
    ///
    /// Returns `false` once the array is exhausted.
    ///
    /// # Errors
    /// Fails with [`Details::NotInArrayContext`] outside of an array or a map.
    pub fn has_next_array_value(&mut self) -> AvroResult<bool> {
        self.guard(|this| {
            let block = this
                .blocks
                .last_mut()
                .ok_or(Details::NotInArrayContext)?;
            block.claim(&mut this.reader)
        })
    }

    /// Ends the innermost array or map, or the record once no array or map is open.
    ///
    /// With `consume_remaining` every item or field that was not read is skipped. Otherwise
    /// unread items are an error. A record decoder is closed afterwards.
    pub fn finish_structure(&mut self, consume_remaining: bool) -> AvroResult<()> {
        self.guard(|this| {
            if consume_remaining && let Some(branch) = this.union_branch.take() {
                codec::skip_value(branch, &mut this.reader)?;
            }
            if let Some(mut block) = this.blocks.pop() {
                if consume_remaining {
                    block.drain(&mut this.reader)?;
                } else {
                    block.close(&mut this.reader)?;
                }
                debug!("Finished {:?}", block.kind);
                return Ok(());
            }
            if consume_remaining && let Some(record) = this.record() {
                let start = match this.cursor {
                    None => 0,
                    Some(index) if this.field_consumed => index + 1,
                    Some(index) => index,
                };
                for field in record.fields.iter().skip(start) {
                    codec::skip_value(&field.schema, &mut this.reader)?;
                }
            }
            this.closed = true;
            debug!("Closed decoder");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Name, RecordField};
    use pretty_assertions::assert_eq;

    type TestResult = anyhow::Result<()>;

    fn nullable_record() -> AvroResult<Schema> {
        Schema::record(Name::new("Pet")?)
            .fields(vec![
                RecordField::builder()
                    .name("nickname")
                    .schema(Schema::union(vec![Schema::null(), Schema::string()])?)
                    .build(),
                RecordField::builder().name("age").schema(Schema::int()).build(),
            ])
            .build()
    }

    #[test]
    fn decode_null_reads_the_union_index_once() -> TestResult {
        let schema = nullable_record()?;
        let input: &[u8] = &[2, 6, 102, 111, 111, 46];
        let mut decoder = AvroDecoder::with_schema(input, &schema);
        decoder.decode_key()?;
        assert!(!decoder.decode_null()?);
        assert_eq!(decoder.decode_string()?, "foo");
        decoder.decode_key()?;
        assert!(!decoder.decode_null()?);
        assert_eq!(decoder.decode_int()?, 23);
        assert_eq!(decoder.decode_key()?, None);
        decoder.finish_structure(false)?;
        Ok(())
    }

    #[test]
    fn decode_null_consumes_null() -> TestResult {
        let schema = nullable_record()?;
        let input: &[u8] = &[0, 46];
        let mut decoder = AvroDecoder::with_schema(input, &schema);
        decoder.decode_key()?;
        assert!(decoder.decode_null()?);
        decoder.decode_key()?;
        assert_eq!(decoder.decode_int()?, 23);
        Ok(())
    }

    #[test]
    fn key_before_value_is_consumed() -> TestResult {
        let schema = nullable_record()?;
        let input: &[u8] = &[0, 46];
        let mut decoder = AvroDecoder::with_schema(input, &schema);
        decoder.decode_key()?;
        let error = decoder.decode_key().unwrap_err();
        assert!(matches!(error.details(), Details::FieldValueNotConsumed(name) if name == "nickname"));
        assert!(matches!(
            decoder.decode_key().unwrap_err().details(),
            Details::DecoderPoisoned
        ));
        Ok(())
    }

    #[test]
    fn closed_decoder_rejects_calls() -> TestResult {
        let schema = nullable_record()?;
        let input: &[u8] = &[0, 46];
        let mut decoder = AvroDecoder::with_schema(input, &schema);
        decoder.finish_structure(true)?;
        assert!(decoder.into_inner().is_empty());

        let mut decoder = AvroDecoder::with_schema(input, &schema);
        decoder.finish_structure(true)?;
        assert!(matches!(
            decoder.decode_key().unwrap_err().details(),
            Details::DecoderClosed
        ));
        Ok(())
    }

    #[test]
    fn array_outside_of_context() {
        let input: &[u8] = &[];
        let mut decoder = AvroDecoder::new(input);
        assert!(matches!(
            decoder.has_next_array_value().unwrap_err().details(),
            Details::NotInArrayContext
        ));
    }

    #[test]
    fn schemaless_reads_by_call_type() -> TestResult {
        let input: &[u8] = &[20, 6, 102, 111, 111, 1];
        let mut decoder = AvroDecoder::new(input);
        assert_eq!(decoder.decode_int()?, 10);
        assert_eq!(decoder.decode_string()?, "foo");
        assert!(decoder.decode_boolean()?);
        Ok(())
    }

    #[test]
    fn max_depth_is_enforced() -> TestResult {
        let schema = Schema::array(Schema::array(Schema::int()).build()).build();
        let input: &[u8] = &[2, 2, 2, 0, 0];
        let config = Config::builder().max_depth(1).build();
        let mut decoder = AvroDecoder::with_schema(input, &schema).config(config);
        let outer = decoder.decode_array()?;
        assert!(outer.has_next_array_value()?);
        match outer.decode_array() {
            Err(error) => assert!(matches!(error.details(), Details::MaxDepthExceeded(1))),
            Ok(_) => panic!("nested array must exceed the depth"),
        }
        Ok(())
    }

    #[test]
    fn decode_string_accepts_textual_kinds() -> TestResult {
        let schema = Schema::record(Name::new("Mixed")?)
            .fields(vec![
                RecordField::builder().name("count").schema(Schema::long()).build(),
                RecordField::builder().name("flag").schema(Schema::boolean()).build(),
            ])
            .build()?;
        let input: &[u8] = &[46, 1];
        let mut decoder = AvroDecoder::with_schema(input, &schema);
        decoder.decode_key()?;
        assert_eq!(decoder.decode_string()?, "23");
        decoder.decode_key()?;
        assert_eq!(decoder.decode_string()?, "true");
        Ok(())
    }
}
