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

//! Logic for encoding values with an optional schema, one call per value.
//!
//! An [`AvroEncoder`] accepts the values of a record in any order and buffers them until
//! [`finish_structure`](AvroEncoder::finish_structure) is called. The record is then written in
//! the order of the fields of its schema, or sorted by key when there is no schema.
//!
//! ```
//! # use avro_serde::{AvroEncoder, schema::{RecordField, Schema}};
//! let schema = Schema::record("Person".try_into()?)
//!     .fields(vec![
//!         RecordField::builder().name("name").schema(Schema::string()).build(),
//!         RecordField::builder().name("age").schema(Schema::int()).build(),
//!     ])
//!     .build()?;
//!
//! let mut bytes = Vec::new();
//! let mut encoder = AvroEncoder::with_schema(&mut bytes, &schema);
//! encoder.encode_key("age")?;
//! encoder.encode_int(23)?;
//! encoder.encode_key("name")?;
//! encoder.encode_string("foo")?;
//! encoder.finish_structure()?;
//!
//! assert_eq!(bytes, [6, 102, 111, 111, 46]);
//! # Ok::<(), avro_serde::Error>(())
//! ```

mod datum;
mod pending;

use crate::{
    AvroResult, Config,
    bigdecimal::BigDecimal,
    duration::Duration,
    encode::encode_union_index,
    error::Details,
    schema::{Schema, SchemaKind, SchemaProvider, SchemaType},
};
use datum::Datum;
use log::{debug, error, warn};
use num_bigint::BigInt;
use pending::{Frame, Mode, PendingWrite, Slot, deferred};
use std::io::Write;
use uuid::Uuid;

/// Where an encoder puts its content once finished.
enum Target<'s, 'p> {
    /// A root: content is written to the writer, which is flushed afterwards.
    Writer(&'p mut dyn Write),
    /// A structure started at a root without a key: written straight to the root's writer.
    Through {
        writer: &'p mut dyn Write,
        parent: &'p mut Frame<'s>,
    },
    /// A nested structure: content replaces the open marker reserved in the parent.
    Slot {
        parent: &'p mut Frame<'s>,
        slot: Slot,
    },
}

/// Encodes values into the Avro binary format.
///
/// `'s` is the lifetime of the schemas, `'p` the lifetime of the borrow of the writer or of
/// the parent encoder.
///
/// A root encoder is created with [`new`](Self::new) or [`with_schema`](Self::with_schema).
/// Nested records, arrays and maps are encoded by child encoders returned by
/// [`encode_object`](Self::encode_object), [`encode_array`](Self::encode_array) and
/// [`encode_map`](Self::encode_map). A child borrows its parent, so the parent cannot be used
/// until the child is finished or dropped. A child that is dropped without being finished
/// leaves its slot open and the parent fails to finish.
///
/// Once an operation fails the encoder and its ancestors are poisoned: every further operation
/// fails with [`Details::EncoderPoisoned`].
pub struct AvroEncoder<'s, 'p> {
    target: Target<'s, 'p>,
    frame: Frame<'s>,
    provider: &'s dyn SchemaProvider,
    config: Config,
    root: bool,
    union_index: Option<usize>,
    finished: bool,
}

impl<'s, 'p> AvroEncoder<'s, 'p> {
    /// Creates an encoder without schema.
    ///
    /// Values are written with their natural Avro type and record fields are sorted by key.
    pub fn new(writer: &'p mut dyn Write) -> Self {
        Self::root(writer, None)
    }

    /// Creates an encoder whose values are checked against `schema`.
    pub fn with_schema(writer: &'p mut dyn Write, schema: &'s Schema) -> Self {
        Self::root(writer, Some(schema))
    }

    fn root(writer: &'p mut dyn Write, schema: Option<&'s Schema>) -> Self {
        Self {
            target: Target::Writer(writer),
            frame: Frame::new(Mode::Record, schema),
            provider: &(),
            config: Config::default(),
            root: true,
            union_index: None,
            finished: false,
        }
    }

    /// Sets the provider used to look up the schemas of objects started with a type name.
    pub fn provider(mut self, provider: &'s dyn SchemaProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// The schema of the structure being encoded.
    pub fn schema(&self) -> Option<&'s Schema> {
        self.frame.schema
    }

    fn check(&self) -> AvroResult<()> {
        if self.frame.poisoned {
            return Err(Details::EncoderPoisoned.into());
        }
        Ok(())
    }

    fn poison(&mut self) {
        self.frame.poisoned = true;
        match &mut self.target {
            Target::Through { parent, .. } | Target::Slot { parent, .. } => parent.poisoned = true,
            Target::Writer(_) => {}
        }
    }

    fn guard<T>(&mut self, op: impl FnOnce(&mut Self) -> AvroResult<T>) -> AvroResult<T> {
        self.check()?;
        op(self).inspect_err(|_| self.poison())
    }

    /// The schema the next value must match, if known.
    fn expected(&self) -> AvroResult<Option<&'s Schema>> {
        let frame = &self.frame;
        match frame.mode {
            Mode::Record => match (&frame.key, frame.schema) {
                (Some(key), Some(schema)) => Ok(schema
                    .as_record()
                    .and_then(|record| record.field(key))
                    .map(|(_, field)| &field.schema)),
                (Some(_), None) => Ok(None),
                (None, schema) if self.root => Ok(schema),
                (None, _) => Err(Details::ValueWithoutKey.into()),
            },
            Mode::Array => Ok(frame.schema.and_then(|schema| match &schema.ty {
                SchemaType::Array(array) => Some(array.items.as_ref()),
                _ => None,
            })),
            Mode::Map => {
                if frame.key.is_none() {
                    return Err(Details::ValueWithoutKey.into());
                }
                Ok(frame.schema.and_then(|schema| match &schema.ty {
                    SchemaType::Map(map) => Some(map.values.as_ref()),
                    _ => None,
                }))
            }
        }
    }

    /// Whether the next value goes straight to the writer.
    fn writes_through(&self) -> bool {
        self.root && self.frame.is_unkeyed()
    }

    fn store(&mut self, write: PendingWrite<'s>) -> AvroResult<()> {
        let through = self.writes_through();
        match &mut self.target {
            Target::Writer(writer) if through => {
                write
                    .run(&mut **writer)
                    .inspect_err(|e| error!("Failed to write an encoded value: {e}"))?;
                self.frame.wrote_through = true;
            }
            _ => {
                self.frame.store(write)?;
            }
        }
        Ok(())
    }

    fn encode_datum(&mut self, datum: Datum) -> AvroResult<()> {
        self.guard(|this| {
            let schema = this.expected()?;
            let resolved = datum.resolve(schema)?;
            this.store(resolved.into_pending())
        })
    }

    /// Sets the name of the record field, or the key of the map entry, the next value belongs to.
    ///
    /// # Errors
    /// Fails if the record schema has no such field or alias, if the key was already used, or
    /// if the previous key has no value yet.
    pub fn encode_key(&mut self, name: &str) -> AvroResult<()> {
        self.guard(|this| this.frame.set_key(name))
    }

    /// Encodes `null`, which is written as zero bytes.
    pub fn encode_null(&mut self) -> AvroResult<()> {
        self.encode_datum(Datum::Null)
    }

    pub fn encode_boolean(&mut self, value: bool) -> AvroResult<()> {
        self.encode_datum(Datum::Boolean(value))
    }

    pub fn encode_byte(&mut self, value: i8) -> AvroResult<()> {
        self.encode_datum(Datum::Byte(value))
    }

    pub fn encode_short(&mut self, value: i16) -> AvroResult<()> {
        self.encode_datum(Datum::Short(value))
    }

    /// Encodes a character as an `int` holding its code point.
    pub fn encode_char(&mut self, value: char) -> AvroResult<()> {
        self.encode_datum(Datum::Char(value))
    }

    pub fn encode_int(&mut self, value: i32) -> AvroResult<()> {
        self.encode_datum(Datum::Int(value))
    }

    pub fn encode_long(&mut self, value: i64) -> AvroResult<()> {
        self.encode_datum(Datum::Long(value))
    }

    pub fn encode_float(&mut self, value: f32) -> AvroResult<()> {
        self.encode_datum(Datum::Float(value))
    }

    pub fn encode_double(&mut self, value: f64) -> AvroResult<()> {
        self.encode_datum(Datum::Double(value))
    }

    /// Encodes a string. Against an `enum` schema the string is the symbol to write.
    pub fn encode_string(&mut self, value: &str) -> AvroResult<()> {
        self.encode_datum(Datum::String(value.to_string()))
    }

    /// Encodes an optional string.
    ///
    /// `None` is written as the `null` branch of a nullable union and as an empty string
    /// against a `string` schema. Use [`encode_null`](Self::encode_null) and
    /// [`encode_string`](Self::encode_string) to keep both apart.
    pub fn encode_optional_string(&mut self, value: Option<&str>) -> AvroResult<()> {
        let Some(value) = value else {
            let datum = self
                .expected()
                .ok()
                .flatten()
                .filter(|schema| schema.kind() == SchemaKind::String)
                .map_or(Datum::Null, |_| Datum::String(String::new()));
            return self.encode_datum(datum);
        };
        self.encode_string(value)
    }

    pub fn encode_bytes(&mut self, value: &[u8]) -> AvroResult<()> {
        self.encode_datum(Datum::Bytes(value.to_vec()))
    }

    /// Encodes an arbitrary-precision integer as its two's-complement big-endian bytes.
    pub fn encode_big_integer(&mut self, value: &BigInt) -> AvroResult<()> {
        self.encode_datum(Datum::BigInteger(value.clone()))
    }

    /// Encodes a decimal.
    ///
    /// A `decimal` logical type stores the unscaled value at the scale of the schema, anything
    /// else stores the decimal in plain notation.
    pub fn encode_big_decimal(&mut self, value: &BigDecimal) -> AvroResult<()> {
        self.encode_datum(Datum::BigDecimal(value.clone()))
    }

    pub fn encode_uuid(&mut self, value: Uuid) -> AvroResult<()> {
        self.encode_datum(Datum::Uuid(value))
    }

    pub fn encode_duration(&mut self, value: Duration) -> AvroResult<()> {
        self.encode_datum(Datum::Duration(value))
    }

    /// Starts a nested record.
    ///
    /// The schema of the record is the one `provider` knows as `type_name`, otherwise the
    /// schema expected at the current position. Without either the record is schemaless.
    pub fn encode_object(&mut self, type_name: Option<&str>) -> AvroResult<AvroEncoder<'s, '_>> {
        let (union_index, schema) = self.guard(|this| {
            this.resolve_structure(SchemaKind::Record, "encode_object", type_name)
        })?;
        debug!(
            "Starting record {}",
            schema.and_then(Schema::name).map_or_else(|| "<schemaless>".to_string(), |n| n.fullname())
        );
        self.spawn(Mode::Record, schema, union_index)
    }

    /// Starts a nested array. Every value encoded by the returned encoder is one item.
    pub fn encode_array(&mut self) -> AvroResult<AvroEncoder<'s, '_>> {
        let (union_index, schema) =
            self.guard(|this| this.resolve_structure(SchemaKind::Array, "encode_array", None))?;
        debug!("Starting array");
        self.spawn(Mode::Array, schema, union_index)
    }

    /// Starts a nested map. Every value encoded by the returned encoder must follow a key.
    pub fn encode_map(&mut self) -> AvroResult<AvroEncoder<'s, '_>> {
        let (union_index, schema) =
            self.guard(|this| this.resolve_structure(SchemaKind::Map, "encode_map", None))?;
        debug!("Starting map");
        self.spawn(Mode::Map, schema, union_index)
    }

    fn resolve_structure(
        &self,
        kind: SchemaKind,
        operation: &'static str,
        type_name: Option<&str>,
    ) -> AvroResult<(Option<usize>, Option<&'s Schema>)> {
        let slot = self.expected()?;
        let provider = self.provider;
        let named = type_name.and_then(|name| provider.schema(name));
        match (named, slot) {
            (Some(named), Some(slot)) if slot.as_union().is_some() => {
                let fullname = named.name().map(|n| n.fullname());
                let (index, _) = select_branch(slot, named.kind(), operation, fullname.as_deref())?;
                Ok((index, Some(named)))
            }
            (Some(named), _) if named.kind() != kind => Err(Details::SchemaMismatch {
                operation,
                expected: named.kind(),
            }
            .into()),
            (Some(named), _) => Ok((None, Some(named))),
            (None, Some(slot)) => {
                let (index, schema) = select_branch(slot, kind, operation, type_name)?;
                Ok((index, Some(schema)))
            }
            (None, None) => Ok((None, None)),
        }
    }

    fn spawn(
        &mut self,
        mode: Mode,
        schema: Option<&'s Schema>,
        union_index: Option<usize>,
    ) -> AvroResult<AvroEncoder<'s, '_>> {
        let through = self.writes_through();
        let provider = self.provider;
        let config = self.config;
        let AvroEncoder { target, frame, .. } = self;
        let target = match target {
            Target::Writer(writer) if through => {
                frame.open_through = Some(mode.kind());
                Target::Through {
                    writer: &mut **writer,
                    parent: frame,
                }
            }
            _ => {
                let slot = frame
                    .store(PendingWrite::open(mode.kind()))
                    .inspect_err(|_| frame.poisoned = true)?;
                Target::Slot {
                    parent: frame,
                    slot,
                }
            }
        };
        Ok(AvroEncoder {
            target,
            frame: Frame::new(mode, schema),
            provider,
            config,
            root: false,
            union_index,
            finished: false,
        })
    }

    /// Finishes the structure and hands its content to the parent, or to the writer for a root.
    ///
    /// A record with a schema is written in the order of its fields and every field must have
    /// been given a value. Arrays and maps are written as blocks followed by an empty block.
    ///
    /// # Errors
    /// Fails with [`Details::MissingField`] if a field has no value and with
    /// [`Details::UnfinishedStructure`] if a child encoder was dropped without being finished.
    /// Nothing of the structure is written in that case.
    pub fn finish_structure(mut self) -> AvroResult<()> {
        let result = self.finish();
        if result.is_err() {
            self.poison();
        }
        self.finished = true;
        result
    }

    fn finish(&mut self) -> AvroResult<()> {
        self.check()?;
        let mode = self.frame.mode;
        let content = self.frame.take_content(&self.config)?;
        let content = match self.union_index {
            Some(index) => deferred(move |writer| {
                Ok(encode_union_index(index, &mut *writer)? + content(writer)?)
            }),
            None => content,
        };
        let write = PendingWrite::new(mode.kind(), content);
        match &mut self.target {
            Target::Writer(writer) => {
                let written = write
                    .run(&mut **writer)
                    .inspect_err(|e| error!("Failed to write the encoded data: {e}"))?;
                writer.flush().map_err(Details::Flush)?;
                debug!("Wrote {written} bytes");
            }
            Target::Through { writer, parent } => {
                write
                    .run(&mut **writer)
                    .inspect_err(|e| error!("Failed to write the encoded data: {e}"))?;
                parent.open_through = None;
                parent.wrote_through = true;
            }
            Target::Slot { parent, slot } => parent.fill(slot, write),
        }
        debug!("Finished {} structure", mode.kind());
        Ok(())
    }
}

impl Drop for AvroEncoder<'_, '_> {
    fn drop(&mut self) {
        if !self.finished && !self.frame.poisoned {
            warn!(
                "{} encoder dropped without finish_structure, its content is lost",
                self.frame.mode.kind()
            );
        }
    }
}

/// Picks the schema of a structure of `kind` in a slot of schema `slot`, going through unions.
///
/// Within a union a branch named `type_name` is preferred over the first branch of `kind`.
fn select_branch<'s>(
    slot: &'s Schema,
    kind: SchemaKind,
    operation: &'static str,
    type_name: Option<&str>,
) -> AvroResult<(Option<usize>, &'s Schema)> {
    match &slot.ty {
        SchemaType::Union(union) => {
            let named = type_name.and_then(|type_name| {
                union.find(|branch| {
                    branch.kind() == kind
                        && branch
                            .name()
                            .is_some_and(|n| n.fullname() == type_name || n.name == type_name)
                })
            });
            named
                .or_else(|| union.find(|branch| branch.kind() == kind))
                .map(|(index, branch)| (Some(index), branch))
                .ok_or_else(|| Details::NoUnionBranch(kind).into())
        }
        _ if slot.kind() == kind => Ok((None, slot)),
        _ => Err(Details::SchemaMismatch {
            operation,
            expected: slot.kind(),
        }
        .into()),
    }
}
