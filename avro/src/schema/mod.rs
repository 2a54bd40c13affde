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

//! The in-memory schema model.
//!
//! A [`Schema`] is one Avro type: its [`SchemaType`] (which carries the kind-specific payload),
//! an optional [`LogicalType`] and an optional [`NativeType`] hint. Schemas are built once,
//! usually by a generator or a loader living outside this crate, and are only borrowed by
//! encoders and decoders afterwards.
//!
//! ```
//! # use avro_serde::schema::{RecordField, Schema};
//! let schema = Schema::record("io.example.Person".try_into()?)
//!     .fields(vec![
//!         RecordField::builder().name("age").schema(Schema::int()).build(),
//!         RecordField::builder().name("name").schema(Schema::string()).build(),
//!     ])
//!     .build()?;
//!
//! assert_eq!(schema.as_record().map(|r| r.fields.len()), Some(2));
//! # Ok::<(), avro_serde::Error>(())
//! ```

mod builders;
mod name;
mod provider;
mod record;
mod union;

pub use crate::schema::{
    name::{Alias, Name},
    provider::{NamedSchemas, SchemaProvider},
    record::{RecordField, RecordSchema},
    union::UnionSchema,
};
pub(crate) use name::{validate_enum_symbol, validate_field_name};

use crate::{AvroResult, error::Details};
use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use strum_macros::{Display, EnumDiscriminants, EnumString, IntoStaticStr};

/// Represents documentation for complex Avro schemas.
pub type Documentation = Option<String>;

/// The kind of an Avro schema together with its kind-specific payload.
///
/// [`SchemaKind`] is the payload-less discriminant of this enum.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(
    name(SchemaKind),
    derive(Hash, Ord, PartialOrd, Display, EnumString, IntoStaticStr),
    strum(serialize_all = "lowercase")
)]
pub enum SchemaType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(RecordSchema),
    Enum(EnumSchema),
    Array(ArraySchema),
    Map(MapSchema),
    Union(UnionSchema),
    Fixed(FixedSchema),
}

/// A semantic annotation on top of a primitive or fixed schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LogicalType {
    /// An arbitrary-precision signed decimal number, stored as its unscaled two's-complement
    /// big-endian representation.
    Decimal { precision: usize, scale: usize },
    /// Days since the unix epoch, on an `int`.
    Date,
    /// Milliseconds after midnight, on an `int`.
    TimeMillis,
    /// Microseconds after midnight, on a `long`.
    TimeMicros,
    /// Milliseconds since the unix epoch, on a `long`.
    TimestampMillis,
    /// Microseconds since the unix epoch, on a `long`.
    TimestampMicros,
    /// Months, days and milliseconds on a `fixed` of size 12.
    Duration,
    /// A RFC-4122 uuid, on a `string` or a `fixed` of size 16.
    Uuid,
}

/// The application-level type an `int`, `long`, `bytes` or `string` schema stands for.
///
/// Several native types share one Avro kind. The hint tells them apart when the caller does not,
/// for example when decoding an arbitrary value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum NativeType {
    Byte,
    Short,
    Char,
    Int,
    Long,
    BigInteger,
    BigDecimal,
}

/// One Avro type.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    pub ty: SchemaType,
    pub logical_type: Option<LogicalType>,
    pub native_type: Option<NativeType>,
}

/// A description of an Array schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    pub items: Box<Schema>,
}

/// A description of a Map schema. Keys are always strings.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSchema {
    pub values: Box<Schema>,
}

/// A description of an Enum schema.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    pub aliases: Vec<Alias>,
    /// The documentation of the schema
    pub doc: Documentation,
    /// The set of symbols of the schema, in index order
    pub symbols: Vec<String>,
    /// An optional default symbol used for compatibility
    pub default: Option<String>,
}

impl EnumSchema {
    /// Position of `symbol` in the symbol list.
    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// A description of a Fixed schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    pub aliases: Vec<Alias>,
    /// The documentation of the schema
    pub doc: Documentation,
    /// The size of the fixed schema
    pub size: usize,
}

impl From<&Schema> for SchemaKind {
    fn from(schema: &Schema) -> Self {
        schema.kind()
    }
}

impl From<SchemaType> for Schema {
    fn from(ty: SchemaType) -> Self {
        Self::new(ty)
    }
}

impl Schema {
    pub const fn new(ty: SchemaType) -> Self {
        Self {
            ty,
            logical_type: None,
            native_type: None,
        }
    }

    pub const fn null() -> Self {
        Self::new(SchemaType::Null)
    }

    pub const fn boolean() -> Self {
        Self::new(SchemaType::Boolean)
    }

    pub const fn int() -> Self {
        Self::new(SchemaType::Int)
    }

    pub const fn long() -> Self {
        Self::new(SchemaType::Long)
    }

    pub const fn float() -> Self {
        Self::new(SchemaType::Float)
    }

    pub const fn double() -> Self {
        Self::new(SchemaType::Double)
    }

    pub const fn bytes() -> Self {
        Self::new(SchemaType::Bytes)
    }

    pub const fn string() -> Self {
        Self::new(SchemaType::String)
    }

    /// An `int` holding days since the unix epoch.
    pub const fn date() -> Self {
        Self {
            ty: SchemaType::Int,
            logical_type: Some(LogicalType::Date),
            native_type: None,
        }
    }

    /// A `string` holding a uuid.
    pub const fn uuid() -> Self {
        Self {
            ty: SchemaType::String,
            logical_type: Some(LogicalType::Uuid),
            native_type: None,
        }
    }

    /// A `long` holding milliseconds since the unix epoch.
    pub const fn timestamp_millis() -> Self {
        Self {
            ty: SchemaType::Long,
            logical_type: Some(LogicalType::TimestampMillis),
            native_type: None,
        }
    }

    /// A `bytes` schema holding a decimal with the given precision and scale.
    pub fn decimal(precision: usize, scale: usize) -> AvroResult<Self> {
        Self::bytes().with_logical_type(LogicalType::Decimal { precision, scale })
    }

    /// The kind of this schema, ignoring any logical type.
    pub fn kind(&self) -> SchemaKind {
        SchemaKind::from(&self.ty)
    }

    /// Annotates the schema with a logical type.
    ///
    /// # Errors
    /// Fails when the logical type cannot be stored in a schema of this kind.
    pub fn with_logical_type(mut self, logical: LogicalType) -> AvroResult<Self> {
        let compatible = match (logical, &self.ty) {
            (LogicalType::Date | LogicalType::TimeMillis, SchemaType::Int) => true,
            (
                LogicalType::TimeMicros
                | LogicalType::TimestampMillis
                | LogicalType::TimestampMicros,
                SchemaType::Long,
            ) => true,
            (LogicalType::Decimal { precision, scale }, SchemaType::Bytes | SchemaType::Fixed(_)) => {
                if precision == 0 || scale > precision {
                    return Err(Details::DecimalMetadata { precision, scale }.into());
                }
                true
            }
            (LogicalType::Uuid, SchemaType::String) => true,
            (LogicalType::Uuid, SchemaType::Fixed(fixed)) => fixed.size == 16,
            (LogicalType::Duration, SchemaType::Fixed(fixed)) => fixed.size == 12,
            _ => false,
        };
        if !compatible {
            return Err(Details::LogicalTypeMismatch {
                logical,
                kind: self.kind(),
            }
            .into());
        }
        self.logical_type = Some(logical);
        Ok(self)
    }

    /// Annotates the schema with the native type it stands for.
    ///
    /// # Errors
    /// Fails when a value of the native type cannot be stored in a schema of this kind.
    pub fn with_native_type(mut self, native: NativeType) -> AvroResult<Self> {
        let compatible = matches!(
            (native, &self.ty),
            (
                NativeType::Byte | NativeType::Short | NativeType::Char | NativeType::Int,
                SchemaType::Int
            ) | (NativeType::Long, SchemaType::Long)
                | (
                    NativeType::BigInteger,
                    SchemaType::Bytes | SchemaType::Fixed(_)
                )
                | (
                    NativeType::BigDecimal,
                    SchemaType::Bytes | SchemaType::String | SchemaType::Fixed(_)
                )
        );
        if !compatible {
            return Err(Details::NativeTypeMismatch {
                native,
                kind: self.kind(),
            }
            .into());
        }
        self.native_type = Some(native);
        Ok(self)
    }

    /// Returns whether the schema is a record, an enum or a fixed.
    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }

    /// Returns the name of the schema if it has one.
    pub fn name(&self) -> Option<&Name> {
        match &self.ty {
            SchemaType::Record(RecordSchema { name, .. })
            | SchemaType::Enum(EnumSchema { name, .. })
            | SchemaType::Fixed(FixedSchema { name, .. }) => Some(name),
            _ => None,
        }
    }

    /// Returns the aliases of the schema if it has any.
    pub fn aliases(&self) -> &[Alias] {
        match &self.ty {
            SchemaType::Record(RecordSchema { aliases, .. })
            | SchemaType::Enum(EnumSchema { aliases, .. })
            | SchemaType::Fixed(FixedSchema { aliases, .. }) => aliases,
            _ => &[],
        }
    }

    pub fn as_record(&self) -> Option<&RecordSchema> {
        match &self.ty {
            SchemaType::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionSchema> {
        match &self.ty {
            SchemaType::Union(union) => Some(union),
            _ => None,
        }
    }
}

fn serialize_named<M: SerializeMap>(
    map: &mut M,
    name: &Name,
    aliases: &[Alias],
    doc: &Documentation,
) -> Result<(), M::Error> {
    if let Some(namespace) = &name.namespace {
        map.serialize_entry("namespace", namespace)?;
    }
    map.serialize_entry("name", &name.name)?;
    if !aliases.is_empty() {
        map.serialize_entry("aliases", aliases)?;
    }
    if let Some(doc) = doc {
        map.serialize_entry("doc", doc)?;
    }
    Ok(())
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let annotated = self.logical_type.is_some() || self.native_type.is_some();
        let kind: &'static str = self.kind().into();
        let mut map = match &self.ty {
            SchemaType::Null
            | SchemaType::Boolean
            | SchemaType::Int
            | SchemaType::Long
            | SchemaType::Float
            | SchemaType::Double
            | SchemaType::Bytes
            | SchemaType::String => {
                if !annotated {
                    return serializer.serialize_str(kind);
                }
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                map
            }
            SchemaType::Union(union) => {
                let variants = union.variants();
                let mut seq = serializer.serialize_seq(Some(variants.len()))?;
                for v in variants {
                    seq.serialize_element(v)?;
                }
                return seq.end();
            }
            SchemaType::Array(ArraySchema { items }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                map.serialize_entry("items", items)?;
                map
            }
            SchemaType::Map(MapSchema { values }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                map.serialize_entry("values", values)?;
                map
            }
            SchemaType::Record(RecordSchema {
                name,
                aliases,
                doc,
                fields,
                ..
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                serialize_named(&mut map, name, aliases, doc)?;
                map.serialize_entry("fields", fields)?;
                map
            }
            SchemaType::Enum(EnumSchema {
                name,
                aliases,
                doc,
                symbols,
                default,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                serialize_named(&mut map, name, aliases, doc)?;
                map.serialize_entry("symbols", symbols)?;
                if let Some(default) = default {
                    map.serialize_entry("default", default)?;
                }
                map
            }
            SchemaType::Fixed(FixedSchema {
                name,
                aliases,
                doc,
                size,
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", kind)?;
                serialize_named(&mut map, name, aliases, doc)?;
                map.serialize_entry("size", size)?;
                map
            }
        };
        if let Some(logical) = self.logical_type {
            let logical_name: &'static str = logical.into();
            map.serialize_entry("logicalType", logical_name)?;
            if let LogicalType::Decimal { precision, scale } = logical {
                map.serialize_entry("precision", &precision)?;
                map.serialize_entry("scale", &scale)?;
            }
        }
        if let Some(native) = self.native_type {
            let native_name: &'static str = native.into();
            map.serialize_entry("nativeType", native_name)?;
        }
        map.end()
    }
}
