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

//! Logic handling the intermediate representation of Avro values.

use crate::{bigdecimal::decimal_to_plain_string, duration::Duration};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;
use uuid::Uuid;

/// Represents any valid Avro value, as produced by
/// [`AvroDecoder::decode_arbitrary`](crate::decoder::AvroDecoder::decode_arbitrary).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A `null` Avro value.
    Null,
    /// A `boolean` Avro value.
    Boolean(bool),
    /// A `int` Avro value.
    Int(i32),
    /// A `long` Avro value.
    Long(i64),
    /// A `float` Avro value.
    Float(f32),
    /// A `double` Avro value.
    Double(f64),
    /// A `bytes` Avro value.
    Bytes(Vec<u8>),
    /// A `string` Avro value.
    String(String),
    /// A `fixed` Avro value.
    /// The size of the fixed value is represented as a `usize`.
    Fixed(usize, Vec<u8>),
    /// An `enum` Avro value.
    ///
    /// An Enum is represented by a symbol and its position in the symbols list
    /// of its corresponding schema.
    /// This allows schema-less encoding, as well as schema resolution while
    /// reading values.
    Enum(u32, String),
    /// An `union` Avro value.
    ///
    /// A Union is represented by the value it holds and its position in the type list
    /// of its corresponding schema
    Union(u32, Box<Value>),
    /// An `array` Avro value.
    Array(Vec<Value>),
    /// A `map` Avro value.
    Map(HashMap<String, Value>),
    /// A `record` Avro value.
    ///
    /// A Record is represented by a vector of (`<record name>`, `value`).
    /// This allows schema-less encoding.
    Record(Vec<(String, Value)>),
    /// An `int` hinted as a character.
    Char(char),
    /// A `bytes` or `fixed` hinted as an arbitrary-precision integer.
    BigInteger(BigInt),
    /// A `decimal` logical value, or a decimal stored in a `string`.
    Decimal(BigDecimal),
    /// A `date` Avro value, days since the unix epoch.
    Date(i32),
    /// Time in milliseconds.
    TimeMillis(i32),
    /// Time in microseconds.
    TimeMicros(i64),
    /// Timestamp in milliseconds.
    TimestampMillis(i64),
    /// Timestamp in microseconds.
    TimestampMicros(i64),
    /// Avro Duration. An amount of time defined by months, days and milliseconds.
    Duration(Duration),
    /// Universally unique identifier.
    Uuid(Uuid),
}

fn float_to_json(f: f64) -> JsonValue {
    Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
}

fn bytes_to_json(bytes: Vec<u8>) -> JsonValue {
    JsonValue::Array(bytes.into_iter().map(JsonValue::from).collect())
}

/// Converts the value into a JSON tree.
///
/// Numbers that JSON cannot hold (non-finite floats) become `null`, big integers and decimals
/// become strings and bytes become arrays of numbers.
impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Boolean(b) => Self::Bool(b),
            Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => Self::from(i),
            Value::Long(l)
            | Value::TimeMicros(l)
            | Value::TimestampMillis(l)
            | Value::TimestampMicros(l) => Self::from(l),
            Value::Float(f) => float_to_json(f64::from(f)),
            Value::Double(d) => float_to_json(d),
            Value::Bytes(bytes) | Value::Fixed(_, bytes) => bytes_to_json(bytes),
            Value::String(s) | Value::Enum(_, s) => Self::String(s),
            Value::Union(_, inner) => Self::from(*inner),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Map(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect::<Map<_, _>>(),
            ),
            Value::Record(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, Self::from(value)))
                    .collect::<Map<_, _>>(),
            ),
            Value::Char(c) => Self::String(c.to_string()),
            Value::BigInteger(i) => Self::String(i.to_string()),
            Value::Decimal(d) => Self::String(decimal_to_plain_string(&d)),
            Value::Duration(d) => {
                let mut object = Map::new();
                object.insert("months".to_string(), d.months.into());
                object.insert("days".to_string(), d.days.into());
                object.insert("millis".to_string(), d.millis.into());
                Self::Object(object)
            }
            Value::Uuid(uuid) => Self::String(uuid.to_string()),
        }
    }
}
