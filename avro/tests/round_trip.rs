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

use avro_serde::{
    AvroDecoder, AvroEncoder, AvroResult, BigDecimal, Duration, Schema, Uuid, from_avro_bytes,
    error::Details,
    schema::{LogicalType, Name, NativeType, RecordField},
    to_avro_bytes,
    types::Value,
};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::str::FromStr;

type TestResult = anyhow::Result<()>;

fn field(name: &str, schema: Schema) -> RecordField {
    RecordField::builder().name(name).schema(schema).build()
}

#[derive(Debug, PartialEq)]
struct MyRecord {
    test_byte: i8,
    test_char: char,
    test_double: f64,
    test_float: f32,
    test_int: i32,
    test_long: i64,
    test_short: i16,
}

fn my_record_schema() -> AvroResult<Schema> {
    Schema::record(Name::with_namespace("MyRecord", "test")?)
        .fields(vec![
            field("testByte", Schema::int().with_native_type(NativeType::Byte)?),
            field("testChar", Schema::int().with_native_type(NativeType::Char)?),
            field("testDouble", Schema::double()),
            field("testFloat", Schema::float()),
            field("testInt", Schema::int()),
            field("testLong", Schema::long()),
            field("testShort", Schema::int().with_native_type(NativeType::Short)?),
        ])
        .build()
}

fn encode_my_record(schema: &Schema, record: &MyRecord) -> AvroResult<Vec<u8>> {
    to_avro_bytes(schema, |encoder| {
        encoder.encode_key("testShort")?;
        encoder.encode_short(record.test_short)?;
        encoder.encode_key("testLong")?;
        encoder.encode_long(record.test_long)?;
        encoder.encode_key("testInt")?;
        encoder.encode_int(record.test_int)?;
        encoder.encode_key("testFloat")?;
        encoder.encode_float(record.test_float)?;
        encoder.encode_key("testDouble")?;
        encoder.encode_double(record.test_double)?;
        encoder.encode_key("testChar")?;
        encoder.encode_char(record.test_char)?;
        encoder.encode_key("testByte")?;
        encoder.encode_byte(record.test_byte)
    })
}

fn decode_my_record(schema: &Schema, bytes: &[u8]) -> AvroResult<MyRecord> {
    from_avro_bytes(schema, bytes, |decoder| {
        let mut record = MyRecord {
            test_byte: 0,
            test_char: '\0',
            test_double: 0.0,
            test_float: 0.0,
            test_int: 0,
            test_long: 0,
            test_short: 0,
        };
        while let Some(key) = decoder.decode_key()? {
            match key.as_str() {
                "testByte" => record.test_byte = decoder.decode_byte()?,
                "testChar" => record.test_char = decoder.decode_char()?,
                "testDouble" => record.test_double = decoder.decode_double()?,
                "testFloat" => record.test_float = decoder.decode_float()?,
                "testInt" => record.test_int = decoder.decode_int()?,
                "testLong" => record.test_long = decoder.decode_long()?,
                "testShort" => record.test_short = decoder.decode_short()?,
                _ => decoder.skip_value()?,
            }
        }
        decoder.finish_structure(false)?;
        Ok(record)
    })
}

#[rstest]
#[case::small(MyRecord {
    test_byte: 1,
    test_char: 'a',
    test_double: 2.5,
    test_float: -1.25,
    test_int: 42,
    test_long: 1 << 40,
    test_short: 300,
})]
#[case::extremes(MyRecord {
    test_byte: i8::MIN,
    test_char: '\u{1F980}',
    test_double: f64::MAX,
    test_float: f32::MIN_POSITIVE,
    test_int: i32::MIN,
    test_long: i64::MAX,
    test_short: i16::MAX,
})]
fn my_record(#[case] record: MyRecord) -> TestResult {
    let schema = my_record_schema()?;
    let bytes = encode_my_record(&schema, &record)?;
    assert_eq!(decode_my_record(&schema, &bytes)?, record);
    Ok(())
}

#[test]
fn byte_out_of_range_is_rejected() -> TestResult {
    let schema = Schema::int().with_native_type(NativeType::Byte)?;
    let error = to_avro_bytes(&schema, |encoder| encoder.encode_int(200)).unwrap_err();
    assert!(matches!(
        error.details(),
        Details::NativeRange {
            value: 200,
            native: NativeType::Byte
        }
    ));
    Ok(())
}

#[test]
fn decimal_with_more_digits_than_the_scale_is_rejected() -> TestResult {
    let schema = Schema::decimal(10, 2)?;
    let value = BigDecimal::from_str("1.239")?;
    let error = to_avro_bytes(&schema, |encoder| encoder.encode_big_decimal(&value)).unwrap_err();
    assert!(matches!(
        error.details(),
        Details::DecimalScale {
            scale: 2,
            actual: 3
        }
    ));
    assert!(error.is_schema_mismatch());
    Ok(())
}

fn cube() -> Schema {
    Schema::array(Schema::array(Schema::array(Schema::long()).build()).build()).build()
}

#[test]
fn arrays_nested_three_deep() -> TestResult {
    let cube_values: Vec<Vec<Vec<i64>>> = vec![
        vec![vec![1, 2], vec![]],
        vec![],
        vec![vec![3], vec![4, 5, 6], vec![-7]],
    ];
    let schema = cube();
    let bytes = to_avro_bytes(&schema, |encoder| {
        let mut outer = encoder.encode_array()?;
        for plane in &cube_values {
            let mut middle = outer.encode_array()?;
            for row in plane {
                let mut inner = middle.encode_array()?;
                for value in row {
                    inner.encode_long(*value)?;
                }
                inner.finish_structure()?;
            }
            middle.finish_structure()?;
        }
        outer.finish_structure()
    })?;

    let decoded = from_avro_bytes(&schema, &bytes, |decoder| {
        let mut planes = Vec::new();
        let outer = decoder.decode_array()?;
        while outer.has_next_array_value()? {
            let mut rows = Vec::new();
            outer.decode_array()?;
            while outer.has_next_array_value()? {
                let mut values = Vec::new();
                outer.decode_array()?;
                while outer.has_next_array_value()? {
                    values.push(outer.decode_long()?);
                }
                outer.finish_structure(false)?;
                rows.push(values);
            }
            outer.finish_structure(false)?;
            planes.push(rows);
        }
        outer.finish_structure(false)?;
        Ok(planes)
    })?;
    assert_eq!(decoded, cube_values);

    let arbitrary = from_avro_bytes(&schema, &bytes, |decoder| decoder.decode_arbitrary())?;
    let Value::Array(planes) = arbitrary else {
        panic!("an array was expected");
    };
    assert_eq!(planes.len(), 3);
    Ok(())
}

#[test]
fn logical_types() -> TestResult {
    let color = Schema::r#enum(Name::new("color")?, vec!["GREEN", "BLUE", "RED", "YELLOW"])
        .build()?;
    let duration = Schema::fixed(Name::new("span")?, Duration::SIZE)
        .build()
        .with_logical_type(LogicalType::Duration)?;
    let schema = Schema::record(Name::new("Event")?)
        .fields(vec![
            field("color", color),
            field("price", Schema::decimal(9, 3)?),
            field("id", Schema::uuid()),
            field("day", Schema::date()),
            field("at", Schema::timestamp_millis()),
            field("span", duration),
            field("count", Schema::bytes().with_native_type(NativeType::BigInteger)?),
        ])
        .build()?;

    let price = BigDecimal::from_str("-1234.567")?;
    let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8")?;
    let span = Duration::new(1, 2, 3);
    let count = BigInt::from(-1) << 70;

    let bytes = to_avro_bytes(&schema, |encoder| {
        encoder.encode_key("span")?;
        encoder.encode_duration(span)?;
        encoder.encode_key("count")?;
        encoder.encode_big_integer(&count)?;
        encoder.encode_key("at")?;
        encoder.encode_long(1_700_000_000_000)?;
        encoder.encode_key("day")?;
        encoder.encode_int(19_000)?;
        encoder.encode_key("id")?;
        encoder.encode_uuid(id)?;
        encoder.encode_key("price")?;
        encoder.encode_big_decimal(&price)?;
        encoder.encode_key("color")?;
        encoder.encode_string("RED")
    })?;
    assert_eq!(bytes[0], 4);

    from_avro_bytes(&schema, &bytes, |decoder| {
        decoder.decode_key()?;
        assert_eq!(decoder.decode_string()?, "RED");
        decoder.decode_key()?;
        assert_eq!(decoder.decode_big_decimal()?, price);
        decoder.decode_key()?;
        assert_eq!(decoder.decode_uuid()?, id);
        decoder.decode_key()?;
        assert_eq!(decoder.decode_arbitrary()?, Value::Date(19_000));
        decoder.decode_key()?;
        assert_eq!(decoder.decode_long()?, 1_700_000_000_000);
        decoder.decode_key()?;
        assert_eq!(decoder.decode_duration()?, span);
        decoder.decode_key()?;
        assert_eq!(decoder.decode_big_integer()?, count);
        assert_eq!(decoder.decode_key()?, None);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn nullable_fields() -> TestResult {
    let nullable = |schema| Schema::union(vec![Schema::null(), schema]);
    let schema = Schema::record(Name::new("Pet")?)
        .fields(vec![
            field("name", nullable(Schema::string())?),
            field("age", nullable(Schema::int())?),
        ])
        .build()?;
    let bytes = to_avro_bytes(&schema, |encoder| {
        encoder.encode_key("age")?;
        encoder.encode_null()?;
        encoder.encode_key("name")?;
        encoder.encode_string("rex")
    })?;
    assert_eq!(bytes, [2, 6, 114, 101, 120, 0]);

    let (name, age) = from_avro_bytes(&schema, &bytes, |decoder| {
        decoder.decode_key()?;
        let name = if decoder.decode_null()? {
            None
        } else {
            Some(decoder.decode_string()?)
        };
        decoder.decode_key()?;
        let age = if decoder.decode_null()? {
            None
        } else {
            Some(decoder.decode_int()?)
        };
        Ok((name, age))
    })?;
    assert_eq!(name.as_deref(), Some("rex"));
    assert_eq!(age, None);
    Ok(())
}

#[test]
fn maps_of_records() -> TestResult {
    let point = Schema::record(Name::new("Point")?)
        .fields(vec![field("x", Schema::int()), field("y", Schema::int())])
        .build()?;
    let schema = Schema::map(point).build();
    let mut bytes = Vec::new();
    let mut encoder = AvroEncoder::with_schema(&mut bytes, &schema);
    let mut map = encoder.encode_map()?;
    for (key, x, y) in [("a", 1, 2), ("b", 3, 4)] {
        map.encode_key(key)?;
        let mut object = map.encode_object(None)?;
        object.encode_key("y")?;
        object.encode_int(y)?;
        object.encode_key("x")?;
        object.encode_int(x)?;
        object.finish_structure()?;
    }
    map.finish_structure()?;
    encoder.finish_structure()?;

    let mut decoder = AvroDecoder::with_schema(bytes.as_slice(), &schema);
    let map = decoder.decode_map()?;
    let mut sums = Vec::new();
    while let Some(key) = map.decode_key()? {
        let mut object = map.decode_object(None)?;
        let mut sum = 0;
        while object.decode_key()?.is_some() {
            sum += object.decode_int()?;
        }
        object.finish_structure(false)?;
        sums.push((key, sum));
    }
    map.finish_structure(false)?;
    sums.sort();
    assert_eq!(sums, [("a".to_string(), 3), ("b".to_string(), 7)]);
    Ok(())
}
