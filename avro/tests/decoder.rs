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
    AvroDecoder, AvroResult, Schema,
    error::Details,
    schema::{Name, NamedSchemas, RecordField},
    types::Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Read;

type TestResult = anyhow::Result<()>;

const SALAMANDER: &[u8] = &[
    6, 97, 108, 105, 2, 6, 6, 110, 111, 119, 6, 104, 111, 119, 6, 108, 97, 119, 0, 0, 46, 4, 6,
    98, 97, 114, 6, 102, 111, 111, 0, 0, 64, 3, 69,
];

fn field(name: &str, schema: Schema) -> RecordField {
    RecordField::builder().name(name).schema(schema).build()
}

fn salamander() -> AvroResult<Schema> {
    Schema::record(Name::new("Salamander")?)
        .fields(vec![
            field("name", Schema::string()),
            field(
                "words",
                Schema::array(Schema::array(Schema::string()).build()).build(),
            ),
            field("age", Schema::int()),
            field("strings", Schema::array(Schema::string()).build()),
            field("salary", Schema::float()),
        ])
        .build()
}

fn decode_strings<R: Read>(decoder: &mut AvroDecoder<'_, R>) -> AvroResult<Vec<String>> {
    let array = decoder.decode_array()?;
    let mut strings = Vec::new();
    while array.has_next_array_value()? {
        strings.push(array.decode_string()?);
    }
    array.finish_structure(false)?;
    Ok(strings)
}

#[test]
fn decode_salamander() -> TestResult {
    let schema = salamander()?;
    let mut decoder = AvroDecoder::with_schema(SALAMANDER, &schema);

    assert_eq!(decoder.decode_key()?.as_deref(), Some("name"));
    assert_eq!(decoder.decode_string()?, "ali");

    assert_eq!(decoder.decode_key()?.as_deref(), Some("words"));
    let words = decoder.decode_array()?;
    let mut groups = Vec::new();
    while words.has_next_array_value()? {
        groups.push(decode_strings(words)?);
    }
    words.finish_structure(false)?;
    assert_eq!(groups, [["now", "how", "law"]]);

    assert_eq!(decoder.decode_key()?.as_deref(), Some("age"));
    assert_eq!(decoder.decode_int()?, 23);
    assert_eq!(decoder.decode_key()?.as_deref(), Some("strings"));
    assert_eq!(decode_strings(&mut decoder)?, ["bar", "foo"]);
    assert_eq!(decoder.decode_key()?.as_deref(), Some("salary"));
    assert_eq!(decoder.decode_float()?, 2100.0);
    assert_eq!(decoder.decode_key()?, None);
    decoder.finish_structure(false)?;
    assert!(decoder.into_inner().is_empty());
    Ok(())
}

#[test]
fn has_next_yields_exactly_the_item_count() -> TestResult {
    let schema = Schema::array(Schema::int()).build();
    let input: &[u8] = &[12, 4, 6, 10, 2, 10, 18, 0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let array = decoder.decode_array()?;
    let mut items = Vec::new();
    while array.has_next_array_value()? {
        items.push(array.decode_int()?);
    }
    assert_eq!(items, [2, 3, 5, 1, 5, 9]);
    assert!(!array.has_next_array_value()?);
    array.finish_structure(false)?;
    Ok(())
}

#[test]
fn empty_array_has_no_items() -> TestResult {
    let schema = Schema::array(Schema::string()).build();
    let input: &[u8] = &[0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let array = decoder.decode_array()?;
    assert!(!array.has_next_array_value()?);
    array.finish_structure(false)?;
    Ok(())
}

#[test]
fn reading_past_the_end_of_an_array() -> TestResult {
    let schema = Schema::array(Schema::int()).build();
    let input: &[u8] = &[2, 4, 0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let array = decoder.decode_array()?;
    assert_eq!(array.decode_int()?, 2);
    let error = array.decode_int().unwrap_err();
    assert!(matches!(error.details(), Details::ArrayExhausted));
    Ok(())
}

#[test]
fn unread_items_fail_to_finish() -> TestResult {
    let schema = Schema::array(Schema::int()).build();
    let input: &[u8] = &[4, 4, 6, 0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let array = decoder.decode_array()?;
    assert!(array.has_next_array_value()?);
    assert_eq!(array.decode_int()?, 2);
    let error = array.finish_structure(false).unwrap_err();
    assert!(matches!(error.details(), Details::UnconsumedItems(1)));
    Ok(())
}

#[test]
fn map_entries_are_read_by_key() -> TestResult {
    let schema = Schema::map(Schema::long()).build();
    let input: &[u8] = &[4, 2, 97, 14, 2, 98, 16, 0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let map = decoder.decode_map()?;
    let mut entries = Vec::new();
    while let Some(key) = map.decode_key()? {
        entries.push((key, map.decode_long()?));
    }
    map.finish_structure(false)?;
    assert_eq!(entries, [("a".to_string(), 7), ("b".to_string(), 8)]);
    Ok(())
}

#[test]
fn map_value_needs_a_key() -> TestResult {
    let schema = Schema::map(Schema::long()).build();
    let input: &[u8] = &[2, 2, 97, 14, 0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let map = decoder.decode_map()?;
    assert!(matches!(
        map.decode_long().unwrap_err().details(),
        Details::ValueWithoutKey
    ));
    Ok(())
}

#[test]
fn value_without_key_in_a_record() -> TestResult {
    let schema = salamander()?;
    let mut decoder = AvroDecoder::with_schema(SALAMANDER, &schema);
    decoder.decode_key()?;
    decoder.decode_string()?;
    let error = decoder.decode_string().unwrap_err();
    assert!(matches!(error.details(), Details::NoCurrentField));
    assert!(matches!(
        decoder.decode_key().unwrap_err().details(),
        Details::DecoderPoisoned
    ));
    Ok(())
}

#[rstest]
#[case::boolean(Schema::boolean(), &[1])]
#[case::string(Schema::string(), &[0])]
fn call_must_match_the_schema(#[case] schema: Schema, #[case] input: &[u8]) {
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let error = decoder.decode_int().unwrap_err();
    assert!(error.is_schema_mismatch());
    match error.details() {
        Details::SchemaMismatch {
            operation,
            expected,
        } => {
            assert_eq!(*operation, "decode_int");
            assert_eq!(*expected, schema.kind());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn long_and_double_widen() -> TestResult {
    let schema = Schema::record(Name::new("Numbers")?)
        .fields(vec![
            field("small", Schema::int()),
            field("ratio", Schema::float()),
        ])
        .build()?;
    let input: &[u8] = &[46, 0, 0, 192, 63];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    decoder.decode_key()?;
    assert_eq!(decoder.decode_long()?, 23);
    decoder.decode_key()?;
    assert_eq!(decoder.decode_double()?, 1.5);
    Ok(())
}

#[test]
fn nested_object_uses_its_own_cursor() -> TestResult {
    let point = Schema::record(Name::new("Point")?)
        .fields(vec![field("x", Schema::int()), field("y", Schema::int())])
        .build()?;
    let line = Schema::record(Name::new("Line")?)
        .fields(vec![
            field("from", point.clone()),
            field("to", point),
            field("label", Schema::string()),
        ])
        .build()?;
    let input: &[u8] = &[2, 4, 6, 8, 2, 97];
    let mut decoder = AvroDecoder::with_schema(input, &line);
    let mut points = Vec::new();
    for _ in 0..2 {
        decoder.decode_key()?;
        let mut object = decoder.decode_object(None)?;
        object.decode_key()?;
        let x = object.decode_int()?;
        object.decode_key()?;
        let y = object.decode_int()?;
        assert_eq!(object.decode_key()?, None);
        object.finish_structure(false)?;
        points.push((x, y));
    }
    assert_eq!(points, [(1, 2), (3, 4)]);
    assert_eq!(decoder.decode_key()?.as_deref(), Some("label"));
    assert_eq!(decoder.decode_string()?, "a");
    Ok(())
}

#[test]
fn object_schema_from_the_provider() -> TestResult {
    let point = Schema::record(Name::with_namespace("Point", "geo")?)
        .fields(vec![field("x", Schema::int()), field("y", Schema::int())])
        .build()?;
    let provider = NamedSchemas::new([point]);
    let input: &[u8] = &[2, 4];
    let mut decoder = AvroDecoder::new(input).provider(&provider);
    let mut object = decoder.decode_object(Some("Point"))?;
    object.decode_key()?;
    assert_eq!(object.decode_int()?, 1);
    object.finish_structure(true)?;
    drop(object);
    assert!(decoder.into_inner().is_empty());

    let mut decoder = AvroDecoder::new(input).provider(&provider);
    match decoder.decode_object(Some("geo.Line")) {
        Err(error) => assert!(matches!(error.details(), Details::SchemaNotFound(name) if name == "geo.Line")),
        Ok(_) => panic!("geo.Line is not registered"),
    }
    Ok(())
}

#[test]
fn object_needs_a_record_schema() -> TestResult {
    let schema = Schema::int();
    let input: &[u8] = &[2];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    match decoder.decode_object(None) {
        Err(error) => assert!(matches!(error.details(), Details::ExpectedRecord(_))),
        Ok(_) => panic!("an int is not a record"),
    }
    Ok(())
}

#[test]
fn nullable_items() -> TestResult {
    let schema =
        Schema::array(Schema::union(vec![Schema::null(), Schema::string()])?).build();
    let input: &[u8] = &[6, 2, 2, 97, 0, 2, 2, 98, 0];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let array = decoder.decode_array()?;
    let mut items = Vec::new();
    while array.has_next_array_value()? {
        if array.decode_null()? {
            items.push(None);
        } else {
            items.push(Some(array.decode_string()?));
        }
    }
    array.finish_structure(false)?;
    assert_eq!(items, [Some("a".to_string()), None, Some("b".to_string())]);
    Ok(())
}

#[test]
fn buffered_value_is_decoded_later() -> TestResult {
    let schema = salamander()?;
    let mut decoder = AvroDecoder::with_schema(SALAMANDER, &schema);
    decoder.decode_key()?;
    decoder.skip_value()?;
    decoder.decode_key()?;
    let mut words = decoder.decode_buffer()?;
    decoder.decode_key()?;
    assert_eq!(decoder.decode_int()?, 23);

    let outer = words.decode_array()?;
    assert!(outer.has_next_array_value()?);
    let inner = outer.decode_array()?;
    let mut count = 0;
    while inner.has_next_array_value()? {
        inner.decode_string()?;
        count += 1;
    }
    assert_eq!(count, 3);
    Ok(())
}

#[test]
fn arbitrary_values_and_nodes() -> TestResult {
    let schema = salamander()?;
    let mut decoder = AvroDecoder::with_schema(SALAMANDER, &schema);
    decoder.decode_key()?;
    assert_eq!(decoder.decode_arbitrary()?, Value::String("ali".to_string()));
    decoder.decode_key()?;
    assert_eq!(
        decoder.decode_node()?,
        serde_json::json!([["now", "how", "law"]])
    );
    Ok(())
}

#[test]
fn whole_record_at_once() -> TestResult {
    let schema = salamander()?;
    let mut decoder = AvroDecoder::with_schema(SALAMANDER, &schema);
    let Value::Record(fields) = decoder.decode_arbitrary()? else {
        panic!("a record was expected");
    };
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[2], ("age".to_string(), Value::Int(23)));
    assert_eq!(decoder.decode_key()?, None);
    Ok(())
}

#[rstest]
#[case::truncated(&[6, 97])]
#[case::negative_length(&[1])]
#[case::overlong_varint(&[255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 1])]
fn framing_errors_poison_the_decoder(#[case] input: &[u8]) {
    let schema = Schema::string();
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let error = decoder.decode_string().unwrap_err();
    assert!(error.is_framing(), "{error:?}");
    assert!(matches!(
        decoder.decode_string().unwrap_err().details(),
        Details::DecoderPoisoned
    ));
}

#[test]
fn union_index_out_of_range() -> TestResult {
    let schema = Schema::union(vec![Schema::null(), Schema::int()])?;
    let input: &[u8] = &[4];
    let mut decoder = AvroDecoder::with_schema(input, &schema);
    let error = decoder.decode_int().unwrap_err();
    assert!(matches!(
        error.details(),
        Details::UnionIndex {
            index: 2,
            num_variants: 2
        }
    ));
    Ok(())
}
