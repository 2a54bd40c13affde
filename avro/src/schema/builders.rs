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

use crate::error::Details;
use crate::schema::{
    Alias, ArraySchema, EnumSchema, FixedSchema, MapSchema, Name, RecordField, RecordSchema,
    SchemaType, UnionSchema, validate_enum_symbol, validate_field_name,
};
use crate::{AvroResult, Schema};
use bon::bon;
use std::collections::HashSet;

#[bon]
impl Schema {
    /// Returns a map schema with the given value schema.
    #[builder(finish_fn = build)]
    pub fn map(#[builder(start_fn)] values: Schema) -> Self {
        Schema::new(SchemaType::Map(MapSchema {
            values: Box::new(values),
        }))
    }

    /// Returns an array schema with the given item schema.
    #[builder(finish_fn = build)]
    pub fn array(#[builder(start_fn)] items: Schema) -> Self {
        Schema::new(SchemaType::Array(ArraySchema {
            items: Box::new(items),
        }))
    }

    /// Returns an enum schema with the given name, symbols and optional
    /// aliases, doc and default.
    ///
    /// # Errors
    /// Will return an error if a symbol is not a valid name or is declared twice.
    #[builder(finish_fn = build)]
    pub fn r#enum(
        #[builder(start_fn)] name: Name,
        #[builder(start_fn)] symbols: Vec<impl Into<String>>,
        #[builder(default)] aliases: Vec<Alias>,
        doc: Option<String>,
        default: Option<String>,
    ) -> AvroResult<Self> {
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(symbols.len());
        for symbol in &symbols {
            validate_enum_symbol(symbol)?;
            if !seen.insert(symbol.as_str()) {
                return Err(Details::EnumSymbolDuplicate(symbol.clone()).into());
            }
        }
        if let Some(default) = &default
            && !seen.contains(default.as_str())
        {
            return Err(Details::EnumSymbol {
                symbol: default.clone(),
                name: name.fullname(),
            }
            .into());
        }
        Ok(Schema::new(SchemaType::Enum(EnumSchema {
            name,
            aliases,
            doc,
            symbols,
            default,
        })))
    }

    /// Returns a fixed schema with the given name, size and optional
    /// aliases and doc.
    #[builder(finish_fn = build)]
    pub fn fixed(
        #[builder(start_fn)] name: Name,
        #[builder(start_fn)] size: usize,
        #[builder(default)] aliases: Vec<Alias>,
        doc: Option<String>,
    ) -> Self {
        Schema::new(SchemaType::Fixed(FixedSchema {
            name,
            aliases,
            doc,
            size,
        }))
    }

    /// Returns a record schema with the given name, fields and optional
    /// aliases and doc.
    ///
    /// # Errors
    /// Will return an error if a field name is not a valid name or is declared twice.
    #[builder(finish_fn = build)]
    pub fn record(
        #[builder(start_fn)] name: Name,
        #[builder(default)] fields: Vec<RecordField>,
        #[builder(default)] aliases: Vec<Alias>,
        doc: Option<String>,
    ) -> AvroResult<Self> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            validate_field_name(&field.name)?;
            if !seen.insert(field.name.as_str()) {
                return Err(Details::FieldNameDuplicate(field.name.clone()).into());
            }
        }
        let record_schema = RecordSchema::builder()
            .name(name)
            .fields(fields)
            .aliases(aliases)
            .doc(doc)
            .build();
        Ok(Schema::new(SchemaType::Record(record_schema)))
    }

    /// Returns a union schema with the given variants.
    ///
    /// # Errors
    /// Will return an error if `schemas` has duplicate unnamed schemas or if `schemas`
    /// contains a union.
    pub fn union(schemas: Vec<Schema>) -> AvroResult<Schema> {
        UnionSchema::new(schemas).map(|union| Schema::new(SchemaType::Union(union)))
    }
}
