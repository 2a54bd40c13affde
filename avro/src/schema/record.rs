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

use crate::schema::{Alias, Documentation, Name, Schema};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Represents a `field` in a `record` Avro schema.
#[derive(bon::Builder, Clone, Debug, PartialEq)]
pub struct RecordField {
    /// Name of the field.
    #[builder(into)]
    pub name: String,
    /// Documentation of the field.
    #[builder(default)]
    pub doc: Documentation,
    /// Aliases of the field's name. They have no namespace.
    #[builder(default)]
    pub aliases: Vec<String>,
    /// Schema of the field.
    pub schema: Schema,
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        if !self.aliases.is_empty() {
            map.serialize_entry("aliases", &self.aliases)?;
        }
        map.end()
    }
}

/// A description of a Record schema.
///
/// The order of `fields` is the order of the fields on the wire.
#[derive(bon::Builder, Clone, Debug)]
pub struct RecordSchema {
    /// The name of the schema
    pub name: Name,
    /// The aliases of the schema
    #[builder(default)]
    pub aliases: Vec<Alias>,
    /// The documentation of the schema
    #[builder(default)]
    pub doc: Documentation,
    /// The set of fields of the schema
    #[builder(default)]
    pub fields: Vec<RecordField>,
    /// The `lookup` table maps field names and field aliases to their position in the `Vec`
    /// of `fields`.
    #[builder(skip = calculate_lookup_table(&fields))]
    pub lookup: BTreeMap<String, usize>,
}

// No need to compare lookup, it is derivative of fields.
impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.aliases == other.aliases
            && self.doc == other.doc
            && self.fields == other.fields
    }
}

impl RecordSchema {
    /// Finds a field by its name or one of its aliases.
    pub fn field(&self, name: &str) -> Option<(usize, &RecordField)> {
        let position = *self.lookup.get(name)?;
        self.fields.get(position).map(|field| (position, field))
    }
}

/// Calculate the lookup table for the given fields.
///
/// Names win over aliases of other fields.
fn calculate_lookup_table(fields: &[RecordField]) -> BTreeMap<String, usize> {
    let mut lookup: BTreeMap<String, usize> = fields
        .iter()
        .enumerate()
        .flat_map(|(i, field)| field.aliases.iter().map(move |alias| (alias.clone(), i)))
        .collect();
    lookup.extend(
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name.clone(), i)),
    );
    lookup
}
