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

use crate::schema::{Schema, SchemaType};
use crate::{AvroResult, error::Details};
use log::debug;
use std::collections::HashMap;

/// Looks up the schema of a type by its identifier.
///
/// The encoder and decoder consult the provider when a nested object is started with an explicit
/// type name. Schemas are produced outside this crate, by a generator or a loader.
pub trait SchemaProvider {
    /// Returns the schema registered for `type_name`, if any.
    fn schema(&self, type_name: &str) -> Option<&Schema>;

    /// Returns the schema registered for `type_name`.
    ///
    /// # Errors
    /// Fails with [`Details::SchemaNotFound`] if there is none.
    fn require(&self, type_name: &str) -> AvroResult<&Schema> {
        self.schema(type_name)
            .ok_or_else(|| Details::SchemaNotFound(type_name.to_string()).into())
    }
}

impl SchemaProvider for HashMap<String, Schema> {
    fn schema(&self, type_name: &str) -> Option<&Schema> {
        self.get(type_name)
    }
}

/// A provider that knows no schemas.
impl SchemaProvider for () {
    fn schema(&self, _type_name: &str) -> Option<&Schema> {
        None
    }
}

/// A [`SchemaProvider`] over a list of named schemas.
///
/// Every named schema, including the records, enums and fixeds nested inside the registered
/// schemas, can be found by its full name, its simple name and its aliases. When two schemas
/// share a simple name only the first one registered is found under it.
#[derive(Debug, Default)]
pub struct NamedSchemas {
    schemas: Vec<Schema>,
    index: HashMap<String, (usize, Vec<usize>)>,
}

impl NamedSchemas {
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Self {
        let mut named = Self::default();
        for schema in schemas {
            named.register(schema);
        }
        named
    }

    /// Adds a schema and every named schema nested inside it.
    pub fn register(&mut self, schema: Schema) {
        let position = self.schemas.len();
        let mut path = Vec::new();
        index_named(&schema, position, &mut path, &mut self.index);
        debug!("Registered schema #{position} ({} names known)", self.index.len());
        self.schemas.push(schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Records where every named schema lives, as the registered schema position followed by the
/// child positions leading to it.
fn index_named(
    schema: &Schema,
    position: usize,
    path: &mut Vec<usize>,
    index: &mut HashMap<String, (usize, Vec<usize>)>,
) {
    if let Some(name) = schema.name() {
        let keys = std::iter::once(name.fullname())
            .chain(std::iter::once(name.name.clone()))
            .chain(schema.aliases().iter().map(|alias| alias.fullname()));
        for key in keys {
            index.entry(key).or_insert_with(|| (position, path.clone()));
        }
    }
    for (i, child) in children(schema).enumerate() {
        path.push(i);
        index_named(child, position, path, index);
        path.pop();
    }
}

fn children(schema: &Schema) -> Box<dyn Iterator<Item = &Schema> + '_> {
    match &schema.ty {
        SchemaType::Record(record) => Box::new(record.fields.iter().map(|f| &f.schema)),
        SchemaType::Array(array) => Box::new(std::iter::once(array.items.as_ref())),
        SchemaType::Map(map) => Box::new(std::iter::once(map.values.as_ref())),
        SchemaType::Union(union) => Box::new(union.variants().iter()),
        _ => Box::new(std::iter::empty()),
    }
}

impl SchemaProvider for NamedSchemas {
    fn schema(&self, type_name: &str) -> Option<&Schema> {
        let (position, path) = self.index.get(type_name)?;
        let mut schema = self.schemas.get(*position)?;
        for &step in path {
            schema = children(schema).nth(step)?;
        }
        Some(schema)
    }
}
