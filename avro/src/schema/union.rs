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

use crate::AvroResult;
use crate::error::Details;
use crate::schema::{Schema, SchemaKind};
use std::collections::BTreeSet;

/// A description of a Union schema
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    /// The schemas that make up this union
    pub(crate) schemas: Vec<Schema>,
}

impl UnionSchema {
    /// Creates a new UnionSchema from a vector of schemas.
    ///
    /// # Errors
    /// Will return an error if `schemas` has duplicate unnamed schemas or if `schemas`
    /// contains a union.
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        let mut seen = BTreeSet::new();
        for schema in &schemas {
            let kind = schema.kind();
            if kind == SchemaKind::Union {
                return Err(Details::GetNestedUnion.into());
            }
            if !schema.is_named() && !seen.insert(kind) {
                return Err(Details::GetUnionDuplicate(kind).into());
            }
        }
        Ok(UnionSchema { schemas })
    }

    /// Returns a slice to all variants of this schema.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns true if the any of the variants of this `UnionSchema` is `Null`.
    pub fn is_nullable(&self) -> bool {
        self.schemas.iter().any(|x| x.kind() == SchemaKind::Null)
    }

    /// Returns the first variant accepted by `predicate`, with its position in the union.
    pub fn find(&self, predicate: impl Fn(&Schema) -> bool) -> Option<(usize, &Schema)> {
        self.schemas.iter().enumerate().find(|(_, s)| predicate(s))
    }

    /// Returns the variant at `index` as read from the wire.
    pub(crate) fn variant(&self, index: i32) -> AvroResult<&Schema> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.schemas.get(i))
            .ok_or_else(|| {
                Details::UnionIndex {
                    index,
                    num_variants: self.schemas.len(),
                }
                .into()
            })
    }
}
