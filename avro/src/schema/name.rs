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

use crate::{AvroResult, Error, error::Details};
use regex_lite::Regex;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

/// Represents names for `record`, `enum` and `fixed` Avro schemas.
///
/// Each of these `Schema`s have a `fullname` composed of two parts:
///   * a name
///   * a namespace
///
/// More information about schema names can be found in the
/// [Avro specification](https://avro.apache.org/docs/++version++/specification/#names)
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

/// Aliases of named schemas and record fields.
pub type Alias = Name;

fn schema_name_regex() -> &'static Regex {
    static SCHEMA_NAME_ONCE: OnceLock<Regex> = OnceLock::new();
    SCHEMA_NAME_ONCE.get_or_init(|| {
        Regex::new(
            // An optional namespace (with optional dots) followed by a name without any dots in it.
            r"^((?P<namespace>([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?)\.)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)$",
        )
        .expect("Regex is valid")
    })
}

fn namespace_regex() -> &'static Regex {
    static NAMESPACE_ONCE: OnceLock<Regex> = OnceLock::new();
    NAMESPACE_ONCE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)?(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("Regex is valid")
    })
}

fn simple_name_regex() -> &'static Regex {
    static SIMPLE_NAME_ONCE: OnceLock<Regex> = OnceLock::new();
    SIMPLE_NAME_ONCE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Regex is valid"))
}

/// Validates a record field name.
pub(crate) fn validate_field_name(name: &str) -> AvroResult<()> {
    if simple_name_regex().is_match(name) {
        Ok(())
    } else {
        Err(Details::FieldName(name.to_string()).into())
    }
}

/// Validates an enum symbol.
pub(crate) fn validate_enum_symbol(symbol: &str) -> AvroResult<()> {
    if simple_name_regex().is_match(symbol) {
        Ok(())
    } else {
        Err(Details::EnumSymbolName(symbol.to_string()).into())
    }
}

impl Name {
    /// Create a new `Name`.
    /// Parses the optional `namespace` from the `name` string.
    pub fn new(name: &str) -> AvroResult<Self> {
        let regex = schema_name_regex();
        let caps = regex
            .captures(name)
            .ok_or_else(|| Details::InvalidSchemaName(name.to_string(), regex.as_str()))?;
        let namespace = caps
            .name("namespace")
            .map(|m| m.as_str().to_string())
            .filter(|ns| !ns.is_empty());
        let name = caps
            .name("name")
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Details::InvalidSchemaName(name.to_string(), regex.as_str()))?;
        Ok(Self { name, namespace })
    }

    /// Create a new `Name` in the given namespace, unless `name` is already qualified.
    pub fn with_namespace(name: &str, namespace: &str) -> AvroResult<Self> {
        let mut parsed = Self::new(name)?;
        if parsed.namespace.is_none() && !namespace.is_empty() {
            let regex = namespace_regex();
            if !regex.is_match(namespace) {
                return Err(Details::InvalidNamespace(namespace.to_string(), regex.as_str()).into());
            }
            parsed.namespace = Some(namespace.to_string());
        }
        Ok(parsed)
    }

    /// Return the `fullname` of this `Name`
    ///
    /// More information about fullnames can be found in the
    /// [Avro specification](https://avro.apache.org/docs/++version++/specification/#names)
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Name {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fullname())
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.fullname())
    }
}
