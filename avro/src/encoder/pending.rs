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

//! Buffered writes of a structure that is still being encoded.

use crate::{
    AvroResult, Config,
    encode::{encode_block_count, encode_block_end, encode_str},
    error::Details,
    schema::{Schema, SchemaKind, SchemaType},
};
use std::{
    collections::{BTreeMap, HashSet},
    fmt, mem,
    io::Write,
};

/// A write that replays one encoded value.
pub(super) type Deferred<'s> = Box<dyn FnOnce(&mut dyn Write) -> AvroResult<usize> + 's>;

pub(super) fn deferred<'s, F>(f: F) -> Deferred<'s>
where
    F: FnOnce(&mut dyn Write) -> AvroResult<usize> + 's,
{
    Box::new(f)
}

enum Action<'s> {
    Deferred(Deferred<'s>),
    /// Reserved for a child structure that has not finished yet.
    Open,
}

/// One buffered value together with the kind of data it emits.
pub(super) struct PendingWrite<'s> {
    pub(super) kind: SchemaKind,
    action: Action<'s>,
}

impl<'s> PendingWrite<'s> {
    pub(super) fn new(kind: SchemaKind, write: Deferred<'s>) -> Self {
        Self {
            kind,
            action: Action::Deferred(write),
        }
    }

    pub(super) fn open(kind: SchemaKind) -> Self {
        Self {
            kind,
            action: Action::Open,
        }
    }

    pub(super) fn is_open(&self) -> bool {
        matches!(self.action, Action::Open)
    }

    pub(super) fn run(self, writer: &mut dyn Write) -> AvroResult<usize> {
        match self.action {
            Action::Deferred(write) => write(writer),
            Action::Open => Err(Details::UnfinishedStructure(self.kind.to_string()).into()),
        }
    }
}

impl fmt::Debug for PendingWrite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWrite")
            .field("kind", &self.kind)
            .field("open", &self.is_open())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    Record,
    Array,
    Map,
}

impl Mode {
    pub(super) fn kind(self) -> SchemaKind {
        match self {
            Mode::Record => SchemaKind::Record,
            Mode::Array => SchemaKind::Array,
            Mode::Map => SchemaKind::Map,
        }
    }
}

/// Where a child structure puts its content once finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Slot {
    Field(String),
    Item(usize),
    Entry(usize),
}

/// The buffered state of one record, array or map.
#[derive(Debug)]
pub(super) struct Frame<'s> {
    pub(super) mode: Mode,
    /// The schema of the structure itself. For a root this is the schema it was created with.
    pub(super) schema: Option<&'s Schema>,
    pub(super) key: Option<String>,
    fields: BTreeMap<String, PendingWrite<'s>>,
    items: Vec<PendingWrite<'s>>,
    entries: Vec<(String, PendingWrite<'s>)>,
    entry_keys: HashSet<String>,
    pub(super) poisoned: bool,
    /// Set once a root wrote an unkeyed value straight to its writer.
    pub(super) wrote_through: bool,
    /// The kind of an unkeyed child of a root that has not finished yet.
    pub(super) open_through: Option<SchemaKind>,
}

impl<'s> Frame<'s> {
    pub(super) fn new(mode: Mode, schema: Option<&'s Schema>) -> Self {
        Self {
            mode,
            schema,
            key: None,
            fields: BTreeMap::new(),
            items: Vec::new(),
            entries: Vec::new(),
            entry_keys: HashSet::new(),
            poisoned: false,
            wrote_through: false,
            open_through: None,
        }
    }

    /// Whether the next value has no key to be stored under.
    pub(super) fn is_unkeyed(&self) -> bool {
        self.mode == Mode::Record && self.key.is_none()
    }

    pub(super) fn set_key(&mut self, name: &str) -> AvroResult<()> {
        if let Some(pending) = &self.key {
            return Err(Details::KeyWithoutValue(pending.clone()).into());
        }
        let key = match self.mode {
            Mode::Array => return Err(Details::KeyInArray.into()),
            Mode::Map => {
                if !self.entry_keys.insert(name.to_string()) {
                    return Err(Details::FieldNameDuplicate(name.to_string()).into());
                }
                name.to_string()
            }
            Mode::Record => {
                let key = match self.schema {
                    Some(schema) => match &schema.ty {
                        SchemaType::Record(record) => record
                            .field(name)
                            .map(|(_, field)| field.name.clone())
                            .ok_or_else(|| Details::UnknownField(name.to_string()))?,
                        _ => {
                            return Err(Details::SchemaMismatch {
                                operation: "encode_key",
                                expected: schema.kind(),
                            }
                            .into());
                        }
                    },
                    None => name.to_string(),
                };
                if self.fields.contains_key(&key) {
                    return Err(Details::FieldNameDuplicate(key).into());
                }
                key
            }
        };
        self.key = Some(key);
        Ok(())
    }

    /// Buffers a write at the current position and returns the slot it went into.
    pub(super) fn store(&mut self, write: PendingWrite<'s>) -> AvroResult<Slot> {
        match self.mode {
            Mode::Record => {
                let key = self.key.take().ok_or(Details::ValueWithoutKey)?;
                self.fields.insert(key.clone(), write);
                Ok(Slot::Field(key))
            }
            Mode::Array => {
                self.items.push(write);
                Ok(Slot::Item(self.items.len() - 1))
            }
            Mode::Map => {
                let key = self.key.take().ok_or(Details::ValueWithoutKey)?;
                self.entries.push((key, write));
                Ok(Slot::Entry(self.entries.len() - 1))
            }
        }
    }

    /// Replaces the open marker of `slot` with the finished content of a child.
    pub(super) fn fill(&mut self, slot: &Slot, write: PendingWrite<'s>) {
        let target = match slot {
            Slot::Field(name) => self.fields.get_mut(name),
            Slot::Item(index) => self.items.get_mut(*index),
            Slot::Entry(index) => self.entries.get_mut(*index).map(|(_, w)| w),
        };
        if let Some(target) = target {
            *target = write;
        }
    }

    fn first_open(&self) -> Option<String> {
        if let Some((name, _)) = self.fields.iter().find(|(_, w)| w.is_open()) {
            return Some(name.clone());
        }
        if let Some(index) = self.items.iter().position(PendingWrite::is_open) {
            return Some(format!("item {index}"));
        }
        self.entries
            .iter()
            .find(|(_, w)| w.is_open())
            .map(|(key, _)| key.clone())
    }

    /// Takes every buffered write and returns a single write that emits the whole structure.
    ///
    /// Nothing is emitted if this fails.
    pub(super) fn take_content(&mut self, config: &Config) -> AvroResult<Deferred<'s>> {
        if let Some(key) = self.key.take() {
            return Err(Details::KeyWithoutValue(key).into());
        }
        if let Some(open) = self.first_open() {
            return Err(Details::UnfinishedStructure(open).into());
        }
        if let Some(kind) = self.open_through.take() {
            return Err(Details::UnfinishedStructure(kind.to_string()).into());
        }
        let block_size = config.block_size.filter(|size| *size > 0);
        Ok(match self.mode {
            Mode::Record => {
                let writes = self.ordered_fields()?;
                deferred(move |writer| {
                    writes
                        .into_iter()
                        .try_fold(0, |written, write| Ok(written + write.run(&mut *writer)?))
                })
            }
            Mode::Array => {
                let items = mem::take(&mut self.items);
                deferred(move |writer| {
                    write_blocks(items, block_size, writer, |item, writer| item.run(writer))
                })
            }
            Mode::Map => {
                let entries = mem::take(&mut self.entries);
                deferred(move |writer| {
                    write_blocks(entries, block_size, writer, |(key, value), writer| {
                        Ok(encode_str(&key, &mut *writer)? + value.run(writer)?)
                    })
                })
            }
        })
    }

    /// The buffered fields in schema order, or sorted by name when there is no record schema.
    fn ordered_fields(&mut self) -> AvroResult<Vec<PendingWrite<'s>>> {
        let record = self.schema.and_then(Schema::as_record);
        match record {
            Some(_) if self.wrote_through && self.fields.is_empty() => Ok(Vec::new()),
            Some(record) => {
                let mut ordered = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let write = self
                        .fields
                        .remove(&field.name)
                        .ok_or_else(|| Details::MissingField(field.name.clone()))?;
                    ordered.push(write);
                }
                Ok(ordered)
            }
            None => Ok(mem::take(&mut self.fields).into_values().collect()),
        }
    }
}

/// Writes `items` as blocks of at most `block_size` items followed by the terminating block.
fn write_blocks<T>(
    items: Vec<T>,
    block_size: Option<usize>,
    writer: &mut dyn Write,
    mut write_item: impl FnMut(T, &mut dyn Write) -> AvroResult<usize>,
) -> AvroResult<usize> {
    let mut remaining = items.len();
    let block = block_size.unwrap_or(remaining).max(1);
    let mut items = items.into_iter();
    let mut written = 0;
    while remaining > 0 {
        let count = remaining.min(block);
        written += encode_block_count(count, &mut *writer)?;
        for item in items.by_ref().take(count) {
            written += write_item(item, &mut *writer)?;
        }
        remaining -= count;
    }
    written += encode_block_end(writer)?;
    Ok(written)
}
