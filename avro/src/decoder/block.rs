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

use crate::{
    AvroResult,
    decode::{decode_block_header, decode_len, decode_string, skip_bytes, skip_value},
    error::Details,
    schema::Schema,
};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockKind {
    Array,
    Map,
}

/// The position of a decoder inside an array or a map.
#[derive(Debug)]
pub(super) struct BlockContext<'s> {
    pub(super) kind: BlockKind,
    /// The schema of the array items or of the map values.
    pub(super) item_schema: Option<&'s Schema>,
    /// Items left in the current block, not counting a claimed one.
    pub(super) remaining: u64,
    /// The size of the current block while none of its items was claimed, if the writer
    /// announced it.
    untouched_size: Option<u64>,
    /// The terminating block was read.
    pub(super) ended: bool,
    /// An item was claimed and not consumed yet.
    pub(super) claimed: bool,
    /// The key of the claimed map entry, once read.
    pub(super) key: Option<String>,
}

impl<'s> BlockContext<'s> {
    /// Reads the first block header of an array or a map.
    pub(super) fn open<R: Read>(
        kind: BlockKind,
        item_schema: Option<&'s Schema>,
        reader: &mut R,
    ) -> AvroResult<Self> {
        let header = decode_block_header(reader)?;
        Ok(Self {
            kind,
            item_schema,
            remaining: header.count,
            untouched_size: header.byte_size,
            ended: header.is_end(),
            claimed: false,
            key: None,
        })
    }

    /// Claims the next item, reading the next block header when the current one is exhausted.
    ///
    /// Returns `false` once the terminating block is reached. Claiming again before the item
    /// was consumed returns `true` without moving on.
    pub(super) fn claim<R: Read>(&mut self, reader: &mut R) -> AvroResult<bool> {
        if self.claimed {
            return Ok(true);
        }
        while self.remaining == 0 {
            if self.ended {
                return Ok(false);
            }
            let header = decode_block_header(reader)?;
            if header.is_end() {
                self.ended = true;
                return Ok(false);
            }
            self.remaining = header.count;
            self.untouched_size = header.byte_size;
        }
        self.remaining -= 1;
        self.untouched_size = None;
        self.claimed = true;
        Ok(true)
    }

    /// Marks the claimed item as read.
    pub(super) fn consume(&mut self) {
        self.claimed = false;
        self.key = None;
    }

    /// Claims the next map entry and reads its key.
    pub(super) fn read_key<R: Read>(&mut self, reader: &mut R) -> AvroResult<Option<String>> {
        if let Some(key) = &self.key {
            return Err(Details::FieldValueNotConsumed(key.clone()).into());
        }
        if !self.claim(reader)? {
            return Ok(None);
        }
        let key = decode_string(reader)?;
        self.key = Some(key.clone());
        Ok(Some(key))
    }

    fn skip_item<R: Read>(&self, reader: &mut R, with_key: bool) -> AvroResult<()> {
        let schema = self.item_schema.ok_or(Details::NoSchema)?;
        if with_key {
            let len = decode_len(reader)?;
            skip_bytes(reader, len as u64)?;
        }
        skip_value(schema, reader)
    }

    /// Skips every item that was not read, up to and including the terminating block.
    pub(super) fn drain<R: Read>(&mut self, reader: &mut R) -> AvroResult<()> {
        let with_key = self.kind == BlockKind::Map;
        if self.claimed {
            self.skip_item(reader, with_key && self.key.is_none())?;
            self.consume();
        }
        loop {
            match self.untouched_size.take() {
                Some(size) => skip_bytes(reader, size)?,
                None => {
                    for _ in 0..self.remaining {
                        self.skip_item(reader, with_key)?;
                    }
                }
            }
            self.remaining = 0;
            if self.ended {
                return Ok(());
            }
            let header = decode_block_header(reader)?;
            if header.is_end() {
                self.ended = true;
                return Ok(());
            }
            self.remaining = header.count;
            self.untouched_size = header.byte_size;
        }
    }

    /// Checks that every item was read, consuming the terminating block if needed.
    pub(super) fn close<R: Read>(&mut self, reader: &mut R) -> AvroResult<()> {
        let unread = self.remaining + u64::from(self.claimed);
        if unread > 0 {
            return Err(Details::UnconsumedItems(unread).into());
        }
        if !self.ended {
            let header = decode_block_header(reader)?;
            if !header.is_end() {
                return Err(Details::UnconsumedItems(header.count).into());
            }
            self.ended = true;
        }
        Ok(())
    }
}
