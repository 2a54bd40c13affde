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

use std::io::{self, Read};

/// A reader that keeps a copy of every byte read through it.
pub(super) struct TeeReader<'a, R: Read> {
    inner: &'a mut R,
    captured: Vec<u8>,
}

impl<'a, R: Read> TeeReader<'a, R> {
    pub(super) fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            captured: Vec::new(),
        }
    }

    pub(super) fn into_captured(self) -> Vec<u8> {
        self.captured
    }
}

impl<R: Read> Read for TeeReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.captured.extend_from_slice(&buf[..read]);
        Ok(read)
    }
}
