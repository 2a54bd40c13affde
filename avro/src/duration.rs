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

/// The value of an Avro `duration` logical type: an amount of time made of months, days and
/// milliseconds, each an unsigned 32 bit integer stored little-endian in a `fixed` of size 12.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Duration {
    pub months: u32,
    pub days: u32,
    pub millis: u32,
}

impl Duration {
    /// The size of the `fixed` holding a duration.
    pub const SIZE: usize = 12;

    pub const fn new(months: u32, days: u32, millis: u32) -> Self {
        Self {
            months,
            days,
            millis,
        }
    }
}

impl From<Duration> for [u8; 12] {
    fn from(duration: Duration) -> Self {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&duration.months.to_le_bytes());
        bytes[4..8].copy_from_slice(&duration.days.to_le_bytes());
        bytes[8..12].copy_from_slice(&duration.millis.to_le_bytes());
        bytes
    }
}

impl From<[u8; 12]> for Duration {
    fn from(bytes: [u8; 12]) -> Self {
        let part = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            months: part(0),
            days: part(4),
            millis: part(8),
        }
    }
}
