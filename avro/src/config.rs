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

use bon::Builder;

/// The default maximum nesting depth of a decoder.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Tunables shared by [`AvroEncoder`](crate::AvroEncoder) and [`AvroDecoder`](crate::AvroDecoder).
///
/// ```
/// # use avro_serde::Config;
/// let config = Config::builder().block_size(100).build();
/// assert_eq!(config.block_size, Some(100));
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct Config {
    /// Split arrays and maps into blocks of at most this many items.
    ///
    /// When `None` every array or map is written as a single block.
    pub block_size: Option<usize>,
    /// How deep arrays, maps and records may nest while decoding.
    #[builder(default = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}
