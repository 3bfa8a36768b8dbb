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

// Binary layout, little-endian:
//
//   byte 0      serial version
//   byte 1      family id
//   byte 2      flags
//   byte 3      item size in bytes
//   bytes 4-5   k
//   bytes 6-7   unused (0)
//
// Empty sketches stop after the header. Otherwise:
//
//   bytes 8-15  n
//   byte 16     number of levels
//   bytes 17-19 unused (0)
//   u32 per level: item count
//   min item, max item
//   items, level by level in buffer order

pub const SERIAL_VERSION: u8 = 1;
pub const RANK_FAMILY_ID: u8 = 21;

pub const FLAG_EMPTY: u8 = 1;
pub const FLAG_LEVEL_ZERO_SORTED: u8 = 2;

pub const HEADER_SIZE_BYTES: usize = 8;
pub const DATA_START: usize = 20;
