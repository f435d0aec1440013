// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

#![deny(unsafe_code)]
pub mod bit_reader;
pub mod dct;
pub mod decode;
pub mod error;
pub mod frame;
pub mod headers;
pub mod huffman;
pub mod render;
pub mod scan;
pub mod util;

const BLOCK_DIM: usize = 8;
const BLOCK_SIZE: usize = BLOCK_DIM * BLOCK_DIM;
const MAX_COMPONENTS: usize = 4;
