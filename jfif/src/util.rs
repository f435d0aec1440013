// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

pub mod tracing_wrappers;

/// Clamps `v` to the representable sample range.
#[inline]
pub fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}
