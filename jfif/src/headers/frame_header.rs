// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::MAX_COMPONENTS;
use crate::bit_reader::BitReader;
use crate::error::{Error, Result};

/// One component entry of a SOF segment.
#[derive(Debug, Clone)]
pub struct FrameComponent {
    pub id: u8,
    /// Horizontal sampling factor, 1..=4.
    pub h: usize,
    /// Vertical sampling factor, 1..=4.
    pub v: usize,
    /// Quantization table index, 0..=15.
    pub qt_index: usize,
}

/// Parsed SOF0/SOF1/SOF2 segment.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub progressive: bool,
    pub precision: u8,
    pub scan_lines: u16,
    pub samples_per_line: u16,
    /// Components in SOF encounter order.
    pub components: Vec<FrameComponent>,
}

impl FrameHeader {
    pub fn parse(payload: &[u8], progressive: bool) -> Result<FrameHeader> {
        let mut br = BitReader::new(payload);
        let precision = br.read_u8()?;
        let scan_lines = br.read_u16()?;
        let samples_per_line = br.read_u16()?;
        if scan_lines == 0 || samples_per_line == 0 {
            return Err(Error::InvalidImageSize(
                samples_per_line as usize,
                scan_lines as usize,
            ));
        }
        let count = br.read_u8()? as usize;
        if count == 0 || count > MAX_COMPONENTS {
            return Err(Error::InvalidComponentCount(count));
        }
        let mut components = Vec::with_capacity(count);
        for _ in 0..count {
            let id = br.read_u8()?;
            let hv = br.read_u8()?;
            let (h, v) = (hv >> 4, hv & 15);
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(Error::InvalidSamplingFactor(hv));
            }
            let qt_index = br.read_u8()? as usize;
            if qt_index > 15 {
                return Err(Error::InvalidQuantIndex(qt_index));
            }
            components.push(FrameComponent {
                id,
                h: h as usize,
                v: v as usize,
                qt_index,
            });
        }
        Ok(FrameHeader {
            progressive,
            precision,
            scan_lines,
            samples_per_line,
            components,
        })
    }
}
