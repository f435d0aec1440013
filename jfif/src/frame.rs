// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Frame and component model: MCU geometry and coefficient storage.

use crate::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::headers::FrameHeader;
use crate::util::tracing_wrappers::*;

/// Resource limits applied before the eager coefficient allocation.
///
/// The block arrays are sized from the dimensions declared in SOF, before any
/// entropy data is validated, so a hostile stream can request arbitrarily
/// large allocations. These bounds cap that.
#[derive(Clone, Debug)]
pub struct DecodeLimits {
    /// Maximum `width * height` of the decoded image.
    pub max_pixels: u64,
    /// Maximum number of 8x8 blocks allocated for a single component,
    /// including MCU padding.
    pub max_blocks_per_component: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits {
            max_pixels: 1 << 28,
            max_blocks_per_component: 1 << 22,
        }
    }
}

/// One image component with its coefficient storage.
///
/// `blocks` holds `blocks_per_column_mcu * blocks_per_line_mcu` blocks of 64
/// coefficients each, row-major, each block in zigzag order.
#[derive(Debug)]
pub struct Component {
    pub id: u8,
    pub h: usize,
    pub v: usize,
    pub qt_index: usize,
    /// Blocks covering the actual sample area.
    pub blocks_per_line: usize,
    pub blocks_per_column: usize,
    /// Blocks padded out to whole MCUs.
    pub blocks_per_line_mcu: usize,
    pub blocks_per_column_mcu: usize,
    pub blocks: Vec<i32>,
    /// Running DC predictor; reset at scan start and at each restart interval.
    pub pred: i32,
    /// Huffman table slots assigned by the current scan.
    pub dc_slot: Option<usize>,
    pub ac_slot: Option<usize>,
}

impl Component {
    /// Start offset of one coefficient block in the padded grid.
    pub fn block_start(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.blocks_per_column_mcu || col >= self.blocks_per_line_mcu {
            return Err(Error::BlockOutOfBounds { row, col });
        }
        Ok((row * self.blocks_per_line_mcu + col) * BLOCK_SIZE)
    }

    /// Mutable access to one coefficient block in the padded grid.
    pub fn block_mut(&mut self, row: usize, col: usize) -> Result<&mut [i32]> {
        let start = self.block_start(row, col)?;
        Ok(&mut self.blocks[start..start + BLOCK_SIZE])
    }

    /// Read access to one coefficient block in the padded grid.
    pub fn block(&self, row: usize, col: usize) -> &[i32] {
        let start = (row * self.blocks_per_line_mcu + col) * BLOCK_SIZE;
        &self.blocks[start..start + BLOCK_SIZE]
    }
}

/// The single frame of a JPEG stream.
#[derive(Debug)]
pub struct Frame {
    pub progressive: bool,
    pub precision: u8,
    pub scan_lines: u16,
    pub samples_per_line: u16,
    pub components: Vec<Component>,
    pub max_h: usize,
    pub max_v: usize,
    pub mcus_per_line: usize,
    pub mcus_per_column: usize,
}

impl Frame {
    /// Builds the frame from a parsed SOF header: computes MCU geometry and
    /// eagerly allocates the per-component coefficient blocks, after
    /// checking `limits`.
    pub fn new(header: &FrameHeader, limits: &DecodeLimits) -> Result<Frame> {
        let width = header.samples_per_line as u64;
        let height = header.scan_lines as u64;
        let pixels = width * height;
        if pixels > limits.max_pixels {
            return Err(Error::ImageTooLarge {
                pixels,
                limit: limits.max_pixels,
            });
        }

        let max_h = header.components.iter().map(|c| c.h).max().unwrap_or(1);
        let max_v = header.components.iter().map(|c| c.v).max().unwrap_or(1);
        let samples_per_line = header.samples_per_line as usize;
        let scan_lines = header.scan_lines as usize;
        let mcus_per_line = samples_per_line.div_ceil(8 * max_h);
        let mcus_per_column = scan_lines.div_ceil(8 * max_v);

        let mut components = Vec::with_capacity(header.components.len());
        for c in &header.components {
            let blocks_per_line = (samples_per_line.div_ceil(8) * c.h).div_ceil(max_h);
            let blocks_per_column = (scan_lines.div_ceil(8) * c.v).div_ceil(max_v);
            let blocks_per_line_mcu = mcus_per_line * c.h;
            let blocks_per_column_mcu = mcus_per_column * c.v;
            let total_blocks = blocks_per_line_mcu as u64 * blocks_per_column_mcu as u64;
            if total_blocks > limits.max_blocks_per_component {
                return Err(Error::TooManyBlocks {
                    blocks: total_blocks,
                    limit: limits.max_blocks_per_component,
                });
            }
            components.push(Component {
                id: c.id,
                h: c.h,
                v: c.v,
                qt_index: c.qt_index,
                blocks_per_line,
                blocks_per_column,
                blocks_per_line_mcu,
                blocks_per_column_mcu,
                blocks: vec![0; total_blocks as usize * BLOCK_SIZE],
                pred: 0,
                dc_slot: None,
                ac_slot: None,
            });
        }
        debug!(
            "frame {}x{}, {} components, {}x{} MCUs",
            samples_per_line,
            scan_lines,
            components.len(),
            mcus_per_line,
            mcus_per_column
        );

        Ok(Frame {
            progressive: header.progressive,
            precision: header.precision,
            scan_lines: header.scan_lines,
            samples_per_line: header.samples_per_line,
            components,
            max_h,
            max_v,
            mcus_per_line,
            mcus_per_column,
        })
    }
}
