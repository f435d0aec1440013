// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Per-scan entropy decoding.
//!
//! Each SOS selects one of five decode routines. Baseline scans carry every
//! coefficient in one pass; progressive scans split them by spectral band
//! (DC vs. AC) and by bit precision (first pass vs. successive
//! approximation refinements). Blocks store coefficients in zigzag order;
//! the de-zigzag happens during dequantization.

use crate::BLOCK_SIZE;
use crate::bit_reader::BitReader;
use crate::error::{Error, Result, ScanError, ScanResult};
use crate::frame::Frame;
use crate::headers::{ScanHeader, markers};
use crate::huffman::HuffmanTable;
use crate::util::tracing_wrappers::*;

/// Decode routine for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Baseline,
    DcFirst,
    DcSuccessive,
    AcFirst,
    AcSuccessive,
}

impl ScanMode {
    /// Routine selection: non-progressive frames are always baseline;
    /// progressive scans split on spectral band and on whether this is the
    /// first pass (`successive_high == 0`) or a refinement.
    pub fn select(progressive: bool, header: &ScanHeader) -> ScanMode {
        if !progressive {
            ScanMode::Baseline
        } else if header.spectral_start == 0 {
            if header.successive_high == 0 {
                ScanMode::DcFirst
            } else {
                ScanMode::DcSuccessive
            }
        } else if header.successive_high == 0 {
            ScanMode::AcFirst
        } else {
            ScanMode::AcSuccessive
        }
    }

    fn needs_dc(self) -> bool {
        matches!(self, ScanMode::Baseline | ScanMode::DcFirst)
    }

    fn needs_ac(self) -> bool {
        matches!(
            self,
            ScanMode::Baseline | ScanMode::AcFirst | ScanMode::AcSuccessive
        )
    }
}

/// Mutable state threaded through every block of one scan.
#[derive(Debug)]
pub struct ScanState {
    pub spectral_start: usize,
    pub spectral_end: usize,
    /// Successive-approximation bit position (the SOS `Al` field).
    pub successive: u8,
    /// Remaining all-zero blocks announced by an AC end-of-band run.
    pub eobrun: i32,
    /// AC refinement automaton state: 0 initial, 1/2 skipping zero items,
    /// 3 placing a pending value, 4 inside an end-of-band run.
    ac_state: u8,
    ac_next_value: i32,
}

impl ScanState {
    pub fn new(header: &ScanHeader) -> ScanState {
        ScanState {
            spectral_start: header.spectral_start,
            spectral_end: header.spectral_end,
            successive: header.successive_low,
            eobrun: 0,
            ac_state: 0,
            ac_next_value: 0,
        }
    }

    fn reset_interval(&mut self) {
        self.eobrun = 0;
        self.ac_state = 0;
    }
}

fn decode_baseline(
    br: &mut BitReader,
    dc: &HuffmanTable,
    ac: &HuffmanTable,
    pred: &mut i32,
    block: &mut [i32],
) -> ScanResult<()> {
    let t = dc.decode(br)?;
    let diff = if t == 0 { 0 } else { br.receive_and_extend(t)? };
    *pred = pred.wrapping_add(diff);
    block[0] = *pred;
    let mut k = 1;
    while k < BLOCK_SIZE {
        let rs = ac.decode(br)?;
        let s = rs & 15;
        let r = (rs >> 4) as usize;
        if s == 0 {
            if r < 15 {
                break;
            }
            k += 16;
            continue;
        }
        k += r;
        if k >= BLOCK_SIZE {
            return Err(Error::InvalidAcEncoding.into());
        }
        block[k] = br.receive_and_extend(s)?;
        k += 1;
    }
    Ok(())
}

fn decode_dc_first(
    br: &mut BitReader,
    dc: &HuffmanTable,
    pred: &mut i32,
    block: &mut [i32],
    state: &ScanState,
) -> ScanResult<()> {
    let t = dc.decode(br)?;
    let diff = if t == 0 {
        0
    } else {
        br.receive_and_extend(t)? << state.successive
    };
    *pred = pred.wrapping_add(diff);
    block[0] = *pred;
    Ok(())
}

fn decode_dc_successive(
    br: &mut BitReader,
    block: &mut [i32],
    state: &ScanState,
) -> ScanResult<()> {
    block[0] |= (br.read_bit()? as i32) << state.successive;
    Ok(())
}

fn decode_ac_first(
    br: &mut BitReader,
    ac: &HuffmanTable,
    block: &mut [i32],
    state: &mut ScanState,
) -> ScanResult<()> {
    if state.eobrun > 0 {
        state.eobrun -= 1;
        return Ok(());
    }
    let mut k = state.spectral_start;
    while k <= state.spectral_end {
        let rs = ac.decode(br)?;
        let s = rs & 15;
        let r = (rs >> 4) as usize;
        if s == 0 {
            if r < 15 {
                // End-of-band run: this block plus `eobrun` following ones
                // have no further coefficients in this band.
                state.eobrun = br.receive(r as u8)? + (1 << r) - 1;
                break;
            }
            k += 16;
            continue;
        }
        k += r;
        if k >= BLOCK_SIZE {
            return Err(Error::InvalidAcEncoding.into());
        }
        block[k] = br.receive_and_extend(s)? << state.successive;
        k += 1;
    }
    Ok(())
}

fn decode_ac_successive(
    br: &mut BitReader,
    ac: &HuffmanTable,
    block: &mut [i32],
    state: &mut ScanState,
) -> ScanResult<()> {
    let mut k = state.spectral_start;
    let mut r = 0i32;
    while k <= state.spectral_end {
        match state.ac_state {
            0 => {
                let rs = ac.decode(br)?;
                let s = rs & 15;
                r = (rs >> 4) as i32;
                if s == 0 {
                    if r < 15 {
                        state.eobrun = br.receive(r as u8)? + (1 << r);
                        state.ac_state = 4;
                    } else {
                        r = 16;
                        state.ac_state = 1;
                    }
                } else {
                    if s != 1 {
                        return Err(Error::InvalidAcEncoding.into());
                    }
                    state.ac_next_value = br.receive_and_extend(s)?;
                    state.ac_state = if r != 0 { 2 } else { 3 };
                }
                continue;
            }
            1 | 2 => {
                if block[k] != 0 {
                    block[k] += (br.read_bit()? as i32) << state.successive;
                } else {
                    r -= 1;
                    if r == 0 {
                        state.ac_state = if state.ac_state == 2 { 3 } else { 0 };
                    }
                }
            }
            3 => {
                if block[k] != 0 {
                    block[k] += (br.read_bit()? as i32) << state.successive;
                } else {
                    block[k] = state.ac_next_value << state.successive;
                    state.ac_state = 0;
                }
            }
            _ => {
                if block[k] != 0 {
                    block[k] += (br.read_bit()? as i32) << state.successive;
                }
            }
        }
        k += 1;
    }
    if state.ac_state == 4 {
        state.eobrun -= 1;
        if state.eobrun == 0 {
            state.ac_state = 0;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_block_at(
    frame: &mut Frame,
    ci: usize,
    row: usize,
    col: usize,
    mode: ScanMode,
    br: &mut BitReader,
    tables: (Option<&HuffmanTable>, Option<&HuffmanTable>),
    state: &mut ScanState,
) -> ScanResult<()> {
    let comp = &mut frame.components[ci];
    let start = comp.block_start(row, col)?;
    let pred = &mut comp.pred;
    let block = &mut comp.blocks[start..start + BLOCK_SIZE];
    let (dc, ac) = tables;
    match mode {
        ScanMode::Baseline => decode_baseline(
            br,
            dc.ok_or(Error::InvalidHuffman)?,
            ac.ok_or(Error::InvalidHuffman)?,
            pred,
            block,
        ),
        ScanMode::DcFirst => {
            decode_dc_first(br, dc.ok_or(Error::InvalidHuffman)?, pred, block, state)
        }
        ScanMode::DcSuccessive => decode_dc_successive(br, block, state),
        ScanMode::AcFirst => {
            decode_ac_first(br, ac.ok_or(Error::InvalidHuffman)?, block, state)
        }
        ScanMode::AcSuccessive => {
            decode_ac_successive(br, ac.ok_or(Error::InvalidHuffman)?, block, state)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_restart_batch(
    br: &mut BitReader,
    frame: &mut Frame,
    tables: &[(Option<&HuffmanTable>, Option<&HuffmanTable>)],
    comp_indices: &[usize],
    mode: ScanMode,
    state: &mut ScanState,
    mcu: &mut usize,
    count: usize,
) -> ScanResult<()> {
    if comp_indices.len() == 1 {
        // Non-interleaved scan: the MCU is a single block, addressed by the
        // component's own (unpadded) block grid.
        let ci = comp_indices[0];
        for _ in 0..count {
            let blocks_per_line = frame.components[ci].blocks_per_line;
            let row = *mcu / blocks_per_line;
            let col = *mcu % blocks_per_line;
            decode_block_at(frame, ci, row, col, mode, br, tables[0], state)?;
            *mcu += 1;
        }
    } else {
        for _ in 0..count {
            let mcu_row = *mcu / frame.mcus_per_line;
            let mcu_col = *mcu % frame.mcus_per_line;
            for (i, &ci) in comp_indices.iter().enumerate() {
                let (h, v) = {
                    let c = &frame.components[ci];
                    (c.h, c.v)
                };
                for j in 0..v {
                    for k in 0..h {
                        let row = mcu_row * v + j;
                        let col = mcu_col * h + k;
                        decode_block_at(frame, ci, row, col, mode, br, tables[i], state)?;
                    }
                }
            }
            *mcu += 1;
        }
    }
    Ok(())
}

/// Decodes one entropy-coded scan and returns the marker that terminated it.
///
/// Restart markers are consumed internally; DC predictors and the end-of-band
/// run reset at each interval. A codec fault inside the entropy data aborts
/// the remaining MCUs of this scan only: the reader is re-aligned and a
/// synthesized EOI is returned, leaving previously decoded blocks intact.
pub fn decode_scan(
    br: &mut BitReader,
    frame: &mut Frame,
    dc_tables: &[Option<HuffmanTable>; 4],
    ac_tables: &[Option<HuffmanTable>; 4],
    header: &ScanHeader,
    comp_indices: &[usize],
    restart_interval: usize,
) -> Result<u16> {
    let mode = ScanMode::select(frame.progressive, header);
    let mut state = ScanState::new(header);

    let mut tables = Vec::with_capacity(comp_indices.len());
    for &ci in comp_indices {
        let comp = &frame.components[ci];
        let dc = comp.dc_slot.and_then(|s| dc_tables[s].as_ref());
        let ac = comp.ac_slot.and_then(|s| ac_tables[s].as_ref());
        if mode.needs_dc() && dc.is_none() {
            return Err(Error::HuffmanTableMissing {
                class: 0,
                slot: comp.dc_slot.unwrap_or(0) as u8,
            });
        }
        if mode.needs_ac() && ac.is_none() {
            return Err(Error::HuffmanTableMissing {
                class: 1,
                slot: comp.ac_slot.unwrap_or(0) as u8,
            });
        }
        tables.push((dc, ac));
    }

    let mcu_expected = if comp_indices.len() == 1 {
        let c = &frame.components[comp_indices[0]];
        c.blocks_per_line * c.blocks_per_column
    } else {
        frame.mcus_per_line * frame.mcus_per_column
    };
    let interval = if restart_interval == 0 {
        mcu_expected
    } else {
        restart_interval
    };
    debug!("scan: mode {:?}, {} MCUs, interval {}", mode, mcu_expected, interval);

    let mut mcu = 0usize;
    while mcu < mcu_expected {
        for &ci in comp_indices {
            frame.components[ci].pred = 0;
        }
        state.reset_interval();

        match decode_restart_batch(
            br,
            frame,
            &tables,
            comp_indices,
            mode,
            &mut state,
            &mut mcu,
            interval,
        ) {
            Ok(()) => {}
            Err(ScanError::Marker(marker)) => return Ok(marker),
            Err(ScanError::Codec(_e)) => {
                warn!("aborting scan after MCU {}: {}", mcu, _e);
                br.align();
                return Ok(markers::EOI);
            }
        }

        br.align();
        let marker = br.read_u16()?;
        if !markers::is_restart(marker) {
            return Ok(marker);
        }
    }
    br.align();
    br.read_u16()
}
