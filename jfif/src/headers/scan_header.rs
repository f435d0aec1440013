// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use crate::MAX_COMPONENTS;
use crate::bit_reader::BitReader;
use crate::error::{Error, Result};

/// One component entry of a SOS segment.
#[derive(Debug, Clone)]
pub struct ScanComponent {
    /// Component id, matched against the SOF component ids.
    pub selector: u8,
    /// DC Huffman table slot, 0..=3.
    pub dc_slot: usize,
    /// AC Huffman table slot, 0..=3.
    pub ac_slot: usize,
}

/// Parsed SOS segment.
#[derive(Debug, Clone)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
    pub spectral_start: usize,
    pub spectral_end: usize,
    pub successive_high: u8,
    pub successive_low: u8,
}

impl ScanHeader {
    pub fn parse(payload: &[u8]) -> Result<ScanHeader> {
        let mut br = BitReader::new(payload);
        let count = br.read_u8()? as usize;
        if count == 0 || count > MAX_COMPONENTS {
            return Err(Error::InvalidComponentCount(count));
        }
        let mut components = Vec::with_capacity(count);
        for _ in 0..count {
            let selector = br.read_u8()?;
            let slots = br.read_u8()?;
            let (dc_slot, ac_slot) = ((slots >> 4) as usize, (slots & 15) as usize);
            if dc_slot > 3 || ac_slot > 3 {
                return Err(Error::InvalidHuffmanSlot {
                    class: slots >> 4,
                    slot: slots & 15,
                });
            }
            components.push(ScanComponent {
                selector,
                dc_slot,
                ac_slot,
            });
        }
        let spectral_start = br.read_u8()? as usize;
        let spectral_end = br.read_u8()? as usize;
        let ah_al = br.read_u8()?;
        if spectral_start > spectral_end || spectral_end > 63 {
            return Err(Error::InvalidSpectralSelection(
                spectral_start as u8,
                spectral_end as u8,
            ));
        }
        Ok(ScanHeader {
            components,
            spectral_start,
            spectral_end,
            successive_high: ah_al >> 4,
            successive_low: ah_al & 15,
        })
    }
}
