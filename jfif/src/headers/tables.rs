// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! DQT, DHT and DRI segment payloads.

use crate::BLOCK_SIZE;
use crate::bit_reader::BitReader;
use crate::dct::UNZIGZAG;
use crate::error::{Error, Result};

/// One quantization table from a DQT segment, already de-zigzagged into
/// natural (row-major) order.
#[derive(Debug, Clone)]
pub struct QuantTable {
    /// 0 = 8-bit entries, 1 = 16-bit entries.
    pub precision: u8,
    /// Table slot, 0..=15.
    pub index: usize,
    pub values: Box<[i32; 64]>,
}

/// Parses a DQT payload, which may carry several tables back to back.
pub fn read_dqt(payload: &[u8]) -> Result<Vec<QuantTable>> {
    let mut br = BitReader::new(payload);
    let mut tables = Vec::new();
    while br.remaining() > 0 {
        let spec = br.read_u8()?;
        let precision = spec >> 4;
        let index = (spec & 15) as usize;
        if precision > 1 {
            return Err(Error::InvalidQuantPrecision(precision));
        }
        let mut values = Box::new([0i32; BLOCK_SIZE]);
        for k in 0..BLOCK_SIZE {
            let v = if precision == 0 {
                br.read_u8()? as i32
            } else {
                br.read_u16()? as i32
            };
            values[UNZIGZAG[k]] = v;
        }
        tables.push(QuantTable {
            precision,
            index,
            values,
        });
    }
    Ok(tables)
}

/// One Huffman table definition from a DHT segment.
#[derive(Debug, Clone)]
pub struct HuffmanSpec {
    /// 0 = DC, 1 = AC.
    pub class: u8,
    /// Table slot, 0..=3.
    pub slot: usize,
    pub counts: [u8; 16],
    pub values: Vec<u8>,
}

/// Parses a DHT payload, which may carry several table definitions.
pub fn read_dht(payload: &[u8]) -> Result<Vec<HuffmanSpec>> {
    let mut br = BitReader::new(payload);
    let mut specs = Vec::new();
    while br.remaining() > 0 {
        let spec = br.read_u8()?;
        let class = spec >> 4;
        let slot = (spec & 15) as usize;
        if class > 1 || slot > 3 {
            return Err(Error::InvalidHuffmanSlot {
                class,
                slot: slot as u8,
            });
        }
        let mut counts = [0u8; 16];
        let mut total = 0usize;
        for (i, c) in br.take(16)?.iter().enumerate() {
            counts[i] = *c;
            total += *c as usize;
        }
        let values = br.take(total)?.to_vec();
        specs.push(HuffmanSpec {
            class,
            slot,
            counts,
            values,
        });
    }
    Ok(specs)
}

/// Parses a DRI payload: the restart interval in MCUs.
pub fn read_dri(payload: &[u8]) -> Result<usize> {
    let mut br = BitReader::new(payload);
    Ok(br.read_u16()? as usize)
}
