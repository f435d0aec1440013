// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Canonical Huffman decode tables.
//!
//! A DHT segment carries 16 per-length code counts followed by the symbol
//! values in canonical (length-then-lexicographic) order. The decode trie is
//! stored as a flat arena of nodes; children are integer indices, so no
//! per-node heap allocation is needed.

use crate::bit_reader::BitReader;
use crate::error::{Error, Result, ScanResult};

const EMPTY: i32 = -1;

/// Binary decode trie for one DC or AC table slot.
///
/// Each node holds two links, selected by the next bit. A link is either
/// another node index, [`EMPTY`], or an encoded leaf carrying the symbol.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    nodes: Vec<[i32; 2]>,
}

#[inline]
fn leaf(value: u8) -> i32 {
    -(value as i32) - 2
}

impl HuffmanTable {
    /// Builds the decode trie from canonical code-length counts and values.
    ///
    /// `counts[i]` is the number of codes of length `i + 1`; `values` holds
    /// `counts.iter().sum()` symbols. Over-subscribed tables (a code that
    /// would collide with or extend past an assigned shorter code) are
    /// rejected.
    pub fn build(counts: &[u8; 16], values: &[u8]) -> Result<HuffmanTable> {
        let mut nodes = vec![[EMPTY; 2]];
        let mut code = 0u32;
        let mut next_value = 0usize;
        for length in 1..=16u32 {
            for _ in 0..counts[length as usize - 1] {
                if code >> length != 0 {
                    return Err(Error::HuffmanTableOverflow);
                }
                let value = *values.get(next_value).ok_or(Error::InvalidHuffman)?;
                next_value += 1;
                let mut node = 0usize;
                for i in (0..length).rev() {
                    let bit = ((code >> i) & 1) as usize;
                    let link = nodes[node][bit];
                    if i == 0 {
                        if link != EMPTY {
                            return Err(Error::HuffmanTableOverflow);
                        }
                        nodes[node][bit] = leaf(value);
                    } else if link == EMPTY {
                        nodes.push([EMPTY; 2]);
                        let child = (nodes.len() - 1) as i32;
                        nodes[node][bit] = child;
                        node = child as usize;
                    } else if link < EMPTY {
                        // Walking through an already-assigned leaf.
                        return Err(Error::HuffmanTableOverflow);
                    } else {
                        node = link as usize;
                    }
                }
                code += 1;
            }
            code <<= 1;
        }
        Ok(HuffmanTable { nodes })
    }

    /// Decodes one symbol by walking the trie bit by bit.
    pub fn decode(&self, br: &mut BitReader) -> ScanResult<u8> {
        let mut node = 0usize;
        loop {
            let bit = br.read_bit()? as usize;
            let link = self.nodes[node][bit];
            if link == EMPTY {
                return Err(Error::InvalidHuffman.into());
            }
            if link < EMPTY {
                return Ok((-link - 2) as u8);
            }
            node = link as usize;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Canonical (code, length) pairs for a counts array, in value order.
    fn canonical_codes(counts: &[u8; 16]) -> Vec<(u32, u32)> {
        let mut codes = Vec::new();
        let mut code = 0u32;
        for length in 1..=16u32 {
            for _ in 0..counts[length as usize - 1] {
                codes.push((code, length));
                code += 1;
            }
            code <<= 1;
        }
        codes
    }

    /// Packs MSB-first code bits into bytes, padding with 1s.
    fn pack_bits(bits: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut acc = 0u8;
        let mut used = 0u8;
        for &(code, length) in bits {
            for i in (0..length).rev() {
                acc = (acc << 1) | ((code >> i) & 1) as u8;
                used += 1;
                if used == 8 {
                    out.push(acc);
                    acc = 0;
                    used = 0;
                }
            }
        }
        if used > 0 {
            out.push((acc << (8 - used)) | ((1 << (8 - used)) - 1));
        }
        out
    }

    #[test]
    fn round_trip_standard_dc_table() {
        // The standard luminance DC table from JPEG Annex K.
        let counts = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0u8];
        let values: Vec<u8> = (0..12).collect();
        let table = HuffmanTable::build(&counts, &values).unwrap();
        let codes = canonical_codes(&counts);
        assert_eq!(codes.len(), values.len());
        let data = pack_bits(&codes);
        let mut br = BitReader::new(&data);
        for &v in &values {
            assert_eq!(table.decode(&mut br).unwrap(), v);
        }
    }

    #[test]
    fn single_code_table() {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let table = HuffmanTable::build(&counts, &[0x42]).unwrap();
        let mut br = BitReader::new(&[0x00]);
        assert_eq!(table.decode(&mut br).unwrap(), 0x42);
    }

    #[test]
    fn unassigned_path_is_error() {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let table = HuffmanTable::build(&counts, &[7]).unwrap();
        // Code "1" was never assigned.
        let mut br = BitReader::new(&[0xFF, 0x00]);
        assert!(table.decode(&mut br).is_err());
    }

    #[test]
    fn oversubscribed_table_rejected() {
        let mut counts = [0u8; 16];
        counts[0] = 3; // only two codes of length 1 exist
        assert!(HuffmanTable::build(&counts, &[1, 2, 3]).is_err());
    }

    #[test]
    fn missing_values_rejected() {
        let mut counts = [0u8; 16];
        counts[1] = 2;
        assert!(HuffmanTable::build(&counts, &[1]).is_err());
    }
}
