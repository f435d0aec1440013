// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use std::fmt::Debug;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result, ScanError, ScanResult};

/// Reads bytes, big-endian words and entropy-coded bits from a JPEG stream.
///
/// Outside entropy-coded segments the reader works on whole bytes. Inside
/// them, [`BitReader::read_bit`] consumes bits MSB-first, removes 0xFF
/// byte-stuffing and reports any real marker through
/// [`ScanError::Marker`] instead of returning data.
#[derive(Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_buf: u32,
    bits_in_buf: u8,
}

impl Debug for BitReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BitReader{{ data: [{} bytes], pos: {}, bits_in_buf: {} }}",
            self.data.len(),
            self.pos,
            self.bits_in_buf
        )
    }
}

impl<'a> BitReader<'a> {
    /// Constructs a BitReader over the full stream.
    pub fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            pos: 0,
            bit_buf: 0,
            bits_in_buf: 0,
        }
    }

    /// Current byte position in the stream.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Repositions the reader; buffered bits are discarded.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
        self.align();
    }

    /// Bytes remaining after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Reads one raw byte.
    /// ```
    /// # use jfif::bit_reader::BitReader;
    /// let mut br = BitReader::new(&[0xab, 0xcd]);
    /// assert_eq!(br.read_u8()?, 0xab);
    /// assert_eq!(br.read_u8()?, 0xcd);
    /// assert!(br.read_u8().is_err());
    /// # Ok::<(), jfif::error::Error>(())
    /// ```
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(Error::UnexpectedEndOfStream)?;
        self.pos += 1;
        Ok(b)
    }

    /// Reads a big-endian 16-bit value.
    /// ```
    /// # use jfif::bit_reader::BitReader;
    /// let mut br = BitReader::new(&[0xff, 0xd8]);
    /// assert_eq!(br.read_u16()?, 0xffd8);
    /// # Ok::<(), jfif::error::Error>(())
    /// ```
    pub fn read_u16(&mut self) -> Result<u16> {
        let end = self.pos.checked_add(2).ok_or(Error::UnexpectedEndOfStream)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(Error::UnexpectedEndOfStream)?;
        self.pos = end;
        Ok(BigEndian::read_u16(bytes))
    }

    /// Reads the next big-endian 16-bit value without consuming it.
    pub fn peek_u16(&self) -> Result<u16> {
        let bytes = self
            .data
            .get(self.pos..self.pos + 2)
            .ok_or(Error::UnexpectedEndOfStream)?;
        Ok(BigEndian::read_u16(bytes))
    }

    /// Takes the next `n` bytes as a slice.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(Error::UnexpectedEndOfStream)?;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(Error::UnexpectedEndOfStream)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n)?;
        Ok(())
    }

    /// Discards any buffered bits, re-aligning to the next byte boundary.
    pub fn align(&mut self) {
        self.bit_buf = 0;
        self.bits_in_buf = 0;
    }

    /// Reads one entropy-coded bit, MSB-first.
    ///
    /// A `0xFF 0x00` pair in the stream is byte-stuffing: the zero byte is
    /// dropped and the `0xFF` is data. A `0xFF` followed by anything else is
    /// a marker; both marker bytes are consumed and the 16-bit marker value
    /// is reported as [`ScanError::Marker`].
    pub fn read_bit(&mut self) -> ScanResult<u32> {
        if self.bits_in_buf == 0 {
            let byte = *self
                .data
                .get(self.pos)
                .ok_or(Error::UnexpectedEndOfStream)?;
            self.pos += 1;
            if byte == 0xFF {
                let next = *self
                    .data
                    .get(self.pos)
                    .ok_or(Error::UnexpectedEndOfStream)?;
                self.pos += 1;
                if next != 0x00 {
                    return Err(ScanError::Marker(0xFF00 | next as u16));
                }
            }
            self.bit_buf = byte as u32;
            self.bits_in_buf = 8;
        }
        self.bits_in_buf -= 1;
        Ok((self.bit_buf >> self.bits_in_buf) & 1)
    }

    /// Reads `length` bits as an unsigned magnitude.
    pub fn receive(&mut self, length: u8) -> ScanResult<i32> {
        let mut n = 0i32;
        for _ in 0..length {
            n = (n << 1) | self.read_bit()? as i32;
        }
        Ok(n)
    }

    /// Reads `length` bits and sign-extends them per JPEG F.12: values whose
    /// top bit is clear encode the negative range.
    pub fn receive_and_extend(&mut self, length: u8) -> ScanResult<i32> {
        let n = self.receive(length)?;
        if length > 0 && n < (1 << (length - 1)) {
            Ok(n - (1 << length) + 1)
        } else {
            Ok(n)
        }
    }
}
