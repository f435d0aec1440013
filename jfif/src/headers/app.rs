// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! APPn application segments: JFIF (APP0), EXIF (APP1), Adobe (APP14).
//!
//! Each parser inspects the payload's identifying prefix and returns `None`
//! when it does not match, so unrelated APPn payloads are skipped untouched.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::bit_reader::BitReader;
use crate::error::Result;
use crate::render::ColorSpace;

/// APP0 "JFIF\0" header.
#[derive(Debug, Clone)]
pub struct JfifHeader {
    pub version_major: u8,
    pub version_minor: u8,
    /// 0 = no units, 1 = dots per inch, 2 = dots per cm.
    pub density_units: u8,
    pub x_density: u16,
    pub y_density: u16,
    pub thumb_width: u8,
    pub thumb_height: u8,
    /// Embedded RGB thumbnail, `3 * thumb_width * thumb_height` bytes.
    pub thumbnail: Vec<u8>,
}

impl JfifHeader {
    pub fn parse(payload: &[u8]) -> Result<Option<JfifHeader>> {
        if !payload.starts_with(b"JFIF\0") {
            return Ok(None);
        }
        let mut br = BitReader::new(&payload[5..]);
        let version_major = br.read_u8()?;
        let version_minor = br.read_u8()?;
        let density_units = br.read_u8()?;
        let x_density = br.read_u16()?;
        let y_density = br.read_u16()?;
        let thumb_width = br.read_u8()?;
        let thumb_height = br.read_u8()?;
        let thumb_len = 3 * thumb_width as usize * thumb_height as usize;
        // Tolerate truncated thumbnails; the image data is unaffected.
        let thumbnail = br.take(thumb_len.min(br.remaining()))?.to_vec();
        Ok(Some(JfifHeader {
            version_major,
            version_minor,
            density_units,
            x_density,
            y_density,
            thumb_width,
            thumb_height,
            thumbnail,
        }))
    }
}

/// APP1 "Exif\0" header. The TIFF structure inside is not interpreted; only
/// presence (and the raw bytes) are recorded.
#[derive(Debug, Clone)]
pub struct ExifHeader {
    pub raw: Vec<u8>,
}

impl ExifHeader {
    pub fn parse(payload: &[u8]) -> Option<ExifHeader> {
        if !payload.starts_with(b"Exif\0") {
            return None;
        }
        Some(ExifHeader {
            raw: payload[5..].to_vec(),
        })
    }
}

/// Color transform declared by an Adobe APP14 segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum AdobeTransform {
    Unknown = 0,
    YCbCr = 1,
    Ycck = 2,
}

/// APP14 "Adobe\0" header.
#[derive(Debug, Clone)]
pub struct AdobeHeader {
    pub version: u8,
    pub flags0: u16,
    pub flags1: u16,
    pub transform: AdobeTransform,
}

impl AdobeHeader {
    pub fn parse(payload: &[u8]) -> Result<Option<AdobeHeader>> {
        if !payload.starts_with(b"Adobe\0") {
            return Ok(None);
        }
        let mut br = BitReader::new(&payload[6..]);
        let version = br.read_u8()?;
        let flags0 = br.read_u16()?;
        let flags1 = br.read_u16()?;
        let transform =
            AdobeTransform::from_u8(br.read_u8()?).unwrap_or(AdobeTransform::Unknown);
        Ok(Some(AdobeHeader {
            version,
            flags0,
            flags1,
            transform,
        }))
    }

    /// Color space of a four-component image under this header. Only the
    /// YCCK transform changes the interpretation; every other code,
    /// including the three-component YCbCr one, means CMYK.
    pub fn color_space(&self) -> ColorSpace {
        match self.transform {
            AdobeTransform::Ycck => ColorSpace::Ycck,
            _ => ColorSpace::Cmyk,
        }
    }
}
