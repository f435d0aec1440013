// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Parsers for the payloads of JPEG marker segments.

pub mod app;
pub mod frame_header;
pub mod scan_header;
pub mod tables;

pub use app::{AdobeHeader, AdobeTransform, ExifHeader, JfifHeader};
pub use frame_header::{FrameComponent, FrameHeader};
pub use scan_header::{ScanComponent, ScanHeader};
pub use tables::{HuffmanSpec, QuantTable, read_dht, read_dqt, read_dri};

/// JPEG marker values. The high byte is always 0xFF.
pub mod markers {
    pub const SOI: u16 = 0xFFD8;
    pub const EOI: u16 = 0xFFD9;
    pub const SOS: u16 = 0xFFDA;
    pub const DQT: u16 = 0xFFDB;
    pub const DRI: u16 = 0xFFDD;
    pub const DHT: u16 = 0xFFC4;
    /// Baseline DCT frame.
    pub const SOF0: u16 = 0xFFC0;
    /// Extended sequential DCT frame; decoded like baseline.
    pub const SOF1: u16 = 0xFFC1;
    /// Progressive DCT frame.
    pub const SOF2: u16 = 0xFFC2;
    pub const APP0: u16 = 0xFFE0;
    pub const APP1: u16 = 0xFFE1;
    pub const APP14: u16 = 0xFFEE;
    pub const APP15: u16 = 0xFFEF;
    pub const COM: u16 = 0xFFFE;
    pub const RST0: u16 = 0xFFD0;
    pub const RST7: u16 = 0xFFD7;

    pub fn is_restart(marker: u16) -> bool {
        (RST0..=RST7).contains(&marker)
    }

    pub fn is_app(marker: u16) -> bool {
        (APP0..=APP15).contains(&marker)
    }
}
