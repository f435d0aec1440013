// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Top-level decoder: marker dispatch and decoded-image state.

use crate::BLOCK_SIZE;
use crate::bit_reader::BitReader;
use crate::error::{Error, Result};
use crate::frame::{DecodeLimits, Frame};
use crate::headers::{
    AdobeHeader, ExifHeader, FrameHeader, JfifHeader, ScanHeader, markers, read_dht, read_dqt,
    read_dri,
};
use crate::huffman::HuffmanTable;
use crate::render::{ColorSpace, ComponentOut, PixelSink, build_component_data, emit_pixels};
use crate::scan::decode_scan;
use crate::util::tracing_wrappers::*;

const QUANT_SLOTS: usize = 16;
const HUFFMAN_SLOTS: usize = 4;

/// A JPEG decoder instance.
///
/// Holds all cross-marker state for one stream: tables, the frame, parsed
/// application headers and, after a successful [`Decoder::decode`], the
/// assembled component planes. A single instance may be reused; each decode
/// starts from a cleared state. Decoding runs to completion synchronously
/// and an instance must not be shared across threads without external
/// serialization.
pub struct Decoder {
    limits: DecodeLimits,
    jfif: Option<JfifHeader>,
    exif: Option<ExifHeader>,
    adobe: Option<AdobeHeader>,
    frame: Option<Frame>,
    quant_tables: [Option<Box<[i32; BLOCK_SIZE]>>; QUANT_SLOTS],
    dc_tables: [Option<HuffmanTable>; HUFFMAN_SLOTS],
    ac_tables: [Option<HuffmanTable>; HUFFMAN_SLOTS],
    restart_interval: usize,
    components_out: Vec<ComponentOut>,
    source_space: ColorSpace,
}

impl Default for Decoder {
    fn default() -> Decoder {
        Decoder::new(DecodeLimits::default())
    }
}

impl Decoder {
    pub fn new(limits: DecodeLimits) -> Decoder {
        Decoder {
            limits,
            jfif: None,
            exif: None,
            adobe: None,
            frame: None,
            quant_tables: array_init::array_init(|_| None),
            dc_tables: array_init::array_init(|_| None),
            ac_tables: array_init::array_init(|_| None),
            restart_interval: 0,
            components_out: Vec::new(),
            source_space: ColorSpace::YCbCr,
        }
    }

    /// Drops all state from a previous decode.
    pub fn clear(&mut self) {
        self.jfif = None;
        self.exif = None;
        self.adobe = None;
        self.frame = None;
        self.quant_tables = array_init::array_init(|_| None);
        self.dc_tables = array_init::array_init(|_| None);
        self.ac_tables = array_init::array_init(|_| None);
        self.restart_interval = 0;
        self.components_out.clear();
        self.source_space = ColorSpace::YCbCr;
    }

    pub fn width(&self) -> usize {
        self.frame
            .as_ref()
            .map_or(0, |f| f.samples_per_line as usize)
    }

    pub fn height(&self) -> usize {
        self.frame.as_ref().map_or(0, |f| f.scan_lines as usize)
    }

    pub fn jfif_header(&self) -> Option<&JfifHeader> {
        self.jfif.as_ref()
    }

    pub fn exif_header(&self) -> Option<&ExifHeader> {
        self.exif.as_ref()
    }

    pub fn adobe_header(&self) -> Option<&AdobeHeader> {
        self.adobe.as_ref()
    }

    /// Color model of the decoded planes.
    pub fn source_color_space(&self) -> ColorSpace {
        self.source_space
    }

    fn segment<'a>(br: &mut BitReader<'a>, marker: u16) -> Result<&'a [u8]> {
        let len = br.read_u16()? as usize;
        if len < 2 {
            return Err(Error::InvalidSegmentLength { marker, len });
        }
        br.take(len - 2)
    }

    /// Decodes a complete JPEG stream.
    ///
    /// On success the component planes are held internally; call
    /// [`Decoder::render`] to emit pixels. Previous state is cleared first,
    /// so instances may be reused across streams.
    pub fn decode(&mut self, data: &[u8]) -> Result<()> {
        self.clear();
        let mut br = BitReader::new(data);

        let b0 = br.read_u8()?;
        let b1 = br.read_u8()?;
        if u16::from_be_bytes([b0, b1]) != markers::SOI {
            return Err(Error::InvalidSignature(b0, b1));
        }

        let mut marker = br.read_u16()?;
        while marker != markers::EOI {
            match marker {
                m if markers::is_app(m) || m == markers::COM => {
                    let payload = Self::segment(&mut br, m)?;
                    match m {
                        markers::APP0 if self.jfif.is_none() => {
                            self.jfif = JfifHeader::parse(payload)?;
                        }
                        markers::APP1 if self.exif.is_none() => {
                            self.exif = ExifHeader::parse(payload);
                        }
                        markers::APP14 if self.adobe.is_none() => {
                            self.adobe = AdobeHeader::parse(payload)?;
                        }
                        _ => {}
                    }
                }
                markers::DQT => {
                    for table in read_dqt(Self::segment(&mut br, marker)?)? {
                        self.quant_tables[table.index] = Some(table.values);
                    }
                }
                markers::DHT => {
                    for spec in read_dht(Self::segment(&mut br, marker)?)? {
                        let table = HuffmanTable::build(&spec.counts, &spec.values)?;
                        if spec.class == 0 {
                            self.dc_tables[spec.slot] = Some(table);
                        } else {
                            self.ac_tables[spec.slot] = Some(table);
                        }
                    }
                }
                markers::DRI => {
                    self.restart_interval = read_dri(Self::segment(&mut br, marker)?)?;
                }
                markers::SOF0 | markers::SOF1 | markers::SOF2 => {
                    if self.frame.is_some() {
                        return Err(Error::MultipleFrames);
                    }
                    let progressive = marker == markers::SOF2;
                    let header = FrameHeader::parse(Self::segment(&mut br, marker)?, progressive)?;
                    info!(
                        "frame: {}x{}, {} components, progressive={}",
                        header.samples_per_line,
                        header.scan_lines,
                        header.components.len(),
                        progressive
                    );
                    self.frame = Some(Frame::new(&header, &self.limits)?);
                }
                markers::SOS => {
                    let header = ScanHeader::parse(Self::segment(&mut br, marker)?)?;
                    let frame = self.frame.as_mut().ok_or(Error::MissingFrame)?;
                    let mut comp_indices = Vec::with_capacity(header.components.len());
                    for sc in &header.components {
                        let ci = frame
                            .components
                            .iter()
                            .position(|c| c.id == sc.selector)
                            .ok_or(Error::UnknownScanComponent(sc.selector))?;
                        frame.components[ci].dc_slot = Some(sc.dc_slot);
                        frame.components[ci].ac_slot = Some(sc.ac_slot);
                        comp_indices.push(ci);
                    }
                    marker = decode_scan(
                        &mut br,
                        frame,
                        &self.dc_tables,
                        &self.ac_tables,
                        &header,
                        &comp_indices,
                        self.restart_interval,
                    )?;
                    continue;
                }
                _ => return Err(Error::InvalidMarker(marker)),
            }
            marker = br.read_u16()?;
        }

        self.finish()
    }

    /// Checks post-EOI invariants and assembles the component planes.
    fn finish(&mut self) -> Result<()> {
        let frame = self.frame.as_ref().ok_or(Error::MissingFrame)?;
        for component in &frame.components {
            let quant = self.quant_tables[component.qt_index]
                .as_deref()
                .ok_or(Error::QuantTableMissing(component.qt_index))?;
            self.components_out.push(build_component_data(
                component,
                quant,
                frame.max_h,
                frame.max_v,
            ));
        }
        self.source_space = match frame.components.len() {
            4 => self
                .adobe
                .as_ref()
                .map_or(ColorSpace::Cmyk, AdobeHeader::color_space),
            _ => ColorSpace::YCbCr,
        };
        Ok(())
    }

    /// Emits the decoded image into `sink` at the requested output size,
    /// resampling with nearest-neighbor as needed.
    pub fn render(&self, sink: &mut dyn PixelSink, width: usize, height: usize) -> Result<()> {
        let frame = self.frame.as_ref().ok_or(Error::NoDecodedImage)?;
        if self.components_out.is_empty() {
            return Err(Error::NoDecodedImage);
        }
        emit_pixels(
            frame,
            &self.components_out,
            self.source_space,
            sink,
            width,
            height,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn segment(marker: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = marker.to_be_bytes().to_vec();
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn gray_sof0() -> Vec<u8> {
        // 8-bit precision, 8x8, one component (id 1, 1x1 sampling, qt 0).
        segment(markers::SOF0, &[8, 0, 8, 0, 8, 1, 1, 0x11, 0])
    }

    #[test]
    fn rejects_missing_soi() {
        let mut dec = Decoder::default();
        let err = dec.decode(&[0x12, 0x34]);
        assert!(matches!(err, Err(Error::InvalidSignature(0x12, 0x34))));
    }

    #[test]
    fn rejects_unknown_top_level_marker() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&0xFFC9u16.to_be_bytes()); // arithmetic coding SOF
        let mut dec = Decoder::default();
        let err = dec.decode(&data);
        assert!(matches!(err, Err(Error::InvalidMarker(0xFFC9))));
    }

    #[test]
    fn rejects_restart_marker_outside_scan() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&gray_sof0());
        data.extend_from_slice(&0xFFD0u16.to_be_bytes());
        let mut dec = Decoder::default();
        let err = dec.decode(&data);
        assert!(matches!(err, Err(Error::InvalidMarker(0xFFD0))));
    }

    #[test]
    fn rejects_second_frame() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&gray_sof0());
        data.extend_from_slice(&gray_sof0());
        let mut dec = Decoder::default();
        let err = dec.decode(&data);
        assert!(matches!(err, Err(Error::MultipleFrames)));
    }

    #[test]
    fn rejects_scan_before_frame() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&segment(markers::SOS, &[1, 1, 0x00, 0, 63, 0]));
        let mut dec = Decoder::default();
        let err = dec.decode(&data);
        assert!(matches!(err, Err(Error::MissingFrame)));
    }

    #[test]
    fn rejects_undersized_segment_length() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&markers::DQT.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        let mut dec = Decoder::default();
        let err = dec.decode(&data);
        assert!(matches!(
            err,
            Err(Error::InvalidSegmentLength {
                marker: markers::DQT,
                len: 1
            })
        ));
    }

    #[test]
    fn missing_quant_table_detected_at_eoi() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&gray_sof0());
        data.extend_from_slice(&markers::EOI.to_be_bytes());
        let mut dec = Decoder::default();
        let err = dec.decode(&data);
        assert!(matches!(err, Err(Error::QuantTableMissing(0))));
    }

    #[test]
    fn unparsed_app_segments_are_skipped() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&segment(markers::APP0 + 5, b"ducky"));
        data.extend_from_slice(&segment(markers::COM, b"a comment"));
        data.extend_from_slice(&gray_sof0());
        data.extend_from_slice(&markers::EOI.to_be_bytes());
        let mut dec = Decoder::default();
        // Fails later on the missing quantization table, which proves the
        // APPn and COM payloads were consumed cleanly.
        let err = dec.decode(&data);
        assert!(matches!(err, Err(Error::QuantTableMissing(0))));
        assert_eq!(dec.width(), 8);
        assert_eq!(dec.height(), 8);
    }

    #[test]
    fn clear_resets_all_state() {
        let mut data = markers::SOI.to_be_bytes().to_vec();
        data.extend_from_slice(&segment(
            markers::APP0,
            &[b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0],
        ));
        data.extend_from_slice(&gray_sof0());
        data.extend_from_slice(&markers::EOI.to_be_bytes());
        let mut dec = Decoder::default();
        let _ = dec.decode(&data);
        assert_eq!(dec.width(), 8);
        assert!(dec.jfif_header().is_some());

        dec.clear();
        assert_eq!(dec.width(), 0);
        assert_eq!(dec.height(), 0);
        assert!(dec.jfif_header().is_none());
        assert!(dec.exif_header().is_none());
        assert!(dec.adobe_header().is_none());
    }

    #[test]
    fn render_without_decode_is_an_error() {
        struct NullSink;
        impl PixelSink for NullSink {
            fn allocate(&mut self, _: usize, _: usize, _: ColorSpace, _: usize) -> ColorSpace {
                ColorSpace::Rgb
            }
            fn store2(&mut self, _: usize, _: usize, _: u8, _: u8) {}
            fn store_rgb(&mut self, _: usize, _: usize, _: u8, _: u8, _: u8) {}
            fn store_ycbcr(&mut self, _: usize, _: usize, _: u8, _: u8, _: u8) {}
        }
        let dec = Decoder::default();
        let err = dec.render(&mut NullSink, 8, 8);
        assert!(matches!(err, Err(Error::NoDecodedImage)));
    }
}
