// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,
    #[error("Invalid signature {0:02x}{1:02x}, expected ffd8")]
    InvalidSignature(u8, u8),
    #[error("Unknown marker {0:04x} at top level")]
    InvalidMarker(u16),
    #[error("Invalid length {len} for segment {marker:04x}")]
    InvalidSegmentLength { marker: u16, len: usize },
    #[error("Invalid quantization table precision: {0}")]
    InvalidQuantPrecision(u8),
    #[error("Invalid quantization table index: {0}")]
    InvalidQuantIndex(usize),
    #[error("Quantization table {0} referenced but never defined")]
    QuantTableMissing(usize),
    #[error("Invalid Huffman table slot: class {class}, slot {slot}")]
    InvalidHuffmanSlot { class: u8, slot: u8 },
    #[error("Huffman table (class {class}, slot {slot}) referenced but never defined")]
    HuffmanTableMissing { class: u8, slot: u8 },
    #[error("Invalid Huffman code")]
    InvalidHuffman,
    #[error("Huffman table is over-subscribed")]
    HuffmanTableOverflow,
    #[error("Multiple frames in stream; only one SOF is supported")]
    MultipleFrames,
    #[error("Scan before frame header")]
    MissingFrame,
    #[error("Invalid component count: {0}")]
    InvalidComponentCount(usize),
    #[error("Invalid sampling factor: {0}")]
    InvalidSamplingFactor(u8),
    #[error("Unknown component selector {0} in scan header")]
    UnknownScanComponent(u8),
    #[error("Invalid spectral selection: start {0}, end {1}")]
    InvalidSpectralSelection(u8, u8),
    #[error("Invalid image size: {0}x{1}")]
    InvalidImageSize(usize, usize),
    #[error("Image too large: {pixels} pixels, limit is {limit}")]
    ImageTooLarge { pixels: u64, limit: u64 },
    #[error("Too many blocks for one component: {blocks}, limit is {limit}")]
    TooManyBlocks { blocks: u64, limit: u64 },
    #[error("Block access out of bounds: row {row}, col {col}")]
    BlockOutOfBounds { row: usize, col: usize },
    #[error("Unsupported color space for {0}-component image")]
    UnsupportedColorSpace(usize),
    #[error("Pixel sink must choose RGB or YCbCr, got {0:?}")]
    InvalidSinkColorSpace(crate::render::ColorSpace),
    #[error("No decoded image available")]
    NoDecodedImage,
    #[error("Invalid AC coefficient encoding")]
    InvalidAcEncoding,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Faults surfacing out of the entropy-coded layer.
///
/// A marker inside an entropy-coded segment is structurally expected (restart
/// markers, end of scan) and is kept distinct from genuine codec faults so
/// the scan loop can branch on it.
#[derive(Debug)]
pub enum ScanError {
    /// A 16-bit marker value was encountered mid-stream.
    Marker(u16),
    Codec(Error),
}

impl From<Error> for ScanError {
    fn from(e: Error) -> Self {
        ScanError::Codec(e)
    }
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;
