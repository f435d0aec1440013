// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Color conversion and pixel output.
//!
//! After all scans complete, each component's coefficient blocks are run
//! through dequantization and the inverse DCT into rows of spatial samples.
//! [`emit_pixels`] then walks the requested output grid with
//! nearest-neighbor sampling and hands rows of pixels to a [`PixelSink`].

use crate::error::{Error, Result};
use crate::frame::{Component, Frame};
use crate::{BLOCK_DIM, BLOCK_SIZE, dct};
use crate::util::clamp_u8;
use crate::util::tracing_wrappers::*;

/// Color interpretation of the decoded component planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    YCbCr,
    Cmyk,
    Ycck,
}

/// Receiver for decoded pixels.
///
/// `allocate` is called once with the output geometry and the color model
/// of the decoded planes, and returns the color space the sink wants to
/// receive. Only [`ColorSpace::Rgb`] and [`ColorSpace::YCbCr`] are valid
/// choices. The store methods are then called once per output pixel in
/// row-major order, `y` outer and `x` inner.
pub trait PixelSink {
    fn allocate(
        &mut self,
        width: usize,
        height: usize,
        source_space: ColorSpace,
        components: usize,
    ) -> ColorSpace;
    /// Two-component images are passed through unconverted.
    fn store2(&mut self, x: usize, y: usize, c0: u8, c1: u8);
    fn store_rgb(&mut self, x: usize, y: usize, r: u8, g: u8, b: u8);
    fn store_ycbcr(&mut self, x: usize, y: usize, yy: u8, cb: u8, cr: u8);
}

/// One decoded component plane, as spatial sample rows.
#[derive(Debug)]
pub struct ComponentOut {
    lines: Vec<Vec<u8>>,
    /// Sampling factor of this component relative to the densest one.
    pub scale_x: f32,
    pub scale_y: f32,
}

impl ComponentOut {
    /// Sample row `y`, clamped to the decoded area.
    fn line(&self, y: usize) -> &[u8] {
        let y = y.min(self.lines.len() - 1);
        &self.lines[y]
    }

    fn sample(&self, x: usize, y: usize) -> u8 {
        let line = self.line(y);
        line[x.min(line.len() - 1)]
    }
}

/// Runs dequantization and the inverse DCT over every block of one
/// component and collects the spatial samples as full-width rows.
pub fn build_component_data(
    component: &Component,
    quant: &[i32; BLOCK_SIZE],
    max_h: usize,
    max_v: usize,
) -> ComponentOut {
    let width = component.blocks_per_line * BLOCK_DIM;
    let height = component.blocks_per_column * BLOCK_DIM;
    let mut lines = vec![vec![0u8; width]; height];

    let mut pixels = [0u8; BLOCK_SIZE];
    for block_row in 0..component.blocks_per_column {
        for block_col in 0..component.blocks_per_line {
            let coeffs = component.block(block_row, block_col);
            dct::dequantize_and_idct(coeffs, quant, &mut pixels);
            let x0 = block_col * BLOCK_DIM;
            for iy in 0..BLOCK_DIM {
                let row = &mut lines[block_row * BLOCK_DIM + iy];
                row[x0..x0 + BLOCK_DIM]
                    .copy_from_slice(&pixels[iy * BLOCK_DIM..(iy + 1) * BLOCK_DIM]);
            }
        }
    }

    ComponentOut {
        lines,
        scale_x: component.h as f32 / max_h as f32,
        scale_y: component.v as f32 / max_v as f32,
    }
}

fn ycbcr_to_rgb(yy: u8, cb: u8, cr: u8) -> (u8, u8, u8) {
    let yy = yy as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    let r = yy + 1.402 * cr;
    let g = yy - 0.344136 * cb - 0.714136 * cr;
    let b = yy + 1.772 * cb;
    (clamp_u8(r as i32), clamp_u8(g as i32), clamp_u8(b as i32))
}

// Adobe four-component JPEGs store inverted ink values, so the product
// against K directly yields the additive channel.
fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> (u8, u8, u8) {
    let k = k as i32;
    (
        clamp_u8(c as i32 * k / 255),
        clamp_u8(m as i32 * k / 255),
        clamp_u8(y as i32 * k / 255),
    )
}

/// Walks the `width` by `height` output grid and emits every pixel into
/// `sink`, converting from the source color model as needed.
///
/// `source_space` is the interpretation of the decoded planes (from the
/// frame's component count and the Adobe APP14 transform). One- and
/// three-component images may be emitted either as-is or converted to RGB
/// depending on what the sink allocated; four-component CMYK and YCCK
/// always convert to RGB.
pub fn emit_pixels(
    frame: &Frame,
    components: &[ComponentOut],
    source_space: ColorSpace,
    sink: &mut dyn PixelSink,
    width: usize,
    height: usize,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidImageSize(width, height));
    }
    let scale_x = frame.samples_per_line as f32 / width as f32;
    let scale_y = frame.scan_lines as f32 / height as f32;

    // Per-component mapping from output coordinates to decoded samples.
    let coord = |c: &ComponentOut, x: usize, y: usize| -> (usize, usize) {
        (
            (x as f32 * scale_x * c.scale_x) as usize,
            (y as f32 * scale_y * c.scale_y) as usize,
        )
    };

    debug!(
        "render: {} components as {:?}, {}x{}",
        components.len(),
        source_space,
        width,
        height
    );

    let chosen = sink.allocate(width, height, source_space, components.len());
    if !matches!(chosen, ColorSpace::Rgb | ColorSpace::YCbCr) {
        return Err(Error::InvalidSinkColorSpace(chosen));
    }

    match components {
        [gray] => {
            for y in 0..height {
                for x in 0..width {
                    let (sx, sy) = coord(gray, x, y);
                    let g = gray.sample(sx, sy);
                    match chosen {
                        ColorSpace::YCbCr => sink.store_ycbcr(x, y, g, 0, 0),
                        _ => sink.store_rgb(x, y, g, g, g),
                    }
                }
            }
        }
        [c0, c1] => {
            for y in 0..height {
                for x in 0..width {
                    let (x0, y0) = coord(c0, x, y);
                    let (x1, y1) = coord(c1, x, y);
                    sink.store2(x, y, c0.sample(x0, y0), c1.sample(x1, y1));
                }
            }
        }
        [c0, c1, c2] => {
            if source_space != ColorSpace::YCbCr {
                return Err(Error::UnsupportedColorSpace(3));
            }
            for y in 0..height {
                for x in 0..width {
                    let (x0, y0) = coord(c0, x, y);
                    let (x1, y1) = coord(c1, x, y);
                    let (x2, y2) = coord(c2, x, y);
                    let yy = c0.sample(x0, y0);
                    let cb = c1.sample(x1, y1);
                    let cr = c2.sample(x2, y2);
                    match chosen {
                        ColorSpace::YCbCr => sink.store_ycbcr(x, y, yy, cb, cr),
                        _ => {
                            let (r, g, b) = ycbcr_to_rgb(yy, cb, cr);
                            sink.store_rgb(x, y, r, g, b);
                        }
                    }
                }
            }
        }
        [c0, c1, c2, c3] => {
            if !matches!(source_space, ColorSpace::Cmyk | ColorSpace::Ycck) {
                return Err(Error::UnsupportedColorSpace(4));
            }
            if chosen != ColorSpace::Rgb {
                return Err(Error::InvalidSinkColorSpace(chosen));
            }
            for y in 0..height {
                for x in 0..width {
                    let (x0, y0) = coord(c0, x, y);
                    let (x1, y1) = coord(c1, x, y);
                    let (x2, y2) = coord(c2, x, y);
                    let (x3, y3) = coord(c3, x, y);
                    let s0 = c0.sample(x0, y0);
                    let s1 = c1.sample(x1, y1);
                    let s2 = c2.sample(x2, y2);
                    let s3 = c3.sample(x3, y3);
                    let (c, m, yv) = if source_space == ColorSpace::Ycck {
                        // YCCK carries YCbCr in the first three channels.
                        let (r, g, b) = ycbcr_to_rgb(s0, s1, s2);
                        (255 - r, 255 - g, 255 - b)
                    } else {
                        (s0, s1, s2)
                    };
                    let (r, g, b) = cmyk_to_rgb(c, m, yv, s3);
                    sink.store_rgb(x, y, r, g, b);
                }
            }
        }
        other => return Err(Error::UnsupportedColorSpace(other.len())),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::{DecodeLimits, Frame};
    use crate::headers::FrameHeader;
    use crate::headers::frame_header::FrameComponent;

    struct CaptureSink {
        choice: ColorSpace,
        width: usize,
        height: usize,
        source: Option<ColorSpace>,
        pixels: Vec<(u8, u8, u8)>,
    }

    impl CaptureSink {
        fn new(choice: ColorSpace) -> CaptureSink {
            CaptureSink {
                choice,
                width: 0,
                height: 0,
                source: None,
                pixels: Vec::new(),
            }
        }
    }

    impl PixelSink for CaptureSink {
        fn allocate(
            &mut self,
            width: usize,
            height: usize,
            source: ColorSpace,
            _n: usize,
        ) -> ColorSpace {
            self.width = width;
            self.height = height;
            self.source = Some(source);
            self.pixels.clear();
            self.choice
        }
        fn store2(&mut self, _x: usize, _y: usize, c0: u8, c1: u8) {
            self.pixels.push((c0, c1, 0));
        }
        fn store_rgb(&mut self, _x: usize, _y: usize, r: u8, g: u8, b: u8) {
            self.pixels.push((r, g, b));
        }
        fn store_ycbcr(&mut self, _x: usize, _y: usize, yy: u8, cb: u8, cr: u8) {
            self.pixels.push((yy, cb, cr));
        }
    }

    fn gray_frame(width: usize, height: usize) -> Frame {
        let header = FrameHeader {
            progressive: false,
            precision: 8,
            scan_lines: height as u16,
            samples_per_line: width as u16,
            components: vec![FrameComponent {
                id: 1,
                h: 1,
                v: 1,
                qt_index: 0,
            }],
        };
        Frame::new(&header, &DecodeLimits::default()).unwrap()
    }

    fn flat_plane(value: u8, width: usize, height: usize) -> ComponentOut {
        ComponentOut {
            lines: vec![vec![value; width]; height],
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    #[test]
    fn ycbcr_conversion_neutral_chroma_is_gray() {
        assert_eq!(ycbcr_to_rgb(100, 128, 128), (100, 100, 100));
    }

    #[test]
    fn ycbcr_conversion_red_chroma() {
        let (r, g, b) = ycbcr_to_rgb(76, 84, 255);
        assert!(r > 200, "r = {r}");
        assert!(g < 60, "g = {g}");
        assert!(b < 60, "b = {b}");
    }

    #[test]
    fn cmyk_values_are_preinverted() {
        assert_eq!(cmyk_to_rgb(0, 0, 0, 0), (0, 0, 0));
        assert_eq!(cmyk_to_rgb(255, 255, 255, 255), (255, 255, 255));
        assert_eq!(cmyk_to_rgb(255, 0, 0, 255), (255, 0, 0));
    }

    #[test]
    fn grayscale_emits_luma_only() {
        let frame = gray_frame(4, 4);
        let comps = vec![flat_plane(200, 8, 8)];
        let mut sink = CaptureSink::new(ColorSpace::YCbCr);
        emit_pixels(&frame, &comps, ColorSpace::YCbCr, &mut sink, 4, 4).unwrap();
        assert_eq!(sink.source, Some(ColorSpace::YCbCr));
        assert_eq!(sink.pixels.len(), 16);
        assert!(sink.pixels.iter().all(|&p| p == (200, 0, 0)));
    }

    #[test]
    fn grayscale_to_rgb_replicates_channels() {
        let frame = gray_frame(2, 2);
        let comps = vec![flat_plane(90, 8, 8)];
        let mut sink = CaptureSink::new(ColorSpace::Rgb);
        emit_pixels(&frame, &comps, ColorSpace::YCbCr, &mut sink, 2, 2).unwrap();
        assert!(sink.pixels.iter().all(|&p| p == (90, 90, 90)));
    }

    #[test]
    fn sink_must_choose_rgb_or_ycbcr() {
        let frame = gray_frame(2, 2);
        let comps = vec![flat_plane(0, 8, 8)];
        let mut sink = CaptureSink::new(ColorSpace::Cmyk);
        let err = emit_pixels(&frame, &comps, ColorSpace::YCbCr, &mut sink, 2, 2);
        assert!(matches!(err, Err(Error::InvalidSinkColorSpace(ColorSpace::Cmyk))));
    }

    #[test]
    fn three_components_convert_to_rgb_on_request() {
        let frame = gray_frame(2, 2);
        let comps = vec![
            flat_plane(100, 8, 8),
            flat_plane(128, 8, 8),
            flat_plane(128, 8, 8),
        ];
        let mut sink = CaptureSink::new(ColorSpace::Rgb);
        emit_pixels(&frame, &comps, ColorSpace::YCbCr, &mut sink, 2, 2).unwrap();
        assert!(sink.pixels.iter().all(|&p| p == (100, 100, 100)));
    }

    #[test]
    fn scaling_down_samples_nearest() {
        let frame = gray_frame(8, 8);
        let mut plane = flat_plane(10, 8, 8);
        // Right half of the source is brighter.
        for row in &mut plane.lines {
            for s in &mut row[4..] {
                *s = 250;
            }
        }
        let mut sink = CaptureSink::new(ColorSpace::YCbCr);
        emit_pixels(&frame, &[plane], ColorSpace::YCbCr, &mut sink, 2, 2).unwrap();
        assert_eq!(sink.pixels[0].0, 10);
        assert_eq!(sink.pixels[1].0, 250);
    }

    #[test]
    fn subsampled_chroma_samples_at_half_rate() {
        // A 1x1 component under max 2x2 sampling carries scale 0.5; at
        // native output resolution pixel (x, y) must read source sample
        // (x / 2, y / 2).
        let frame = gray_frame(16, 16);
        let mut plane = flat_plane(0, 8, 8);
        for (y, row) in plane.lines.iter_mut().enumerate() {
            for (x, s) in row.iter_mut().enumerate() {
                *s = (y * 8 + x) as u8;
            }
        }
        plane.scale_x = 0.5;
        plane.scale_y = 0.5;
        let mut sink = CaptureSink::new(ColorSpace::YCbCr);
        emit_pixels(&frame, &[plane], ColorSpace::YCbCr, &mut sink, 16, 16).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                let expected = ((y / 2) * 8 + x / 2) as u8;
                assert_eq!(sink.pixels[y * 16 + x].0, expected, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn zero_output_size_rejected() {
        let frame = gray_frame(8, 8);
        let comps = vec![flat_plane(0, 8, 8)];
        let mut sink = CaptureSink::new(ColorSpace::YCbCr);
        let err = emit_pixels(&frame, &comps, ColorSpace::YCbCr, &mut sink, 0, 4);
        assert!(matches!(err, Err(Error::InvalidImageSize(0, 4))));
    }
}
