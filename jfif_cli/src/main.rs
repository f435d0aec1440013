// Copyright (c) the jfif-rs Project Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use jfif::decode::Decoder;
use jfif::render::{ColorSpace, PixelSink};
use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;

/// Collects decoded pixels into an interleaved byte buffer for PNG output.
#[derive(Default)]
struct PngSink {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl PixelSink for PngSink {
    fn allocate(
        &mut self,
        width: usize,
        height: usize,
        _source: ColorSpace,
        components: usize,
    ) -> ColorSpace {
        self.width = width;
        self.height = height;
        self.channels = match components {
            1 => 1,
            2 => 2,
            _ => 3,
        };
        self.data = vec![0; width * height * self.channels];
        ColorSpace::Rgb
    }

    fn store2(&mut self, x: usize, y: usize, c0: u8, c1: u8) {
        let i = (y * self.width + x) * 2;
        self.data[i] = c0;
        self.data[i + 1] = c1;
    }

    fn store_rgb(&mut self, x: usize, y: usize, r: u8, g: u8, b: u8) {
        if self.channels == 1 {
            self.data[y * self.width + x] = r;
        } else {
            let i = (y * self.width + x) * 3;
            self.data[i] = r;
            self.data[i + 1] = g;
            self.data[i + 2] = b;
        }
    }

    fn store_ycbcr(&mut self, _x: usize, _y: usize, _y8: u8, _cb: u8, _cr: u8) {
        unreachable!("sink requested RGB");
    }
}

fn save_png(sink: &PngSink, output: &PathBuf) -> Result<()> {
    let file = fs::File::create(output)
        .wrap_err_with(|| format!("cannot create {}", output.display()))?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        sink.width as u32,
        sink.height as u32,
    );
    encoder.set_color(match sink.channels {
        1 => png::ColorType::Grayscale,
        2 => png::ColorType::GrayscaleAlpha,
        _ => png::ColorType::Rgb,
    });
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&sink.data)?;
    Ok(())
}

#[derive(Parser)]
struct Opt {
    /// Input JPEG file
    input: PathBuf,

    /// Output PNG file
    output: PathBuf,

    /// Output width; defaults to the coded width
    #[clap(long)]
    width: Option<usize>,

    /// Output height; defaults to the coded height
    #[clap(long)]
    height: Option<usize>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    #[cfg(feature = "tracing-subscriber")]
    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .init();
    }

    let opt = Opt::parse();
    let data = fs::read(&opt.input)
        .wrap_err_with(|| format!("cannot read {}", opt.input.display()))?;

    let mut decoder = Decoder::default();
    decoder.decode(&data).wrap_err("decoding failed")?;
    println!("Image size: {} x {}", decoder.width(), decoder.height());
    if let Some(jfif) = decoder.jfif_header() {
        println!(
            "JFIF {}.{}, density {}x{}",
            jfif.version_major, jfif.version_minor, jfif.x_density, jfif.y_density
        );
    }
    if decoder.exif_header().is_some() {
        println!("EXIF metadata present");
    }
    if let Some(adobe) = decoder.adobe_header() {
        println!("Adobe transform: {:?}", adobe.transform);
    }

    let width = opt.width.unwrap_or_else(|| decoder.width());
    let height = opt.height.unwrap_or_else(|| decoder.height());
    if width == 0 || height == 0 {
        return Err(eyre!("no image dimensions in stream"));
    }

    let mut sink = PngSink::default();
    decoder.render(&mut sink, width, height)?;
    save_png(&sink, &opt.output)
}
