//! Pixel reduction codec
//!
//! Turns a truecolor screenshot into the packed 1- or 2-bit grayscale raster
//! TRMNL firmware expects. The luma weights, the rotation formulas and the
//! MSB-first packing order are a compatibility contract with the device
//! firmware: changing any of them is a format break, not a bug fix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{CodecError, CodecResult};

pub mod container;

/// Luma weights applied to (r, g, b). Not the ITU coefficients.
const LUMA_WEIGHTS: [f64; 3] = [0.229, 0.587, 0.114];

/// Output bit depth of a packed raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    One,
    Two,
}

impl BitDepth {
    pub fn bits(self) -> u8 {
        match self {
            BitDepth::One => 1,
            BitDepth::Two => 2,
        }
    }

    /// Number of distinct gray levels
    pub fn levels(self) -> u32 {
        1 << self.bits()
    }

    /// Width of one quantization bucket in 8-bit gray units
    pub fn divisor(self) -> u32 {
        256 / self.levels()
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(BitDepth::One),
            2 => Ok(BitDepth::Two),
            other => Err(format!("unsupported bit depth {other}, expected 1 or 2")),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// Axis-aligned panel rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    /// The rotation that undoes this one
    pub fn inverse(self) -> Self {
        match self {
            Rotation::None => Rotation::None,
            Rotation::Quarter => Rotation::ThreeQuarter,
            Rotation::Half => Rotation::Half,
            Rotation::ThreeQuarter => Rotation::Quarter,
        }
    }

    /// Size the page must be captured at so the panel's natural reading order
    /// comes out right once re-projected into a `width`x`height` output.
    pub fn capture_size(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Rotation::Quarter | Rotation::ThreeQuarter => (height, width),
            Rotation::None | Rotation::Half => (width, height),
        }
    }

    /// Map a capture-space pixel to output space for a `width`x`height` output.
    ///
    /// Edge pixels may land outside the output (e.g. `x == 0` at 90°); the
    /// packer drops those.
    pub fn map(self, x: u32, y: u32, width: u32, height: u32) -> (i64, i64) {
        let (x, y, w, h) = (x as i64, y as i64, width as i64, height as i64);
        match self {
            Rotation::None => (x, y),
            Rotation::Quarter => (y, h - x),
            Rotation::Half => (w - x, h - y),
            Rotation::ThreeQuarter => (w - y, x),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Quarter),
            180 => Ok(Rotation::Half),
            270 => Ok(Rotation::ThreeQuarter),
            other => Err(format!("unsupported rotation {other}, expected 0, 90, 180 or 270")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Raw bitmap as produced by the renderer, pixels row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBitmap {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub bits_per_channel: u8,
    pub data: Vec<u8>,
}

impl RawBitmap {
    /// Build an RGB8 bitmap
    pub fn rgb8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels: 3,
            bits_per_channel: 8,
            data,
        }
    }

    /// An RGB8 bitmap filled with one color
    #[cfg(test)]
    pub(crate) fn solid_rgb8(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width as usize) * (height as usize);
        let data = rgb.iter().copied().cycle().take(pixels * 3).collect();
        Self::rgb8(width, height, data)
    }
}

/// Packed low bit-depth raster.
///
/// Pixel (x, y) lives at bit offset `(y * width + x) * depth`, most significant
/// bits first: the first pixel of a byte occupies its highest bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRaster {
    pub width: u32,
    pub height: u32,
    pub depth: BitDepth,
    pub data: Vec<u8>,
}

impl PackedRaster {
    /// All-zero (black) raster
    pub fn blank(width: u32, height: u32, depth: BitDepth) -> Self {
        let bits = (width as usize) * (height as usize) * depth.bits() as usize;
        Self {
            width,
            height,
            depth,
            data: vec![0; bits.div_ceil(8)],
        }
    }

    fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Read back the level at a flat pixel index
    pub fn level_at(&self, index: usize) -> Option<u8> {
        if index >= self.pixel_count() {
            return None;
        }
        let depth = self.depth.bits() as usize;
        let bit = index * depth;
        let shift = 8 - depth - (bit % 8);
        let mask = (1u8 << depth) - 1;
        Some((self.data[bit / 8] >> shift) & mask)
    }

    /// Read back the level at (x, y)
    pub fn level(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.level_at(y as usize * self.width as usize + x as usize)
    }

    /// OR `level` into the flat pixel index; out-of-range indices are dropped
    fn set_level(&mut self, index: i64, level: u8) {
        if index < 0 || index as usize >= self.pixel_count() {
            return;
        }
        let depth = self.depth.bits() as usize;
        let bit = index as usize * depth;
        let shift = 8 - depth - (bit % 8);
        self.data[bit / 8] |= level << shift;
    }
}

/// Weighted luminance, floored
pub fn luminance(r: u8, g: u8, b: u8) -> u32 {
    let [wr, wg, wb] = LUMA_WEIGHTS;
    (wr * r as f64 + wg * g as f64 + wb * b as f64).floor() as u32
}

/// Map an 8-bit gray value into `depth`-bit levels
pub fn quantize(gray: u32, depth: BitDepth) -> Result<u8, CodecError> {
    let level = gray / depth.divisor();
    if level >= depth.levels() {
        return Err(CodecError::QuantizationRange {
            level,
            gray,
            depth: depth.bits(),
        });
    }
    Ok(level as u8)
}

/// Reduce a captured bitmap into a `width`x`height` packed raster.
///
/// The bitmap must be RGB8 and sized `rotation.capture_size(width, height)`.
pub fn encode(
    bitmap: &RawBitmap,
    width: u32,
    height: u32,
    rotation: Rotation,
    depth: BitDepth,
) -> CodecResult<PackedRaster> {
    if bitmap.channels != 3 || bitmap.bits_per_channel != 8 {
        return Err(CodecError::UnsupportedFormat {
            channels: bitmap.channels,
            bits_per_channel: bitmap.bits_per_channel,
        });
    }

    let (capture_width, capture_height) = rotation.capture_size(width, height);
    let expected_len = (capture_width as usize) * (capture_height as usize) * 3;
    if bitmap.width != capture_width
        || bitmap.height != capture_height
        || bitmap.data.len() != expected_len
    {
        return Err(CodecError::DimensionMismatch {
            expected_width: capture_width,
            expected_height: capture_height,
            actual_width: bitmap.width,
            actual_height: bitmap.height,
            actual_len: bitmap.data.len(),
        });
    }

    let mut raster = PackedRaster::blank(width, height, depth);
    if capture_width == 0 {
        return Ok(raster);
    }

    for (i, px) in bitmap.data.chunks_exact(3).enumerate() {
        let level = quantize(luminance(px[0], px[1], px[2]), depth)?;
        if level == 0 {
            continue;
        }

        let x = (i % capture_width as usize) as u32;
        let y = (i / capture_width as usize) as u32;
        let (dest_x, dest_y) = rotation.map(x, y, width, height);

        raster.set_level(dest_y * width as i64 + dest_x, level);
    }

    Ok(raster)
}
