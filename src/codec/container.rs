//! Grayscale PNG container for packed rasters

use super::{BitDepth, PackedRaster};
use crate::errors::{CodecError, CodecResult};

/// MIME type of encoded artifacts
pub const CONTENT_TYPE: &str = "image/png";

impl PackedRaster {
    /// Bytes per PNG scanline at this raster's width and depth
    pub fn row_stride(&self) -> usize {
        (self.width as usize * self.depth.bits() as usize).div_ceil(8)
    }

    /// Byte-aligned scanlines.
    ///
    /// The packed buffer is one continuous bit stream, so when a row does not
    /// end on a byte boundary it has to be re-split per row.
    pub fn scanlines(&self) -> Vec<u8> {
        let row_bits = self.width as usize * self.depth.bits() as usize;
        if row_bits % 8 == 0 {
            return self.data.clone();
        }

        let stride = self.row_stride();
        let depth = self.depth.bits() as usize;
        let mut rows = vec![0u8; stride * self.height as usize];
        for y in 0..self.height {
            let row = &mut rows[y as usize * stride..(y as usize + 1) * stride];
            for x in 0..self.width {
                let level = self.level(x, y).unwrap_or(0);
                let bit = x as usize * depth;
                row[bit / 8] |= level << (8 - depth - bit % 8);
            }
        }
        rows
    }

    /// Encode as a single-channel grayscale PNG at the raster's bit depth
    pub fn to_png(&self) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Grayscale);
            encoder.set_depth(match self.depth {
                BitDepth::One => png::BitDepth::One,
                BitDepth::Two => png::BitDepth::Two,
            });

            let mut writer = encoder
                .write_header()
                .map_err(|e| CodecError::Container(e.to_string()))?;
            writer
                .write_image_data(&self.scanlines())
                .map_err(|e| CodecError::Container(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| CodecError::Container(e.to_string()))?;
        }
        Ok(out)
    }
}
