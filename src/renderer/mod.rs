//! Page rendering
//!
//! The renderer is the one external collaborator of the pipeline: given a URL
//! and a viewport it produces a truecolor bitmap. Everything downstream of it
//! is pure.

use async_trait::async_trait;
use image::DynamicImage;
use url::Url;

use crate::codec::RawBitmap;
use crate::errors::RenderResult;

pub mod chrome;

pub use chrome::ChromeRenderer;

/// Captures a page into a raw bitmap at exactly `width`x`height`
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn capture(&self, url: &Url, width: u32, height: u32) -> RenderResult<RawBitmap>;
}

/// Describe a decoded screenshot as a raw bitmap.
///
/// Browsers emit RGBA screenshots even for opaque pages, so a fully opaque
/// RGBA8 image is flattened to RGB8. Every other layout is passed through as-is
/// and left for the codec to reject.
pub fn raw_bitmap_from_image(img: DynamicImage) -> RawBitmap {
    let (width, height) = (img.width(), img.height());
    match img {
        DynamicImage::ImageRgb8(rgb) => RawBitmap::rgb8(width, height, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) if rgba.pixels().all(|p| p[3] == u8::MAX) => {
            let rgb = DynamicImage::ImageRgba8(rgba).into_rgb8();
            RawBitmap::rgb8(width, height, rgb.into_raw())
        }
        other => {
            let color = other.color();
            let channels = color.channel_count();
            RawBitmap {
                width,
                height,
                channels,
                bits_per_channel: (color.bits_per_pixel() / channels as u16) as u8,
                data: other.into_bytes(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_rgb8_passes_through() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(2, 1, image::Rgb([1, 2, 3])));
        let bitmap = raw_bitmap_from_image(img);
        assert_eq!(bitmap, RawBitmap::rgb8(2, 1, vec![1, 2, 3, 1, 2, 3]));
    }

    #[test]
    fn test_opaque_rgba_is_flattened() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(1, 2, Rgba([9, 8, 7, 255])));
        let bitmap = raw_bitmap_from_image(img);
        assert_eq!(bitmap.channels, 3);
        assert_eq!(bitmap.data, vec![9, 8, 7, 9, 8, 7]);
    }

    #[test]
    fn test_translucent_rgba_is_left_for_the_codec() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(1, 1, Rgba([9, 8, 7, 10])));
        let bitmap = raw_bitmap_from_image(img);
        assert_eq!((bitmap.channels, bitmap.bits_per_channel), (4, 8));
    }

    #[test]
    fn test_sixteen_bit_reports_channel_depth() {
        let img = DynamicImage::new_rgb16(1, 1);
        let bitmap = raw_bitmap_from_image(img);
        assert_eq!((bitmap.channels, bitmap.bits_per_channel), (3, 16));
    }
}
