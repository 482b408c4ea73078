use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::errors::ThemeError;
use crate::icon::filter::ColorFilter;

/// Owned RGBA8 bitmap, straight (not premultiplied) alpha
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Transparent buffer, allocation failures are reported instead of aborting
    pub fn new(width: u32, height: u32) -> Result<PixelBuffer, ThemeError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(ThemeError::OutOfMemory(width, height))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ThemeError::OutOfMemory(width, height))?;
        data.resize(len, 0);

        let image = RgbaImage::from_raw(width, height, data)
            .ok_or(ThemeError::OutOfMemory(width, height))?;
        Ok(PixelBuffer { image })
    }

    /// Decode any image format the `image` crate was built with
    pub fn decode(data: &[u8]) -> Result<PixelBuffer, ThemeError> {
        let image = image::load_from_memory(data)?;
        Ok(PixelBuffer {
            image: image.to_rgba8(),
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, ThemeError> {
        let mut data = Cursor::new(Vec::new());
        self.image.write_to(&mut data, ImageFormat::Png)?;
        Ok(data.into_inner())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes, row major
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.image.as_raw().len()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Returns `false` for coordinates outside the buffer
    pub fn set(&mut self, x: u32, y: u32, rgba: [u8; 4]) -> bool {
        match self.image.get_pixel_mut_checked(x, y) {
            Some(pixel) => {
                *pixel = Rgba(rgba);
                true
            }
            None => false,
        }
    }

    /// Scaled copy, same buffer when the size already matches
    pub fn resize(&self, width: u32, height: u32) -> Result<PixelBuffer, ThemeError> {
        if self.width() == width && self.height() == height {
            return Ok(self.clone());
        }

        let mut target = PixelBuffer::new(width, height)?;
        target.image = imageops::resize(&self.image, width, height, FilterType::Triangle);
        Ok(target)
    }

    /// Draw `src` over this buffer with its top left corner at `(x, y)`
    pub fn draw(&mut self, src: &PixelBuffer, x: i64, y: i64) {
        for sy in 0..src.height() {
            for sx in 0..src.width() {
                let (dx, dy) = (x + sx as i64, y + sy as i64);
                if dx < 0 || dy < 0 {
                    continue;
                }

                let (Some(source), Some(dest)) = (
                    src.get(sx, sy),
                    self.image.get_pixel_mut_checked(dx as u32, dy as u32),
                ) else {
                    continue;
                };
                dest.0 = source_over(source, dest.0);
            }
        }
    }

    /// Multiply the alpha channel by the mask's alpha
    ///
    /// Pixels outside the mask keep their alpha.
    pub fn mask_alpha(&mut self, mask: &PixelBuffer) {
        for (x, y, pixel) in self.image.enumerate_pixels_mut() {
            if let Some([_, _, _, mask_alpha]) = mask.get(x, y) {
                pixel.0[3] = ((pixel.0[3] as u32 * mask_alpha as u32) / 255) as u8;
            }
        }
    }

    pub fn apply_filter(&mut self, filter: &ColorFilter) {
        for pixel in self.image.pixels_mut() {
            pixel.0 = filter.apply(pixel.0);
        }
    }
}

/// Porter-Duff source over on straight alpha
fn source_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    match (src[3], dst[3]) {
        (255, _) | (_, 0) => return src,
        (0, _) => return dst,
        _ => {}
    }

    let src_alpha = src[3] as f32 / 255.0;
    let dst_alpha = dst[3] as f32 / 255.0 * (1.0 - src_alpha);
    let out_alpha = src_alpha + dst_alpha;

    let channel = |i: usize| {
        ((src[i] as f32 * src_alpha + dst[i] as f32 * dst_alpha) / out_alpha)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    [
        channel(0),
        channel(1),
        channel(2),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::solid_png;

    #[test]
    fn checked_access() {
        let mut buffer = PixelBuffer::new(2, 3).unwrap();
        assert_eq!(buffer.byte_len(), 24);
        assert_eq!(buffer.get(1, 2), Some([0, 0, 0, 0]));
        assert_eq!(buffer.get(2, 0), None);

        assert!(buffer.set(1, 1, [1, 2, 3, 4]));
        assert!(!buffer.set(0, 3, [1, 2, 3, 4]));
        assert_eq!(buffer.get(1, 1), Some([1, 2, 3, 4]));
    }

    #[test]
    fn huge_buffer_is_out_of_memory() {
        assert!(matches!(
            PixelBuffer::new(u32::MAX, u32::MAX),
            Err(ThemeError::OutOfMemory(_, _))
        ));
    }

    #[test]
    fn png_roundtrip_and_resize() {
        let buffer = PixelBuffer::decode(&solid_png(4, [10, 20, 30, 255])).unwrap();
        assert_eq!((buffer.width(), buffer.height()), (4, 4));

        let decoded = PixelBuffer::decode(&buffer.encode_png().unwrap()).unwrap();
        assert_eq!(decoded, buffer);

        let scaled = buffer.resize(8, 8).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (8, 8));
        assert_eq!(scaled.get(7, 7), Some([10, 20, 30, 255]));
    }

    #[test]
    fn decode_garbage() {
        assert!(matches!(
            PixelBuffer::decode(b"definitely not a png"),
            Err(ThemeError::ImageError(_))
        ));
    }

    #[test]
    fn blending() {
        assert_eq!(source_over([1, 2, 3, 255], [9, 9, 9, 255]), [1, 2, 3, 255]);
        assert_eq!(source_over([1, 2, 3, 0], [9, 9, 9, 200]), [9, 9, 9, 200]);
        assert_eq!(source_over([200, 0, 0, 128], [0, 0, 0, 0]), [200, 0, 0, 128]);
        assert_eq!(source_over([255, 0, 0, 128], [0, 0, 255, 255]), [128, 0, 127, 255]);
    }

    #[test]
    fn draw_clips() {
        let mut canvas = PixelBuffer::new(2, 2).unwrap();
        let mut dot = PixelBuffer::new(2, 2).unwrap();
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            dot.set(x, y, [255, 255, 255, 255]);
        }

        canvas.draw(&dot, 1, -1);
        assert_eq!(canvas.get(1, 0), Some([255, 255, 255, 255]));
        assert_eq!(canvas.get(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.get(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn mask_cuts_alpha() {
        let mut buffer = PixelBuffer::new(1, 2).unwrap();
        buffer.set(0, 0, [50, 50, 50, 255]);
        buffer.set(0, 1, [50, 50, 50, 200]);

        let mut mask = PixelBuffer::new(1, 2).unwrap();
        mask.set(0, 0, [0, 0, 0, 0]);
        mask.set(0, 1, [0, 0, 0, 128]);

        buffer.mask_alpha(&mask);
        assert_eq!(buffer.get(0, 0), Some([50, 50, 50, 0]));
        assert_eq!(buffer.get(0, 1), Some([50, 50, 50, 100]));
    }
}
