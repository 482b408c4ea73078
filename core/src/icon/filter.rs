//! Color adjustments of themed icons.
//!
//! An icon theme may ship `filters.xml`:
//!
//! ```xml
//! <filters>
//!     <filter name="saturation" value="0.5"/>
//!     <filter name="hue" value="30"/>
//! </filters>
//! ```
//!
//! Every filter is a 4x5 color matrix, the matrices are post-concatenated in
//! document order so the first filter is applied first.

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::errors::ValuesError;
use crate::values::parse_color;

const LUM_R: f32 = 0.213;
const LUM_G: f32 = 0.715;
const LUM_B: f32 = 0.072;

/// Row major 4x5 matrix mapping `[r, g, b, a, 1]` to `[r, g, b, a]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorFilter {
    matrix: [f32; 20],
}

impl Default for ColorFilter {
    fn default() -> Self {
        ColorFilter::identity()
    }
}

impl ColorFilter {
    #[rustfmt::skip]
    pub fn identity() -> ColorFilter {
        ColorFilter {
            matrix: [
                1.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Rotate hue by `degrees`, keeping luminance
    #[rustfmt::skip]
    pub fn hue(degrees: f32) -> ColorFilter {
        let (sin, cos) = degrees.to_radians().sin_cos();
        ColorFilter {
            matrix: [
                LUM_R + cos * (1.0 - LUM_R) - sin * LUM_R,
                LUM_G - cos * LUM_G - sin * LUM_G,
                LUM_B - cos * LUM_B + sin * (1.0 - LUM_B),
                0.0, 0.0,

                LUM_R - cos * LUM_R + sin * 0.143,
                LUM_G + cos * (1.0 - LUM_G) + sin * 0.140,
                LUM_B - cos * LUM_B - sin * 0.283,
                0.0, 0.0,

                LUM_R - cos * LUM_R - sin * (1.0 - LUM_R),
                LUM_G - cos * LUM_G + sin * LUM_G,
                LUM_B + cos * (1.0 - LUM_B) + sin * LUM_B,
                0.0, 0.0,

                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// `0` is grayscale, `1` leaves colors untouched
    #[rustfmt::skip]
    pub fn saturation(factor: f32) -> ColorFilter {
        let inv = 1.0 - factor;
        let (r, g, b) = (LUM_R * inv, LUM_G * inv, LUM_B * inv);
        ColorFilter {
            matrix: [
                r + factor, g, b, 0.0, 0.0,
                r, g + factor, b, 0.0, 0.0,
                r, g, b + factor, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Add `offset` (in 0..255 channel units) to every color channel
    #[rustfmt::skip]
    pub fn brightness(offset: f32) -> ColorFilter {
        ColorFilter {
            matrix: [
                1.0, 0.0, 0.0, 0.0, offset,
                0.0, 1.0, 0.0, 0.0, offset,
                0.0, 0.0, 1.0, 0.0, offset,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Scale colors around mid gray, `1` leaves colors untouched
    #[rustfmt::skip]
    pub fn contrast(factor: f32) -> ColorFilter {
        let shift = 128.0 * (1.0 - factor);
        ColorFilter {
            matrix: [
                factor, 0.0, 0.0, 0.0, shift,
                0.0, factor, 0.0, 0.0, shift,
                0.0, 0.0, factor, 0.0, shift,
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Scale the alpha channel
    #[rustfmt::skip]
    pub fn alpha(factor: f32) -> ColorFilter {
        ColorFilter {
            matrix: [
                1.0, 0.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 0.0, factor, 0.0,
            ],
        }
    }

    /// Blend colors towards an ARGB tint, weighted by the tint's alpha
    #[rustfmt::skip]
    pub fn tint(argb: u32) -> ColorFilter {
        let weight = (argb >> 24) as f32 / 255.0;
        let keep = 1.0 - weight;
        let channel = |shift: u32| ((argb >> shift) & 0xFF) as f32 * weight;
        ColorFilter {
            matrix: [
                keep, 0.0, 0.0, 0.0, channel(16),
                0.0, keep, 0.0, 0.0, channel(8),
                0.0, 0.0, keep, 0.0, channel(0),
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Apply `next` after this filter
    pub fn post_concat(&self, next: &ColorFilter) -> ColorFilter {
        let (a, b) = (&next.matrix, &self.matrix);
        let mut matrix = [0.0f32; 20];

        for row in 0..4 {
            for col in 0..5 {
                let mut value = (0..4).map(|k| a[row * 5 + k] * b[k * 5 + col]).sum::<f32>();
                if col == 4 {
                    value += a[row * 5 + 4];
                }
                matrix[row * 5 + col] = value;
            }
        }

        ColorFilter { matrix }
    }

    pub fn apply(&self, rgba: [u8; 4]) -> [u8; 4] {
        let m = &self.matrix;
        let input = rgba.map(|c| c as f32);
        let mut output = [0u8; 4];

        for (row, out) in output.iter_mut().enumerate() {
            let value = m[row * 5] * input[0]
                + m[row * 5 + 1] * input[1]
                + m[row * 5 + 2] * input[2]
                + m[row * 5 + 3] * input[3]
                + m[row * 5 + 4];
            *out = value.round().clamp(0.0, 255.0) as u8;
        }

        output
    }

    /// Build a filter from a named adjustment
    pub fn named(name: &str, value: &str) -> Option<ColorFilter> {
        if name == "tint" {
            return parse_color(value).map(|argb| Self::tint(argb as u32));
        }

        let value: f32 = value.trim().parse().ok()?;
        Some(match name {
            "hue" => Self::hue(value),
            "saturation" => Self::saturation(value),
            "brightness" => Self::brightness(value),
            "contrast" => Self::contrast(value),
            "alpha" => Self::alpha(value),
            _ => return None,
        })
    }

    /// Read `filters.xml`, unknown or broken filters are skipped
    pub fn parse(data: &[u8]) -> Result<ColorFilter, ValuesError> {
        let mut reader = Reader::from_reader(data);
        let mut filter = ColorFilter::identity();

        loop {
            let event = reader
                .read_event()
                .map_err(|_| ValuesError::Malformed(reader.buffer_position() as u64))?;

            match event {
                Event::Start(element) | Event::Empty(element)
                    if element.local_name().as_ref() == b"filter" =>
                {
                    let (name, value) = filter_attributes(&element)?;
                    match ColorFilter::named(&name, &value) {
                        Some(next) => filter = filter.post_concat(&next),
                        None => warn!("skipping filter {:?} = {:?}", name, value),
                    }
                }
                Event::Eof => return Ok(filter),
                _ => {}
            }
        }
    }
}

fn filter_attributes(element: &BytesStart<'_>) -> Result<(String, String), ValuesError> {
    let mut name = String::new();
    let mut value = String::new();

    for attr in element.attributes() {
        let attr = attr.map_err(|_| ValuesError::Encoding)?;
        let text = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.local_name().as_ref() {
            b"name" => name = text,
            b"value" => value = text,
            _ => {}
        }
    }

    Ok((name, value))
}
