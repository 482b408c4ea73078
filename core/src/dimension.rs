//! Packed dimension values.
//!
//! Themes write dimensions as text (`12.5dp`), resource consumers expect the
//! packed "complex" format of compiled resource tables: a 24 bit signed
//! mantissa in bits 8..32, the radix in bits 4..6 and the unit in bits 0..4.

use crate::config::DisplayMetrics;

pub const COMPLEX_UNIT_PX: u32 = 0;
pub const COMPLEX_UNIT_DIP: u32 = 1;
pub const COMPLEX_UNIT_SP: u32 = 2;
pub const COMPLEX_UNIT_PT: u32 = 3;
pub const COMPLEX_UNIT_IN: u32 = 4;
pub const COMPLEX_UNIT_MM: u32 = 5;

const COMPLEX_UNIT_MASK: u32 = 0x0F;
const COMPLEX_RADIX_SHIFT: u32 = 4;
const COMPLEX_RADIX_MASK: u32 = 0x03;
const COMPLEX_MANTISSA_SHIFT: u32 = 8;
const COMPLEX_MANTISSA_MASK: u64 = 0x00FF_FFFF;

/// Fixed point split of the mantissa, integer bits `p` fractional bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Radix {
    R23p0 = 0,
    R16p7 = 1,
    R8p15 = 2,
    R0p23 = 3,
}

impl Radix {
    /// Shift applied to the 23 bit fractional representation
    #[inline]
    fn shift(self) -> u32 {
        match self {
            Self::R23p0 => 23,
            Self::R16p7 => 16,
            Self::R8p15 => 8,
            Self::R0p23 => 0,
        }
    }

    /// Pick the radix that keeps the most fractional precision
    fn select(bits: u64) -> Radix {
        if bits & 0x7F_FFFF == 0 {
            Self::R23p0
        } else if bits & 0xFFFF_FFFF_FF80_0000 == 0 {
            Self::R0p23
        } else if bits & 0xFFFF_FFFF_8000_0000 == 0 {
            Self::R8p15
        } else if bits & 0xFFFF_FF80_0000_0000 == 0 {
            Self::R16p7
        } else {
            Self::R23p0
        }
    }
}

/// Multipliers to turn the mantissa (still shifted by 8) into a float
const RADIX_MULTS: [f64; 4] = [
    1.0 / (1u64 << 8) as f64,
    1.0 / (1u64 << 15) as f64,
    1.0 / (1u64 << 23) as f64,
    1.0 / (1u64 << 31) as f64,
];

fn unit_from_suffix(suffix: &str) -> u32 {
    match suffix {
        "px" => COMPLEX_UNIT_PX,
        "dp" | "dip" => COMPLEX_UNIT_DIP,
        "sp" => COMPLEX_UNIT_SP,
        "pt" => COMPLEX_UNIT_PT,
        "in" => COMPLEX_UNIT_IN,
        "mm" => COMPLEX_UNIT_MM,
        // unknown units carry no scaling bits
        _ => COMPLEX_UNIT_PX,
    }
}

/// Parse textual dimension into the packed representation
///
/// Malformed input yields `0` instead of an error, theme files are not
/// trusted to be well formed.
pub fn parse_dimension(text: &str) -> u32 {
    let text = text.trim();
    let bytes = text.as_bytes();

    let mut first_digit: Option<usize> = None;
    let mut last_digit: Option<usize> = None;
    let mut dot: Option<usize> = None;
    let mut unit_start: Option<usize> = None;

    for (i, &c) in bytes.iter().enumerate() {
        match c {
            b'0'..=b'9' => {
                if first_digit.is_none() {
                    first_digit = Some(i);
                }
                last_digit = Some(i);
            }
            b'.' if dot.is_none() => dot = Some(i),
            b'a'..=b'z' | b'A'..=b'Z' | b'%' => {
                unit_start = Some(i);
                break;
            }
            _ => {}
        }
    }

    let (Some(first_digit), Some(last_digit)) = (first_digit, last_digit) else {
        return 0;
    };

    let number_start = match dot {
        Some(dot) if dot < first_digit => dot,
        _ => first_digit,
    };
    let number_end = last_digit + 1;

    let number = &text[number_start..number_end];
    let Ok(value) = number.parse::<f64>() else {
        return 0;
    };
    let negative = text[..number_start].contains('-');

    let unit = unit_start
        .map(|start| unit_from_suffix(&text[start..].to_ascii_lowercase()))
        .unwrap_or(COMPLEX_UNIT_PX);

    pack(if negative { -value } else { value }, unit)
}

/// Pack a float with a unit into the complex representation
pub fn pack(value: f64, unit: u32) -> u32 {
    let negative = value < 0.0;
    let magnitude = value.abs();

    // value in 23 bit fixed point, saturated to what the mantissa can carry
    let bits = (magnitude * (1u64 << 23) as f64 + 0.5) as u64;

    let radix = Radix::select(bits);
    let mut mantissa = (bits >> radix.shift()) & COMPLEX_MANTISSA_MASK;
    if negative {
        mantissa = mantissa.wrapping_neg() & COMPLEX_MANTISSA_MASK;
    }

    ((mantissa as u32) << COMPLEX_MANTISSA_SHIFT)
        | ((radix as u32) << COMPLEX_RADIX_SHIFT)
        | (unit & COMPLEX_UNIT_MASK)
}

#[inline]
pub fn complex_unit(complex: u32) -> u32 {
    complex & COMPLEX_UNIT_MASK
}

/// Decode the numeric part of a packed value
#[inline]
pub fn complex_to_float(complex: u32) -> f64 {
    let radix = ((complex >> COMPLEX_RADIX_SHIFT) & COMPLEX_RADIX_MASK) as usize;
    // mantissa stays in the top 24 bits so the sign comes for free
    ((complex & 0xFFFF_FF00) as i32 as f64) * RADIX_MULTS[radix]
}

/// Decode a packed value into pixels for the given display
pub fn complex_to_dimension(complex: u32, metrics: &DisplayMetrics) -> f32 {
    let value = complex_to_float(complex) as f32;

    match complex_unit(complex) {
        COMPLEX_UNIT_DIP => value * metrics.density(),
        COMPLEX_UNIT_SP => value * metrics.scaled_density(),
        COMPLEX_UNIT_PT => value * metrics.xdpi() / 72.0,
        COMPLEX_UNIT_IN => value * metrics.xdpi(),
        COMPLEX_UNIT_MM => value * metrics.xdpi() / 25.4,
        _ => value,
    }
}

/// Same rounding as pixel-size lookups: at least one pixel for non-zero values
pub fn complex_to_dimension_pixel_size(complex: u32, metrics: &DisplayMetrics) -> i32 {
    let value = complex_to_dimension(complex, metrics);
    let rounded = (value + if value >= 0.0 { 0.5 } else { -0.5 }) as i32;

    match rounded {
        0 if value > 0.0 => 1,
        0 if value < 0.0 => -1,
        v => v,
    }
}
