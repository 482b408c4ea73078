#![no_main]

use libfuzzer_sys::fuzz_target;
use theme_overlay::DisplayMetrics;
use theme_overlay::dimension::{complex_to_dimension_pixel_size, parse_dimension};

fuzz_target!(|data: &str| {
    let packed = parse_dimension(data);
    let _ = complex_to_dimension_pixel_size(packed, &DisplayMetrics::default());
});
