#![no_main]

use libfuzzer_sys::fuzz_target;
use theme_overlay::icon::ColorFilter;

fuzz_target!(|data: &[u8]| {
    if let Ok(filter) = ColorFilter::parse(data) {
        let _ = filter.apply([0x12, 0x34, 0x56, 0x78]);
    }
});
