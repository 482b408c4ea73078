#![no_main]

use libfuzzer_sys::fuzz_target;
use theme_overlay::read_value_entries;
use theme_overlay::values::{parse_color, parse_integer};

fuzz_target!(|data: &[u8]| {
    let document = read_value_entries(data);
    for entry in document.entries {
        let _ = parse_color(&entry.text);
        let _ = parse_integer(&entry.text);
    }
});
