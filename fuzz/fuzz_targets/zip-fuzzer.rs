#![no_main]

use libfuzzer_sys::fuzz_target;
use theme_overlay_zip::entry::ZipEntry;

fuzz_target!(|data: &[u8]| {
    if let Ok(zip) = ZipEntry::new(data.to_vec()) {
        let names: Vec<String> = zip.namelist().map(str::to_owned).collect();
        for name in names {
            let _ = zip.read(&name);
        }
    }
});
