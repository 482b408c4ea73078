use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use theme_overlay_zip::testing::ZipBuilder;

static MTIME_STEP: AtomicU64 = AtomicU64::new(1);

pub fn write_archive(path: &Path, builder: ZipBuilder) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, builder.finish()).unwrap();
}

/// Push the modification time forward so a rewrite is always noticed
pub fn bump_mtime(path: &Path) {
    let step = MTIME_STEP.fetch_add(1, Ordering::Relaxed);
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(60 * step))
        .unwrap();
}

/// Minimal `theme_values.xml` body from `(tag, name, value)` triples
pub fn values_xml(entries: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut xml = String::from("<theme_values>");
    for (tag, name, value) in entries {
        xml.push_str(&format!("<{tag} name=\"{name}\">{value}</{tag}>"));
    }
    xml.push_str("</theme_values>");
    xml.into_bytes()
}

/// Encode a solid square as png
pub fn solid_png(size: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(size, size, image::Rgba(rgba));
    let mut data = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut data, image::ImageFormat::Png)
        .unwrap();
    data.into_inner()
}

/// Archive holding only `theme_values.xml` with the given entries
pub fn values_archive(entries: &[(&str, &str, &str)]) -> ZipBuilder {
    ZipBuilder::new().stored("theme_values.xml", &values_xml(entries))
}
