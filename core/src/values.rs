//! Theme value definition files.
//!
//! A component archive may carry `theme_values.xml` (and density variants such
//! as `theme_values-xhdpi.xml`) overriding scalar resources:
//!
//! ```xml
//! <theme_values>
//!     <color name="status_bar_bg">#ff101010</color>
//!     <dimen name="status_bar_height" package="com.android.systemui">24dp</dimen>
//!     <string name="carrier">Hello</string>
//! </theme_values>
//! ```

use std::collections::HashMap;

use log::{debug, warn};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::archive::ThemeArchive;
use crate::density::{DensitySlot, density_suffix};
use crate::dimension::parse_dimension;
use crate::errors::ValuesError;
use crate::resolver::{IdentifierResolver, ResourceId, is_valid_id};

/// Accepted root elements
pub const VALUE_ROOTS: [&str; 2] = ["theme_values", "resources"];

const VALUES_FILE_STEM: &str = "theme_values";

/// Kind of a value element, maps onto a resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Color,
    Integer,
    Drawable,
    String,
    Dimen,
}

impl ValueKind {
    pub fn from_tag(tag: &[u8]) -> Option<ValueKind> {
        Some(match tag {
            b"bool" => Self::Bool,
            b"color" => Self::Color,
            b"integer" => Self::Integer,
            b"drawable" => Self::Drawable,
            b"string" => Self::String,
            b"dimen" => Self::Dimen,
            _ => return None,
        })
    }

    /// Resource type name used for id resolution
    pub fn resource_type(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Color => "color",
            Self::Integer => "integer",
            Self::Drawable => "drawable",
            Self::String => "string",
            Self::Dimen => "dimen",
        }
    }
}

/// Raw value element as written in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEntry {
    pub kind: ValueKind,
    pub name: String,
    /// Owning package, `None` means the archive's own package
    pub package: Option<String>,
    pub text: String,
}

/// Result of reading one value file
#[derive(Debug, Default)]
pub struct ValueDocument {
    /// Root element is one of [`VALUE_ROOTS`]
    pub recognized: bool,

    /// Entries in document order, up to the first error
    pub entries: Vec<ValueEntry>,

    /// Set when reading stopped early, `entries` still holds what came before
    pub error: Option<ValuesError>,
}

struct PendingEntry {
    kind: ValueKind,
    name: Option<String>,
    package: Option<String>,
    text: String,
}

fn attributes(element: &BytesStart<'_>) -> Result<(Option<String>, Option<String>), ValuesError> {
    let mut name = None;
    let mut package = None;

    for attr in element.attributes() {
        let attr = attr.map_err(|_| ValuesError::Encoding)?;
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw)
            .map_err(|_| ValuesError::Encoding)?
            .into_owned();

        match attr.key.local_name().as_ref() {
            b"name" => name = Some(value),
            b"package" => package = Some(value),
            _ => {}
        }
    }

    Ok((name, package))
}

fn finish(pending: PendingEntry, entries: &mut Vec<ValueEntry>) {
    match pending.name {
        Some(name) if !name.is_empty() => entries.push(ValueEntry {
            kind: pending.kind,
            name,
            package: pending.package.filter(|p| !p.is_empty()),
            text: pending.text.trim().to_owned(),
        }),
        _ => warn!(
            "skipping <{}> without name",
            pending.kind.resource_type()
        ),
    }
}

fn is_value_root(element: &BytesStart<'_>) -> bool {
    let root = element.local_name();
    VALUE_ROOTS
        .iter()
        .any(|candidate| candidate.as_bytes() == root.as_ref())
}

fn value_element(element: &BytesStart<'_>) -> Result<Option<PendingEntry>, ValuesError> {
    let Some(kind) = ValueKind::from_tag(element.local_name().as_ref()) else {
        return Ok(None);
    };
    let (name, package) = attributes(element)?;

    Ok(Some(PendingEntry {
        kind,
        name,
        package,
        text: String::new(),
    }))
}

fn append_escaped(target: &mut String, raw: &[u8]) -> Result<(), ValuesError> {
    let raw = String::from_utf8_lossy(raw);
    let value = unescape(&raw).map_err(|_| ValuesError::Encoding)?;
    target.push_str(&value);
    Ok(())
}

/// Read all value elements of a document
///
/// Reading stops at the first xml error; entries parsed before it are kept
/// and the error is reported alongside them.
pub fn read_value_entries(data: &[u8]) -> ValueDocument {
    let mut document = ValueDocument::default();
    if let Err(e) = read_into(data, &mut document) {
        document.error = Some(e);
    }
    document
}

fn read_into(data: &[u8], document: &mut ValueDocument) -> Result<(), ValuesError> {
    let mut reader = Reader::from_reader(data);

    // element depth, children of the root live at depth 2
    let mut depth = 0usize;
    let mut pending: Option<PendingEntry> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|_| ValuesError::Malformed(reader.buffer_position() as u64))?;

        match event {
            Event::Start(element) => {
                depth += 1;
                if depth == 1 {
                    document.recognized = is_value_root(&element);
                    if !document.recognized {
                        return Ok(());
                    }
                } else if depth == 2 {
                    pending = value_element(&element)?;
                }
            }
            Event::Empty(element) => {
                if depth == 0 {
                    document.recognized = is_value_root(&element);
                    return Ok(());
                }
                if depth == 1 {
                    if let Some(entry) = value_element(&element)? {
                        finish(entry, &mut document.entries);
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let Some(entry) = pending.take() {
                        finish(entry, &mut document.entries);
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Text(text) => {
                if let Some(entry) = pending.as_mut().filter(|_| depth == 2) {
                    append_escaped(&mut entry.text, &text)?;
                }
            }
            Event::CData(data) => {
                if let Some(entry) = pending.as_mut().filter(|_| depth == 2) {
                    entry.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(entry) = pending.as_mut().filter(|_| depth == 2) {
                    let mut raw = Vec::with_capacity(reference.len() + 2);
                    raw.push(b'&');
                    raw.extend_from_slice(&reference);
                    raw.push(b';');
                    append_escaped(&mut entry.text, &raw)?;
                }
            }
            Event::Eof => {
                if depth > 0 {
                    return Err(ValuesError::Malformed(reader.buffer_position() as u64));
                }
                return Ok(());
            }
            _ => {}
        }
    }
}

/// Parse a signed decimal or `0x` prefixed hex integer
///
/// Values above `i32::MAX` up to `u32::MAX` keep their bit pattern.
pub fn parse_integer(text: &str) -> Option<i32> {
    let text = text.trim();

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok().map(|v| v as i32);
    }

    let value: i64 = text.parse().ok()?;
    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return None;
    }
    Some(value as i32)
}

/// Parse `#RGB`, `#ARGB`, `#RRGGBB`, `#AARRGGBB` or a plain integer into ARGB
pub fn parse_color(text: &str) -> Option<i32> {
    let text = text.trim();
    let Some(hex) = text.strip_prefix('#') else {
        return parse_integer(text);
    };

    if !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;

    // widen a 4 bit channel to 8 bits
    let nibble = |shift: u32| ((value >> shift) & 0xF) * 0x11;

    let argb = match hex.len() {
        3 => 0xFF00_0000 | (nibble(8) << 16) | (nibble(4) << 8) | nibble(0),
        4 => (nibble(12) << 24) | (nibble(8) << 16) | (nibble(4) << 8) | nibble(0),
        6 => 0xFF00_0000 | value,
        8 => value,
        _ => return None,
    };
    Some(argb as i32)
}

fn parse_bool(text: &str) -> i32 {
    text.trim().eq_ignore_ascii_case("true") as i32
}

/// Name of the value file for a density slot, `theme_values-xhdpi.xml`
pub fn values_file_name(slot: DensitySlot) -> String {
    format!("{}{}.xml", VALUES_FILE_STEM, density_suffix(slot))
}

/// Resolved overrides of one archive, keyed by resource id
#[derive(Debug, Default, Clone)]
pub struct OverrideTable {
    integers: HashMap<ResourceId, i32>,
    texts: HashMap<ResourceId, String>,
    source: Option<String>,
}

impl OverrideTable {
    pub fn new() -> OverrideTable {
        OverrideTable::default()
    }

    /// Load the first value file found along the density preference list
    ///
    /// Entries whose name doesn't resolve to an id are skipped, for duplicated
    /// ids the first entry wins. A file with a foreign root element is not a
    /// value file and the search goes on with the next density.
    pub fn load(
        archive: &ThemeArchive,
        densities: &[DensitySlot],
        resolver: &dyn IdentifierResolver,
    ) -> OverrideTable {
        let mut table = OverrideTable::new();

        for slot in densities {
            let file_name = values_file_name(*slot);
            let Some(data) = archive.read(&file_name) else {
                continue;
            };

            let document = read_value_entries(&data);
            if !document.recognized {
                warn!(
                    "{:?} in {:?} is not a value file",
                    file_name,
                    archive.path()
                );
                continue;
            }
            if let Some(e) = &document.error {
                warn!(
                    "{:?} in {:?} is malformed, keeping {} entries: {}",
                    file_name,
                    archive.path(),
                    document.entries.len(),
                    e
                );
            }

            for entry in &document.entries {
                table.merge(entry, archive.package(), resolver);
            }
            debug!(
                "loaded {} overrides from {:?} in {:?}",
                table.len(),
                file_name,
                archive.path()
            );
            table.source = Some(file_name);
            break;
        }

        table
    }

    fn merge(
        &mut self,
        entry: &ValueEntry,
        default_package: &str,
        resolver: &dyn IdentifierResolver,
    ) {
        let package = entry.package.as_deref().unwrap_or(default_package);
        let Some(id) = resolver
            .identifier(&entry.name, entry.kind.resource_type(), package)
            .filter(|id| is_valid_id(*id))
        else {
            debug!(
                "no id for {}:{}/{}",
                package,
                entry.kind.resource_type(),
                entry.name
            );
            return;
        };

        if self.integers.contains_key(&id) || self.texts.contains_key(&id) {
            return;
        }

        let value = match entry.kind {
            ValueKind::String => {
                self.texts.insert(id, entry.text.clone());
                return;
            }
            ValueKind::Bool => Some(parse_bool(&entry.text)),
            ValueKind::Color | ValueKind::Drawable => parse_color(&entry.text),
            ValueKind::Integer => parse_integer(&entry.text),
            ValueKind::Dimen => Some(parse_dimension(&entry.text) as i32),
        };

        match value {
            Some(value) => {
                self.integers.insert(id, value);
            }
            None => warn!(
                "bad {} value {:?} for {}",
                entry.kind.resource_type(),
                entry.text,
                entry.name
            ),
        }
    }

    #[inline]
    pub fn integer(&self, id: ResourceId) -> Option<i32> {
        self.integers.get(&id).copied()
    }

    #[inline]
    pub fn text(&self, id: ResourceId) -> Option<&str> {
        self.texts.get(&id).map(String::as_str)
    }

    /// Value file the table was loaded from
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.integers.len() + self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integers.is_empty() && self.texts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::best_density_order;
    use crate::resolver::ResourceTable;
    use crate::test_utils::write_archive;
    use theme_overlay_zip::testing::ZipBuilder;

    const PHONE: &str = "com.android.phone";

    #[test]
    fn entries_in_document_order() {
        let document = read_value_entries(
            br#"<?xml version="1.0" encoding="utf-8"?>
            <theme_values>
                <!-- comment -->
                <color name="bg">#ff000000</color>
                <string name="carrier" package="com.android.systemui"> Tom &amp; Jerry </string>
                <bool name="flag"/>
                <unknown name="skipped">1</unknown>
            </theme_values>"#,
        );

        assert!(document.recognized);
        assert!(document.error.is_none());
        assert_eq!(
            document.entries,
            vec![
                ValueEntry {
                    kind: ValueKind::Color,
                    name: "bg".to_owned(),
                    package: None,
                    text: "#ff000000".to_owned(),
                },
                ValueEntry {
                    kind: ValueKind::String,
                    name: "carrier".to_owned(),
                    package: Some("com.android.systemui".to_owned()),
                    text: "Tom & Jerry".to_owned(),
                },
                ValueEntry {
                    kind: ValueKind::Bool,
                    name: "flag".to_owned(),
                    package: None,
                    text: String::new(),
                },
            ]
        );
    }

    #[test]
    fn resources_root_is_accepted() {
        let document =
            read_value_entries(b"<resources><integer name=\"n\">3</integer></resources>");
        assert!(document.recognized);
        assert_eq!(document.entries.len(), 1);
    }

    #[test]
    fn foreign_root_is_not_a_value_file() {
        let document = read_value_entries(b"<manifest><color name=\"a\">#fff</color></manifest>");
        assert!(!document.recognized);
        assert!(document.entries.is_empty());
    }

    #[test]
    fn entry_without_name_is_skipped() {
        let document = read_value_entries(
            b"<theme_values><color>#fff</color><color name=\"b\">#000</color></theme_values>",
        );
        assert_eq!(document.entries.len(), 1);
        assert_eq!(document.entries[0].name, "b");
    }

    #[test]
    fn malformed_keeps_partial_entries() {
        let document = read_value_entries(
            b"<theme_values><color name=\"a\">#fff</color>\
              <color name=\"b\">#000</colour></theme_values>",
        );
        assert!(document.recognized);
        assert!(matches!(document.error, Some(ValuesError::Malformed(_))));
        assert_eq!(document.entries.len(), 1);
        assert_eq!(document.entries[0].name, "a");
    }

    #[test]
    fn truncated_document() {
        let document =
            read_value_entries(b"<theme_values><integer name=\"a\">1</integer><integer name=");
        assert!(document.error.is_some());
        assert_eq!(document.entries.len(), 1);
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#f00"), Some(0xFFFF0000u32 as i32));
        assert_eq!(parse_color("#8f00"), Some(0x88FF0000u32 as i32));
        assert_eq!(parse_color("#102030"), Some(0xFF102030u32 as i32));
        assert_eq!(parse_color("#80102030"), Some(0x80102030u32 as i32));
        assert_eq!(parse_color("0xff00ff00"), Some(0xFF00FF00u32 as i32));
        assert_eq!(parse_color("16"), Some(16));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#zzz"), None);
        assert_eq!(parse_color("red"), None);
    }

    #[test]
    fn integers() {
        assert_eq!(parse_integer("-7"), Some(-7));
        assert_eq!(parse_integer(" 42 "), Some(42));
        assert_eq!(parse_integer("4294967295"), Some(-1));
        assert_eq!(parse_integer("4294967296"), None);
        assert_eq!(parse_integer("1.5"), None);
    }

    fn phone_ids() -> ResourceTable {
        ResourceTable::new()
            .with(PHONE, "color", "bg", 0x7f010001)
            .with(PHONE, "color", "fg", 0x7f010002)
            .with(PHONE, "dimen", "pad", 0x7f020001)
            .with(PHONE, "bool", "flag", 0x7f030001)
            .with(PHONE, "string", "title", 0x7f040001)
            .with("android", "color", "white", 0x01060001)
    }

    fn archive_with(builder: ZipBuilder) -> (tempfile::TempDir, ThemeArchive) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PHONE);
        write_archive(&path, builder);

        let archive = ThemeArchive::new(&path, PHONE);
        archive.check_for_update();
        (dir, archive)
    }

    #[test]
    fn load_resolves_and_converts() {
        let (_dir, archive) = archive_with(ZipBuilder::new().deflated(
            "theme_values.xml",
            br#"<theme_values>
                <color name="bg">#102030</color>
                <color name="bg">#ffffff</color>
                <dimen name="pad">12dp</dimen>
                <bool name="flag">TRUE</bool>
                <string name="title">Phone</string>
                <color name="white" package="android">#fff</color>
                <color name="missing">#000</color>
            </theme_values>"#,
        ));

        let table = OverrideTable::load(&archive, &best_density_order(320), &phone_ids());

        assert_eq!(table.source(), Some("theme_values.xml"));
        assert_eq!(table.len(), 5);
        // first entry wins
        assert_eq!(table.integer(0x7f010001), Some(0xFF102030u32 as i32));
        assert_eq!(table.integer(0x7f020001), Some(((12 << 8) | 1) as i32));
        assert_eq!(table.integer(0x7f030001), Some(1));
        assert_eq!(table.text(0x7f040001), Some("Phone"));
        assert_eq!(table.integer(0x01060001), Some(-1));
        assert_eq!(table.integer(0x7f010002), None);
    }

    #[test]
    fn load_prefers_closest_density() {
        let (_dir, archive) = archive_with(
            ZipBuilder::new()
                .stored(
                    "theme_values.xml",
                    b"<theme_values><color name=\"bg\">#111</color>\
                      <color name=\"fg\">#222</color></theme_values>",
                )
                .stored(
                    "theme_values-xhdpi.xml",
                    b"<theme_values><color name=\"bg\">#333</color></theme_values>",
                )
                .stored(
                    "theme_values-xxhdpi.xml",
                    b"<theme_values><color name=\"bg\">#444</color></theme_values>",
                ),
        );

        let table = OverrideTable::load(&archive, &best_density_order(320), &phone_ids());

        assert_eq!(table.source(), Some("theme_values-xhdpi.xml"));
        assert_eq!(table.integer(0x7f010001), Some(0xFF333333u32 as i32));
        // search stops at the first file
        assert_eq!(table.integer(0x7f010002), None);
    }

    #[test]
    fn load_skips_foreign_files() {
        let (_dir, archive) = archive_with(
            ZipBuilder::new()
                .stored("theme_values-xhdpi.xml", b"<manifest/>")
                .stored(
                    "theme_values.xml",
                    b"<theme_values><color name=\"fg\">#222</color></theme_values>",
                ),
        );

        let table = OverrideTable::load(&archive, &best_density_order(320), &phone_ids());
        assert_eq!(table.source(), Some("theme_values.xml"));
        assert_eq!(table.integer(0x7f010002), Some(0xFF222222u32 as i32));
    }

    #[test]
    fn load_without_values() {
        let (_dir, archive) = archive_with(ZipBuilder::new().stored("icon.png", b"png"));

        let table = OverrideTable::load(&archive, &best_density_order(320), &phone_ids());
        assert!(table.is_empty());
        assert!(table.source().is_none());
    }
}
