use ahash::AHashMap;
use flate2::{Crc, Decompress, FlushDecompress, Status};
use log::warn;

use crate::{
    errors::ZipError,
    structs::{
        central_directory::CentralDirectory, eocd::EndOfCentralDirectory,
        local_file_header::LocalFileHeader,
    },
};

/// Marker that turns a lookup name into a prefix/suffix pattern
pub const WILDCARD_MARKER: &str = "#*";

/// Represents a parsed ZIP archive
///
/// Only the central directory is trusted for names and sizes, local headers
/// are consulted for the data offset.
pub struct ZipEntry {
    input: Vec<u8>,
    central_directory: CentralDirectory,
    local_headers: AHashMap<String, LocalFileHeader>,
}

/// Implementation of common methods
impl ZipEntry {
    pub fn new(input: Vec<u8>) -> Result<ZipEntry, ZipError> {
        // perform basic sanity check, an empty archive is just the EOCD
        if !input.starts_with(b"PK\x03\x04") && !input.starts_with(b"PK\x05\x06") {
            return Err(ZipError::InvalidHeader);
        }

        let eocd_offset =
            EndOfCentralDirectory::find_eocd(&input, 4096).ok_or(ZipError::NotFoundEOCD)?;

        let eocd = EndOfCentralDirectory::parse(&mut &input[eocd_offset..])
            .map_err(|_| ZipError::ParseError)?;

        let central_directory =
            CentralDirectory::parse(&input, &eocd).map_err(|_| ZipError::ParseError)?;

        if central_directory.entries.len() != eocd.total_entries as usize {
            warn!(
                "central directory declares {} entries, parsed {}",
                eocd.total_entries,
                central_directory.entries.len()
            );
        }

        let local_headers = central_directory
            .entries
            .iter()
            .filter_map(|(filename, entry)| {
                LocalFileHeader::parse(&input, entry.local_header_offset as usize)
                    .ok()
                    .map(|header| (filename.clone(), header))
            })
            .collect();

        Ok(ZipEntry {
            input,
            central_directory,
            local_headers,
        })
    }

    /// Get list of the filenames from zip archive
    pub fn namelist(&self) -> impl Iterator<Item = &str> {
        self.central_directory.entries.keys().map(String::as_str)
    }

    /// Number of records in the central directory
    #[inline]
    pub fn len(&self) -> usize {
        self.central_directory.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.central_directory.entries.is_empty()
    }

    /// Check that a readable (non-directory) entry exists
    pub fn contains(&self, filename: &str) -> bool {
        self.central_directory
            .entries
            .get(filename)
            .is_some_and(|entry| !entry.is_dir())
    }

    /// Resolve a `prefix#*suffix` pattern to a concrete entry name
    ///
    /// The lexicographically first match wins so lookups are stable across
    /// hash map orderings.
    pub fn find_wildcard(&self, pattern: &str) -> Option<&str> {
        let (prefix, suffix) = pattern.split_once(WILDCARD_MARKER)?;

        self.central_directory
            .entries
            .values()
            .filter(|entry| !entry.is_dir())
            .map(|entry| entry.file_name.as_str())
            .filter(|name| {
                name.len() >= prefix.len() + suffix.len()
                    && name.starts_with(prefix)
                    && name.ends_with(suffix)
            })
            .min()
    }

    /// Read and decompress a file from the archive
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, ZipError> {
        let local_header = self
            .local_headers
            .get(filename)
            .ok_or(ZipError::FileNotFound)?;

        let central_directory_entry = self
            .central_directory
            .entries
            .get(filename)
            .ok_or(ZipError::FileNotFound)?;

        if central_directory_entry.is_dir() {
            return Err(ZipError::FileNotFound);
        }

        // sizes are zero in local headers when a data descriptor is used
        let (compressed_size, uncompressed_size) =
            if local_header.compressed_size == 0 || local_header.uncompressed_size == 0 {
                (
                    central_directory_entry.compressed_size as usize,
                    central_directory_entry.uncompressed_size as usize,
                )
            } else {
                (
                    local_header.compressed_size as usize,
                    local_header.uncompressed_size as usize,
                )
            };

        let offset = central_directory_entry.local_header_offset as usize + local_header.size();
        // helper to safely get a slice from input
        let get_slice = |start: usize, end: usize| self.input.get(start..end).ok_or(ZipError::EOF);

        let data = match central_directory_entry.compression_method {
            0 => get_slice(offset, offset + uncompressed_size)?.to_vec(),
            8 => {
                let compressed_data = get_slice(offset, offset + compressed_size)?;
                let mut uncompressed_data = Vec::with_capacity(uncompressed_size);

                let status = Decompress::new(false)
                    .decompress_vec(
                        compressed_data,
                        &mut uncompressed_data,
                        FlushDecompress::Finish,
                    )
                    .map_err(|_| ZipError::DecompressionError)?;

                if !matches!(status, Status::StreamEnd)
                    && uncompressed_data.len() != uncompressed_size
                {
                    return Err(ZipError::DecompressionError);
                }

                uncompressed_data
            }
            method => return Err(ZipError::UnsupportedCompression(method)),
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != central_directory_entry.crc32 {
            return Err(ZipError::CrcMismatch(filename.to_owned()));
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ZipBuilder;

    fn sample() -> ZipEntry {
        let data = ZipBuilder::new()
            .stored("theme_values.xml", b"<theme_values/>")
            .deflated("res/drawable-xhdpi/icon.png", &[7u8; 300])
            .directory("res/")
            .stored("clock_2x1.png", b"a")
            .stored("clock_4x2.png", b"b")
            .finish();

        ZipEntry::new(data).unwrap()
    }

    #[test]
    fn read_stored_and_deflated() {
        let zip = sample();

        assert_eq!(zip.read("theme_values.xml").unwrap(), b"<theme_values/>");
        assert_eq!(zip.read("res/drawable-xhdpi/icon.png").unwrap(), vec![7u8; 300]);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let zip = sample();

        assert!(matches!(zip.read("nope.png"), Err(ZipError::FileNotFound)));
        assert!(matches!(zip.read("res/"), Err(ZipError::FileNotFound)));
        assert!(!zip.contains("res/"));
        assert!(zip.contains("clock_2x1.png"));
    }

    #[test]
    fn wildcard_picks_first_sorted_match() {
        let zip = sample();

        assert_eq!(zip.find_wildcard("clock_#*.png"), Some("clock_2x1.png"));
        assert_eq!(zip.find_wildcard("weather_#*.png"), None);
        assert_eq!(zip.find_wildcard("clock_2x1.png"), None);
    }

    #[test]
    fn empty_archive() {
        let zip = ZipEntry::new(ZipBuilder::new().finish()).unwrap();

        assert!(zip.is_empty());
        assert_eq!(zip.namelist().count(), 0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            ZipEntry::new(b"definitely not a zip".to_vec()),
            Err(ZipError::InvalidHeader)
        ));
        assert!(matches!(
            ZipEntry::new(b"PK\x03\x04truncated".to_vec()),
            Err(ZipError::NotFoundEOCD)
        ));
    }

    #[test]
    fn corrupted_payload_fails_crc() {
        let mut data = ZipBuilder::new().stored("a.txt", b"hello").finish();
        // local header is 30 bytes + "a.txt"
        data[35] = b'j';

        let zip = ZipEntry::new(data).unwrap();
        assert!(matches!(zip.read("a.txt"), Err(ZipError::CrcMismatch(_))));
    }
}
