//! Minimal archive writer for fixtures.
//!
//! Produces archives with stored and deflated entries, no data descriptors
//! and no zip64 records, which is exactly what [`crate::ZipEntry`] reads.

use std::io::Write;

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;

struct PendingEntry {
    name: String,
    method: u16,
    crc32: u32,
    uncompressed_size: u32,
    payload: Vec<u8>,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<PendingEntry>,
}

impl ZipBuilder {
    pub fn new() -> ZipBuilder {
        ZipBuilder::default()
    }

    /// Add an entry without compression
    pub fn stored(mut self, name: &str, data: &[u8]) -> ZipBuilder {
        self.entries.push(PendingEntry {
            name: name.to_owned(),
            method: 0,
            crc32: Self::crc(data),
            uncompressed_size: data.len() as u32,
            payload: data.to_vec(),
        });
        self
    }

    /// Add an entry compressed with raw deflate
    pub fn deflated(mut self, name: &str, data: &[u8]) -> ZipBuilder {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .expect("in-memory deflate can't fail");
        let payload = encoder.finish().expect("in-memory deflate can't fail");

        self.entries.push(PendingEntry {
            name: name.to_owned(),
            method: 8,
            crc32: Self::crc(data),
            uncompressed_size: data.len() as u32,
            payload,
        });
        self
    }

    /// Add a directory record, name should end with `/`
    pub fn directory(mut self, name: &str) -> ZipBuilder {
        self.entries.push(PendingEntry {
            name: name.to_owned(),
            method: 0,
            crc32: 0,
            uncompressed_size: 0,
            payload: Vec::new(),
        });
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            offsets.push(out.len() as u32);
            out.extend_from_slice(&0x04034b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes()); // version_needed
            out.extend_from_slice(&0u16.to_le_bytes()); // flags
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // time
            out.extend_from_slice(&0x21u16.to_le_bytes()); // date
            out.extend_from_slice(&entry.crc32.to_le_bytes());
            out.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.payload);
        }

        let central_dir_offset = out.len() as u32;
        for (entry, offset) in self.entries.iter().zip(offsets) {
            let external_attrs: u32 = if entry.name.ends_with('/') { 0x10 } else { 0 };

            out.extend_from_slice(&0x02014b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes()); // version_made_by
            out.extend_from_slice(&20u16.to_le_bytes()); // version_needed
            out.extend_from_slice(&0u16.to_le_bytes()); // flags
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // time
            out.extend_from_slice(&0x21u16.to_le_bytes()); // date
            out.extend_from_slice(&entry.crc32.to_le_bytes());
            out.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra
            out.extend_from_slice(&0u16.to_le_bytes()); // comment
            out.extend_from_slice(&0u16.to_le_bytes()); // disk
            out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            out.extend_from_slice(&external_attrs.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
        }
        let central_dir_size = out.len() as u32 - central_dir_offset;

        let count = self.entries.len() as u16;
        out.extend_from_slice(&[0x50, 0x4B, 0x05, 0x06]);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&central_dir_size.to_le_bytes());
        out.extend_from_slice(&central_dir_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        out
    }

    fn crc(data: &[u8]) -> u32 {
        let mut crc = Crc::new();
        crc.update(data);
        crc.sum()
    }
}
