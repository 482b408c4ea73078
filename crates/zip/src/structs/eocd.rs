use memchr::memmem;

use winnow::{
    binary::{le_u16, le_u32},
    prelude::*,
    token::take,
};

/// End of central directory record
///
/// Only the fields needed to locate the central directory are kept,
/// multi-disk archives are not a thing for theme packages.
#[derive(Debug)]
pub(crate) struct EndOfCentralDirectory {
    pub(crate) total_entries: u16,
    pub(crate) central_dir_size: u32,
    pub(crate) central_dir_offset: u32,
}

impl EndOfCentralDirectory {
    const MAGIC: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

    /// 4 (MAGIC) + 18 (DATA), comment excluded
    pub(crate) const MIN_SIZE: usize = 22;

    #[inline(always)]
    const fn magic_u32() -> u32 {
        u32::from_le_bytes(Self::MAGIC)
    }

    pub(crate) fn parse(input: &mut &[u8]) -> ModalResult<EndOfCentralDirectory> {
        let (_, _, _, _, total_entries, central_dir_size, central_dir_offset, comment_length) = (
            le_u32.verify(|magic| *magic == Self::magic_u32()), // magic
            le_u16,                                             // disk_number
            le_u16,                                             // central_dir_start_disk
            le_u16,                                             // entries_on_this_disk
            le_u16,                                             // total_entries
            le_u32,                                             // central_dir_size
            le_u32,                                             // central_dir_offset
            le_u16,                                             // comment_length
        )
            .parse_next(input)?;

        // comment is not interesting, but it must be there
        let _ = take(comment_length).parse_next(input)?;

        Ok(EndOfCentralDirectory {
            total_entries,
            central_dir_size,
            central_dir_offset,
        })
    }

    /// Searching magic from the end of the file
    ///
    /// The record sits in the last 64k + 22 bytes, so the search stops there.
    pub(crate) fn find_eocd(input: &[u8], chunk_size: usize) -> Option<usize> {
        let limit = input
            .len()
            .saturating_sub(u16::MAX as usize + Self::MIN_SIZE);
        let chunk_size = chunk_size.max(Self::MAGIC.len() * 2);
        let mut end = input.len();

        while end > limit {
            // overlap chunks by the magic size, otherwise a split magic is lost
            let start = end.saturating_sub(chunk_size).max(limit);
            let chunk = &input[start..end];

            if let Some(pos) = memmem::rfind(chunk, &Self::MAGIC) {
                return Some(start + pos);
            }

            if start == limit {
                break;
            }
            end = start + Self::MAGIC.len() - 1;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_eocd_at_the_end() {
        let mut data = vec![0u8; 100];
        data.extend_from_slice(&[0x50, 0x4B, 0x05, 0x06]);
        data.extend_from_slice(&[0u8; 18]);

        assert_eq!(EndOfCentralDirectory::find_eocd(&data, 16), Some(100));
    }

    #[test]
    fn find_eocd_split_between_chunks() {
        let mut data = vec![0u8; 30];
        data.extend_from_slice(&[0x50, 0x4B, 0x05, 0x06]);
        data.extend_from_slice(&[0u8; 18]);

        // chunk boundary falls inside the magic
        assert_eq!(EndOfCentralDirectory::find_eocd(&data, 20), Some(30));
    }

    #[test]
    fn find_eocd_missing() {
        assert_eq!(EndOfCentralDirectory::find_eocd(&[0u8; 64], 16), None);
    }

    #[test]
    fn parse_with_comment() {
        let mut data = vec![0x50, 0x4B, 0x05, 0x06];
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&120u32.to_le_bytes());
        data.extend_from_slice(&4096u32.to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(b"hi");

        let eocd = EndOfCentralDirectory::parse(&mut &data[..]).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.central_dir_size, 120);
        assert_eq!(eocd.central_dir_offset, 4096);
    }
}
