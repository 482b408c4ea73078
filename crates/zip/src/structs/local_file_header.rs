use winnow::binary::{le_u16, le_u32};
use winnow::error::{ErrMode, Needed};
use winnow::prelude::*;
use winnow::token::take;

/// Fields of a local header needed to locate and decode the entry data
///
/// Sizes are zero when the entry is followed by a data descriptor, the
/// central directory has them then.
#[derive(Debug)]
pub(crate) struct LocalFileHeader {
    pub(crate) compressed_size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) file_name_length: u16,
    pub(crate) extra_field_length: u16,
}

impl LocalFileHeader {
    const MAGIC: u32 = 0x04034b50;

    /// Fixed part of the header, magic included
    const FIXED_SIZE: usize = 30;

    pub(crate) fn parse(input: &[u8], offset: usize) -> ModalResult<LocalFileHeader> {
        let mut input = input
            .get(offset..)
            .ok_or(ErrMode::Incomplete(Needed::Unknown))?;

        le_u32
            .verify(|magic| *magic == Self::MAGIC)
            .parse_next(&mut input)?;

        // version needed, flags, method, time, date, crc32
        take(14usize).void().parse_next(&mut input)?;

        let (compressed_size, uncompressed_size, file_name_length, extra_field_length) =
            (le_u32, le_u32, le_u16, le_u16).parse_next(&mut input)?;

        Ok(LocalFileHeader {
            compressed_size,
            uncompressed_size,
            file_name_length,
            extra_field_length,
        })
    }

    /// Offset of the entry data relative to the header start
    #[inline]
    pub(crate) fn size(&self) -> usize {
        Self::FIXED_SIZE + self.file_name_length as usize + self.extra_field_length as usize
    }
}
