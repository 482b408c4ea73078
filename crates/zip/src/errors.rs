use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZipError {
    /// Got error while decompressing object
    #[error("got error while decompressing object")]
    DecompressionError,

    /// Got EOF while reading data
    #[error("got EOF while parsing zip")]
    EOF,

    /// Decompressed data doesn't match the recorded checksum
    #[error("crc32 mismatch for {0}")]
    CrcMismatch(String),

    /// Provided file not found in zip
    #[error("file not exist in zip")]
    FileNotFound,

    /// Input doesn't look like a zip archive at all
    #[error("invalid zip header")]
    InvalidHeader,

    /// Can't operate without EOCD
    #[error("can't find EOCD in zip")]
    NotFoundEOCD,

    /// Generic parsing error
    #[error("got error while parsing zip archive")]
    ParseError,

    /// Only stored and deflated entries are supported
    #[error("unsupported compression method {0}")]
    UnsupportedCompression(u16),
}
