use std::io;

use theme_overlay_zip::errors::ZipError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThemeError {
    /// Generic I/O error while trying to read theme data
    #[error(transparent)]
    IoError(#[from] io::Error),

    /// Error occurred while parsing a theme component as zip archive
    #[error("got error while parsing theme archive")]
    ZipError(#[from] ZipError),

    /// Value definition file is malformed
    #[error("got error while parsing theme values")]
    ValuesError(#[from] ValuesError),

    /// Bitmap can't be decoded or encoded
    #[error("got error while processing bitmap")]
    ImageError(#[from] image::ImageError),

    /// Pixel buffer allocation failed
    #[error("not enough memory for {0}x{1} bitmap")]
    OutOfMemory(u32, u32),

    /// Configuration file can't be parsed
    #[error("invalid configuration")]
    ConfigError(#[source] serde_json::Error),

    /// Resource id table can't be parsed
    #[error("invalid resource id table")]
    ResolverError(#[source] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuesError {
    /// Document is not well formed xml
    #[error("malformed xml at byte {0}")]
    Malformed(u64),

    /// Text can't be decoded as utf-8
    #[error("invalid text encoding")]
    Encoding,
}
