pub(crate) mod central_directory;
pub(crate) mod eocd;
pub(crate) mod local_file_header;
