pub mod entry;
pub mod errors;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

mod structs;
pub use entry::*;
pub use errors::*;
