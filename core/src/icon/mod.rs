pub mod cache;
pub mod composer;
pub mod filter;
pub mod pixels;

pub use cache::{CacheStats, IconCache};
pub use composer::{IconComposer, IconKey, canvas_size};
pub use filter::ColorFilter;
pub use pixels::PixelBuffer;
