pub mod formatting;
pub mod truncation;

pub use formatting::{format_bytes, format_duration};
pub use truncation::{quoted_preview, truncate_chars, truncate_error, truncate_preview};
