pub mod types;
pub mod classification;

pub use types::KbFuzzError;
pub use classification::ErrorClassification;
