pub mod category;
pub mod outcome;
pub mod payload;
pub mod report;
pub mod verdict;

pub use category::*;
pub use outcome::*;
pub use payload::*;
pub use report::*;
pub use verdict::*;
