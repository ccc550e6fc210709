pub mod credentials;
pub mod parser;
pub mod schema;
pub mod target;
pub mod types;

pub use types::*;
pub use target::{PropertySettings, TargetConfig, TrialCounts};
pub use parser::{check_config, parse_config, parse_config_str};
