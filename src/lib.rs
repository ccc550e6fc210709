pub mod cli;
pub mod config;
pub mod corpus;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod property;
pub mod reporting;
pub mod utils;

/// Version string recorded in every report.
pub fn tool_version() -> String {
    match option_env!("GIT_HASH") {
        Some(hash) => format!("kbfuzz {} ({})", env!("CARGO_PKG_VERSION"), hash),
        None => format!("kbfuzz {}", env!("CARGO_PKG_VERSION")),
    }
}
