use std::path::PathBuf;

use console::style;

use crate::config::{check_config, TargetConfig};
use crate::errors::KbFuzzError;
use super::commands::{ValidateArgs, DEFAULT_BASE_URL};

pub async fn handle_validate(args: ValidateArgs) -> Result<(), KbFuzzError> {
    print!("{}", validate_file(&args.config).await?);
    Ok(())
}

/// Parse and resolve a config file, rendering the result and any advisory
/// schema warnings.
pub async fn validate_file(config_path: &str) -> Result<String, KbFuzzError> {
    let path = PathBuf::from(config_path);
    let (config, warnings) = check_config(&path).await?;
    let has_url = config.target.as_ref().and_then(|t| t.base_url.as_ref()).is_some();
    let resolved = TargetConfig::from_config(&config, if has_url { None } else { Some(DEFAULT_BASE_URL) })?;

    let mut out = String::new();
    out.push_str(&format!("Configuration is valid: {}\n", config_path));
    out.push_str(&format!("  target:      {}\n", resolved.base_url));
    out.push_str(&format!("  api prefix:  {}\n", resolved.layout.api_prefix));
    out.push_str(&format!("  results dir: {}\n", resolved.results_dir.display()));
    if !warnings.is_empty() {
        out.push_str(&format!("{}\n", style(format!("{} schema warning(s):", warnings.len())).yellow()));
        for warning in &warnings {
            out.push_str(&format!("  - {}\n", warning));
        }
    }
    Ok(out)
}
