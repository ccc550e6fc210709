use tracing::debug;

/// Resolve a credential value. If the value starts with '$', treat it as an
/// environment variable reference and resolve from the environment.
pub fn resolve_credential(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        match std::env::var(var_name) {
            Ok(resolved) => {
                debug!(var = %var_name, "Resolved credential from environment");
                resolved
            }
            Err(_) => {
                debug!(var = %var_name, "Environment variable not set, using literal");
                value.to_string()
            }
        }
    } else {
        value.to_string()
    }
}

/// Mask a credential for logs: keep a short prefix, hide the rest.
pub fn mask_credential(value: &str) -> String {
    let visible: String = value.chars().take(8).collect();
    if value.chars().count() <= 8 {
        "[REDACTED]".to_string()
    } else {
        format!("{}…[REDACTED]", visible)
    }
}
