//! Konnect authentication
//!
//! Resolves the personal access or system account token used for API
//! calls. Order: explicit flag, `KONNECT_TOKEN`, then the config file.

use anyhow::Result;

pub const TOKEN_ENV: &str = "KONNECT_TOKEN";

/// Known Konnect token prefixes
const TOKEN_PREFIXES: &[&str] = &["kpat_", "spat_"];

/// Tokens are opaque, but never contain whitespace or control characters.
fn validate_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_graphic())
}

/// Pick the first non-empty token from flag, environment, then config.
pub fn resolve_token(flag: Option<&str>, configured: Option<&str>) -> Result<String> {
    let env_token = std::env::var(TOKEN_ENV).ok();
    let candidates = [
        ("--token", flag.map(str::to_string)),
        (TOKEN_ENV, env_token),
        ("config", configured.map(str::to_string)),
    ];

    for (source, candidate) in candidates {
        let Some(token) = candidate.map(|t| t.trim().to_string()) else {
            continue;
        };
        if token.is_empty() {
            continue;
        }
        if !validate_token(&token) {
            tracing::warn!("Ignoring malformed token from {}", source);
            continue;
        }
        if !TOKEN_PREFIXES.iter().any(|p| token.starts_with(p)) {
            tracing::warn!("Token from {} does not have a known Konnect prefix", source);
        }
        tracing::debug!("Using token from {}", source);
        return Ok(token);
    }

    Err(anyhow::anyhow!(
        "No Konnect token found. Pass --token, set {}, or add \"token\" to the config file",
        TOKEN_ENV
    ))
}
