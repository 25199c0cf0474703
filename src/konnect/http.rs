//! HTTP utilities for Konnect REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate long bodies and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Konnect API calls
#[derive(Clone)]
pub struct KonnectHttpClient {
    client: Client,
}

impl KonnectHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("konctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// GET a JSON document
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);
        let (status, body) = self.send(self.client.get(url).bearer_auth(token)).await?;
        check_status(status, &body)?;
        parse_body(&body)
    }

    /// GET a JSON document, mapping 404 and empty bodies to `None`
    pub async fn get_optional(&self, url: &str, token: &str) -> Result<Option<Value>> {
        tracing::debug!("GET {}", url);
        let (status, body) = self.send(self.client.get(url).bearer_auth(token)).await?;
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("GET {} returned 404", url);
            return Ok(None);
        }
        check_status(status, &body)?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_body(&body).map(Some)
    }

    /// PATCH a JSON document
    pub async fn patch(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        tracing::debug!("PATCH {}", url);
        let (status, response_body) = self
            .send(self.client.patch(url).bearer_auth(token).json(body))
            .await?;
        check_status(status, &response_body)?;

        if response_body.is_empty() {
            return Ok(Value::Null);
        }
        parse_body(&response_body)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request.send().await.context("Failed to send request")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok((status, body))
    }
}

fn check_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    tracing::error!("API error: {} - {}", status, sanitize_for_log(body));
    Err(anyhow::anyhow!("API request failed: {}", status))
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).context("Failed to parse response JSON")
}

/// Format a Konnect API error for display
pub fn format_konnect_error(error: &anyhow::Error) -> String {
    let error_str = format!("{:#}", error);

    if error_str.contains("403") {
        return "Permission denied. Check the token's Konnect roles.".to_string();
    }
    if error_str.contains("401") {
        return "Authentication failed. Check KONNECT_TOKEN or --token.".to_string();
    }
    if error_str.contains("404") {
        return "Resource not found.".to_string();
    }
    if error_str.contains("429") {
        return "Rate limit exceeded. Please try again later.".to_string();
    }
    if error_str.contains("400") {
        return "Invalid request. Check your parameters.".to_string();
    }
    if error_str.contains("500") || error_str.contains("503") {
        return "Konnect temporarily unavailable. Please try again.".to_string();
    }
    if error_str.contains("409") {
        return "Resource conflict. The resource may already exist or be in use.".to_string();
    }
    if error_str.contains("API request failed") {
        return "Request failed. Check your network connection and try again.".to_string();
    }

    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(500);
        let sanitized = sanitize_for_log(&long);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("500 bytes total"));
        assert_eq!(sanitize_for_log("ok\nbody"), "okbody");
    }

    #[test]
    fn test_format_konnect_error() {
        let err = anyhow::anyhow!("API request failed: 401 Unauthorized");
        assert!(format_konnect_error(&err).contains("Authentication failed"));
        let err = anyhow::anyhow!("API request failed: 418 I'm a teapot");
        assert!(format_konnect_error(&err).starts_with("Request failed"));
    }
}
