use thiserror::Error;

/// Failure kinds of the generation gateway.
///
/// `Display` is meant for logs. Anything shown to an end user must go
/// through [`GatewayError::user_message`], which never carries upstream detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("generation service not configured: {0}")]
    Configuration(String),
    #[error("generation service busy: {0}")]
    Busy(String),
    #[error("generation service error: {0}")]
    Service(String),
}

impl GatewayError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "API key not configured. Contact the administrator.",
            GatewayError::Busy(_) => "The AI service is busy. Please try again in a few seconds.",
            GatewayError::Service(_) => {
                "Something went wrong while processing your request. Please try again."
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, GatewayError::Configuration(_))
    }

    /// Map a non-success HTTP status (and its body) to an error kind.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        let lower = body.to_lowercase();
        let overloaded = lower.contains("overloaded")
            || lower.contains("rate_limit")
            || lower.contains("resource_exhausted");
        match status {
            429 | 503 | 529 => GatewayError::Busy(format!("{} returned HTTP {}", provider, status)),
            401 | 403 => GatewayError::Configuration(format!(
                "{} rejected the credential (HTTP {})",
                provider, status
            )),
            _ if overloaded => {
                GatewayError::Busy(format!("{} reported overload (HTTP {})", provider, status))
            }
            _ => GatewayError::Service(format!(
                "{} API error {}: {}",
                provider,
                status,
                body.chars().take(500).collect::<String>()
            )),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "request timed out"
        } else if e.is_connect() {
            "connection failed"
        } else if e.is_decode() {
            "could not decode response"
        } else {
            "request failed"
        };
        // Drop the URL so nothing query-borne ends up in logs
        GatewayError::Service(format!("{}: {}", kind, e.without_url()))
    }
}
