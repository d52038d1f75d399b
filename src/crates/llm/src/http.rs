//! Shared HTTP plumbing for the provider clients.

use reqwest::StatusCode;
use stategraph::ChatError;

/// Map a transport-level reqwest failure onto [`ChatError`].
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout(format!("{provider}: {err}"))
    } else {
        ChatError::Transport(format!("{provider}: {err}"))
    }
}

/// Map a non-success HTTP status plus response body onto [`ChatError`].
///
/// 401/403 are authentication failures, 429 rate limiting, 408 a timeout,
/// other 4xx a malformed request, and 5xx a server-side provider failure.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> ChatError {
    let detail = format!("{provider} returned {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited(detail),
        StatusCode::REQUEST_TIMEOUT => ChatError::Timeout(detail),
        s if s.is_client_error() => ChatError::InvalidRequest(detail),
        _ => ChatError::Provider(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            status_error("openai", StatusCode::UNAUTHORIZED, ""),
            ChatError::Auth(_)
        ));
        assert!(matches!(
            status_error("openai", StatusCode::TOO_MANY_REQUESTS, ""),
            ChatError::RateLimited(_)
        ));
        assert!(matches!(
            status_error("openai", StatusCode::REQUEST_TIMEOUT, ""),
            ChatError::Timeout(_)
        ));
        assert!(matches!(
            status_error("openai", StatusCode::BAD_REQUEST, ""),
            ChatError::InvalidRequest(_)
        ));
        assert!(matches!(
            status_error("openai", StatusCode::INTERNAL_SERVER_ERROR, ""),
            ChatError::Provider(_)
        ));
    }

    #[test]
    fn retryability_follows_classification() {
        assert!(status_error("x", StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(status_error("x", StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!status_error("x", StatusCode::UNAUTHORIZED, "").is_retryable());
        assert!(!status_error("x", StatusCode::UNPROCESSABLE_ENTITY, "").is_retryable());
    }
}
