use reqwest::StatusCode;

/// Failure of a single remote operation. No retries happen at this layer;
/// callers decide whether the failure is blocking (upload/delete) or
/// log-and-keep-going telemetry (view/like/duration).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure, no response was received.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response, with the server's `{message}` payload when it sent one.
    #[error("server error ({status}): {message}")]
    Server { status: StatusCode, message: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ApiError::Server {
                status: StatusCode::NOT_FOUND,
                ..
            }
        )
    }

    /// The message a user should see: the server's own words when available.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => "Network error, please try again.".to_string(),
            ApiError::Server { message, .. } => message.clone(),
        }
    }
}
