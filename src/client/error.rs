use crate::models::FormErrors;

/// Failures surfaced by the API client and the session built on it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error status or `success: false`.
    /// `message` is the server's text, passed through unmodified.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("credential storage error: {0}")]
    Storage(String),
    /// An authenticated action was attempted without a logged-in user.
    #[error("Not logged in")]
    NotAuthenticated,
    /// A form failed local validation before anything was sent.
    #[error("{0}")]
    Invalid(FormErrors),
    /// An image was given a content type that is not a valid MIME type.
    #[error("{file_name}: invalid content type '{content_type}'")]
    InvalidContentType {
        file_name: String,
        content_type: String,
    },
}

impl ClientError {
    /// The HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
