use thiserror::Error;

use crate::auth_messages::auth_error_message;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} ({code}): {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("gateway error: {0}")]
    Gateway(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Text to show the user. Auth failures use the fixed message table,
    /// everything else collapses to "Failed to {action}".
    pub fn user_message(&self, action: &str) -> String {
        match self.code() {
            Some(code) if code.starts_with("auth/") => auth_error_message(code).to_string(),
            _ => format!("Failed to {action}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, code: &str) -> ClientError {
        ClientError::Http {
            status,
            code: code.into(),
            message: "server text".into(),
        }
    }

    #[test]
    fn auth_errors_use_the_lookup_table() {
        assert_eq!(
            http(400, "auth/weak-password").user_message("create account"),
            "Password must be at least 8 characters long."
        );
    }

    #[test]
    fn other_errors_are_generic() {
        let err = http(409, "conflict");
        assert!(err.is_conflict());
        assert_eq!(err.user_message("save game"), "Failed to save game");

        let err = ClientError::Gateway("closed".into());
        assert_eq!(err.status(), None);
        assert_eq!(err.user_message("load notifications"), "Failed to load notifications");
    }
}
