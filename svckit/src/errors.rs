use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("A submission is already in flight")]
    InFlight,
}

impl DashError {
    /// Whether the backend was never reached (as opposed to answering badly).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, DashError::NetworkError(_))
    }
}

impl From<reqwest::Error> for DashError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashError::DecodeError(err.to_string())
        } else {
            DashError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::DecodeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_decode() {
        let err: DashError = serde_json::from_str::<serde_json::Value>("<html>")
            .unwrap_err()
            .into();
        assert!(matches!(err, DashError::DecodeError(_)));
        assert!(!err.is_unreachable());
    }

    #[test]
    fn test_only_network_errors_are_unreachable() {
        assert!(DashError::NetworkError("refused".to_string()).is_unreachable());
        for err in [
            DashError::Rejected { status: 500, body: String::new() },
            DashError::DecodeError("bad json".to_string()),
            DashError::ValidationError("no patient".to_string()),
            DashError::InFlight,
        ] {
            assert!(!err.is_unreachable(), "{err}");
        }
    }

    #[test]
    fn test_rejected_display_carries_status_and_body() {
        let err = DashError::Rejected { status: 400, body: "Falta 'maquina'".to_string() };
        assert_eq!(err.to_string(), "Request rejected with HTTP 400: Falta 'maquina'");
    }
}
