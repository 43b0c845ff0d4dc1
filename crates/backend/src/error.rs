use homequote_core::submission::BookingValidation;
use homequote_core::ApplicationError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("backend payload violated contract: {0}")]
    Contract(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<BackendError> for ApplicationError {
    fn from(error: BackendError) -> Self {
        ApplicationError::Integration(error.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("booking is incomplete")]
    Validation(BookingValidation),
    #[error("booking rejected ({status}): {error}")]
    Rejected { status: u16, error: String, detail: Option<String>, hint: Option<String> },
    #[error("booking could not be delivered: {0}")]
    Transport(String),
}

#[derive(Debug, Default, Deserialize)]
struct RejectionBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl From<BackendError> for SubmissionError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Status { status, body } => {
                let parsed = serde_json::from_str::<RejectionBody>(&body).unwrap_or_default();
                let error = parsed
                    .error
                    .or(parsed.message)
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| {
                        let trimmed = body.trim();
                        if trimmed.is_empty() {
                            format!("booking request failed with status {status}")
                        } else {
                            trimmed.to_string()
                        }
                    });
                Self::Rejected { status, error, detail: parsed.detail, hint: parsed.hint }
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendError, SubmissionError};

    #[test]
    fn status_body_fields_surface_verbatim() {
        let error = SubmissionError::from(BackendError::Status {
            status: 409,
            body: r#"{"error":"slot taken","detail":"09:00 is booked","hint":"pick another time"}"#
                .to_string(),
        });

        assert_eq!(
            error,
            SubmissionError::Rejected {
                status: 409,
                error: "slot taken".to_string(),
                detail: Some("09:00 is booked".to_string()),
                hint: Some("pick another time".to_string()),
            }
        );
    }

    #[test]
    fn non_json_body_is_used_as_message() {
        let error = SubmissionError::from(BackendError::Status {
            status: 500,
            body: "upstream exploded".to_string(),
        });

        assert!(matches!(
            error,
            SubmissionError::Rejected { ref error, detail: None, hint: None, .. }
                if error == "upstream exploded"
        ));
    }

    #[test]
    fn empty_body_gets_status_message() {
        let error =
            SubmissionError::from(BackendError::Status { status: 502, body: String::new() });

        assert!(matches!(
            error,
            SubmissionError::Rejected { ref error, .. }
                if error == "booking request failed with status 502"
        ));
    }

    #[test]
    fn decode_failures_are_transport_errors() {
        let error = SubmissionError::from(BackendError::Decode("expected value".to_string()));
        assert!(matches!(error, SubmissionError::Transport(_)));
    }
}
