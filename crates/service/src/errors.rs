use advisor_core::{ArtifactError, EncodeError, ModelError, PredictError};
use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by the prediction service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no data provided")]
    EmptyRequest,

    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    #[error("missing answers: {}", .0.join(", "))]
    MissingAnswers(Vec<String>),

    #[error("{0}")]
    Artifacts(#[from] ArtifactError),

    #[error("{0}")]
    Encode(#[from] EncodeError),

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PredictError> for ServiceError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Encode(e) => Self::from(e),
            PredictError::Model(e) => Self::Model(e),
        }
    }
}

impl ServiceError {
    /// HTTP status reported for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyRequest | Self::InvalidRequest(_) | Self::MissingAnswers(_) => StatusCode::BAD_REQUEST,
            Self::Encode(EncodeError::MissingAnswers(_)) => StatusCode::BAD_REQUEST,
            Self::Encode(EncodeError::UnknownCategory { .. } | EncodeError::NotInteger { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Artifacts(ArtifactError::Missing(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encode(_) | Self::Artifacts(_) | Self::Model(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServiceError::EmptyRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::MissingAnswers(vec!["Potência desejada".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::from(EncodeError::UnknownCategory {
                column: "O que irá moer?".into(),
                value: "Peixe".into()
            })
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::from(PredictError::Encode(EncodeError::NotInteger {
                column: "Potência desejada".into(),
                value: "alta".into()
            }))
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::from(ArtifactError::Missing(PathBuf::from("models/model.json"))).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::from(ArtifactError::Inconsistent("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Internal("task panicked".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_answers_message_lists_every_question() {
        let err = ServiceError::MissingAnswers(vec!["O que irá moer?".into(), "Potência desejada".into()]);
        assert_eq!(err.to_string(), "missing answers: O que irá moer?, Potência desejada");
    }
}
