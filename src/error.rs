use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing caller identity")]
    Unauthorized,

    #[error("{provider} error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    ExternalService {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("applied {completed} of {total} moves before failure: {message}")]
    PartialApply {
        change_log_id: String,
        completed: usize,
        total: usize,
        message: String,
    },

    #[error("reverted {reverted} of {total} moves before failure: {message}")]
    PartialUndo {
        change_log_id: String,
        reverted: usize,
        total: usize,
        message: String,
    },

    #[error("{0}")]
    General(String),
}

impl AppError {
    pub fn external(provider: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            provider: provider.to_string(),
            status,
            message: message.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidState(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ExternalService { .. } | Self::PartialApply { .. } | Self::PartialUndo { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    change_log_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let change_log_id = match &self {
            AppError::PartialApply { change_log_id, .. }
            | AppError::PartialUndo { change_log_id, .. } => Some(change_log_id.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            change_log_id,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::InvalidState("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::external("drive", Some(429), "rate limited").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::General("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn external_error_includes_provider_status() {
        let err = AppError::external("drive", Some(403), "quota exceeded");
        assert_eq!(err.to_string(), "drive error (status 403): quota exceeded");
    }
}
