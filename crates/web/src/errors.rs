use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::templates::TemplateError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    body: ErrorBody,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: Option<String>) -> Self {
        let body = ErrorBody {
            status: status.as_u16(),
            message: message.into(),
            code,
        };
        Self { status, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<TemplateError> for HttpError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "not found", Some("not_found".to_string()))
            }
            TemplateError::Encoding(_)
            | TemplateError::Compile { .. }
            | TemplateError::Render { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to render page",
                Some("render_failed".to_string()),
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
