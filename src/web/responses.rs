//! Response conversions
//!
//! Errors are status-only: devices never see internal details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::errors::AppError;
use crate::protocol::DeviceReply;

pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::UnknownCommand { .. } => StatusCode::NOT_FOUND,
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::RenderFailed(_) | AppError::Configuration { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        status.into_response()
    }
}

impl IntoResponse for DeviceReply {
    fn into_response(self) -> Response {
        match self {
            DeviceReply::Setup(setup) => Json(setup).into_response(),
            DeviceReply::Display(display) => Json(display).into_response(),
            DeviceReply::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RenderError;
    use std::time::Duration;

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            status_for(&AppError::unknown_command("reboot")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AppError::validation("bad rotation")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AppError::RenderFailed(RenderError::Timeout {
                after: Duration::from_secs(30)
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&AppError::configuration("bad page url")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_no_content_reply() {
        assert_eq!(
            DeviceReply::NoContent.into_response().status(),
            StatusCode::NO_CONTENT
        );
    }
}
