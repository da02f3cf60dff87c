//! Maps [`GatewayError`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use weather_core::GatewayError;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    error_type: String,
}

/// Newtype so [`GatewayError`] (defined in `weather-core`, with no
/// dependency on `axum`) can implement [`IntoResponse`] here.
pub struct HttpError(pub GatewayError);

impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            detail: self.0.to_string(),
            error_type: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
