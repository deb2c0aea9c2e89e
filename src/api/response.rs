use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::errors::ApiError;

/// Body shape shared by every API route.
#[derive(Debug, Serialize)]
pub(crate) struct ApiResponse<T> {
    pub(crate) success: bool,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) errors: Option<Vec<String>>,
}

/// Successful response with a status code and message.
pub(crate) struct Envelope<T> {
    status: StatusCode,
    message: Cow<'static, str>,
    data: Option<T>,
}

pub(crate) type ApiResult<T> = Result<Envelope<T>, ApiError>;

pub(crate) fn ok<T>(message: impl Into<Cow<'static, str>>, data: T) -> Envelope<T> {
    Envelope { status: StatusCode::OK, message: message.into(), data: Some(data) }
}

pub(crate) fn created<T>(message: impl Into<Cow<'static, str>>, data: T) -> Envelope<T> {
    Envelope { status: StatusCode::CREATED, message: message.into(), data: Some(data) }
}

pub(crate) fn done(message: impl Into<Cow<'static, str>>) -> Envelope<()> {
    Envelope { status: StatusCode::OK, message: message.into(), data: None }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            success: true,
            message: self.message.into_owned(),
            data: self.data,
            errors: None,
        };
        (self.status, Json(body)).into_response()
    }
}
