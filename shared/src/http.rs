//! HTTP helpers for the RSVP Lambda.

use lambda_http::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW,
    CONTENT_TYPE,
};
use lambda_http::http::response::Builder;
use lambda_http::http::HeaderValue;
use lambda_http::{Body, Response};
use serde::Serialize;

use crate::Error;

pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// RSVP endpoint response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            details: None,
            request_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(message.into()),
            details: None,
            request_id: None,
        }
    }

    /// Caller-facing view of an error. Diagnostics stay in the logs.
    pub fn from_error(err: &Error, request_id: Option<String>) -> Self {
        Self {
            details: err.public_details().map(String::from),
            request_id,
            ..Self::error(err.public_message())
        }
    }
}

/// Response builder carrying the cross-origin headers.
pub fn cors_builder(status: u16) -> Builder {
    Response::builder()
        .status(status)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
        .header(ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS)
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_builder(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(data)?))
        .map_err(Box::new)?)
}

/// Create an error response for the given error.
pub fn error_response(
    err: &Error,
    request_id: Option<String>,
) -> Result<Response<Body>, lambda_http::Error> {
    json_response(err.status_code(), &ApiResponse::from_error(err, request_id))
}

/// `405` answer naming the supported methods.
pub fn method_not_allowed() -> Result<Response<Body>, lambda_http::Error> {
    let mut response = json_response(405, &ApiResponse::error("Method not allowed"))?;
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    Ok(response)
}

/// Empty `200` answer to a CORS pre-flight request.
pub fn preflight_response() -> Result<Response<Body>, lambda_http::Error> {
    Ok(cors_builder(200).body(Body::Empty).map_err(Box::new)?)
}
