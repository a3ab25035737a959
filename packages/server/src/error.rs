//! RPC error type and the procedure error wrapper.

use std::fmt::Display;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use aviation_server_models::{RpcErrorCode, RpcErrorData, RpcErrorResponse, RpcErrorShape};

use crate::REQUEST_ID_HEADER;

/// An error returned to an RPC client.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    code: RpcErrorCode,
    message: String,
    request_id: String,
}

impl ApiError {
    /// Creates an error of the given class.
    pub fn new(
        code: RpcErrorCode,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    /// Input that could not be decoded.
    pub fn bad_request(message: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::new(RpcErrorCode::BadRequest, message, request_id)
    }

    /// Error class.
    #[must_use]
    pub const fn code(&self) -> RpcErrorCode {
        self.code
    }

    /// Correlation id of the failed request.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn envelope(&self) -> RpcErrorResponse {
        RpcErrorResponse {
            error: RpcErrorShape {
                message: self.message.clone(),
                code: self.code.json_rpc_code(),
                data: RpcErrorData {
                    code: self.code,
                    http_status: self.code.http_status(),
                    request_id: self.request_id.clone(),
                },
            },
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header((REQUEST_ID_HEADER, self.request_id.clone()))
            .json(self.envelope())
    }
}

/// Where a procedure failure happened.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Router name, e.g. `aviation`.
    pub service: &'static str,
    /// Procedure name, e.g. `fetch`.
    pub operation: &'static str,
    /// The decoded input, logged alongside the failure.
    pub input: Option<serde_json::Value>,
}

/// Wraps a procedure failure as an `INTERNAL_SERVER_ERROR`.
///
/// The message reads `Error in {service}.{operation}: {error}`.
pub fn handle_error(
    error: &impl Display,
    context: &ErrorContext,
    request_id: impl Into<String>,
) -> ApiError {
    let input = context
        .input
        .as_ref()
        .map_or_else(|| "{}".to_string(), ToString::to_string);
    let request_id = request_id.into();

    log::error!(
        "Error in {}.{} [{request_id}] input={input}: {error}",
        context.service,
        context.operation,
    );

    ApiError::new(
        RpcErrorCode::InternalServerError,
        format!(
            "Error in {}.{}: {error}",
            context.service, context.operation
        ),
        request_id,
    )
}
