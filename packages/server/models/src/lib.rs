#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! RPC request, response and error envelopes for the aviation server.
//!
//! The wire shapes follow the tRPC HTTP convention the frontend already
//! speaks: successes are wrapped as `{"result":{"data":...}}` and failures
//! as `{"error":{"message","code","data":{...}}}`.

use serde::{Deserialize, Serialize};

/// Input of the `aviation.fetchFlights` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFlightsInput {
    /// Start of the requested range, as sent by the client.
    pub start_date: String,
    /// End of the requested range, as sent by the client.
    pub end_date: String,
}

/// Successful RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    /// Wrapped result.
    pub result: RpcResult<T>,
}

/// The `result` member of an [`RpcResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResult<T> {
    /// Procedure output (`null` for procedures that return nothing).
    pub data: T,
}

impl<T> RpcResponse<T> {
    /// Wraps a procedure output.
    pub const fn new(data: T) -> Self {
        Self {
            result: RpcResult { data },
        }
    }
}

/// Error classes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorCode {
    /// The request body could not be decoded into the procedure input.
    BadRequest,
    /// The procedure exists but not for this HTTP method.
    MethodNotSupported,
    /// Any failure inside a procedure.
    InternalServerError,
}

impl RpcErrorCode {
    /// HTTP status the code is reported with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::MethodNotSupported => 405,
            Self::InternalServerError => 500,
        }
    }

    /// JSON-RPC style numeric code.
    #[must_use]
    pub const fn json_rpc_code(self) -> i32 {
        match self {
            Self::BadRequest => -32600,
            Self::MethodNotSupported => -32001,
            Self::InternalServerError => -32603,
        }
    }
}

/// Failed RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorResponse {
    /// Error details.
    pub error: RpcErrorShape,
}

/// The `error` member of an [`RpcErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorShape {
    /// Human-readable message.
    pub message: String,
    /// Numeric JSON-RPC code.
    pub code: i32,
    /// Structured error data.
    pub data: RpcErrorData,
}

/// Structured data attached to every error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcErrorData {
    /// Error class.
    pub code: RpcErrorCode,
    /// HTTP status.
    pub http_status: u16,
    /// Correlation id of the failed request.
    pub request_id: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_flights_input_uses_camel_case() {
        let input: FetchFlightsInput =
            serde_json::from_str(r#"{"startDate":"2024-04-01","endDate":"2024-04-30"}"#).unwrap();
        assert_eq!(input.start_date, "2024-04-01");
        assert_eq!(input.end_date, "2024-04-30");
    }

    #[test]
    fn empty_result_serializes_as_null_data() {
        let json = serde_json::to_value(RpcResponse::new(())).unwrap();
        assert_eq!(json, serde_json::json!({ "result": { "data": null } }));
    }

    #[test]
    fn error_data_is_camel_case_with_screaming_code() {
        let json = serde_json::to_value(RpcErrorData {
            code: RpcErrorCode::InternalServerError,
            http_status: 500,
            request_id: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "code": "INTERNAL_SERVER_ERROR",
                "httpStatus": 500,
                "requestId": "abc",
            })
        );
    }

    #[test]
    fn method_not_supported_is_405() {
        let code = RpcErrorCode::MethodNotSupported;
        assert_eq!(code.http_status(), 405);
        assert_eq!(
            serde_json::to_value(code).unwrap(),
            serde_json::json!("METHOD_NOT_SUPPORTED")
        );
    }
}
