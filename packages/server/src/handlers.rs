//! HTTP handler functions for the aviation API.

use std::convert::Infallible;

use actix_web::{HttpRequest, HttpResponse, web};
use aviation_server_models::{ApiHealth, FetchFlightsInput, RpcErrorCode, RpcResponse};

use crate::{ApiError, ErrorContext, REQUEST_ID_HEADER, handle_error, request_id};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/aviation.fetchFlights`
///
/// Reserved for flight-data queries over the synced BTS dataset. The input
/// is validated and the procedure returns no data.
pub async fn fetch_flights(
    req: HttpRequest,
    input: web::Json<FetchFlightsInput>,
) -> Result<HttpResponse, ApiError> {
    let request_id = request_id(&req);
    let input = input.into_inner();

    log::debug!(
        "aviation.fetchFlights [{request_id}] {}..{}",
        input.start_date,
        input.end_date
    );

    let data = query_flights(&input).map_err(|e| {
        handle_error(
            &e,
            &ErrorContext {
                service: "aviation",
                operation: "fetch",
                input: serde_json::to_value(&input).ok(),
            },
            request_id.clone(),
        )
    })?;

    Ok(HttpResponse::Ok()
        .insert_header((REQUEST_ID_HEADER, request_id))
        .json(RpcResponse::new(data)))
}

/// Fallback for a procedure path hit with the wrong HTTP method.
pub async fn method_not_supported(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::new(
        RpcErrorCode::MethodNotSupported,
        format!("Unsupported {} request to {}", req.method(), req.path()),
        request_id(&req),
    ))
}

#[allow(clippy::unnecessary_wraps)]
const fn query_flights(_input: &FetchFlightsInput) -> Result<(), Infallible> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};

    use crate::configure;

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn fetch_flights_returns_null_data_and_echoes_request_id() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/aviation.fetchFlights")
            .insert_header(("x-request-id", "req-7"))
            .set_json(serde_json::json!({ "startDate": "2024-04-01", "endDate": "2024-04-30" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-7");

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "result": { "data": null } }));
    }

    #[actix_web::test]
    async fn fetch_flights_generates_request_id() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/aviation.fetchFlights")
            .set_json(serde_json::json!({ "startDate": "a", "endDate": "b" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        let id = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[actix_web::test]
    async fn malformed_input_is_bad_request_envelope() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/aviation.fetchFlights")
            .insert_header(("x-request-id", "req-8"))
            .set_json(serde_json::json!({ "startDate": "2024-04-01" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["data"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["data"]["httpStatus"], 400);
        assert_eq!(body["error"]["data"]["requestId"], "req-8");
    }

    #[actix_web::test]
    async fn fetch_flights_rejects_get_with_envelope() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/aviation.fetchFlights")
            .insert_header(("x-request-id", "req-9"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-9");

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["data"]["code"], "METHOD_NOT_SUPPORTED");
        assert_eq!(body["error"]["data"]["httpStatus"], 405);
        assert_eq!(body["error"]["data"]["requestId"], "req-9");
    }
}
