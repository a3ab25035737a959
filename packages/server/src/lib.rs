#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web RPC server for the aviation stack.
//!
//! Procedures are mounted under `/api` using the `{router}.{procedure}`
//! path convention, so `aviation.fetchFlights` is served at
//! `POST /api/aviation.fetchFlights`. Every response carries the request's
//! correlation id in the `x-request-id` header.

mod error;
mod handlers;
pub mod interactive;

use actix_cors::Cors;
use actix_web::{App, HttpRequest, HttpServer, middleware, web};

pub use error::{ApiError, ErrorContext, handle_error};

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Returns the caller-supplied correlation id, or a fresh UUID v4.
#[must_use]
pub fn request_id(req: &HttpRequest) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string)
}

/// Registers the API routes.
///
/// Input that fails to decode is answered with a `BAD_REQUEST` error
/// envelope instead of actix's plain-text default.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, req| {
        ApiError::bad_request(err.to_string(), request_id(req)).into()
    });

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .route("/health", web::get().to(handlers::health))
            .service(
                web::resource("/aviation.fetchFlights")
                    .route(web::post().to(handlers::fetch_flights))
                    .default_service(web::to(handlers::method_not_supported)),
            ),
    );
}

/// Address the server listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind, `127.0.0.1` by default.
    pub bind_addr: String,
    /// TCP port, `8080` by default.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR` and `PORT`, falling back to the defaults for unset
    /// or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("BIND_ADDR")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.bind_addr),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Starts the server on `config.bind_addr:config.port`.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let ServerConfig { bind_addr, port } = config;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(|| {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn request_id_prefers_header() {
        let req = TestRequest::default()
            .insert_header((REQUEST_ID_HEADER, "req-42"))
            .to_http_request();
        assert_eq!(request_id(&req), "req-42");
    }

    #[test]
    fn request_id_falls_back_to_uuid() {
        let req = TestRequest::default().to_http_request();
        let id = request_id(&req);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_ne!(id, request_id(&req));
    }

    #[test]
    fn server_config_defaults_to_localhost_8080() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn server_config_reads_overrides() {
        let config = ServerConfig::from_lookup(|name| match name {
            "BIND_ADDR" => Some("0.0.0.0".to_string()),
            "PORT" => Some("9000".to_string()),
            _ => None,
        });
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn server_config_ignores_bad_port() {
        let config = ServerConfig::from_lookup(|name| (name == "PORT").then(|| "http".to_string()));
        assert_eq!(config.port, 8080);
    }
}
