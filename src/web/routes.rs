use actix_cors::Cors;
use actix_web::{error, web, HttpResponse};

use crate::web::handlers;
use crate::web::models::ErrorResponse;

/// Unparseable bodies are a caller mistake, reported like any other validation failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorResponse {
            detail: err.to_string(),
        };
        error::InternalError::from_response(err, HttpResponse::UnprocessableEntity().json(body))
            .into()
    })
}

/// Browser frontends usually live on another origin. No origins configured
/// means any origin may call the API.
pub fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }

    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health_check))
        .route("/models", web::get().to(handlers::list_models))
        .route("/chat", web::post().to(handlers::chat))
        .route("/chat/stream", web::post().to(handlers::chat_stream));
}
