use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use log::info;
use serde_json::json;

use crate::error::ChatError;
use crate::web::models::ChatRequestBody;
use crate::web::sse;
use crate::AppState;

pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "Ollama chat gateway is running" }))
}

// Always 200; runtime trouble is reported in the body.
pub async fn health_check(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.catalog.check_health().await)
}

pub async fn list_models(data: web::Data<AppState>) -> Result<HttpResponse, ChatError> {
    let names = data.catalog.list_available_models().await?;
    Ok(HttpResponse::Ok().json(names))
}

pub async fn chat(
    data: web::Data<AppState>,
    body: web::Json<ChatRequestBody>,
) -> Result<HttpResponse, ChatError> {
    let request = body.into_inner().into_request(&data.default_model);
    let result = data.chat.handle_chat(&request).await?;
    Ok(HttpResponse::Ok().json(result))
}

// Errors raised before the first chunk get the same response as /chat.
pub async fn chat_stream(
    data: web::Data<AppState>,
    body: web::Json<ChatRequestBody>,
) -> Result<HttpResponse, ChatError> {
    let request = body.into_inner().into_request(&data.default_model);
    let chunks = data.chat.handle_chat_stream(&request).await?;

    info!("Streaming reply from model {}", request.model);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(sse::event_stream(chunks)))
}
