mod catalog;
mod chat;
mod config;
mod conversation;
mod error;
mod model;
mod web;

use std::sync::Arc;

use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;

use catalog::ModelCatalog;
use chat::ChatService;
use config::Settings;
use model::{ModelRuntime, OllamaRuntime};
use web::routes;

// Shared by every worker; nothing in here changes after startup.
struct AppState {
    chat: ChatService,
    catalog: ModelCatalog,
    default_model: String,
}

impl AppState {
    fn new(runtime: Arc<dyn ModelRuntime>, default_model: impl Into<String>) -> Self {
        Self {
            chat: ChatService::new(runtime.clone()),
            catalog: ModelCatalog::new(runtime),
            default_model: default_model.into(),
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Ollama chat gateway");

    let settings = Settings::from_env()?;
    let runtime = OllamaRuntime::new(&settings).context("failed to build Ollama client")?;

    let app_state = Data::new(AppState::new(Arc::new(runtime), settings.default_model.clone()));

    let cors_origins = settings.cors_origins.clone();
    if cors_origins.is_empty() {
        info!("CORS: allowing any origin");
    } else {
        info!("CORS: allowing {}", cors_origins.join(", "));
    }

    info!("Listening on {}:{}", settings.host, settings.port);
    HttpServer::new(move || {
        App::new()
            .wrap(routes::cors(&cors_origins))
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind((settings.host.as_str(), settings.port))
    .with_context(|| format!("failed to bind {}:{}", settings.host, settings.port))?
    .run()
    .await?;

    Ok(())
}
