use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use actix_cors::Cors;
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use log::info;

mod error;
mod models;
mod handlers;
mod services;
mod utils;

use handlers::insights::handle_insights;
use handlers::roast::handle_roast;
use handlers::AppState;
use services::gemini::GeminiClient;
use services::github::GitHubClient;
use services::roaster::RoastOrchestrator;

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "github-griller"
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let github_token = env::var("GITHUB_TOKEN").ok();
    let gemini_api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");
    let gemini_model = env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

    if github_token.is_none() {
        info!("GITHUB_TOKEN not set; running against the unauthenticated rate limit");
    }

    let github_client =
        Arc::new(GitHubClient::new(github_token).expect("Failed to create GitHub client"));
    let gemini_client = Arc::new(GeminiClient::new(gemini_api_key, gemini_model));
    let orchestrator = Arc::new(RoastOrchestrator::new(
        github_client,
        gemini_client.clone(),
    ));
    let insights_http = reqwest::Client::builder()
        .user_agent("github-griller")
        .build()
        .expect("Failed to create HTTP client");

    let app_state = web::Data::new(AppState {
        orchestrator,
        gemini: gemini_client,
        insights_http,
    });

    let bind_addr = format!("{}:{}", host, port);
    info!("Starting server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .route("/health", web::get().to(health_check))
            .route("/roast", web::post().to(handle_roast))
            .route("/insights", web::post().to(handle_insights))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
