/// HTTP server hosting WebSocket grid sessions
use actix_web::{middleware, web, App, Error, HttpRequest, HttpResponse, HttpServer};
use actix_web_actors::ws;

use crate::config::GridConfig;
use crate::websocket::{AppState, GridSession};

/// WebSocket endpoint handler
async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let resp = ws::start(GridSession::new(state), &req, stream)?;
    Ok(resp)
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let datasets: Vec<String> = state
        .datasets
        .lock()
        .map(|d| d.keys().cloned().collect())
        .unwrap_or_default();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "LiveGrid WebSocket server is running",
        "datasets": datasets,
    }))
}

/// Start the HTTP server with WebSocket support
pub async fn run_server(host: &str, port: u16, config: GridConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(config));

    log::info!("LiveGrid WebSocket server");
    log::info!("WebSocket: ws://{}:{}/ws", host, port);
    log::info!("Health check: http://{}:{}/health", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            // CORS for development
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .route("/ws", web::get().to(ws_index))
            .route("/health", web::get().to(health_check))
    })
    .bind((host, port))?
    .run()
    .await
}
