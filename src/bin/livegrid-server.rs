/// LiveGrid WebSocket Server
///
/// Serves grid sessions over WebSocket. Configured from the environment:
/// `HOST`, `PORT` and an optional `LIVEGRID_CONFIG` JSON file.

use livegrid::config::GridConfig;
use livegrid::server::run_server;
use std::io;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("PORT must be a number: {}", e)))?;

    let config = match std::env::var("LIVEGRID_CONFIG") {
        Ok(path) => GridConfig::from_file(&path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{}: {}", path, e)))?,
        Err(_) => GridConfig::default(),
    };

    run_server(&host, port, config).await
}
