use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use authgate_server::auth::handlers::{csrf_token, login, logout, profile, register};
use authgate_server::config::CorsConfig;
use authgate_server::{health_check, AppError, AppState, InMemoryDirectory, Settings, UserDirectory};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
    } else {
        Cors::default()
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE"])
            .allowed_headers(vec!["Content-Type", "X-CSRF-Token"])
            .supports_credentials()
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> authgate_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    // Load configuration; a missing signing secret fails here, before the
    // server ever binds.
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    let server_config = config.server.clone();

    // The persistent user directory lives outside this service; the in-memory
    // implementation backs local runs.
    let users: Arc<dyn UserDirectory> = Arc::new(InMemoryDirectory::new());
    let state = web::Data::new(AppState::new(config, users));

    let listener = TcpListener::bind(format!("{}:{}", server_config.host, server_config.port))?;
    info!(
        "Starting gateway at {}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        App::new()
            // Registered before CORS so the CORS layer runs first and
            // preflight requests never reach the gate.
            .wrap(state.gate())
            .wrap(build_cors(&state.config.cors))
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .route("/api/login", web::post().to(login))
            .route("/api/register", web::post().to(register))
            .route("/api/logout", web::post().to(logout))
            .route("/api/csrf", web::get().to(csrf_token))
            .route("/api/profile", web::get().to(profile))
    })
    .listen(listener)?
    .workers(server_config.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
