//! BoxBox Server - shared item box lending
//!
//! REST API server for borrowing boxes of items and tracking their return.

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boxbox_server::{
    api,
    clock::SystemClock,
    config::{AppConfig, LoggingConfig, StorageBackend},
    repository::{MemoryStore, Repository, Store},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting BoxBox Server v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    tracing::info!(backend = store.backend_name(), "Store ready");

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let sweep_on_startup = config.notifications.sweep_on_startup;

    let services = Services::new(store, Arc::new(SystemClock), &config);

    services
        .users
        .ensure_default_admin()
        .await
        .context("Failed to create the default admin")?;

    if sweep_on_startup {
        let notifications = services.notifications.clone();
        tokio::spawn(async move {
            notifications.run_due_soon_sweep().await;
        });
    }
    let sweeper = services.notifications.spawn_sweeper();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("Server shut down");
    Ok(())
}

/// Console output in pretty or JSON form, plus an optional daily log file
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("boxbox_server={},tower_http=debug", logging.level).into());

    let json = logging.format.eq_ignore_ascii_case("json");
    let pretty_layer = (!json).then(tracing_subscriber::fmt::layer);
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());

    let (file_layer, guard) = match logging.file.as_deref() {
        Some(path) => {
            let path = std::path::Path::new(path);
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "boxbox.log".to_string());
            let appender = tracing_appender::rolling::daily(
                directory.unwrap_or_else(|| std::path::Path::new(".")),
                file_name,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    guard
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .connect(&config.database.url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!("Database migrations completed");
            Ok(Arc::new(Repository::new(pool)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication and own account
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        .route("/auth/profile", put(api::auth::update_profile))
        .route("/auth/password", put(api::auth::change_password))
        .route("/auth/account", delete(api::auth::delete_account))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users/admins", post(api::users::create_admin))
        .route("/users/:id", delete(api::users::delete_user))
        .route("/users/:id/message", post(api::users::send_message))
        // Boxes and items
        .route("/boxes", get(api::boxes::list_boxes).post(api::boxes::create_box))
        .route("/boxes/:id", put(api::boxes::update_box).delete(api::boxes::delete_box))
        .route("/boxes/:id/items", get(api::boxes::list_box_items))
        .route("/boxes/:id/borrow", post(api::records::borrow_box))
        .route("/items", get(api::boxes::list_items))
        // Records
        .route("/records", get(api::records::list_records))
        .route("/records/return-request", post(api::records::request_return_batch))
        .route("/records/status", post(api::records::update_status))
        .route("/records/delete", post(api::records::delete_records))
        .route("/records/:id/return-request", post(api::records::request_return))
        .route("/records/:id/review", post(api::records::review_return))
        // Notifications
        .route(
            "/notifications",
            get(api::notifications::get_feed).delete(api::notifications::clear),
        )
        .route("/notifications/read-all", post(api::notifications::mark_all_read))
        .route("/notifications/sweep", post(api::notifications::run_sweep))
        .route("/notifications/:id/read", post(api::notifications::mark_read))
        // Change events
        .route("/events", get(api::events::stream_events))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
}
