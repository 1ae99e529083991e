use axum::{
    routing::get,
    Extension, Router,
};
use petcare_server::api::{self, middleware::SessionKey};
use petcare_server::config::Config;
use petcare_server::feed::TestimonialFeed;
use petcare_server::lifecycle::RequestLifecycle;
use petcare_server::migrator;
use petcare_server::storage::{GcsBlobStore, LocalBlobStore, SharedBlobStore};
use sea_orm::{Database, DatabaseConnection};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_cookies::Key;

struct Handles {
    db: DatabaseConnection,
    blobs: SharedBlobStore,
    /// Served under `/uploads` when photos are stored locally.
    local_uploads: Option<PathBuf>,
    feed: TestimonialFeed,
    session_key: SessionKey,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let _telemetry = petcare_server::telemetry::init_telemetry("petcare-server");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let config = Config::from_env().expect("Invalid configuration");

    // Database Connection
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    if let Some(seed) = &config.admin {
        api::auth::ensure_admin(&db, seed)
            .await
            .expect("Failed to provision admin account");
    }

    // Photo storage: GCS when a bucket is configured, local directory otherwise
    let (blobs, local_uploads): (SharedBlobStore, Option<PathBuf>) = match &config.gcs_bucket {
        Some(bucket) => {
            let gcs_config = google_cloud_storage::client::ClientConfig::default()
                .with_auth()
                .await
                .expect("Failed to load GCS credentials");
            let gcs_client = google_cloud_storage::client::Client::new(gcs_config);
            tracing::info!(bucket = %bucket, "storing photos in GCS");
            (Arc::new(GcsBlobStore::new(gcs_client, bucket.clone())), None)
        }
        None => {
            tracing::info!(dir = %config.upload_dir.display(), "storing photos on local disk");
            let store = LocalBlobStore::new(config.upload_dir.clone(), config.public_base_url.clone());
            (Arc::new(store), Some(config.upload_dir.clone()))
        }
    };

    let feed = TestimonialFeed::load(&db)
        .await
        .expect("Failed to load latest testimonial");

    let session_key = match config.session_secret.as_deref().map(|s| Key::try_from(s.as_bytes())) {
        Some(Ok(key)) => key,
        Some(Err(_)) => {
            tracing::warn!("SESSION_SECRET must be at least 64 bytes; using a generated key, sessions will not survive a restart");
            Key::generate()
        }
        None => {
            tracing::warn!("SESSION_SECRET not set; using a generated key, sessions will not survive a restart");
            Key::generate()
        }
    };

    // Initialize Metrics
    petcare_server::metrics::init_metrics(&db).await;

    let handles = Handles {
        db,
        blobs,
        local_uploads,
        feed,
        session_key: SessionKey(session_key),
    };
    let app = app(handles, &config.cors_origin, prometheus_layer, metric_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health_check() -> &'static str {
    "OK"
}

fn app(
    handles: Handles,
    cors_origin: &str,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_check))
        .merge(api::routes());

    if let Some(dir) = &handles.local_uploads {
        router = router.nest_service("/uploads", tower_http::services::ServeDir::new(dir));
    }

    let lifecycle = RequestLifecycle::new(handles.db.clone());

    router
        .layer(
            ServiceBuilder::new()
                .layer(Extension(handles.db))
                .layer(Extension(lifecycle))
                .layer(Extension(handles.blobs))
                .layer(Extension(handles.feed))
                .layer(Extension(handles.session_key)),
        )
        .layer(tower_cookies::CookieManagerLayer::new())
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // "METHOD /path", e.g. "POST /api/admin/requests/:id/approve"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    let client_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .or_else(|| {
                            request
                                .headers()
                                .get("x-real-ip")
                                .and_then(|v| v.to_str().ok())
                        })
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        client_ip = client_ip,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by handlers
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        admin_id = tracing::field::Empty,
                        request_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(
                    cors_origin
                        .parse::<axum::http::HeaderValue>()
                        .expect("CORS_ORIGIN must be a valid header value"),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(axum::extract::DefaultBodyLimit::max(50 * 1024 * 1024))
}
