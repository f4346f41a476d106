mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::achievements::{routes as achievements_routes, Achievement};
use crate::features::albums::{routes as albums_routes, Album};
use crate::features::assets::{AssetCoordinator, AssetEntity, EntityService};
use crate::features::faculty::{routes as faculty_routes, Faculty};
use crate::features::programmes::{routes as programmes_routes, Programme};
use crate::features::quick_access::{routes as quick_access_routes, QuickAccessItem};
use crate::features::study_materials::{routes as study_materials_routes, StudyMaterial};
use crate::features::syllabi::{routes as syllabi_routes, Syllabus};
use crate::features::testimonials::{routes as testimonials_routes, Testimonial};
use crate::modules::records::PgRecordStore;
use crate::modules::staging::StagingArea;
use crate::modules::storage::{BlobStoreClient, MinIOClient};
use axum::{extract::DefaultBodyLimit, middleware::from_fn, Router};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

/// Postgres-backed service for one entity kind
fn entity_service<T: AssetEntity>(
    pool: &PgPool,
    coordinator: &Arc<AssetCoordinator>,
) -> Arc<EntityService<T, PgRecordStore<T>>> {
    let service = EntityService::new(
        Arc::new(PgRecordStore::<T>::new(pool.clone())),
        Arc::clone(coordinator),
    );
    tracing::info!("{} service initialized", T::DESCRIPTOR.entity);
    Arc::new(service)
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Blob store: MinIO behind the timeout/retry client
    let minio_client = Arc::new(
        MinIOClient::new(config.minio.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    tracing::info!(
        "MinIO client initialized for bucket: {}",
        minio_client.bucket_name()
    );
    let blob_client = Arc::new(BlobStoreClient::new(minio_client, &config.storage));

    let staging = StagingArea::new(config.storage.staging_dir.clone());
    staging
        .ensure_root()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create staging directory: {}", e))?;
    tracing::info!("Staging area ready at {}", staging.root().display());

    let coordinator = Arc::new(AssetCoordinator::new(blob_client));

    let programme_service = entity_service::<Programme>(&pool, &coordinator);
    let faculty_service = entity_service::<Faculty>(&pool, &coordinator);
    let album_service = entity_service::<Album>(&pool, &coordinator);
    let achievement_service = entity_service::<Achievement>(&pool, &coordinator);
    let syllabus_service = entity_service::<Syllabus>(&pool, &coordinator);
    let study_material_service = entity_service::<StudyMaterial>(&pool, &coordinator);
    let testimonial_service = entity_service::<Testimonial>(&pool, &coordinator);
    let quick_access_service = entity_service::<QuickAccessItem>(&pool, &coordinator);

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    let api_routes = Router::new()
        .merge(programmes_routes(programme_service, staging.clone()))
        .merge(faculty_routes(faculty_service, staging.clone()))
        .merge(albums_routes(album_service, staging.clone()))
        .merge(achievements_routes(achievement_service, staging.clone()))
        .merge(syllabi_routes(syllabus_service, staging.clone()))
        .merge(study_materials_routes(study_material_service, staging.clone()))
        .merge(testimonials_routes(testimonial_service, staging.clone()))
        .merge(quick_access_routes(quick_access_service, staging))
        // Multipart bodies may carry several files per request
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size));

    let app = Router::new()
        .merge(swagger)
        .merge(api_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
