use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modqueue_service::config::Config;
use modqueue_service::db;
use modqueue_service::handlers;
use modqueue_service::jobs::{QueueSyncJob, SyncRunner, SyncStatusHandle};
use modqueue_service::metrics;
use modqueue_service::repository::{PostRepositoryTrait, PostgresPostRepository};
use modqueue_service::services::{QueueSourceTrait, Reconciler, RedditClient};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting modqueue-service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize database connection pool and schema
    let pool = match db::init_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {}", e);
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::MIGRATOR.run(&pool).await {
        tracing::error!("Database migration failed: {}", e);
        eprintln!("ERROR: Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Connected to database, migrations applied");

    // Construct the pipeline: Reddit client -> reconciler -> repository
    let repository: Arc<dyn PostRepositoryTrait> =
        Arc::new(PostgresPostRepository::new(pool.clone()));

    let reddit_client = match RedditClient::new(config.reddit.clone()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Reddit client construction failed: {}", e);
            eprintln!("ERROR: Failed to construct Reddit client: {}", e);
            std::process::exit(1);
        }
    };
    let queue_source: Arc<dyn QueueSourceTrait> = Arc::new(reddit_client);

    let reconciler = Reconciler::new(repository.clone());
    let sync_status = SyncStatusHandle::new();
    let sync_runner = SyncRunner::new(queue_source.clone(), reconciler, sync_status.clone());

    // Spawn the scheduled sync job
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_job = QueueSyncJob::new(sync_runner.clone(), config.sync.clone(), shutdown_rx);
    let job_handle = sync_job.spawn();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let pool_http = pool.clone();
    let repository_data = web::Data::new(repository);
    let queue_source_data = web::Data::new(queue_source);
    let sync_runner_data = web::Data::new(sync_runner);
    let sync_status_data = web::Data::new(sync_status);
    let sync_config_data = web::Data::new(config.sync.clone());

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(pool_http.clone()))
            .app_data(repository_data.clone())
            .app_data(queue_source_data.clone())
            .app_data(sync_runner_data.clone())
            .app_data(sync_status_data.clone())
            .app_data(sync_config_data.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(handlers::configure_routes)
    })
    .bind(&bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();
    let mut server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let exit: io::Result<()>;

    tokio::select! {
        result = &mut server_task => {
            tracing::error!("HTTP server exited unexpectedly");
            exit = match result {
                Ok(inner) => inner,
                Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
            };
            let _ = shutdown_tx.send(true);
        }
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            server_handle.stop(true).await;
            exit = match server_task.await {
                Ok(inner) => inner,
                Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
            };
        }
    }

    // The sync job observes shutdown between cycles, so a cycle in flight
    // finishes its current batch before this join completes.
    let _ = job_handle.await;

    tracing::info!("modqueue-service stopped");
    exit
}
