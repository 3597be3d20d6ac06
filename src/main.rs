use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use transcribe_engine::admission::TaskAdmission;
use transcribe_engine::billing::BillingLedger;
use transcribe_engine::config;
use transcribe_engine::dispatcher::{Dispatcher, InlineDispatcher, QueueDispatcher};
use transcribe_engine::executor::TaskExecutor;
use transcribe_engine::http::{configure_routes, AppState};
use transcribe_engine::providers::{HttpAutoTranscriptProvider, HttpLlmProvider, HttpPlatformMetadataProvider, HttpSyncSttProvider, LlmProvider};
use transcribe_engine::storage::postgres::{create_pool, verify_connection, PgStorage};
use transcribe_engine::storage::Storage;
use transcribe_engine::sweeper::Sweeper;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    tracing_subscriber::fmt::init();

    let settings = match config::init_config() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings from environment: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    let pool = match create_pool(&settings.database.url).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(pool));
    let http_client = reqwest::Client::new();

    let auto_transcript = Arc::new(HttpAutoTranscriptProvider::new(http_client.clone(), &settings));
    let sync_stt = Arc::new(HttpSyncSttProvider::new(http_client.clone(), &settings));
    let platform_metadata = Arc::new(HttpPlatformMetadataProvider::new(http_client.clone(), &settings));
    let llm = if settings.providers.llm_enabled {
        Some(Arc::new(HttpLlmProvider::new(http_client.clone(), &settings)) as Arc<dyn LlmProvider>)
    } else {
        None
    };

    let billing = Arc::new(BillingLedger::new(storage.clone()));
    let settings = Arc::new(settings);

    let admission = Arc::new(TaskAdmission::new(storage.clone(), billing.clone(), platform_metadata.clone(), settings.clone()));

    let executor = Arc::new(TaskExecutor::new(
        storage.clone(),
        billing.clone(),
        auto_transcript.clone(),
        sync_stt.clone(),
        llm.clone(),
        settings.dispatcher.clone(),
    ));

    let dispatcher: Arc<dyn Dispatcher> = if settings.dispatcher.queue_enabled {
        let queue = QueueDispatcher::new(storage.clone());
        queue.clone().spawn(executor.clone());
        queue
    } else {
        match InlineDispatcher::start(executor.clone(), storage.clone()).await {
            Ok(dispatcher) => Arc::new(dispatcher),
            Err(e) => {
                log::error!("Failed to start inline dispatcher: {}", e);
                std::process::exit(1);
            }
        }
    };

    Arc::new(Sweeper::new(storage.clone(), settings.sweeper.clone())).spawn();

    let host = settings.server.host.clone();
    let port = settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);

    let listener = TcpListener::bind(format!("{}:{}", host, port))?;

    let state = AppState {
        storage: storage.clone(),
        admission: admission.clone(),
        dispatcher: dispatcher.clone(),
        billing: billing.clone(),
        settings: settings.clone(),
    };

    HttpServer::new(move || {
        let mut cors = Cors::default().supports_credentials();
        if state.settings.server.cors_origins.iter().any(|o| o == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &state.settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes)
    })
    .listen(listener)?
    .run()
    .await
}
