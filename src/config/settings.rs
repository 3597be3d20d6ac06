use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub trial: TrialConfig,
    pub providers: ProviderConfig,
    pub dispatcher: DispatcherConfig,
    pub sweeper: SweeperConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Trial gating knobs (spec.md S4.1, S6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrialConfig {
    pub max_duration_minutes: u32,
}

/// External provider endpoints, keys and polling knobs (spec.md S4.4, S6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub auto_transcript_base_url: String,
    pub auto_transcript_api_key: String,
    pub auto_transcript_max_poll_attempts: u32,
    pub auto_transcript_poll_interval_seconds: u64,
    pub sync_stt_base_url: String,
    pub sync_stt_api_key: String,
    pub sync_stt_webhook_secret: String,
    pub platform_metadata_base_url: String,
    pub platform_metadata_api_key: String,
    pub llm_enabled: bool,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub subscription_webhook_secret: String,
}

/// Dispatcher mode selection (spec.md S4.2, S6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub queue_enabled: bool,
    pub max_attempts: u32,
    pub initial_backoff_seconds: u64,
}

/// Stuck-task sweeper cadence/threshold (spec.md S4.7, S6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweeperConfig {
    pub task_timeout_minutes: i64,
    pub sweep_interval_seconds: u64,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "transcribe-engine".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL must be set".to_string()))?;

        let max_duration_minutes = env::var("TRIAL_MAX_DURATION_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Configuration("TRIAL_MAX_DURATION_MINUTES must be a valid number".to_string()))?;

        let auto_transcript_base_url = env::var("AUTO_TRANSCRIPT_BASE_URL")
            .unwrap_or_else(|_| "https://api.auto-transcript.example/v1".to_string());
        let auto_transcript_api_key = env::var("AUTO_TRANSCRIPT_API_KEY").unwrap_or_default();
        let auto_transcript_max_poll_attempts = env::var("AUTO_TRANSCRIPT_MAX_POLL_ATTEMPTS")
            .unwrap_or_else(|_| "120".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Configuration("AUTO_TRANSCRIPT_MAX_POLL_ATTEMPTS must be a valid number".to_string()))?;
        let auto_transcript_poll_interval_seconds = env::var("AUTO_TRANSCRIPT_POLL_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("AUTO_TRANSCRIPT_POLL_INTERVAL_SECONDS must be a valid number".to_string()))?;

        let sync_stt_base_url = env::var("SYNC_STT_BASE_URL")
            .unwrap_or_else(|_| "https://api.sync-stt.example/v1".to_string());
        let sync_stt_api_key = env::var("SYNC_STT_API_KEY").unwrap_or_default();
        let sync_stt_webhook_secret = env::var("SYNC_STT_WEBHOOK_SECRET").unwrap_or_default();

        let platform_metadata_base_url = env::var("PLATFORM_METADATA_BASE_URL")
            .unwrap_or_else(|_| "https://api.platform-metadata.example/v1".to_string());
        let platform_metadata_api_key = env::var("PLATFORM_METADATA_API_KEY").unwrap_or_default();

        let llm_enabled = env::var("LLM_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .map_err(|_| AppError::Configuration("LLM_ENABLED must be true or false".to_string()))?;
        let llm_base_url = env::var("LLM_BASE_URL").ok();
        let llm_api_key = env::var("LLM_API_KEY").ok();

        let subscription_webhook_secret = env::var("SUBSCRIPTION_WEBHOOK_SECRET").unwrap_or_default();

        let queue_enabled = env::var("QUEUE_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .map_err(|_| AppError::Configuration("QUEUE_ENABLED must be true or false".to_string()))?;
        let max_attempts = env::var("DISPATCHER_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Configuration("DISPATCHER_MAX_ATTEMPTS must be a valid number".to_string()))?;
        let initial_backoff_seconds = env::var("DISPATCHER_INITIAL_BACKOFF_SECONDS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("DISPATCHER_INITIAL_BACKOFF_SECONDS must be a valid number".to_string()))?;

        let task_timeout_minutes = env::var("TASK_TIMEOUT_MINUTES")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("TASK_TIMEOUT_MINUTES must be a valid number".to_string()))?;
        let sweep_interval_seconds = env::var("SWEEP_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("SWEEP_INTERVAL_SECONDS must be a valid number".to_string()))?;

        Ok(Self {
            app: AppConfig { name: app_name, environment },
            server: ServerConfig { host: server_host, port: server_port, cors_origins },
            database: DatabaseConfig { url: database_url },
            trial: TrialConfig { max_duration_minutes },
            providers: ProviderConfig {
                auto_transcript_base_url,
                auto_transcript_api_key,
                auto_transcript_max_poll_attempts,
                auto_transcript_poll_interval_seconds,
                sync_stt_base_url,
                sync_stt_api_key,
                sync_stt_webhook_secret,
                platform_metadata_base_url,
                platform_metadata_api_key,
                llm_enabled,
                llm_base_url,
                llm_api_key,
                subscription_webhook_secret,
            },
            dispatcher: DispatcherConfig {
                queue_enabled,
                max_attempts,
                initial_backoff_seconds,
            },
            sweeper: SweeperConfig {
                task_timeout_minutes,
                sweep_interval_seconds,
            },
        })
    }
}
