use async_trait::async_trait;
use serde::Deserialize;

use crate::config::settings::AppSettings;
use crate::error::{AppError, AppResult};

/// Looked up before admitting a trial task so duration caps can be enforced
/// up front (spec.md S4.1 step 2).
#[derive(Debug, Clone, Deserialize)]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}

/// Component B (platform metadata side, spec.md S4.1, S6). Callers must
/// treat a lookup failure as `INVALID_INPUT` and never admit the task
/// optimistically.
#[async_trait]
pub trait PlatformMetadataProvider: Send + Sync {
    async fn lookup(&self, url: &str) -> AppResult<VideoMetadata>;
}

pub struct HttpPlatformMetadataProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPlatformMetadataProvider {
    pub fn new(client: reqwest::Client, settings: &AppSettings) -> Self {
        Self {
            client,
            base_url: settings.providers.platform_metadata_base_url.clone(),
            api_key: settings.providers.platform_metadata_api_key.clone(),
        }
    }
}

#[async_trait]
impl PlatformMetadataProvider for HttpPlatformMetadataProvider {
    async fn lookup(&self, url: &str) -> AppResult<VideoMetadata> {
        let response = self
            .client
            .get(format!("{}/metadata", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| AppError::InvalidInput(format!("metadata lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::InvalidInput(format!(
                "metadata lookup returned status {}",
                response.status()
            )));
        }

        response
            .json::<VideoMetadata>()
            .await
            .map_err(|e| AppError::InvalidInput(format!("metadata lookup returned unexpected body: {}", e)))
    }
}
