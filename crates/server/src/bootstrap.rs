use std::sync::Arc;

use homequote_backend::{BackendClient, BackendError, HttpBackend};
use homequote_core::config::AppConfig;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub backend: Arc<dyn BackendClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("backend client could not be built: {0}")]
    Backend(#[source] BackendError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let backend = HttpBackend::new(&config.backend).map_err(BootstrapError::Backend)?;
    info!(
        event_name = "system.bootstrap.backend_configured",
        correlation_id = "bootstrap",
        base_url = %backend.base_url(),
        authenticated = config.backend.api_token.is_some(),
        "booking backend client configured"
    );

    Ok(Application { config, backend: Arc::new(backend) })
}
