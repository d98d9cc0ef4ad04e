use connectivity_core::error::HttpError;
use connectivity_core::http::{HttpClient, RequestOptions, TimeoutProfile};

use log::{debug, warn};
use serde_json::Value;

/// Periodic health check. Its outcomes are what feed the degraded mode tracker.
#[derive(Clone)]
pub struct HealthProbe {
    client: HttpClient,
    endpoint: String,
}

impl HealthProbe {
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub async fn check(&self) -> Result<Value, HttpError> {
        let options = RequestOptions::get().with_profile(TimeoutProfile::Background);

        match self.client.request::<Value>(&self.endpoint, options).await {
            Ok(response) => {
                debug!("Health check {} -> {}", self.endpoint, response.status);
                Ok(response.data)
            }
            Err(e) => {
                warn!("Health check {} failed: {e}", self.endpoint);
                Err(e)
            }
        }
    }
}
