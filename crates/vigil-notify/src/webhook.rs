use std::time::Duration;

use vigil_core::VigilError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat webhook client: posts one JSON payload per run.
///
/// There is no retry or backoff; a delivery failure is surfaced once
/// and the run moves on.
///
/// # Examples
///
/// ```
/// use vigil_notify::WebhookClient;
///
/// let client = WebhookClient::new("https://hooks.example.com/services/T0/B0/x").unwrap();
/// ```
pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
}

impl WebhookClient {
    /// Create a client for the given webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Notify`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, VigilError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VigilError::Notify(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// POST a JSON payload to the webhook.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Notify`] on network errors or a non-2xx
    /// response.
    pub async fn post(&self, payload: &serde_json::Value) -> Result<(), VigilError> {
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| VigilError::Notify(format!("webhook delivery failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VigilError::Notify(format!(
                "webhook returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_for_any_url_shape() {
        // URL validity is checked at send time, not construction.
        assert!(WebhookClient::new("https://hooks.example.com/x").is_ok());
        assert!(WebhookClient::new("not a url").is_ok());
    }
}
