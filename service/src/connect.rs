use crate::adapter::AdapterError;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2_000);

pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("trendsketch/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            log::error!("Falling back to default HTTP client: {e}");
            reqwest::Client::new()
        })
});

/// Where the query service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    base_url: String,
    timeout: Duration,
}

impl Default for Backend {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Backend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `body` as JSON and returns the raw response object.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, AdapterError> {
        let response = HTTP_CLIENT
            .post(self.url(path))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(AdapterError::FetchError)?;

        read_json(response).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<serde_json::Value, AdapterError> {
        let response = HTTP_CLIENT
            .post(self.url(path))
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(AdapterError::FetchError)?;

        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, AdapterError> {
    let status = response.status();
    let text = response.text().await.map_err(AdapterError::FetchError)?;

    if !status.is_success() {
        return Err(AdapterError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| AdapterError::ParseError(e.to_string()))
}

/// Pulls `field` out of the backend's response envelope.
pub fn unwrap_field<T: DeserializeOwned>(
    mut value: serde_json::Value,
    field: &str,
) -> Result<T, AdapterError> {
    let inner = value
        .get_mut(field)
        .map(serde_json::Value::take)
        .ok_or_else(|| AdapterError::ParseError(format!("Missing `{field}` in response")))?;

    serde_json::from_value(inner)
        .map_err(|e| AdapterError::ParseError(format!("Failed to parse `{field}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_joins_without_double_slashes() {
        let backend = Backend::new("http://localhost:5000/");
        assert_eq!(
            backend.url("/api/parse_nl_query"),
            "http://localhost:5000/api/parse_nl_query"
        );
        assert_eq!(backend.url("api/x"), "http://localhost:5000/api/x");
    }

    #[test]
    fn unwrap_field_reads_envelope() {
        let value = json!({"results": {"slope": ">"}});
        let map: std::collections::BTreeMap<String, String> =
            unwrap_field(value, "results").unwrap();
        assert_eq!(map["slope"], ">");
    }

    #[test]
    fn unwrap_field_reports_missing_key() {
        let err = unwrap_field::<String>(json!({"other": 1}), "filename").unwrap_err();
        assert!(matches!(err, AdapterError::ParseError(msg) if msg.contains("filename")));
    }
}
