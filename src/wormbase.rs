use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::domain::EntityKind;
use crate::error::WormbaitError;

pub const DEFAULT_SERVICE_BASE: &str = "http://api.wormbase.org/rest/field";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Reads single named fields of WormBase entities.
///
/// Implementations return the `data` payload of `{field}` or an error naming
/// why it could not be obtained. Callers decide whether a failure is fatal;
/// the record builder treats every one of them as an absent value.
pub trait WormbaseClient: Send + Sync {
    fn fetch_field(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
    ) -> Result<Value, WormbaitError>;
}

impl<T: WormbaseClient + ?Sized> WormbaseClient for &T {
    fn fetch_field(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
    ) -> Result<Value, WormbaitError> {
        (**self).fetch_field(kind, id, field)
    }
}

#[derive(Clone)]
pub struct WormbaseHttpClient {
    client: Client,
    base_url: String,
}

impl WormbaseHttpClient {
    pub fn new() -> Result<Self, WormbaitError> {
        Self::with_settings(DEFAULT_SERVICE_BASE, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_settings(base_url: &str, timeout: Duration) -> Result<Self, WormbaitError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("wormbait/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| WormbaitError::RemoteHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| WormbaitError::RemoteHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn field_url(&self, kind: EntityKind, id: &str, field: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url, kind.as_str(), id, field)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, WormbaitError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "WormBase request failed".to_string());
        Err(WormbaitError::RemoteStatus { status, message })
    }
}

impl WormbaseClient for WormbaseHttpClient {
    fn fetch_field(
        &self,
        kind: EntityKind,
        id: &str,
        field: &str,
    ) -> Result<Value, WormbaitError> {
        let url = self.field_url(kind, id, field);
        debug!(%url, "wormbase.request");
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| WormbaitError::RemoteHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| WormbaitError::RemoteHttp(err.to_string()))?;
        debug!(
            %url,
            latency_ms = start.elapsed().as_millis() as u64,
            "wormbase.response"
        );
        extract_field_data(&body, field)
    }
}

/// Pulls `{field}.data` out of a raw response body.
pub fn extract_field_data(body: &str, field: &str) -> Result<Value, WormbaitError> {
    let mut json: Value =
        serde_json::from_str(body).map_err(|err| WormbaitError::RemoteDecode(err.to_string()))?;
    match json.get_mut(field).and_then(|value| value.get_mut("data")) {
        Some(data) if !data.is_null() => Ok(data.take()),
        _ => Err(WormbaitError::FieldMissing(field.to_string())),
    }
}
