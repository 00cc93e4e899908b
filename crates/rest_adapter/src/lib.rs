use std::{collections::HashMap, marker::PhantomData, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use resource_core::{AdapterError, AdapterResult, CapabilitySet, ServiceAdapter};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{EntityId, Filters},
    error::{ApiError, ErrorCode},
    protocol::ListEnvelope,
};
use tracing::debug;

pub mod config;

pub use config::{load_settings, Settings};

/// Static description of one REST resource: where it lives under the API
/// root and which endpoints the deployment actually exposes.
#[derive(Debug, Clone)]
pub struct RestResourceSpec {
    /// Path segment under the API root, e.g. `productos`.
    pub resource_path: String,
    /// Plural, human-readable name used to scope error messages.
    pub entity_name: String,
    pub capabilities: CapabilitySet,
}

impl RestResourceSpec {
    pub fn new(resource_path: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            resource_path: resource_path.into(),
            entity_name: entity_name.into(),
            capabilities: CapabilitySet::full(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// `ServiceAdapter` backed by a conventional REST API: collection routes
/// with trailing slashes, custom actions as path suffixes, bulk actions
/// under `bulk/`, and validation failures reported as a JSON object keyed
/// by field name.
pub struct RestAdapter<T> {
    client: Client,
    base_url: String,
    spec: RestResourceSpec,
    _entity: PhantomData<fn() -> T>,
}

impl<T> RestAdapter<T> {
    pub fn new(client: Client, base_url: &str, spec: RestResourceSpec) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spec,
            _entity: PhantomData,
        }
    }

    pub fn from_settings(settings: &Settings, spec: RestResourceSpec) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self::new(client, &settings.base_url, spec))
    }

    fn collection_url(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("{}/{}/", self.base_url, self.spec.resource_path)
        } else {
            format!("{}/{}/{suffix}/", self.base_url, self.spec.resource_path)
        }
    }

    fn item_url(&self, id: EntityId, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("{}/{}/{}/", self.base_url, self.spec.resource_path, id.0)
        } else {
            format!(
                "{}/{}/{}/{suffix}/",
                self.base_url, self.spec.resource_path, id.0
            )
        }
    }
}

fn query_pairs(params: &Filters) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), value.as_query_value()))
        .collect()
}

fn transport_error(err: reqwest::Error) -> AdapterError {
    AdapterError::Network(err.to_string())
}

fn classify_failure(status: StatusCode, body: &str) -> AdapterError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdapterError::Unauthorized,
        StatusCode::NOT_FOUND => AdapterError::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => parse_validation(body),
        _ => match serde_json::from_str::<ApiError>(body) {
            Ok(api) => from_api_error(api),
            Err(_) => AdapterError::Network(format!("unexpected status {status}")),
        },
    }
}

/// Some backends report structured `{code, message}` failures instead of
/// relying on the status code alone.
fn from_api_error(err: ApiError) -> AdapterError {
    match err.code {
        ErrorCode::Network => AdapterError::Network(err.message),
        ErrorCode::Validation => AdapterError::Validation {
            message: err.message,
            fields: HashMap::new(),
        },
        ErrorCode::Unauthorized => AdapterError::Unauthorized,
        ErrorCode::NotFound => AdapterError::NotFound,
        ErrorCode::UnsupportedOperation | ErrorCode::Unknown => AdapterError::Unknown(err.message),
    }
}

/// Interprets a 400/422 body as a field-error object. Values are commonly
/// arrays of messages; only the first message per field is surfaced. A
/// `detail` string becomes the overall message instead of a field entry.
fn parse_validation(body: &str) -> AdapterError {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return AdapterError::Validation {
            message: "validation failed".to_string(),
            fields: HashMap::new(),
        };
    };

    let mut message = "validation failed".to_string();
    let mut fields = HashMap::new();
    for (key, value) in map {
        if key == "detail" {
            if let Value::String(detail) = value {
                message = detail;
            }
            continue;
        }
        let text = match value {
            Value::String(text) => text,
            Value::Array(items) => match items.into_iter().next() {
                Some(Value::String(text)) => text,
                Some(other) => other.to_string(),
                None => continue,
            },
            other => other.to_string(),
        };
        fields.insert(key, text);
    }
    AdapterError::Validation { message, fields }
}

impl<T> RestAdapter<T>
where
    T: DeserializeOwned + Clone + Send + Sync,
{
    async fn request_json<R: DeserializeOwned>(&self, request: RequestBuilder) -> AdapterResult<R> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(
                entity = %self.spec.entity_name,
                status = status.as_u16(),
                "request failed"
            );
            return Err(classify_failure(status, &body));
        }
        response.json().await.map_err(transport_error)
    }

    /// For endpoints whose response body carries nothing the caller needs.
    async fn request_ack(&self, request: RequestBuilder) -> AdapterResult<()> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(
                entity = %self.spec.entity_name,
                status = status.as_u16(),
                "request failed"
            );
            return Err(classify_failure(status, &body));
        }
        Ok(())
    }

    async fn list(&self, suffix: &str, params: &Filters) -> AdapterResult<ListEnvelope<T>> {
        let request = self
            .client
            .get(self.collection_url(suffix))
            .query(&query_pairs(params));
        self.request_json(request).await
    }

    async fn bulk(&self, action: &str, ids: &[EntityId]) -> AdapterResult<()> {
        let request = self
            .client
            .post(self.collection_url(&format!("bulk/{action}")))
            .json(&json!({ "ids": ids }));
        self.request_ack(request).await
    }
}

#[async_trait]
impl<T> ServiceAdapter for RestAdapter<T>
where
    T: DeserializeOwned + Clone + Send + Sync,
{
    type Entity = T;

    fn entity_name(&self) -> &str {
        &self.spec.entity_name
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.spec.capabilities
    }

    async fn get_all(&self, params: &Filters) -> AdapterResult<ListEnvelope<T>> {
        self.list("", params).await
    }

    async fn get_by_id(&self, id: EntityId) -> AdapterResult<T> {
        self.request_json(self.client.get(self.item_url(id, ""))).await
    }

    async fn get_active(&self, params: &Filters) -> AdapterResult<ListEnvelope<T>> {
        self.list("active", params).await
    }

    async fn get_inactive(&self, params: &Filters) -> AdapterResult<ListEnvelope<T>> {
        self.list("inactive", params).await
    }

    async fn get_deleted(&self, params: &Filters) -> AdapterResult<ListEnvelope<T>> {
        self.list("deleted", params).await
    }

    async fn search(&self, query: &str, params: &Filters) -> AdapterResult<ListEnvelope<T>> {
        let mut pairs = query_pairs(params);
        pairs.push(("search".to_string(), query.to_string()));
        let request = self.client.get(self.collection_url("search")).query(&pairs);
        self.request_json(request).await
    }

    async fn get_stats(&self) -> AdapterResult<Value> {
        self.request_json(self.client.get(self.collection_url("stats")))
            .await
    }

    async fn create(&self, data: &Value) -> AdapterResult<T> {
        let request = self.client.post(self.collection_url("")).json(data);
        self.request_json(request).await
    }

    async fn update(&self, id: EntityId, data: &Value) -> AdapterResult<T> {
        let request = self.client.put(self.item_url(id, "")).json(data);
        self.request_json(request).await
    }

    async fn patch(&self, id: EntityId, data: &Value) -> AdapterResult<T> {
        let request = self.client.patch(self.item_url(id, "")).json(data);
        self.request_json(request).await
    }

    async fn delete(&self, id: EntityId) -> AdapterResult<()> {
        self.request_ack(self.client.delete(self.item_url(id, "")))
            .await
    }

    async fn toggle_active(&self, id: EntityId, is_active: Option<bool>) -> AdapterResult<()> {
        let body = match is_active {
            Some(value) => json!({ "activo": value }),
            None => json!({}),
        };
        let request = self
            .client
            .post(self.item_url(id, "toggle_active"))
            .json(&body);
        self.request_ack(request).await
    }

    async fn soft_delete(&self, id: EntityId) -> AdapterResult<()> {
        self.request_ack(self.client.post(self.item_url(id, "soft_delete")))
            .await
    }

    async fn hard_delete(&self, id: EntityId) -> AdapterResult<()> {
        self.request_ack(self.client.delete(self.item_url(id, "hard_delete")))
            .await
    }

    async fn restore(&self, id: EntityId) -> AdapterResult<()> {
        self.request_ack(self.client.post(self.item_url(id, "restore")))
            .await
    }

    async fn activate_multiple(&self, ids: &[EntityId]) -> AdapterResult<()> {
        self.bulk("activate", ids).await
    }

    async fn deactivate_multiple(&self, ids: &[EntityId]) -> AdapterResult<()> {
        self.bulk("deactivate", ids).await
    }

    async fn soft_delete_multiple(&self, ids: &[EntityId]) -> AdapterResult<()> {
        self.bulk("soft_delete", ids).await
    }

    async fn restore_multiple(&self, ids: &[EntityId]) -> AdapterResult<()> {
        self.bulk("restore", ids).await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
