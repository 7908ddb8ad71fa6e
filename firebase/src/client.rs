//! Realtime Database REST client

use crate::config::FirebaseConfig;
use reqwest::header::{ETAG, IF_MATCH};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};
use spotbook_core::store::{RecordStore, Records, StoreError, counter_value, records_from_value};

/// Request header asking the database to return an `ETag` with a read.
const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";

/// Realtime Database record store.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct FirebaseStore {
    client: Client,
    config: FirebaseConfig,
}

impl FirebaseStore {
    /// Build a store with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Request` if the HTTP client cannot be built
    /// (TLS backend initialisation).
    pub fn new(config: FirebaseConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    /// Build a store around an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: Client, config: FirebaseConfig) -> Self {
        Self { client, config }
    }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    /// REST endpoint of `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.config.database_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = &self.config.auth_token {
            request = request.query(&[("auth", token.as_str())]);
        }
        if let Some(namespace) = self.config.effective_namespace() {
            request = request.query(&[("ns", namespace)]);
        }
        request
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))
    }

    async fn read(&self, path: &str) -> Result<Value, StoreError> {
        let response = Self::send(self.request(Method::GET, path)).await?;
        let response = ensure_success(response).await?;
        decode(response).await
    }

    /// Read `path` together with its `ETag`.
    async fn read_versioned(&self, path: &str) -> Result<(String, Value), StoreError> {
        let response =
            Self::send(self.request(Method::GET, path).header(ETAG_REQUEST_HEADER, "true")).await?;
        let response = ensure_success(response).await?;
        versioned(response).await
    }
}

impl RecordStore for FirebaseStore {
    async fn get_all(&self, collection: &str) -> Result<Records, StoreError> {
        records_from_value(self.read(collection).await?)
    }

    async fn get_by_path(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let value = self.read(path).await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn set_at_path(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let response = Self::send(self.request(Method::PUT, path).json(&value)).await?;
        ensure_success(response).await?;
        tracing::debug!(path, "Value written");
        Ok(())
    }

    async fn update_at_path(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let response = Self::send(self.request(Method::PATCH, path).json(&fields)).await?;
        ensure_success(response).await?;
        tracing::debug!(path, "Fields merged");
        Ok(())
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Records, StoreError> {
        let order_by = Value::String(field.to_string()).to_string();
        let equal_to = value.to_string();
        let request = self
            .request(Method::GET, collection)
            .query(&[("orderBy", order_by.as_str()), ("equalTo", equal_to.as_str())]);

        let response = Self::send(request).await?;
        let response = ensure_success(response).await.inspect_err(|e| {
            if let StoreError::Status { status: 400, message } = e {
                tracing::warn!(
                    collection,
                    field,
                    %message,
                    "Query rejected; is `.indexOn` set for this field?"
                );
            }
        })?;
        records_from_value(decode(response).await?)
    }

    async fn increment_below(
        &self,
        path: &str,
        limit: u64,
        seed: u64,
    ) -> Result<Option<u64>, StoreError> {
        let attempts = self.config.cas_attempts;
        let (mut etag, mut current) = self.read_versioned(path).await?;

        for attempt in 1..=attempts {
            let value = if current.is_null() {
                seed
            } else {
                counter_value(path, &current)?
            };
            if value >= limit {
                return Ok(None);
            }
            let next = value + 1;

            let request = self
                .request(Method::PUT, path)
                .header(IF_MATCH, etag.as_str())
                .json(&next);
            let response = Self::send(request).await?;

            if response.status() == StatusCode::PRECONDITION_FAILED {
                tracing::debug!(path, attempt, "Counter moved, retrying with fresh value");
                (etag, current) = versioned(response).await?;
                continue;
            }
            ensure_success(response).await?;
            return Ok(Some(next));
        }

        tracing::warn!(path, attempts, "Counter increment kept conflicting");
        Err(StoreError::Conflict {
            path: path.to_string(),
            attempts,
        })
    }
}

/// Turn a non-success response into an error.
async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    match status {
        StatusCode::SERVICE_UNAVAILABLE => Err(StoreError::Unavailable(message)),
        status => Err(StoreError::Status {
            status: status.as_u16(),
            message,
        }),
    }
}

/// The database reports failures as `{"error": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

async fn decode(response: Response) -> Result<Value, StoreError> {
    response
        .json::<Value>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

/// `ETag` header and body of a read or a rejected conditional write.
async fn versioned(response: Response) -> Result<(String, Value), StoreError> {
    let etag = response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Decode("response carries no ETag".to_string()))?;
    let value = decode(response).await?;
    Ok((etag, value))
}
