//! Prism Client
//!
//! Request/response pipeline shared by every API call: resolve the URL, let
//! the codec build the body, send it, buffer the whole response, and route it
//! to the codec's decoder or error decoder by status code.

use super::filter::{filter_entities, AdditionalFilter};
use super::http::{build_transport, sanitize_for_log, RequestEnvelope, ResponseEnvelope};
use crate::codec::{Codec, JsonCodec};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::Task;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use bytes::Bytes;
use std::sync::Arc;
use url::Url;

const OCTET_STREAM: &str = "application/octet-stream";

/// Hook run after every completed exchange with the fully buffered response
pub type RequestCompletionCallback = Arc<dyn Fn(&RequestEnvelope, &ResponseEnvelope) + Send + Sync>;

/// Main Prism client
///
/// Cloning is cheap; clones share the connection pool and configuration.
pub struct PrismClient<C: Codec = JsonCodec> {
    http: Client,
    base_url: Url,
    absolute_path: String,
    username: String,
    password: Arc<str>,
    codec: Arc<C>,
    on_request_completed: Option<RequestCompletionCallback>,
}

impl<C: Codec> Clone for PrismClient<C> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            absolute_path: self.absolute_path.clone(),
            username: self.username.clone(),
            password: Arc::clone(&self.password),
            codec: Arc::clone(&self.codec),
            on_request_completed: self.on_request_completed.clone(),
        }
    }
}

impl PrismClient<JsonCodec> {
    /// Create a JSON client for the v3 API
    pub fn json(config: &Config) -> Result<Self> {
        Self::new(config, JsonCodec)
    }
}

impl<C: Codec> PrismClient<C> {
    /// Create a client speaking through `codec`
    pub fn new(config: &Config, codec: C) -> Result<Self> {
        Ok(Self {
            http: build_transport(config)?,
            base_url: config.base_url()?,
            absolute_path: config.absolute_path.trim_matches('/').to_string(),
            username: config.username.clone(),
            password: Arc::from(config.password.as_str()),
            codec: Arc::new(codec),
            on_request_completed: None,
        })
    }

    /// Point the client at a different base URL (plain HTTP fixtures, proxies)
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Register a hook invoked after every request completes
    pub fn on_request_completed(
        mut self,
        callback: impl Fn(&RequestEnvelope, &ResponseEnvelope) + Send + Sync + 'static,
    ) -> Self {
        self.on_request_completed = Some(Arc::new(callback));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Resolve `url` against the base URL.
    ///
    /// Absolute URLs pass through untouched. Relative ones get the configured
    /// API path prefix, so `/vms` becomes `{base}/api/nutanix/v3/vms`.
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }

        let relative = if self.absolute_path.is_empty() {
            url.to_string()
        } else {
            format!("{}/{}", self.absolute_path, url.trim_start_matches('/'))
        };

        self.base_url.join(&relative).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })
    }

    /// Build a request through the active codec
    pub fn new_request<B>(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<RequestEnvelope>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve_url(url)?;
        let mut request = self.codec.build_request(method, url, body)?;
        request.operation = operation.to_string();
        Ok(request)
    }

    /// Build a request carrying raw bytes, bypassing the codec (image uploads)
    pub fn new_upload_request(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Bytes,
    ) -> Result<RequestEnvelope> {
        let url = self.resolve_url(url)?;
        let mut request = RequestEnvelope::new(method, url, OCTET_STREAM, Some(body));
        request.operation = operation.to_string();
        Ok(request)
    }

    /// Send a request and return the buffered response if it was 2xx.
    ///
    /// Non-2xx responses are decoded by the codec's error decoder. Transport
    /// failures are returned unchanged and never retried here.
    pub async fn execute(&self, request: &RequestEnvelope) -> Result<ResponseEnvelope> {
        tracing::debug!("{} {} [{}]", request.method, request.url, request.operation);

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .basic_auth(&self.username, Some(&*self.password))
            .header(CONTENT_TYPE, request.content_type)
            .header(ACCEPT, self.codec.content_type());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let envelope = ResponseEnvelope {
            status: status.as_u16(),
            headers,
            body,
        };

        if let Some(callback) = &self.on_request_completed {
            callback(request, &envelope);
        }

        if !envelope.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                "API error: {} {} -> {} - {}",
                request.method,
                request.url,
                status,
                sanitize_for_log(&envelope.text())
            );
            return Err(self.codec.unmarshal_error(&envelope));
        }

        Ok(envelope)
    }

    /// Send a request and decode the response into `T`
    pub async fn send<T: DeserializeOwned>(&self, request: &RequestEnvelope) -> Result<T> {
        let response = self.execute(request).await?;
        self.codec.unmarshal(&response)
    }

    /// Send a request and ignore the response body
    pub async fn send_discard(&self, request: &RequestEnvelope) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    /// Send a list request and keep only the entities matching every filter
    pub async fn send_with_filters<T: DeserializeOwned>(
        &self,
        request: &RequestEnvelope,
        filters: &[AdditionalFilter],
        base_search_paths: &[&str],
    ) -> Result<T> {
        let mut response = self.execute(request).await?;
        if !filters.is_empty() {
            response.body = filter_entities(&response.body, filters, base_search_paths)?.into();
        }
        self.codec.unmarshal(&response)
    }

    /// Fetch a task by UUID
    pub async fn get_task(&self, task_uuid: &str) -> Result<Task> {
        let request = self.new_request::<()>(
            "get_task",
            Method::GET,
            &format!("tasks/{}", task_uuid),
            None,
        )?;
        self.send(&request).await
    }
}
