//! Remote store proxy: thin JSON client over the backend `/products` API.
use async_trait::async_trait;
use reqwest::{Client, Method, Request, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::model::{ErrorBody, WelcomeResp};
use crate::config::Config;
use crate::model::{Product, ProductPayload};

pub mod model;

const DEFAULT_API_BASE: &str = "http://localhost:8000/";
const DEFAULT_USER_AGENT: &str = "inventory-client/0.1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend returned {status}")]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint: {0}")]
    Url(String),
}

impl StoreError {
    /// Server-supplied `detail`, if the backend sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            StoreError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Text for the error notice: server detail first, then the transport
    /// failure, then `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            StoreError::Status { detail: Some(d), .. } => d.clone(),
            StoreError::Status { .. } | StoreError::Transport(_) => self.to_string(),
            StoreError::Decode(_) | StoreError::Url(_) => fallback.to_string(),
        }
    }
}

/// The backend operations the inventory view relies on. Each call is a single
/// request/response; nothing is cached or retried.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, StoreError>;

    async fn get(&self, id: i64) -> Result<Product, StoreError>;

    async fn create(&self, payload: &ProductPayload) -> Result<Product, StoreError>;

    async fn update(&self, id: i64, payload: &ProductPayload) -> Result<Product, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<String, StoreError>;
}

#[derive(Clone)]
pub struct HttpStore {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    pub fn new() -> Result<Self, StoreError> {
        let base_url = Url::parse(DEFAULT_API_BASE).map_err(|e| StoreError::Url(e.to_string()))?;
        Self::with_base_url(base_url, DEFAULT_USER_AGENT)
    }

    pub fn from_config(cfg: &Config) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(&cfg.api.base_url).map_err(|e| StoreError::Url(e.to_string()))?;
        Self::with_base_url(base_url, &cfg.api.user_agent)
    }

    pub fn with_base_url(mut base_url: Url, user_agent: &str) -> Result<Self, StoreError> {
        // `Url::join` drops the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(user_agent)
            .no_proxy()
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(path)
            .map_err(|e| StoreError::Url(e.to_string()))
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&ProductPayload>,
    ) -> Result<Request, StoreError> {
        let url = self.endpoint(path)?;
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    /// Send a request and return the raw body of a 2xx response.
    async fn execute(&self, request: Request) -> Result<String, StoreError> {
        let method = request.method().clone();
        let url = request.url().clone();
        info!(%method, %url, "backend request");

        let res = self.http.execute(request).await?;
        let status = res.status();
        let body = res.text().await?;
        debug!(%status, body = %body, "backend response");

        if !status.is_success() {
            let detail = extract_detail(&body);
            warn!(%method, %url, %status, ?detail, "backend error");
            return Err(StoreError::Status { status, detail });
        }
        Ok(body)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&ProductPayload>,
    ) -> Result<T, StoreError> {
        let request = self.build_request(method, path, body)?;
        let text = self.execute(request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    #[instrument(skip_all)]
    pub async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let products: Vec<Product> = self.fetch_json(Method::GET, "products", None).await?;
        info!(count = products.len(), "fetched products");
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Product, StoreError> {
        self.fetch_json(Method::GET, &format!("products/{}", id), None)
            .await
    }

    #[instrument(skip_all)]
    pub async fn create(&self, payload: &ProductPayload) -> Result<Product, StoreError> {
        let product: Product = self
            .fetch_json(Method::POST, "products", Some(payload))
            .await?;
        info!(id = product.id, "created product");
        Ok(product)
    }

    #[instrument(skip(self, payload))]
    pub async fn update(&self, id: i64, payload: &ProductPayload) -> Result<Product, StoreError> {
        self.fetch_json(Method::PUT, &format!("products/{}", id), Some(payload))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let request = self.build_request(Method::DELETE, &format!("products/{}", id), None)?;
        self.execute(request).await?;
        info!(id, "deleted product");
        Ok(())
    }

    pub async fn ping(&self) -> Result<String, StoreError> {
        let welcome: WelcomeResp = self.fetch_json(Method::GET, "", None).await?;
        Ok(welcome.message)
    }
}

#[async_trait]
impl ProductStore for HttpStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        HttpStore::list(self).await
    }

    async fn get(&self, id: i64) -> Result<Product, StoreError> {
        HttpStore::get(self, id).await
    }

    async fn create(&self, payload: &ProductPayload) -> Result<Product, StoreError> {
        HttpStore::create(self, payload).await
    }

    async fn update(&self, id: i64, payload: &ProductPayload) -> Result<Product, StoreError> {
        HttpStore::update(self, id, payload).await
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        HttpStore::delete(self, id).await
    }

    async fn ping(&self) -> Result<String, StoreError> {
        HttpStore::ping(self).await
    }
}

/// Pull the `detail` field out of an error body. String details are returned
/// verbatim; structured ones (validation error lists) as their JSON text.
pub fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
