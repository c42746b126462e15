//! Thin `reqwest` wrapper over the daemon's HTTP API (§6). No retries, no
//! connection pooling tuning — a CLI invocation makes one call and exits.

use anyhow::{anyhow, Result};
use pommel_protocol::{
    ApiError, ConfigResponse, HealthResponse, ReindexRequest, ReindexResponse, SearchRequest, SearchResponse,
    StatusResponse, SubprojectsResponse,
};

pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/health").await
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        self.get("/status").await
    }

    pub async fn config(&self) -> Result<ConfigResponse> {
        self.get("/config").await
    }

    pub async fn subprojects(&self) -> Result<SubprojectsResponse> {
        self.get("/subprojects").await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.post("/search", request).await
    }

    pub async fn reindex(&self, request: &ReindexRequest) -> Result<ReindexResponse> {
        self.post("/reindex", request).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| anyhow!("could not reach pommeld at {}: {e}", self.base_url))?;
        Self::parse_response(response).await
    }

    async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("could not reach pommeld at {}: {e}", self.base_url))?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }
        match serde_json::from_slice::<ApiError>(&bytes) {
            Ok(err) => Err(anyhow!("{}", err.message())),
            Err(_) => Err(anyhow!("daemon returned {status}")),
        }
    }
}
