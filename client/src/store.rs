use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use numbrush_shared::{
    CanvasTemplate, CompleteSessionRequest, ErrorBody, SaveSessionRequest, SessionSnapshot,
};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// The remote project/session store.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn fetch_project(&self, project_id: &str) -> Result<CanvasTemplate, StoreError>;
    async fn fetch_or_create_session(&self, project_id: &str)
        -> Result<SessionSnapshot, StoreError>;
    async fn save_session(
        &self,
        session_id: &str,
        request: &SaveSessionRequest,
    ) -> Result<SessionSnapshot, StoreError>;
    async fn complete_session(&self, session_id: &str) -> Result<SessionSnapshot, StoreError>;
}

/// Supplies the bearer token for store requests. Token refresh lives with the
/// implementor.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpStore {
    pub fn new(config: StoreConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Config(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "{} cannot be used as a base url",
                config.base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let request = match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ProjectStore for HttpStore {
    async fn fetch_project(&self, project_id: &str) -> Result<CanvasTemplate, StoreError> {
        let url = self.endpoint(&["api", "projects", project_id]);
        self.send(self.client.get(url)).await
    }

    async fn fetch_or_create_session(
        &self,
        project_id: &str,
    ) -> Result<SessionSnapshot, StoreError> {
        let url = self.endpoint(&["api", "coloring", "session", project_id]);
        self.send(self.client.post(url)).await
    }

    async fn save_session(
        &self,
        session_id: &str,
        request: &SaveSessionRequest,
    ) -> Result<SessionSnapshot, StoreError> {
        let url = self.endpoint(&["api", "coloring", "session", session_id]);
        self.send(self.client.put(url).json(request)).await
    }

    async fn complete_session(&self, session_id: &str) -> Result<SessionSnapshot, StoreError> {
        let url = self.endpoint(&["api", "coloring", "complete"]);
        let body = CompleteSessionRequest {
            session_id: session_id.to_string(),
        };
        self.send(self.client.post(url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpStore {
        HttpStore::new(StoreConfig::new(base), Arc::new(NoToken)).unwrap()
    }

    #[test]
    fn endpoints_extend_base_path() {
        let store = store("http://localhost:3000/v1/");
        assert_eq!(
            store.endpoint(&["api", "projects", "p 1"]).as_str(),
            "http://localhost:3000/v1/api/projects/p%201"
        );
    }

    #[test]
    fn endpoints_from_bare_host() {
        let store = store("https://colors.example");
        assert_eq!(
            store.endpoint(&["api", "coloring", "complete"]).as_str(),
            "https://colors.example/api/coloring/complete"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let result = HttpStore::new(StoreConfig::new("mailto:someone"), Arc::new(NoToken));
        assert!(matches!(result, Err(StoreError::Config(_))));
        let result = HttpStore::new(StoreConfig::new("not a url"), Arc::new(NoToken));
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
