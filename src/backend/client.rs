/*!
 * HTTP implementation of the backend boundary.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use super::Backend;
use super::models::{
    ContentRequest, ContentSummary, ImageGenerationRequest, ImageRecord, Keyword, KeywordDetail,
    SavedTitle, TitleGenerationAck, normalize_list,
};
use crate::errors::BackendError;
use crate::polling::{NetworkMonitor, StatusRecord};

/// reqwest-based client for the generation backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// HTTP client for making requests
    client: Client,
    /// API root, e.g. `http://localhost:8000/api`
    base_url: Url,
    /// Append `/` to every path (Django-style routing)
    trailing_slash: bool,
    /// Connectivity flag updated by every request
    network: NetworkMonitor,
}

impl BackendClient {
    /// Create a client rooted at `endpoint`
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        trailing_slash: bool,
        network: NetworkMonitor,
    ) -> Result<Self, BackendError> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| BackendError::RequestFailed(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::RequestFailed(format!("invalid endpoint '{}'", endpoint)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            trailing_slash,
            network,
        })
    }

    pub fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    /// Build the URL for `segments` under the API root
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| BackendError::RequestFailed(format!("invalid endpoint '{}'", self.base_url)))?;
            path.pop_if_empty().extend(segments);
            if self.trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    /// Send a request and return the JSON body (`Null` when empty)
    async fn send(&self, request: RequestBuilder) -> Result<Value, BackendError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = BackendError::from(e);
                if err.is_connection() {
                    self.network.mark_offline();
                }
                error!("Backend request failed: {}", err);
                return Err(err);
            }
        };
        self.network.mark_online();

        let status = response.status();
        let body = response.text().await.map_err(BackendError::from)?;

        if !status.is_success() {
            error!("Backend responded with {}: {}", status, body);
            return Err(BackendError::ApiError {
                status_code: status.as_u16(),
                message: body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| BackendError::ParseError(e.to_string()))
    }

    async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value, BackendError> {
        let mut url = self.url(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        debug!("GET {}", url);
        self.send(self.client.get(url)).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> Result<Value, BackendError> {
        let url = self.url(segments)?;
        debug!("POST {}", url);
        self.send(self.client.post(url).json(body)).await
    }

    async fn get_as<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let body = self.get(segments, &[]).await?;
        decode(body)
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, BackendError> {
    serde_json::from_value(body).map_err(|e| BackendError::ParseError(e.to_string()))
}

fn encode<T: serde::Serialize>(body: &T) -> Result<Value, BackendError> {
    serde_json::to_value(body).map_err(|e| BackendError::RequestFailed(e.to_string()))
}

#[async_trait]
impl Backend for BackendClient {
    async fn list_keywords(&self) -> Result<Vec<Keyword>, BackendError> {
        normalize_list(self.get(&["keywords"], &[]).await?)
    }

    async fn get_keyword(&self, keyword_id: &str) -> Result<KeywordDetail, BackendError> {
        self.get_as(&["keywords", keyword_id]).await
    }

    async fn list_contents(&self, keyword_id: Option<&str>) -> Result<Vec<ContentSummary>, BackendError> {
        let body = match keyword_id {
            Some(id) => self.get(&["contents"], &[("keyword", id)]).await?,
            None => self.get(&["contents"], &[]).await?,
        };
        normalize_list(body)
    }

    async fn start_research(&self, keyword_id: &str) -> Result<Value, BackendError> {
        self.post(&["research", keyword_id], &json!({})).await
    }

    async fn research_status(&self, keyword_id: &str) -> Result<StatusRecord, BackendError> {
        self.get_as(&["research", keyword_id, "status"]).await
    }

    async fn create_content(&self, request: &ContentRequest) -> Result<Value, BackendError> {
        self.post(&["content"], &encode(request)?).await
    }

    async fn content_status(&self, keyword_id: &str) -> Result<StatusRecord, BackendError> {
        self.get_as(&["content", keyword_id, "status"]).await
    }

    async fn generate_titles(&self, content_id: &str) -> Result<TitleGenerationAck, BackendError> {
        let body = self
            .post(&["titles", "generate"], &json!({ "content_id": content_id }))
            .await?;
        if body.is_null() {
            return Ok(TitleGenerationAck::default());
        }
        decode(body)
    }

    async fn title_status(&self, content_id: &str) -> Result<StatusRecord, BackendError> {
        self.get_as(&["titles", "status", content_id]).await
    }

    async fn list_titles(&self) -> Result<Vec<SavedTitle>, BackendError> {
        normalize_list(self.get(&["titles"], &[]).await?)
    }

    async fn save_title(&self, content_id: &str, title: &str) -> Result<SavedTitle, BackendError> {
        let body = self
            .post(&["titles"], &json!({ "content_id": content_id, "title": title }))
            .await?;
        decode(body)
    }

    async fn list_images(&self, content_id: &str) -> Result<Vec<ImageRecord>, BackendError> {
        normalize_list(self.get(&["images"], &[("content", content_id)]).await?)
    }

    async fn generate_images(&self, content_id: &str, subtopic_index: Option<usize>) -> Result<Value, BackendError> {
        let request = ImageGenerationRequest {
            content_id: content_id.to_string(),
            subtopic_index,
        };
        self.post(&["images", "generate"], &encode(&request)?).await
    }

    async fn generate_infographic(&self, content_id: &str, subtopic_index: Option<usize>) -> Result<Value, BackendError> {
        let request = ImageGenerationRequest {
            content_id: content_id.to_string(),
            subtopic_index,
        };
        self.post(&["images", "infographic"], &encode(&request)?).await
    }
}
