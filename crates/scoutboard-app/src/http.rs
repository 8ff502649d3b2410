// reqwest implementation of the player-lists API.
//
// Every request carries the bearer token handed over by the auth layer.
// Non-2xx responses are folded into `PipelineError` by `classify_status`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use scoutboard_core::api::PipelineApi;
use scoutboard_core::config::Config;
use scoutboard_core::error::PipelineError;
use scoutboard_core::model::{
    AddPlayerRequest, ItemId, ListId, ListItem, ListUpdate, NewList, PlayerList,
    PlayerListDetail, PlayerSearchResult, ReorderRequest, Stage, StageUpdate,
};

#[derive(Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpApi {
    pub fn new(
        base_url: &str,
        bearer_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Transport(format!("failed to build HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = bearer_token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| PipelineError::Validation {
                    status: 0,
                    message: format!("bearer token is not a valid header value: {e}"),
                })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(HttpApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Self::new(
            &config.api.base_url,
            config.credentials.bearer_token.as_deref(),
            Duration::from_millis(config.api.request_timeout_ms),
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api request");
        self.http.request(method, url).headers(self.headers.clone())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PipelineError> {
        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_status(status, &body);
        warn!(%status, error = %err, "api request failed");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PipelineError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PipelineError::Decode(e.to_string()))
    }

    async fn send_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, PipelineError> {
        self.send(self.request(method, path).json(body)).await
    }
}

/// Map a non-success status and its body to the error taxonomy.
///
/// 401/422 are authentication failures. 409, or a 400 whose detail says the
/// player is "already" present, is a duplicate membership. 404 means the
/// request referenced state the server no longer has. 5xx is treated like a
/// transport failure.
pub fn classify_status(status: StatusCode, body: &str) -> PipelineError {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => PipelineError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::CONFLICT => PipelineError::Duplicate(detail),
        StatusCode::BAD_REQUEST if detail.to_lowercase().contains("already") => {
            PipelineError::Duplicate(detail)
        }
        StatusCode::NOT_FOUND => PipelineError::StaleState(detail),
        s if s.is_server_error() => PipelineError::Transport(format!("{status}: {detail}")),
        _ => PipelineError::Validation {
            status: status.as_u16(),
            message: detail,
        },
    }
}

/// Pull a human-readable message out of an error body. Accepts
/// `{"detail": "..."}`, `{"message": "..."}`, or falls back to the raw text.
fn error_detail(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("detail").or_else(|| v.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl PipelineApi for HttpApi {
    async fn list_lists(&self) -> Result<Vec<PlayerList>, PipelineError> {
        self.send_json(self.request(Method::GET, "/player-lists"))
            .await
    }

    async fn get_list(&self, list_id: ListId) -> Result<PlayerListDetail, PipelineError> {
        self.send_json(self.request(Method::GET, &format!("/player-lists/{list_id}")))
            .await
    }

    async fn create_list(&self, list: &NewList) -> Result<PlayerList, PipelineError> {
        self.send_json(self.request(Method::POST, "/player-lists").json(list))
            .await
    }

    async fn update_list(
        &self,
        list_id: ListId,
        update: &ListUpdate,
    ) -> Result<PlayerList, PipelineError> {
        let path = format!("/player-lists/{list_id}");
        self.send_json(self.request(Method::PUT, &path).json(update))
            .await
    }

    async fn delete_list(&self, list_id: ListId) -> Result<(), PipelineError> {
        self.send(self.request(Method::DELETE, &format!("/player-lists/{list_id}")))
            .await?;
        Ok(())
    }

    async fn add_player(
        &self,
        list_id: ListId,
        request: &AddPlayerRequest,
    ) -> Result<ListItem, PipelineError> {
        let path = format!("/player-lists/{list_id}/players");
        self.send_json(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn remove_player(&self, list_id: ListId, item_id: ItemId) -> Result<(), PipelineError> {
        let path = format!("/player-lists/{list_id}/players/{item_id}");
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn update_stage(
        &self,
        list_id: ListId,
        item_id: ItemId,
        stage: Stage,
    ) -> Result<(), PipelineError> {
        let path = format!("/player-lists/{list_id}/players/{item_id}/stage");
        self.send_body(Method::PUT, &path, &StageUpdate { stage })
            .await?;
        Ok(())
    }

    async fn reorder(
        &self,
        list_id: ListId,
        request: &ReorderRequest,
    ) -> Result<(), PipelineError> {
        let path = format!("/player-lists/{list_id}/reorder");
        self.send_body(Method::PUT, &path, request).await?;
        Ok(())
    }

    async fn search_players(&self, query: &str) -> Result<Vec<PlayerSearchResult>, PipelineError> {
        let request = self
            .request(Method::GET, "/players/search")
            .query(&[("query", query)]);
        self.send_json(request).await
    }
}
