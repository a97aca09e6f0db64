//! HTTP client for the gateway's `/api/queue` endpoint.

use crate::action::{MutationRequest, QueueAction};
use crate::error::{QueueError, QueueResult};
use crate::model::QueueState;
use std::time::Duration;

const QUEUE_PATH: &str = "/api/queue";

#[derive(Debug, Clone)]
pub struct QueueClient {
    base_url: String,
    http: reqwest::Client,
}

impl QueueClient {
    /// Client for a gateway at `base_url` (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: impl Into<String>) -> QueueResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/queue`.
    pub async fn fetch_state(&self) -> QueueResult<QueueState> {
        let res = self
            .http
            .get(format!("{}{}", self.base_url, QUEUE_PATH))
            .send()
            .await?;
        decode(res).await
    }

    /// `POST /api/queue` with the action; returns the state after the write.
    pub async fn send(&self, action: &QueueAction) -> QueueResult<QueueState> {
        let res = self
            .http
            .post(format!("{}{}", self.base_url, QUEUE_PATH))
            .json(&MutationRequest::from(action))
            .send()
            .await?;
        decode(res).await
    }
}

async fn decode(res: reqwest::Response) -> QueueResult<QueueState> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(QueueError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(res.json::<QueueState>().await?)
}
