use super::wire::{
    Ack, StartRequest, StatsResponse, UpdateConfigRequest, PATH_PAUSE, PATH_REPORT, PATH_START,
    PATH_STATS, PATH_STOP, PATH_UPDATE_CONFIG,
};
use crate::error::{ControllerError, Result};
use crate::model::RunConfig;
use bytes::Bytes;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the load-test engine's control and stats endpoints.
#[derive(Debug, Clone)]
pub struct EngineClient {
    base_url: String,
    http: Client,
}

impl EngineClient {
    /// Build a client whose every request is bounded by `request_timeout`.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("stress-console/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn start(&self, cfg: &RunConfig) -> Result<Ack> {
        debug!(target_url = %cfg.target_url, users = cfg.user_count, "POST {PATH_START}");
        let resp = self
            .http
            .post(self.url(PATH_START))
            .json(&StartRequest::from(cfg))
            .send()
            .await?;
        handle_ack(resp).await
    }

    /// Single toggle: the engine answers with the state it is now in.
    pub async fn toggle_pause(&self) -> Result<Ack> {
        debug!("POST {PATH_PAUSE}");
        let resp = self.http.post(self.url(PATH_PAUSE)).send().await?;
        handle_ack(resp).await
    }

    pub async fn stop(&self) -> Result<Ack> {
        debug!("POST {PATH_STOP}");
        let resp = self.http.post(self.url(PATH_STOP)).send().await?;
        handle_ack(resp).await
    }

    pub async fn update_config(&self, users: u32, duration_secs: u64) -> Result<Ack> {
        debug!(users, duration_secs, "POST {PATH_UPDATE_CONFIG}");
        let resp = self
            .http
            .post(self.url(PATH_UPDATE_CONFIG))
            .json(&UpdateConfigRequest {
                users,
                duration: duration_secs,
            })
            .send()
            .await?;
        handle_ack(resp).await
    }

    pub async fn fetch_stats(&self) -> Result<StatsResponse> {
        let resp = self.http.get(self.url(PATH_STATS)).send().await?;
        handle_json(resp).await
    }

    /// Ask the engine to render its PDF report and return the raw bytes.
    pub async fn generate_report(&self) -> Result<Bytes> {
        debug!("POST {PATH_REPORT}");
        let resp = self.http.post(self.url(PATH_REPORT)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ControllerError::TransportFailure(format!("HTTP {status}")));
        }
        Ok(resp.bytes().await?)
    }
}

async fn handle_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ControllerError::TransportFailure(format!("HTTP {status}")));
    }
    resp.json()
        .await
        .map_err(|e| ControllerError::TransportFailure(format!("invalid response body: {e}")))
}

/// Control endpoints may report a refusal with a non-2xx status and an explanatory body.
/// That is a rejection, not a transport problem, so try the body before giving up.
async fn handle_ack(resp: reqwest::Response) -> Result<Ack> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json()
            .await
            .map_err(|e| ControllerError::TransportFailure(format!("invalid response body: {e}")));
    }
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<Ack>(&body) {
        Ok(ack) => Err(ControllerError::EngineRejected(ack.reason())),
        Err(_) => Err(ControllerError::TransportFailure(format!("HTTP {status}"))),
    }
}
