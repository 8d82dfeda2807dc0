//! Remote sync endpoint client

use std::future::Future;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::PendingOperation;
use crate::util::compact_text;

use super::Snapshot;

/// The server side of the sync protocol.
///
/// Abstracted behind a trait so the coordinator can be exercised without a
/// live endpoint.
pub trait Remote: Send + Sync {
    /// Upload one ordered batch; any 2xx means the whole batch was accepted.
    ///
    /// The server must deduplicate by `op_id` since unacknowledged operations
    /// may be resent.
    fn push_batch(&self, batch: &[PendingOperation]) -> impl Future<Output = Result<()>> + Send;

    /// Fetch the full snapshot for a user
    fn fetch_snapshot(&self, user_email: &str) -> impl Future<Output = Result<Snapshot>> + Send;
}

/// HTTP implementation of [`Remote`]
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemote {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upload_timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.endpoint.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn push_url(&self) -> String {
        format!("{}/sync/offline", self.base_url)
    }

    fn snapshot_url(&self, user_email: &str) -> String {
        format!(
            "{}/sync/initial-data/{}",
            self.base_url,
            urlencoding::encode(user_email)
        )
    }
}

impl Remote for HttpRemote {
    fn push_batch(&self, batch: &[PendingOperation]) -> impl Future<Output = Result<()>> + Send {
        async move {
            let request = self
                .authorize(self.client.post(self.push_url()))
                .header("Accept", "application/json")
                .json(batch);

            let response = request.send().await.map_err(request_error)?;
            ensure_success(response).await?;
            Ok(())
        }
    }

    fn fetch_snapshot(&self, user_email: &str) -> impl Future<Output = Result<Snapshot>> + Send {
        async move {
            let request = self
                .authorize(self.client.get(self.snapshot_url(user_email)))
                .header("Accept", "application/json");

            let response = request.send().await.map_err(request_error)?;
            let response = ensure_success(response).await?;
            response
                .json::<Snapshot>()
                .await
                .map_err(|e| Error::Transport(format!("invalid snapshot payload: {e}")))
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Transport(parse_api_error(status, &body)))
}

fn request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Transport("request timed out".to_string())
    } else {
        Error::Transport(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}
