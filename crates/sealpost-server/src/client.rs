//! HTTP implementation of [`PeerClient`].

use std::time::Duration;

use async_trait::async_trait;
use sealpost_core::{PartyInfo, PeerClient, PeerError, PrivacyGroupPayload};
use sealpost_crypto::EncryptedPayload;
use serde::Serialize;

use crate::ServerError;

/// Calls peer nodes over HTTP with a per-call timeout.
#[derive(Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Client whose every call gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ServerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        url: &str,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, PeerError> {
        let target = endpoint(url, path);
        let response = self
            .client
            .post(&target)
            .json(body)
            .send()
            .await
            .map_err(|e| PeerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status(status.as_u16()));
        }
        Ok(response)
    }

    async fn post_for_text<T: Serialize + Sync>(
        &self,
        url: &str,
        path: &str,
        body: &T,
    ) -> Result<String, PeerError> {
        self.post(url, path, body)
            .await?
            .text()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn party_info(&self, url: &str, local: &PartyInfo) -> Result<PartyInfo, PeerError> {
        self.post(url, "partyinfo", local)
            .await?
            .json()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))
    }

    async fn push(&self, url: &str, payload: &EncryptedPayload) -> Result<String, PeerError> {
        self.post_for_text(url, "push", payload).await
    }

    async fn push_privacy_group(
        &self,
        url: &str,
        group: &PrivacyGroupPayload,
    ) -> Result<String, PeerError> {
        self.post_for_text(url, "pushPrivacyGroup", group).await
    }
}

/// `<url>/<path>`, tolerating a trailing slash on the node URL.
fn endpoint(url: &str, path: &str) -> String {
    format!("{}/{path}", url.trim_end_matches('/'))
}
