//! Form-relay client for contact submissions.
//!
//! Submissions are posted as form fields plus the configured access key;
//! the relay answers a success flag and an optional human-readable message.

use async_trait::async_trait;
use reqwest::{Client, Url, multipart::Form};
use serde::Deserialize;
use thiserror::Error;

use crate::application::contact::ContactSubmission;
use crate::config::ContactSettings;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("form relay not configured")]
    NotConfigured,
    #[error("relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("relay response could not be decoded: {0}")]
    Decode(String),
}

/// What the relay said about a submission.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayAcceptance {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait FormRelay: Send + Sync {
    async fn submit(&self, submission: &ContactSubmission) -> Result<RelayAcceptance, RelayError>;
}

pub struct FormRelayClient {
    client: Client,
    relay_url: Url,
    access_key: Option<String>,
}

impl FormRelayClient {
    pub fn new(settings: &ContactSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("vetrina/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.http_timeout)
            .build()?;
        Ok(Self {
            client,
            relay_url: settings.relay_url.clone(),
            access_key: settings.access_key.clone(),
        })
    }
}

#[async_trait]
impl FormRelay for FormRelayClient {
    async fn submit(&self, submission: &ContactSubmission) -> Result<RelayAcceptance, RelayError> {
        let access_key = self
            .access_key
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(RelayError::NotConfigured)?;

        let form = Form::new()
            .text("access_key", access_key.to_string())
            .text("name", submission.name.clone())
            .text("email", submission.email.clone())
            .text("subject", submission.subject.clone())
            .text("message", submission.message.clone());

        let response = self
            .client
            .post(self.relay_url.clone())
            .multipart(form)
            .send()
            .await?;

        // The relay answers JSON on failure statuses too; decode before
        // looking at the status so its message is not lost.
        let status = response.status();
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|_| RelayError::Decode(format!("status {status}, unrecognized body")))
    }
}
