//! Spreadsheet-backed content source.
//!
//! Posts live in an external spreadsheet queried wholesale over HTTPS with
//! a read-only API key in the URL query string. Rows are positional; the
//! mapping to records lives in the content service.

use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::config::ContentSettings;

const MIN_API_KEY_LEN: usize = 30;
const MIN_SPREADSHEET_ID_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet source not configured: {reason}")]
    NotConfigured { reason: &'static str },
    #[error("sheet endpoint is not usable: {0}")]
    Endpoint(String),
    #[error("sheet request failed with status {status}")]
    Status { status: StatusCode },
    #[error("sheet response could not be decoded: {0}")]
    Decode(String),
    #[error("sheet request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Read-only row source for the configured range.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch every row of the range, header row included. Rows may be
    /// ragged; cells are plain strings.
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetError>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetContentClient {
    client: Client,
    endpoint: Url,
    spreadsheet_id: Option<String>,
    api_key: Option<String>,
    range: String,
}

impl SheetContentClient {
    pub fn new(settings: &ContentSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("vetrina/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.http_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.sheet_endpoint.clone(),
            spreadsheet_id: settings.spreadsheet_id.clone(),
            api_key: settings.api_key.clone(),
            range: format!("{}!{}", settings.sheet_name, settings.column_span),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), SheetError> {
        let id = self
            .spreadsheet_id
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(SheetError::NotConfigured {
                reason: "spreadsheet id missing",
            })?;
        let key = self
            .api_key
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(SheetError::NotConfigured {
                reason: "api key missing",
            })?;
        if key.len() < MIN_API_KEY_LEN {
            return Err(SheetError::NotConfigured {
                reason: "api key too short to be valid",
            });
        }
        if id.len() < MIN_SPREADSHEET_ID_LEN {
            return Err(SheetError::NotConfigured {
                reason: "spreadsheet id too short to be valid",
            });
        }
        Ok((id, key))
    }

    fn values_url(&self, id: &str, key: &str) -> Result<Url, SheetError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| SheetError::Endpoint("endpoint cannot be a base URL".to_string()))?
            .push(id)
            .push("values")
            .push(&self.range);
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }
}

#[async_trait]
impl SheetSource for SheetContentClient {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, SheetError> {
        let (id, key) = self.credentials()?;
        let url = self.values_url(id, key)?;

        let started = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            match status {
                StatusCode::NOT_FOUND => warn!(
                    target = "vetrina::sheets",
                    "sheet not found; check the spreadsheet id and sharing settings"
                ),
                StatusCode::FORBIDDEN => warn!(
                    target = "vetrina::sheets",
                    "sheet access denied; check that the key may read the sheet"
                ),
                StatusCode::BAD_REQUEST => warn!(
                    target = "vetrina::sheets",
                    "sheet request rejected; the api key is likely invalid"
                ),
                _ => warn!(
                    target = "vetrina::sheets",
                    status = status.as_u16(),
                    "sheet request failed"
                ),
            }
            return Err(SheetError::Status { status });
        }

        let body = response.text().await?;
        let range: ValueRange =
            serde_json::from_str(&body).map_err(|err| SheetError::Decode(err.to_string()))?;
        histogram!("vetrina_sheet_fetch_ms").record(started.elapsed().as_millis() as f64);
        Ok(range.values)
    }
}
