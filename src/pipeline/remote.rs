//! Remote persistence: POST the raw document batch to the parse endpoint.
//!
//! One request per batch, no retry. Only the status line decides success;
//! a JSON body is handed back for logging when one parses, and ignored
//! otherwise.

use crate::config::WorkflowConfig;
use crate::document::Document;
use crate::error::ParserError;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
struct SubmitRequest<'a> {
    documents: &'a [Document],
}

/// HTTP client bound to one parse URL.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    url: String,
    timeout_secs: Option<u64>,
}

impl RemoteClient {
    pub fn from_config(config: &WorkflowConfig) -> Result<Self, ParserError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ParserError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.parse_url(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submit `documents` as `{ "documents": [...] }`.
    ///
    /// Returns the response body if it was JSON.
    pub async fn submit(&self, documents: &[Document]) -> Result<Option<serde_json::Value>, ParserError> {
        info!("Submitting {} documents to {}", documents.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&SubmitRequest { documents })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParserError::RemoteRejected {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.json::<serde_json::Value>().await.ok();
        debug!("Parse endpoint answered {}: {:?}", status, body);
        Ok(body)
    }

    fn transport_error(&self, e: reqwest::Error) -> ParserError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => ParserError::RemoteTimeout {
                url: self.url.clone(),
                secs,
            },
            _ => ParserError::RemoteUnreachable {
                url: self.url.clone(),
                reason: e.to_string(),
            },
        }
    }
}
