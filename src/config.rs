//! Configuration types for the staging workflow and the parse API server.
//!
//! All workflow behaviour is controlled through [`WorkflowConfig`], built via
//! its [`WorkflowConfigBuilder`]; the server has its own [`ServerConfig`].
//! Defaults reproduce the behaviour of the original upload page: thirty
//! documents, a two-second simulated parse and a local endpoint on port 5000.

use crate::error::ParserError;
use std::path::PathBuf;

/// Maximum number of simultaneously staged documents.
pub const DEFAULT_CAPACITY: usize = 30;

/// Configuration for a [`crate::workflow::Workflow`].
///
/// # Example
/// ```rust
/// use krushflow_parser::WorkflowConfig;
///
/// let config = WorkflowConfig::builder()
///     .endpoint("http://127.0.0.1:5000")
///     .simulated_delay_ms(0)
///     .persist_client_side(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.capacity, 30);
/// ```
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum number of staged documents. Default: 30.
    pub capacity: usize,

    /// Base URL of the parse API, without trailing slash. Default: `http://127.0.0.1:5000`.
    pub endpoint: String,

    /// Path of the submission route on `endpoint`. Default: `/api/parse`.
    pub parse_path: String,

    /// Fixed delay before extraction, independent of batch size. Default: 2000.
    pub simulated_delay_ms: u64,

    /// Directory holding the two local-storage slots.
    pub storage_dir: PathBuf,

    /// Mirror documents and results into the client slot after a parse. Default: false.
    pub persist_client_side: bool,

    /// Upper bound on concurrent file reads during intake. Default: 8.
    pub read_concurrency: usize,

    /// Optional timeout for the submission request. Default: none.
    pub request_timeout_secs: Option<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            endpoint: "http://127.0.0.1:5000".to_string(),
            parse_path: "/api/parse".to_string(),
            simulated_delay_ms: 2000,
            storage_dir: PathBuf::from(".krushflow"),
            persist_client_side: false,
            read_concurrency: 8,
            request_timeout_secs: None,
        }
    }
}

impl WorkflowConfig {
    /// Create a new builder for `WorkflowConfig`.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL the document batch is POSTed to.
    pub fn parse_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if self.parse_path.starts_with('/') {
            format!("{base}{}", self.parse_path)
        } else {
            format!("{base}/{}", self.parse_path)
        }
    }
}

/// Builder for [`WorkflowConfig`].
#[derive(Debug)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn capacity(mut self, n: usize) -> Self {
        self.config.capacity = n;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn parse_path(mut self, path: impl Into<String>) -> Self {
        self.config.parse_path = path.into();
        self
    }

    pub fn simulated_delay_ms(mut self, ms: u64) -> Self {
        self.config.simulated_delay_ms = ms;
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn persist_client_side(mut self, v: bool) -> Self {
        self.config.persist_client_side = v;
        self
    }

    pub fn read_concurrency(mut self, n: usize) -> Self {
        self.config.read_concurrency = n.max(1);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig, ParserError> {
        let c = &self.config;
        if c.capacity == 0 {
            return Err(ParserError::InvalidConfig(
                "Capacity must be ≥ 1".into(),
            ));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(ParserError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(ParserError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Configuration for the parse API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind. Default: `127.0.0.1:5000`.
    pub addr: String,

    /// Directory holding `server_data.json`. Default: `parsed_documents`.
    pub data_dir: PathBuf,

    /// Directory of static files served for unmatched paths. Default: none.
    pub static_dir: Option<PathBuf>,

    /// Request body limit in bytes. Default: 64 MiB.
    ///
    /// A batch carries every file as base64 and must fit under this.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            data_dir: PathBuf::from("parsed_documents"),
            static_dir: None,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_page() {
        let c = WorkflowConfig::default();
        assert_eq!(c.capacity, 30);
        assert_eq!(c.simulated_delay_ms, 2000);
        assert!(!c.persist_client_side);
        assert_eq!(c.parse_url(), "http://127.0.0.1:5000/api/parse");
    }

    #[test]
    fn parse_url_joins_slashes() {
        let c = WorkflowConfig::builder()
            .endpoint("http://localhost:8080/")
            .parse_path("api/parse")
            .build()
            .unwrap();
        assert_eq!(c.parse_url(), "http://localhost:8080/api/parse");
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = WorkflowConfig::builder().capacity(0).build().unwrap_err();
        assert!(matches!(err, ParserError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let err = WorkflowConfig::builder()
            .endpoint("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://example.com"));
    }

    #[test]
    fn read_concurrency_clamped() {
        let c = WorkflowConfig::builder().read_concurrency(0).build().unwrap();
        assert_eq!(c.read_concurrency, 1);
    }
}
