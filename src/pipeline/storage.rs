//! Local persistence: two string-keyed JSON slots in one directory.
//!
//! * **client** (`krushflow_client_data`): documents, results and a
//!   timestamp, written only when the user opted in.
//! * **server** (`krushflow_server_data`): the results echoed after a
//!   successful submission, with count and timestamp.
//!
//! The slots are independent; nothing keeps them in sync. Writes go to a
//! temporary sibling and are renamed into place so a crash never leaves a
//! half-written slot behind.

use crate::document::{Document, ParsedResult};
use crate::error::StorageError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CLIENT_KEY: &str = "krushflow_client_data";
pub const SERVER_KEY: &str = "krushflow_server_data";

/// Contents of the client slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub parsed_results: Vec<ParsedResult>,
    pub timestamp: DateTime<Utc>,
}

/// Contents of the server slot. `documents` holds parsed results, as it
/// always has on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    #[serde(default)]
    pub documents: Vec<ParsedResult>,
    pub timestamp: DateTime<Utc>,
    pub count: usize,
}

/// Directory-backed key/value store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Serialise `value` into slot `key`, replacing any previous content.
    pub async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serialize {
            key: key.to_string(),
            source: e,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::Io {
                path: self.dir.clone(),
                source: e,
            })?;

        let path = self.slot_path(key);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| StorageError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StorageError::Io {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {} bytes to {}", json.len(), path.display());
        Ok(())
    }

    /// Read slot `key`. A missing slot is `Ok(None)`.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.slot_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io { path, source: e }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Corrupt { path, source: e })
    }

    /// Delete slot `key`. Deleting a missing slot succeeds.
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.slot_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io { path, source: e }),
        }
    }

    pub async fn save_client(&self, snapshot: &ClientSnapshot) -> Result<(), StorageError> {
        self.write_json(CLIENT_KEY, snapshot).await
    }

    pub async fn load_client(&self) -> Result<Option<ClientSnapshot>, StorageError> {
        self.read_json(CLIENT_KEY).await
    }

    pub async fn remove_client(&self) -> Result<(), StorageError> {
        self.remove(CLIENT_KEY).await
    }

    pub async fn save_server(&self, snapshot: &ServerSnapshot) -> Result<(), StorageError> {
        self.write_json(SERVER_KEY, snapshot).await
    }

    pub async fn load_server(&self) -> Result<Option<ServerSnapshot>, StorageError> {
        self.read_json(SERVER_KEY).await
    }
}
