//! Session store: every accepted batch, appended to one JSON file.
//!
//! Reads and writes go through [`LocalStore`] under the key `server_data`;
//! a mutex serialises read-modify-write cycles so concurrent submissions
//! never lose a session or reuse an id.

use crate::error::StorageError;
use crate::pipeline::storage::LocalStore;
use crate::server::analyze::SessionDocument;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

const SESSIONS_KEY: &str = "server_data";

/// One accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: u64,
    /// ISO-8601; files written by older servers carry no offset.
    pub timestamp: String,
    pub document_count: usize,
    pub documents: Vec<SessionDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerData {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

pub struct SessionStore {
    store: LocalStore,
    lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: LocalStore::new(data_dir),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.store.slot_path(SESSIONS_KEY)
    }

    /// All sessions; an absent file is an empty store.
    pub async fn load(&self) -> Result<ServerData, StorageError> {
        Ok(self.store.read_json(SESSIONS_KEY).await?.unwrap_or_default())
    }

    /// Record `documents` as a new session numbered after the existing ones.
    pub async fn append(&self, documents: Vec<SessionDocument>) -> Result<Session, StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let session = Session {
            id: data.sessions.len() as u64 + 1,
            timestamp: Utc::now().to_rfc3339(),
            document_count: documents.len(),
            documents,
        };
        data.sessions.push(session.clone());
        self.store.write_json(SESSIONS_KEY, &data).await?;
        Ok(session)
    }

    pub async fn get(&self, id: u64) -> Result<Option<Session>, StorageError> {
        let data = self.load().await?;
        Ok(data.sessions.into_iter().find(|s| s.id == id))
    }

    /// Drop every session.
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.store.write_json(SESSIONS_KEY, &ServerData::default()).await
    }
}
