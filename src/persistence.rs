//! 💾 포럼 데이터 저장소
//!
//! The whole [`ForumData`] document is read once at startup and rewritten on
//! every mutation. Three backends:
//!
//! - [`FileStore`]: a JSON file on local disk
//! - [`RemoteStore`]: a key-value service reached over HTTP (`GET/PUT {base}/data`)
//! - [`MemoryStore`]: keeps nothing, for tests and throwaway runs

use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forum::ForumData;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot file error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("remote store error: {0}")]
    Remote(#[from] reqwest::Error),
}

/// Storage for the forum snapshot.
///
/// The router is generic over this trait, so tests can swap in any double.
pub trait Persistence: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<ForumData, PersistenceError>> + Send;

    fn save(&self, data: &ForumData)
        -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// 🧠 메모리 저장소 (아무것도 저장하지 않음)
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStore;

impl Persistence for MemoryStore {
    async fn load(&self) -> Result<ForumData, PersistenceError> {
        Ok(ForumData::default())
    }

    async fn save(&self, _data: &ForumData) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// 📄 JSON 파일 저장소
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    // `database.json` → `database.json.tmp`
    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tmp.into()
    }
}

impl Persistence for FileStore {
    /// Reads the snapshot, or writes an empty one if the file does not exist yet.
    async fn load(&self) -> Result<ForumData, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no snapshot found, creating an empty one");
                let data = ForumData::default();
                self.save(&data).await?;
                Ok(data)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, data: &ForumData) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(data)?;

        // 임시 파일에 쓴 뒤 rename → 중간에 죽어도 스냅샷이 잘리지 않음
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::trace!(path = %self.path.display(), "snapshot written");
        Ok(())
    }
}

/// 🌐 원격 key-value 저장소
///
/// The service stores one JSON value under `/data`:
///
/// - `GET {base}/data` → `{"data": {"posts": [...], "comments": [...]}}`
/// - `PUT {base}/data` with the same envelope as the request body
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: Client,
    data_url: String,
}

#[derive(Serialize, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default)]
    data: T,
}

impl RemoteStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            data_url: format!("{}/data", base_url.trim_end_matches('/')),
        })
    }

    async fn fetch(&self) -> Result<ForumData, reqwest::Error> {
        let envelope: DataEnvelope<ForumData> = self
            .client
            .get(&self.data_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.data)
    }
}

impl Persistence for RemoteStore {
    /// Never fails: an unreachable or misbehaving store yields an empty forum.
    async fn load(&self) -> Result<ForumData, PersistenceError> {
        match self.fetch().await {
            Ok(data) => Ok(data),
            Err(err) => {
                tracing::warn!(%err, url = %self.data_url, "remote store unavailable, starting with an empty forum");
                Ok(ForumData::default())
            }
        }
    }

    async fn save(&self, data: &ForumData) -> Result<(), PersistenceError> {
        self.client
            .put(&self.data_url)
            .json(&DataEnvelope { data })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
