use std::fmt::{self, Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use numbrush_shared::{decode_session_file, encode_session_file, CanvasTemplate, SessionFileData};

#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    Io(String),
    /// The stored bytes exist but cannot be decoded.
    Corrupt(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(what) => write!(f, "{what} not found"),
            StorageError::Io(msg) => write!(f, "storage i/o failed: {msg}"),
            StorageError::Corrupt(msg) => write!(f, "stored data is unreadable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn load_template(&self, project_id: &str) -> Result<CanvasTemplate, StorageError>;
    async fn load_sessions(&self, project_id: &str) -> Result<SessionFileData, StorageError>;
    async fn save_sessions(
        &self,
        project_id: &str,
        data: &SessionFileData,
    ) -> Result<(), StorageError>;
    /// Project that holds `session_id` in storage, if any. Used when the
    /// session's project has not been loaded by this process yet.
    async fn find_session(&self, session_id: &str) -> Result<Option<String>, StorageError>;
}

/// Templates as `projects/<id>.json`, sessions as `sessions/<id>.bin` under
/// one data directory.
pub struct FileStorage {
    projects_dir: PathBuf,
    sessions_dir: PathBuf,
}

impl FileStorage {
    pub async fn create(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_dir = data_dir.as_ref();
        let storage = Self {
            projects_dir: data_dir.join("projects"),
            sessions_dir: data_dir.join("sessions"),
        };
        tokio::fs::create_dir_all(&storage.projects_dir).await?;
        tokio::fs::create_dir_all(&storage.sessions_dir).await?;
        Ok(storage)
    }

    pub fn template_path(&self, project_id: &str) -> PathBuf {
        self.projects_dir.join(format!("{project_id}.json"))
    }

    fn sessions_path(&self, project_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{project_id}.bin"))
    }
}

async fn read(path: &Path, what: impl FnOnce() -> String) -> Result<Vec<u8>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(payload) => Ok(payload),
        Err(error) if error.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(what())),
        Err(error) => Err(StorageError::Io(format!("{}: {error}", path.display()))),
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load_template(&self, project_id: &str) -> Result<CanvasTemplate, StorageError> {
        let payload = read(&self.template_path(project_id), || {
            format!("project {project_id}")
        })
        .await?;
        serde_json::from_slice(&payload)
            .map_err(|e| StorageError::Corrupt(format!("template {project_id}: {e}")))
    }

    async fn load_sessions(&self, project_id: &str) -> Result<SessionFileData, StorageError> {
        let payload = read(&self.sessions_path(project_id), || {
            format!("sessions of {project_id}")
        })
        .await?;
        decode_session_file(&payload)
            .map_err(|e| StorageError::Corrupt(format!("sessions of {project_id}: {e}")))
    }

    /// Writes to a sibling temp file first so a crash never leaves a torn file.
    async fn save_sessions(
        &self,
        project_id: &str,
        data: &SessionFileData,
    ) -> Result<(), StorageError> {
        let path = self.sessions_path(project_id);
        let staging = path.with_extension("bin.tmp");
        let payload = encode_session_file(data)
            .map_err(|e| StorageError::Io(format!("sessions of {project_id}: {e}")))?;
        tokio::fs::write(&staging, payload)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", staging.display())))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {e}", path.display())))
    }

    /// Scans every session file. Unreadable files are skipped so one corrupt
    /// project cannot hide sessions of the others.
    async fn find_session(&self, session_id: &str) -> Result<Option<String>, StorageError> {
        let io_err = |e: std::io::Error| {
            StorageError::Io(format!("{}: {e}", self.sessions_dir.display()))
        };
        let mut entries = tokio::fs::read_dir(&self.sessions_dir)
            .await
            .map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("bin") {
                continue;
            }
            let Some(project_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match self.load_sessions(project_id).await {
                Ok(data) if data.sessions.iter().any(|session| session.id == session_id) => {
                    return Ok(Some(project_id.to_string()));
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(project = %project_id, %error, "skipping unreadable sessions");
                }
            }
        }
        Ok(None)
    }
}
