use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::error::PersistenceError;
use super::PersistenceAdapter;
use crate::simulation::SimulationSnapshot;

/// File-backed [`PersistenceAdapter`]: one JSON object per simulation id at
/// `${base_path}_${id}.json`, except `default_id`, which is stored at `base_path` directly.
/// In the style of a small `InMemoryRepository` shape (a trivial, fully-owned store satisfying
/// the same repository trait as a networked backend) but backed by the filesystem instead.
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    base_path: PathBuf,
    default_id: String,
}

impl JsonFileAdapter {
    pub fn new(base_path: impl Into<PathBuf>, default_id: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            default_id: default_id.into(),
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        if id == self.default_id {
            self.base_path.clone()
        } else {
            let mut path = self.base_path.clone().into_os_string();
            path.push("_");
            path.push(id);
            path.push(".json");
            PathBuf::from(path)
        }
    }
}

#[async_trait]
impl PersistenceAdapter for JsonFileAdapter {
    async fn load(&self, id: &str) -> Result<Option<SimulationSnapshot>, PersistenceError> {
        let path = self.path_for(id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, id: &str, snapshot: &SimulationSnapshot) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
