use std::{collections::HashMap, io::ErrorKind, path::PathBuf, sync::Arc};

use stableroom_common::ThresholdResponse;
use tokio::sync::Mutex;

/// Per-device threshold bands kept as one JSON file in the data directory.
#[derive(Clone)]
pub struct AppStore {
    thresholds_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl AppStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            thresholds_path: Arc::new(data_dir.into().join("thresholds.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Uses `STABLEROOM_DATA_DIR`, falling back to `./.stableroom`.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("STABLEROOM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.stableroom"));
        Self::new(data_dir)
    }

    pub async fn load_thresholds(&self) -> anyhow::Result<HashMap<String, ThresholdResponse>> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.thresholds_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save_thresholds(
        &self,
        thresholds: &HashMap<String, ThresholdResponse>,
    ) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.thresholds_path.as_ref().clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(thresholds)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stableroom_common::ThresholdSet;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stableroom-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let store = AppStore::new(scratch_dir("missing"));
        assert!(store.load_thresholds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_thresholds_load_back() {
        let dir = scratch_dir("roundtrip");
        let store = AppStore::new(&dir);
        let band: ThresholdResponse = ThresholdSet::new(18.0, 26.0, 35.0, 65.0).into();
        let thresholds = HashMap::from([("D01".to_string(), band)]);

        store.save_thresholds(&thresholds).await.unwrap();
        let loaded = store.load_thresholds().await.unwrap();

        assert_eq!(loaded.get("D01"), Some(&band));
        let _ = std::fs::remove_dir_all(dir);
    }
}
