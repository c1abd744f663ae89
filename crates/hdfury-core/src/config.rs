//! Persisted device configuration.
//!
//! The host keeps one [`DeviceConfig`] per configured device, keyed by its
//! identifier. [`DeviceStore`] is the persistence seam; [`JsonFileStore`]
//! stores the whole mapping as a single JSON object in `config.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{self, ModelConfig, ModelId};

/// File name used by [`JsonFileStore`] inside its directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

fn default_model_id() -> String {
    ModelId::DEFAULT.as_str().to_string()
}

/// Connection settings for one configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub identifier: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Model family identifier. Older configurations omit it.
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

impl DeviceConfig {
    /// Build a configuration whose identifier is derived from the host.
    pub fn new(name: &str, host: &str, port: u16, model: ModelId) -> Self {
        DeviceConfig {
            identifier: device_id_for_host(host),
            name: name.to_string(),
            host: host.to_string(),
            port,
            model_id: model.as_str().to_string(),
        }
    }

    /// The model definition for this device, falling back to the default
    /// family for unknown identifiers.
    pub fn model(&self) -> ModelConfig {
        models::lookup(&self.model_id)
    }
}

/// Derive a stable device identifier from its host address.
///
/// `"192.168.1.100"` becomes `"hdfury-192-168-1-100"`.
pub fn device_id_for_host(host: &str) -> String {
    format!("hdfury-{}", host.replace('.', "-"))
}

/// Persistence for the identifier → configuration mapping.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Reload the mapping from the backing store.
    async fn load(&self) -> Result<()>;

    /// Write the current mapping to the backing store.
    async fn save(&self) -> Result<()>;

    /// Add a device and persist. Returns `false` (and does nothing) if the
    /// identifier is already present.
    async fn add(&self, device: DeviceConfig) -> Result<bool>;

    async fn get(&self, identifier: &str) -> Option<DeviceConfig>;

    async fn all(&self) -> Vec<DeviceConfig>;
}

/// [`DeviceStore`] backed by `<dir>/config.json`.
pub struct JsonFileStore {
    path: PathBuf,
    devices: Mutex<BTreeMap<String, DeviceConfig>>,
}

impl JsonFileStore {
    /// Open (and load) the store rooted at `dir`. A missing file yields an
    /// empty store.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let store = JsonFileStore {
            path: dir.as_ref().join(CONFIG_FILE_NAME),
            devices: Mutex::new(BTreeMap::new()),
        };
        store.load().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DeviceStore for JsonFileStore {
    async fn load(&self) -> Result<()> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::Io(e)),
        };

        tracing::info!(path = %self.path.display(), "Loading device configurations");

        let parsed: BTreeMap<String, DeviceConfig> = match serde_json::from_str(&contents) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not decode device configuration, starting fresh"
                );
                BTreeMap::new()
            }
        };

        *self.devices.lock().await = parsed;
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let json = {
            let devices = self.devices.lock().await;
            serde_json::to_string_pretty(&*devices)
                .map_err(|e| Error::Config(format!("failed to encode devices: {e}")))?
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tracing::info!(path = %self.path.display(), "Saving device configurations");
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn add(&self, device: DeviceConfig) -> Result<bool> {
        {
            let mut devices = self.devices.lock().await;
            if devices.contains_key(&device.identifier) {
                return Ok(false);
            }
            devices.insert(device.identifier.clone(), device);
        }
        self.save().await?;
        Ok(true)
    }

    async fn get(&self, identifier: &str) -> Option<DeviceConfig> {
        self.devices.lock().await.get(identifier).cloned()
    }

    async fn all(&self) -> Vec<DeviceConfig> {
        self.devices.lock().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_from_host() {
        assert_eq!(device_id_for_host("192.168.1.100"), "hdfury-192-168-1-100");
        let cfg = DeviceConfig::new("Living room", "10.0.0.5", 2220, ModelId::Vertex2);
        assert_eq!(cfg.identifier, "hdfury-10-0-0-5");
        assert_eq!(cfg.model().id, ModelId::Vertex2);
    }

    #[test]
    fn missing_model_id_defaults_to_vrroom() {
        let json = r#"{"identifier":"a","name":"A","host":"1.2.3.4","port":2222}"#;
        let cfg: DeviceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.model_id, "vrroom");
        assert_eq!(cfg.model().id, ModelId::Vrroom);
    }

    #[tokio::test]
    async fn add_save_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(store.all().await.is_empty());

        let cfg = DeviceConfig::new("Den", "192.168.1.20", 2222, ModelId::Vrroom);
        assert!(store.add(cfg.clone()).await.unwrap());
        assert!(!store.add(cfg.clone()).await.unwrap());

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.all().await, vec![cfg.clone()]);
        assert_eq!(reopened.get(&cfg.identifier).await, Some(cfg));
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").unwrap();

        let store = JsonFileStore::open(dir.path()).await.unwrap();
        assert!(store.all().await.is_empty());
    }
}
