//! SessionBuilder -- fluent builder for constructing [`DeviceSession`] instances.
//!
//! # Example
//!
//! ```no_run
//! use hdfury_core::models;
//! use hdfury_session::SessionBuilder;
//!
//! # async fn example() -> hdfury_core::Result<()> {
//! let session = SessionBuilder::new(models::vrroom())
//!     .host("192.168.1.100")
//!     .build()?;
//! session.start().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use hdfury_client::{ClientOptions, HdfuryClient};
use hdfury_core::config::{device_id_for_host, DeviceConfig};
use hdfury_core::error::{Error, Result};
use hdfury_core::{ModelConfig, NullObserver, SessionObserver};

use crate::config::SessionConfig;
use crate::session::DeviceSession;

/// Fluent builder for [`DeviceSession`].
///
/// The port defaults to the model's default port and the name to
/// `HDFury <model>`.
pub struct SessionBuilder {
    model: ModelConfig,
    host: Option<String>,
    port: Option<u16>,
    name: Option<String>,
    client_options: ClientOptions,
    config: SessionConfig,
    observer: Arc<dyn SessionObserver>,
}

impl SessionBuilder {
    pub fn new(model: ModelConfig) -> Self {
        SessionBuilder {
            model,
            host: None,
            port: None,
            name: None,
            client_options: ClientOptions::default(),
            config: SessionConfig::default(),
            observer: Arc::new(NullObserver),
        }
    }

    /// Seed a builder from a persisted device entry.
    pub fn from_device_config(device: &DeviceConfig) -> Self {
        SessionBuilder::new(device.model())
            .host(&device.host)
            .port(device.port)
            .name(&device.name)
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Override the model's default port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = options;
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: impl SessionObserver) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Build the session. Requires that [`host()`](Self::host) has been
    /// called. Nothing connects until [`DeviceSession::start`].
    pub fn build(self) -> Result<DeviceSession> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidParameter("host is required for build()".into()))?
            .to_string();
        let port = self.port.unwrap_or(self.model.default_port);
        if port == 0 {
            return Err(Error::InvalidParameter("port must be non-zero".into()));
        }

        let name = self
            .name
            .unwrap_or_else(|| format!("HDFury {}", self.model.display_name));
        let client = HdfuryClient::with_options(&host, port, self.model, self.client_options);

        Ok(DeviceSession::new(
            device_id_for_host(&host),
            name,
            client,
            self.config,
            self.observer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdfury_core::models;
    use hdfury_core::ModelId;

    #[test]
    fn builder_defaults() {
        let session = SessionBuilder::new(models::vertex2())
            .host("10.0.0.5")
            .build()
            .unwrap();
        assert_eq!(session.device_id(), "hdfury-10-0-0-5");
        assert_eq!(session.name(), "HDFury VERTEX2");
        assert_eq!(session.client().port(), 2220);
        assert_eq!(session.client().model().id, ModelId::Vertex2);
        assert_eq!(session.config(), &SessionConfig::default());
        assert!(!session.client().is_connected());
    }

    #[test]
    fn builder_overrides() {
        let config = SessionConfig {
            queue_wait: std::time::Duration::from_secs(3),
            ..SessionConfig::default()
        };
        let session = SessionBuilder::new(models::vrroom())
            .host("hdfury.local")
            .port(4000)
            .name("Living Room")
            .config(config.clone())
            .build()
            .unwrap();
        assert_eq!(session.name(), "Living Room");
        assert_eq!(session.client().addr(), "hdfury.local:4000");
        assert_eq!(session.config(), &config);
    }

    #[test]
    fn missing_host_is_rejected() {
        let result = SessionBuilder::new(models::vrroom()).build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));

        let result = SessionBuilder::new(models::vrroom()).host("  ").build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn zero_port_is_rejected() {
        let result = SessionBuilder::new(models::vrroom())
            .host("10.0.0.5")
            .port(0)
            .build();
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn from_device_config() {
        let device = DeviceConfig::new("Rack", "10.0.0.9", 2210, ModelId::Diva);
        let session = SessionBuilder::from_device_config(&device).build().unwrap();
        assert_eq!(session.name(), "Rack");
        assert_eq!(session.device_id(), "hdfury-10-0-0-9");
        assert_eq!(session.client().model().id, ModelId::Diva);
        assert_eq!(session.client().port(), 2210);
    }
}
