//! Server configuration

use parley_shared::protocol::frame::DEFAULT_MAX_FRAME_LEN;
use parley_shared::FieldList;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fields announced to clients when none are configured
pub const DEFAULT_FIELDS: [&str; 4] = ["translation", "color_image", "depth_image", "feelings"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for the TCP server
    pub listen_addr: String,

    /// Directory samples and identities are written under
    pub data_dir: PathBuf,

    /// Field names sent to clients after the handshake, in order
    pub supported_fields: Vec<String>,

    /// Max frame payload in bytes (bounds sample size)
    pub max_frame_len: usize,

    /// Seconds a single connection may take from accept to stored sample
    pub session_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            data_dir: PathBuf::from("data"),
            supported_fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            session_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration: built-in defaults, then the optional file at
    /// `path` (format from its extension), then `PARLEY_*` environment
    /// variables. `PARLEY_SUPPORTED_FIELDS` is a comma-separated list.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix("PARLEY")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("supported_fields"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn fields(&self) -> FieldList {
        FieldList::new(self.supported_fields.iter().cloned())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.supported_fields.is_empty() {
            anyhow::bail!("At least one supported field must be configured");
        }

        if self.supported_fields.iter().any(|f| f.trim().is_empty()) {
            anyhow::bail!("Supported field names must not be blank");
        }

        if self.max_frame_len == 0 {
            anyhow::bail!("max_frame_len must be greater than 0");
        }

        if self.session_timeout_secs == 0 {
            anyhow::bail!("session_timeout_secs must be greater than 0");
        }

        // Everything we announce must itself fit in one frame.
        let encoded = self.fields().to_bytes()?;
        if encoded.len() > self.max_frame_len {
            anyhow::bail!(
                "Supported fields encode to {} bytes, above max_frame_len {}",
                encoded.len(),
                self.max_frame_len
            );
        }

        Ok(())
    }
}
