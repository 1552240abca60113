//! Configuration types for the upload client

use parley_shared::protocol::frame::DEFAULT_MAX_FRAME_LEN;
use parley_shared::Identity;
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Identity sent in the handshake
    pub identity: Identity,

    /// Connection attempts before giving up
    pub connect_attempts: u32,

    /// Delay before the second connection attempt; doubles after each failure
    pub initial_backoff: Duration,

    /// Max frame payload in bytes; must match or stay below the server's
    pub max_frame_len: usize,
}

impl ClientConfig {
    /// Configuration with default connection settings
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            connect_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connect_attempts == 0 {
            anyhow::bail!("connect_attempts must be greater than 0");
        }

        if self.max_frame_len == 0 {
            anyhow::bail!("max_frame_len must be greater than 0");
        }

        // Fail before connecting if the handshake cannot be encoded.
        self.identity.to_bytes()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parley_shared::Gender;

    fn identity(year: i32) -> Identity {
        Identity::new(
            1,
            "ada",
            Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
            Gender::FEMALE,
        )
    }

    #[test]
    fn test_config_validation() {
        let valid = ClientConfig::new(identity(2000));
        assert!(valid.validate().is_ok());

        let no_attempts = ClientConfig {
            connect_attempts: 0,
            ..valid.clone()
        };
        assert!(no_attempts.validate().is_err());

        let pre_epoch = ClientConfig::new(identity(1960));
        assert!(pre_epoch.validate().is_err());
    }
}
