//! Engine configuration

/// Tunable constants for the AVDTP sink engine
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Default L2CAP MTU requested for the signaling channel
    pub signaling_mtu: u16,
    /// Default L2CAP MTU requested for the media channel
    pub media_mtu: u16,
    /// Service name advertised in the SDP record
    pub service_name: &'static str,
    /// Provider name advertised in the SDP record
    pub provider_name: &'static str,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            signaling_mtu: 672,
            media_mtu: 672,
            service_name: "Audio Sink",
            provider_name: "avdtp-sink",
        }
    }
}

impl SinkConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.signaling_mtu < 48 {
            return Err("signaling MTU must be at least 48 bytes");
        }

        if self.media_mtu < 48 {
            return Err("media MTU must be at least 48 bytes");
        }

        if self.service_name.is_empty() {
            return Err("service name cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SinkConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_tiny_mtu() {
        let cfg = SinkConfig {
            signaling_mtu: 10,
            ..SinkConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
