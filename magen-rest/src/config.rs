//! REST client configuration

use shared::MagenConfig;
use std::time::Duration;

/// Timeout applied to every call unless overridden
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestClientConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// Verify server TLS certificates
    pub verify_tls: bool,
}

impl RestClientConfig {
    /// Settings taken from the service configuration
    pub fn from_magen(config: &MagenConfig) -> Self {
        Self {
            timeout: config.rest_timeout(),
            verify_tls: config.rest_verify_tls,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_defaults() {
        assert_eq!(
            RestClientConfig::default(),
            RestClientConfig::from_magen(&MagenConfig::default())
        );
        assert_eq!(RestClientConfig::default().timeout, Duration::from_secs(2));
    }
}
