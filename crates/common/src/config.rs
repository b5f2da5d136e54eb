use serde::Deserialize;

/// Push delivery configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    /// Whole-request timeout for one push request in milliseconds (default: 30000)
    pub request_timeout_ms: u64,

    /// TCP/TLS connect timeout in milliseconds (default: 10000)
    pub connect_timeout_ms: u64,

    /// Delay before a notification is re-offered after a connection failure (default: 10)
    pub transport_retry_delay_secs: u64,

    /// Delay for split notifications when no endpoint reported a retry time (default: 600)
    pub default_retry_delay_secs: u64,

    /// User-Agent sent with every push request
    pub user_agent: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            transport_retry_delay_secs: 10,
            default_retry_delay_secs: 600,
            user_agent: None,
        }
    }
}

impl NotifierConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            request_timeout_ms: std::env::var("PUSH_REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PUSH_REQUEST_TIMEOUT_MS must be a valid u64"))?,
            connect_timeout_ms: std::env::var("PUSH_CONNECT_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PUSH_CONNECT_TIMEOUT_MS must be a valid u64"))?,
            transport_retry_delay_secs: std::env::var("PUSH_TRANSPORT_RETRY_DELAY_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("PUSH_TRANSPORT_RETRY_DELAY_SECS must be a valid u64")
                })?,
            default_retry_delay_secs: std::env::var("PUSH_DEFAULT_RETRY_DELAY_SECS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PUSH_DEFAULT_RETRY_DELAY_SECS must be a valid u64"))?,
            user_agent: std::env::var("PUSH_USER_AGENT").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays() {
        let config = NotifierConfig::default();
        assert_eq!(config.transport_retry_delay_secs, 10);
        assert_eq!(config.default_retry_delay_secs, 600);
        assert!(config.user_agent.is_none());
    }
}
