//! Revalidation configuration.

use std::time::Duration;

use url::Url;

const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8360/api/revalidate";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Configuration shared by the change notifier and the invalidation
/// endpoint, built once at startup and passed in explicitly.
#[derive(Debug, Clone)]
pub struct RevalidationConfig {
    /// Shared bearer secret. `None` disables the notifier entirely and makes
    /// the endpoint reject every request (fail closed).
    pub token: Option<String>,
    /// Where the notifier delivers change events.
    pub endpoint_url: Url,
    /// Upper bound on one delivery attempt; an expired attempt is logged as
    /// failed and never retried.
    pub request_timeout: Duration,
    /// Capacity of the outbound event queue. A full queue drops new events
    /// rather than blocking the mutation path.
    pub queue_capacity: usize,
}

impl Default for RevalidationConfig {
    fn default() -> Self {
        Self {
            token: None,
            endpoint_url: Url::parse(DEFAULT_ENDPOINT_URL).expect("static default endpoint URL"),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl From<&crate::config::RevalidationSettings> for RevalidationConfig {
    fn from(settings: &crate::config::RevalidationSettings) -> Self {
        Self {
            token: settings.token.clone(),
            endpoint_url: settings.endpoint_url.clone(),
            request_timeout: settings.request_timeout,
            queue_capacity: settings.queue_capacity,
        }
    }
}

impl RevalidationConfig {
    /// True when a shared secret is configured.
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_and_disabled() {
        let config = RevalidationConfig::default();
        assert!(!config.is_enabled());
        assert_eq!(
            config.endpoint_url.as_str(),
            "http://127.0.0.1:8360/api/revalidate"
        );
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.queue_capacity, 256);
    }
}
