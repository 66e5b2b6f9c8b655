//! Reconnection backoff.
//!
//! The delay before the next attempt is `base * attempts`, where `attempts`
//! counts failures since the last successful registration. The first retry
//! is therefore immediate. Losing an established connection uses a shorter
//! base than failing to connect at all.

use std::time::Duration;

use tracing::info;

use crate::config::ReconnectConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Supervisor {
    attempts: u32,
    enabled: bool,
    lost_base: Duration,
    failed_base: Duration,
}

impl Supervisor {
    pub fn new(config: &ReconnectConfig) -> Self {
        Supervisor {
            attempts: 0,
            enabled: config.enabled,
            lost_base: config.lost_base(),
            failed_base: config.failed_base(),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop reconnecting. Used on intentional shutdown.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Registration succeeded; the next failure retries immediately.
    pub fn registered(&mut self) {
        self.attempts = 0;
    }

    /// An established connection dropped. Returns the delay before
    /// reconnecting, or `None` when reconnection is disabled.
    pub fn lost(&mut self, tag: &str) -> Option<Duration> {
        let delay = self.next(self.lost_base)?;
        info!(tag, delay = delay.as_secs(), "lost connection, reconnecting");
        Some(delay)
    }

    /// A connection attempt failed outright.
    pub fn failed(&mut self, tag: &str) -> Option<Duration> {
        let delay = self.next(self.failed_base)?;
        info!(tag, delay = delay.as_secs(), "could not connect, retrying");
        Some(delay)
    }

    fn next(&mut self, base: Duration) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        let delay = base.saturating_mul(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        Some(delay)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(&ReconnectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff() {
        let mut sup = Supervisor::default();
        assert_eq!(sup.failed("net"), Some(Duration::ZERO));
        assert_eq!(sup.failed("net"), Some(Duration::from_secs(30)));
        assert_eq!(sup.lost("net"), Some(Duration::from_secs(20)));
        assert_eq!(sup.attempts(), 3);
    }

    #[test]
    fn test_registration_resets() {
        let mut sup = Supervisor::default();
        sup.lost("net");
        sup.lost("net");
        sup.registered();
        assert_eq!(sup.lost("net"), Some(Duration::ZERO));
        assert_eq!(sup.lost("net"), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_disabled_never_retries() {
        let mut sup = Supervisor::default();
        sup.disable();
        assert_eq!(sup.lost("net"), None);
        assert_eq!(sup.failed("net"), None);
        assert_eq!(sup.attempts(), 0);
    }
}
