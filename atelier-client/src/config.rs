use std::time::Duration;

/// Backoff schedule for opening the signaling channel.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(250),
            multiplier: 2,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Delay to sleep after the given failed attempt (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a signaling call waits for its ack before failing.
    pub ack_timeout: Duration,
    /// How long the server-side consumer resume may take before the
    /// peer entry is surfaced as stalled.
    pub resume_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub constraints: MediaConstraints,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(10),
            resume_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy::default(),
            constraints: MediaConstraints::default(),
        }
    }
}
