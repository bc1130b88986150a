//! Limits, timings and reserved strings of the device protocol
//!
//! Everything here has a compile-time default. Timing values can be overridden per device through
//! [`Config`], buffer capacities can not - they size the fixed storage of the driver.

/// Capacity of the outgoing envelope in bytes, closing brace included
pub const MAX_SEND_SIZE: usize = 512;
/// Longest inbound payload [`crate::Protocol::read_string`] can hand out
pub const MAX_READ_SIZE: usize = 1024;
/// Upper bound of fields tracked by [`MergePolicy::Replace`]
pub const MAX_ENVELOPE_FIELDS: usize = 32;

/// Inactivity (ms) after which an open envelope is flushed by the periodic tick
pub const AUTOFORMAT_TIMEOUT: u32 = 30;
/// Default timeout (ms) of [`crate::Protocol::connect`]
pub const STREAM_TIMEOUT: u32 = 100;
/// Minimum time (ms) between two link reconnect attempts
pub const RECONNECT_INTERVAL: u32 = 10_000;
/// Window (ms) in which the failure counter grows at most once
pub const BACKOFF_WINDOW: u32 = 5_000;
/// Ceiling of the failure counter
pub const BACKOFF_CAP: u8 = 12;
/// Time (ms) since the last recorded disconnect after which re-registration is attempted
pub const REREGISTER_IDLE: u32 = 60_000;
/// How far (ms) the disconnect stamp is moved back after a failed re-registration
pub const REREGISTER_RETRY_SHORTCUT: u32 = 10_000;
/// One day, in seconds
pub const ONE_DAY_TIME: u32 = 86_400;
/// Forced disconnect + re-registration period (ms), two days
pub const REFRESH_INTERVAL: u32 = ONE_DAY_TIME * 2 * 1000;
/// Free heap below which no re-registration is attempted
pub const LOW_HEAP_THRESHOLD: u32 = 15_000;

/// Key used by [`crate::Protocol::notify`]
pub const CMD_NOTICE: &str = "notice";
/// Separator of the two values written by [`crate::Protocol::print_triplet`]
pub const CMD_INTERSPACE: &str = " ";
/// Inbound payloads carrying this marker are dropped right after dispatch
pub const VASSISTANT_MARKER: &str = "vAssistant";

pub type ReadString = heapless::String<MAX_READ_SIZE>;

/// How the envelope treats a key which is already present in it
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub enum MergePolicy {
    /// Fields are concatenated in call order, repeated keys are all sent
    Append,
    /// The latest value of a key wins, the earlier field is removed
    Replace,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::Append => "append",
            MergePolicy::Replace => "replace",
        }
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy::Append
    }
}

/// Runtime tunables of [`crate::Protocol`]
///
/// All durations are milliseconds of the [`crate::Platform`] clock.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub struct Config {
    pub connect_timeout: u32,
    pub autoformat_timeout: u32,
    pub reconnect_interval: u32,
    pub backoff_window: u32,
    /// kept within `1..=BACKOFF_CAP` by the failure counter
    pub backoff_cap: u8,
    pub reregister_idle: u32,
    pub reregister_retry_shortcut: u32,
    pub refresh_interval: u32,
    pub low_heap_threshold: u32,
    pub merge_policy: MergePolicy,
}

impl Config {
    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn connect_timeout(mut self, timeout: u32) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn autoformat_timeout(mut self, timeout: u32) -> Self {
        self.autoformat_timeout = timeout;
        self
    }

    pub fn low_heap_threshold(mut self, threshold: u32) -> Self {
        self.low_heap_threshold = threshold;
        self
    }

    pub fn backoff_cap(mut self, cap: u8) -> Self {
        self.backoff_cap = cap.clamp(1, BACKOFF_CAP);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout: STREAM_TIMEOUT,
            autoformat_timeout: AUTOFORMAT_TIMEOUT,
            reconnect_interval: RECONNECT_INTERVAL,
            backoff_window: BACKOFF_WINDOW,
            backoff_cap: BACKOFF_CAP,
            reregister_idle: REREGISTER_IDLE,
            reregister_retry_shortcut: REREGISTER_RETRY_SHORTCUT,
            refresh_interval: REFRESH_INTERVAL,
            low_heap_threshold: LOW_HEAP_THRESHOLD,
            merge_policy: MergePolicy::Append,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_interval_is_two_days() {
        assert_eq!(REFRESH_INTERVAL, 172_800_000);
    }

    #[test]
    fn test_backoff_cap_is_clamped() {
        let config = Config::default().backoff_cap(40);
        assert_eq!(config.backoff_cap, BACKOFF_CAP);
        let config = Config::default().backoff_cap(3);
        assert_eq!(config.backoff_cap, 3);
        let config = Config::default().backoff_cap(0);
        assert_eq!(config.backoff_cap, 1);
    }

    #[test]
    fn test_default_policy_is_append() {
        assert_eq!(Config::default().merge_policy, MergePolicy::Append);
    }
}
