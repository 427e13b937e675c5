use crate::error::{Error, Result};
use crate::types::TimeToLive;
use bitflags::bitflags;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default values for configuration.
pub mod defaults {
    use std::time::Duration;

    /// The default value for `count`.
    pub const DEFAULT_PING_COUNT: usize = 3;

    /// The default value for `interval`.
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(1000);

    /// The default value for `timeout`.
    pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(3000);

    /// The default value for `max-ttl`.
    pub const DEFAULT_PING_MAX_TTL: u8 = 255;
}

bitflags! {
    /// Ping display flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PingFlags: u8 {
        /// Resolve the address of each reply to a hostname.
        const RESOLVE = 1;
        /// Prefix each reply line with a timestamp.
        const SHOW_TIMESTAMP = 2;
        /// Only print the summary.
        const QUIET = 4;
    }
}

impl Default for PingFlags {
    fn default() -> Self {
        Self::RESOLVE
    }
}

/// Ping configuration.
///
/// A snapshot taken when the instance is created and never modified by it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PingConfig {
    pub target_addr: IpAddr,
    /// The number of probes to send.
    pub count: usize,
    /// The spacing between consecutive probes.
    pub interval: Duration,
    /// How long to wait for a reply before a probe is declared lost.
    pub timeout: Duration,
    pub max_ttl: TimeToLive,
    pub flags: PingFlags,
}

impl PingConfig {
    /// Check that the configuration can drive a measurement.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOptions` if the target is unspecified, the
    /// count is zero or the max ttl is zero.
    pub fn validate(&self) -> Result<()> {
        if self.target_addr.is_unspecified() {
            return Err(Error::InvalidOptions(format!(
                "target_addr {} is unspecified",
                self.target_addr
            )));
        }
        if self.count == 0 {
            return Err(Error::InvalidOptions(String::from(
                "count must be positive",
            )));
        }
        if self.max_ttl.0 == 0 {
            return Err(Error::InvalidOptions(String::from(
                "max_ttl must be positive",
            )));
        }
        Ok(())
    }

    /// The maximum number of probes which may be in flight at once.
    ///
    /// This is the number of intervals which fit in the timeout, capped at
    /// `count`. A zero interval means send as fast as possible, so the whole
    /// count is allowed. A positive count always allows at least one probe.
    #[must_use]
    pub fn burst_size(&self) -> usize {
        if self.interval.is_zero() {
            return self.count;
        }
        let intervals = self.timeout.as_nanos() / self.interval.as_nanos();
        let intervals = usize::try_from(intervals).unwrap_or(usize::MAX);
        intervals.min(self.count).max(usize::from(self.count > 0))
    }
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            target_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            count: defaults::DEFAULT_PING_COUNT,
            interval: defaults::DEFAULT_PING_INTERVAL,
            timeout: defaults::DEFAULT_PING_TIMEOUT,
            max_ttl: TimeToLive(defaults::DEFAULT_PING_MAX_TTL),
            flags: PingFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn config(count: usize, interval_ms: u64, timeout_ms: u64) -> PingConfig {
        PingConfig {
            target_addr: IpAddr::from([192, 0, 2, 1]),
            count,
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            ..Default::default()
        }
    }

    #[test_case(3, 2000, 10000, 3; "timeout budget exceeds count")]
    #[test_case(10, 2000, 10000, 5; "timeout budget limits burst")]
    #[test_case(4, 0, 10000, 4; "zero interval sends count")]
    #[test_case(4, 2000, 1000, 1; "interval exceeds timeout")]
    #[test_case(4, 1000, 0, 1; "zero timeout")]
    #[test_case(0, 1000, 3000, 0; "zero count")]
    #[test_case(5, 1500, 3000, 2; "floor of budget")]
    fn test_burst_size(count: usize, interval_ms: u64, timeout_ms: u64, expected: usize) {
        assert_eq!(expected, config(count, interval_ms, timeout_ms).burst_size());
    }

    #[test]
    fn test_validate() {
        assert!(config(3, 1000, 3000).validate().is_ok());
        let err = config(0, 1000, 3000).validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(s) if s == "count must be positive"));
        let err = PingConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(s) if s == "target_addr 0.0.0.0 is unspecified"));
        let cfg = PingConfig {
            max_ttl: TimeToLive(0),
            ..config(3, 1000, 3000)
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn test_default_flags() {
        let flags = PingConfig::default().flags;
        assert!(flags.contains(PingFlags::RESOLVE));
        assert!(!flags.intersects(PingFlags::QUIET | PingFlags::SHOW_TIMESTAMP));
    }
}
