use crate::config::{defaults, PingConfig, PingFlags};
use crate::error::Result;
use crate::ping::Ping;
use crate::probe::Probe;
use crate::types::{InstanceId, TimeToLive};
use std::net::IpAddr;
use std::time::Duration;

/// Build a ping instance.
///
/// # Examples
///
/// ```
/// # fn main() -> anyhow::Result<()> {
/// use paris_core::{Builder, PingFlags};
/// use std::time::Duration;
///
/// let addr = std::net::IpAddr::from([192, 0, 2, 1]);
/// let ping = Builder::new(addr)
///     .count(5)
///     .interval(Duration::from_millis(200))
///     .flags(PingFlags::QUIET)
///     .build()?;
/// assert_eq!(5, ping.config().count);
/// # Ok(())
/// # }
/// ```
///
/// # See Also
///
/// - [`Ping`] - A ping implementation.
#[derive(Debug)]
pub struct Builder {
    target_addr: IpAddr,
    count: usize,
    interval: Duration,
    timeout: Duration,
    max_ttl: TimeToLive,
    flags: PingFlags,
    caller: Option<InstanceId>,
    skeleton: Option<Probe>,
}

impl Builder {
    /// Build a ping instance for a given `target`.
    #[must_use]
    pub fn new(target: IpAddr) -> Self {
        Self {
            target_addr: target,
            count: defaults::DEFAULT_PING_COUNT,
            interval: defaults::DEFAULT_PING_INTERVAL,
            timeout: defaults::DEFAULT_PING_TIMEOUT,
            max_ttl: TimeToLive(defaults::DEFAULT_PING_MAX_TTL),
            flags: PingFlags::default(),
            caller: None,
            skeleton: None,
        }
    }

    /// Set the number of probes to send.
    #[must_use]
    pub fn count(self, count: usize) -> Self {
        Self { count, ..self }
    }

    /// Set the spacing between consecutive probes.
    #[must_use]
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Set the time to wait for a reply before a probe is lost.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    #[must_use]
    pub fn max_ttl(self, max_ttl: u8) -> Self {
        Self {
            max_ttl: TimeToLive(max_ttl),
            ..self
        }
    }

    #[must_use]
    pub fn flags(self, flags: PingFlags) -> Self {
        Self { flags, ..self }
    }

    /// Set the instance which receives forwarded lifecycle events.
    #[must_use]
    pub fn caller(self, caller: InstanceId) -> Self {
        Self {
            caller: Some(caller),
            ..self
        }
    }

    /// Set the skeleton probe, replacing the default ICMP echo skeleton.
    #[must_use]
    pub fn skeleton(self, skeleton: Probe) -> Self {
        Self {
            skeleton: Some(skeleton),
            ..self
        }
    }

    /// Build the ping instance.
    ///
    /// # Errors
    ///
    /// This function will return `Error::InvalidOptions` if the configuration is invalid.
    pub fn build(self) -> Result<Ping> {
        let config = PingConfig {
            target_addr: self.target_addr,
            count: self.count,
            interval: self.interval,
            timeout: self.timeout,
            max_ttl: self.max_ttl,
            flags: self.flags,
        };
        config.validate()?;
        let skeleton = self
            .skeleton
            .unwrap_or_else(|| Ping::echo_skeleton(&config));
        Ok(Ping::new(config, skeleton, self.caller))
    }
}
