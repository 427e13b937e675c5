use paris_core::{Event, PingConfig, PingEvent, PingFlags, PingSummary, Probe, ProbeReply};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

/// A reverse resolver of addresses to hostnames.
pub trait Resolver {
    /// Perform a reverse lookup of `addr`, returning `None` if not found.
    fn reverse_lookup(&self, addr: IpAddr) -> Option<String>;
}

/// A `Resolver` backed by a fixed table of hosts.
#[derive(Debug, Clone, Default)]
pub struct HostsResolver {
    hosts: BTreeMap<IpAddr, String>,
}

impl HostsResolver {
    pub const fn new(hosts: BTreeMap<IpAddr, String>) -> Self {
        Self { hosts }
    }
}

impl Resolver for HostsResolver {
    fn reverse_lookup(&self, addr: IpAddr) -> Option<String> {
        self.hosts.get(&addr).cloned()
    }
}

/// Render the events of a ping as text.
#[derive(Debug)]
pub struct Report<R> {
    config: PingConfig,
    resolver: R,
    /// The number of replies and timeouts seen so far.
    seq: usize,
}

impl<R: Resolver> Report<R> {
    pub const fn new(config: PingConfig, resolver: R) -> Self {
        Self {
            config,
            resolver,
            seq: 0,
        }
    }

    /// The heading printed before any event.
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "PING {} : {} probes, interval={} ms",
            self.host(self.config.target_addr),
            self.config.count,
            self.config.interval.as_millis()
        )
    }

    /// Render the lines for `event`, raised `elapsed` after the start.
    ///
    /// Per probe lines are suppressed in quiet mode, the summary never is.
    pub fn render(&mut self, elapsed: Duration, event: &Event) -> Vec<String> {
        let Event::Ping(ping) = event else {
            return vec![];
        };
        if ping.probe_reply().is_some() || matches!(ping, PingEvent::Timeout(_)) {
            self.seq += 1;
        }
        if let PingEvent::AllProbesSent(summary) = ping {
            return self.summary(summary);
        }
        if self.config.flags.contains(PingFlags::QUIET) {
            return vec![];
        }
        let line = match ping {
            PingEvent::ProbeReply(probe_reply) => self.reply(probe_reply),
            PingEvent::Timeout(_) => String::from("Timeout"),
            PingEvent::Wait | PingEvent::AllProbesSent(_) => return vec![],
            PingEvent::DstNetUnreachable(pr) => self.error(pr, "network unreachable"),
            PingEvent::DstHostUnreachable(pr) => self.error(pr, "host unreachable"),
            PingEvent::DstProtUnreachable(pr) => self.error(pr, "protocol unreachable"),
            PingEvent::DstPortUnreachable(pr) => self.error(pr, "port unreachable"),
            PingEvent::TtlExceededTransit(pr) => self.error(pr, "ttl exceeded in transit"),
            PingEvent::TimeExceededReassembly(pr) => {
                self.error(pr, "fragment reassembly time exceeded")
            }
            PingEvent::Redirect(pr) => self.error(pr, "redirect"),
            PingEvent::ParameterProblem(pr) => self.error(pr, "parameter problem"),
            PingEvent::GenError(pr) => {
                self.error(pr, "packet has not reached its destination")
            }
        };
        if self.config.flags.contains(PingFlags::SHOW_TIMESTAMP) {
            vec![format!("[{:.6}] {line}", elapsed.as_secs_f64())]
        } else {
            vec![line]
        }
    }

    fn reply(&self, probe_reply: &ProbeReply) -> String {
        let rtt = probe_reply
            .rtt()
            .map_or(0_f64, |rtt| rtt.as_secs_f64() * 1000_f64);
        format!(
            "{} bytes from {} : seq={} ttl={} time={rtt:.3} ms",
            probe_reply.reply.size(),
            self.source(&probe_reply.reply),
            self.seq,
            self.config.max_ttl
        )
    }

    fn error(&self, probe_reply: &ProbeReply, message: &str) -> String {
        format!(
            "From {} : seq={} {message}",
            self.source(&probe_reply.reply),
            self.seq
        )
    }

    fn summary(&self, summary: &PingSummary) -> Vec<String> {
        let mut lines = vec![
            String::new(),
            format!(
                "--- {} ping statistics ---",
                self.host(self.config.target_addr)
            ),
            format!(
                "{} packets transmitted, {} received, {:.0}% packet loss",
                summary.transmitted,
                summary.received,
                summary.loss_pct()
            ),
        ];
        if let Some(rtt) = summary.rtt {
            lines.push(format!(
                "rtt min/avg/max/mdev = {:.3}/{:.3}/{:.3}/{:.3} ms",
                rtt.min(),
                rtt.mean(),
                rtt.max(),
                rtt.mean_deviation()
            ));
        }
        lines
    }

    fn source(&self, reply: &Probe) -> String {
        reply
            .extract_opt::<IpAddr>("src_ip")
            .map_or_else(|| String::from("?"), |addr| self.host(addr))
    }

    fn host(&self, addr: IpAddr) -> String {
        if self.config.flags.contains(PingFlags::RESOLVE) {
            let hostname = self
                .resolver
                .reverse_lookup(addr)
                .unwrap_or_else(|| addr.to_string());
            format!("{hostname} ({addr})")
        } else {
            addr.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paris_core::{Field, Statistics};
    use std::sync::Arc;
    use std::time::SystemTime;
    use test_case::test_case;

    const TARGET: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, 1));
    const HOP: IpAddr = IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, 254));

    fn report(flags: PingFlags) -> Report<HostsResolver> {
        let config = PingConfig {
            target_addr: TARGET,
            max_ttl: paris_core::TimeToLive(64),
            flags,
            ..Default::default()
        };
        let hosts = BTreeMap::from([(TARGET, String::from("target.example"))]);
        Report::new(config, HostsResolver::new(hosts))
    }

    fn probe_reply(src: IpAddr, rtt_ms: u64) -> ProbeReply {
        let mut probe = Probe::new();
        probe.set_sending_time(SystemTime::UNIX_EPOCH);
        let mut reply = Probe::new()
            .with_field(Field::int4("version", 4))
            .with_field(Field::new("src_ip", src))
            .with_field(Field::int8("type", 0))
            .with_field(Field::int8("code", 0));
        reply.set_recv_time(SystemTime::UNIX_EPOCH + Duration::from_millis(rtt_ms));
        ProbeReply::new(Arc::new(probe), reply)
    }

    #[test_case(PingFlags::empty(), "7 bytes from 10.0.0.1 : seq=1 ttl=64 time=12.000 ms")]
    #[test_case(PingFlags::RESOLVE, "7 bytes from target.example (10.0.0.1) : seq=1 ttl=64 time=12.000 ms")]
    #[test_case(PingFlags::SHOW_TIMESTAMP, "[1.500000] 7 bytes from 10.0.0.1 : seq=1 ttl=64 time=12.000 ms")]
    fn test_reply_line(flags: PingFlags, expected: &str) {
        let event = Event::Ping(PingEvent::ProbeReply(probe_reply(TARGET, 12)));
        let lines = report(flags).render(Duration::from_millis(1500), &event);
        assert_eq!(vec![expected.to_string()], lines);
    }

    #[test]
    fn test_error_lines() {
        let mut report = report(PingFlags::RESOLVE);
        let timeout = Event::Ping(PingEvent::Timeout(Arc::new(Probe::new())));
        let unreachable = Event::Ping(PingEvent::DstHostUnreachable(probe_reply(HOP, 3)));
        let wait = Event::Ping(PingEvent::Wait);
        assert_eq!(vec!["Timeout"], report.render(Duration::ZERO, &timeout));
        assert!(report.render(Duration::ZERO, &wait).is_empty());
        assert_eq!(
            vec!["From 10.0.0.254 (10.0.0.254) : seq=2 host unreachable"],
            report.render(Duration::ZERO, &unreachable)
        );
        assert!(report.render(Duration::ZERO, &Event::AlgorithmInit).is_empty());
    }

    #[test]
    fn test_quiet_summary() -> anyhow::Result<()> {
        let mut report = report(PingFlags::QUIET);
        let reply = Event::Ping(PingEvent::ProbeReply(probe_reply(TARGET, 12)));
        assert!(report.render(Duration::ZERO, &reply).is_empty());
        let summary = PingSummary {
            transmitted: 4,
            received: 3,
            losses: 1,
            rtt: Some(Statistics::from_samples(&[10.0, 20.0, 30.0])?),
        };
        let lines = report.render(
            Duration::ZERO,
            &Event::Ping(PingEvent::AllProbesSent(summary)),
        );
        assert_eq!(
            vec![
                "",
                "--- 10.0.0.1 ping statistics ---",
                "4 packets transmitted, 3 received, 25% packet loss",
                "rtt min/avg/max/mdev = 10.000/20.000/30.000/6.667 ms",
            ],
            lines
        );
        Ok(())
    }
}
