use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// A simulated ping.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    pub name: String,
    pub target: IpAddr,
    pub count: Option<usize>,
    pub interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_ttl: Option<u8>,
    /// The hostnames of simulated hosts, for reverse lookups.
    #[serde(default)]
    pub hosts: BTreeMap<IpAddr, String>,
    /// The index of the probe whose send is rejected by the network, if any.
    pub send_failure: Option<usize>,
    /// The simulated responses, in send order, reused from the start when
    /// there are more probes than responses.
    #[serde(default)]
    pub responses: Vec<Response>,
    /// The expected outcome of the simulation.
    pub expected: Option<Expected>,
}

impl Simulation {
    /// The simulated response to the `index`th probe sent.
    #[must_use]
    pub fn response(&self, index: usize) -> Response {
        if self.responses.is_empty() {
            Response::NoResponse
        } else {
            self.responses[index % self.responses.len()]
        }
    }
}

/// A simulated probe response.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "tag")]
pub enum Response {
    /// Simulate a target which does not respond to the probe.
    NoResponse,
    /// Simulate an echo reply from the target.
    Echo(Echo),
    /// Simulate an ICMP message from a host.
    Icmp(Icmp),
}

/// An echo reply from the target.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Echo {
    /// The simulated round trip time (RTT) in ms.
    pub rtt_ms: u64,
}

/// An ICMP message from a single host.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Icmp {
    /// The simulated host sending the message.
    pub addr: IpAddr,
    /// The IP version of the message, derived from `addr` if absent.
    pub version: Option<u8>,
    pub icmp_type: u8,
    pub code: u8,
    /// The simulated round trip time (RTT) in ms.
    pub rtt_ms: u64,
}

/// The expected outcome of a simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct Expected {
    pub transmitted: usize,
    pub received: usize,
    pub losses: usize,
    /// The outward events raised, excluding `PING_WAIT`, in order.
    #[serde(default)]
    pub events: Vec<String>,
    /// The report lines, if checked.
    pub lines: Option<Vec<String>>,
    /// Whether the simulation is expected to fail.
    #[serde(default)]
    pub error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() -> anyhow::Result<()> {
        let sim: Simulation = toml::from_str(
            r#"
            name = "parse"
            target = "10.0.0.1"
            count = 2
            [hosts]
            "10.0.0.1" = "target.example"
            [[responses]]
            tag = "Echo"
            rtt_ms = 10
            [[responses]]
            tag = "Icmp"
            addr = "10.0.0.254"
            icmp_type = 3
            code = 1
            rtt_ms = 5
            [[responses]]
            tag = "NoResponse"
            "#,
        )?;
        assert_eq!("parse", sim.name);
        assert_eq!(Some(2), sim.count);
        assert_eq!(None, sim.interval_ms);
        assert_eq!(
            Some(&String::from("target.example")),
            sim.hosts.get(&IpAddr::from([10, 0, 0, 1]))
        );
        assert!(matches!(sim.response(0), Response::Echo(Echo { rtt_ms: 10 })));
        assert!(matches!(
            sim.response(1),
            Response::Icmp(Icmp {
                icmp_type: 3,
                code: 1,
                version: None,
                ..
            })
        ));
        assert!(matches!(sim.response(2), Response::NoResponse));
        assert!(matches!(sim.response(3), Response::Echo(_)));
        Ok(())
    }

    #[test]
    fn test_no_responses() -> anyhow::Result<()> {
        let sim: Simulation = toml::from_str(
            r#"
            name = "silent"
            target = "fd00::1"
            "#,
        )?;
        assert!(matches!(sim.response(0), Response::NoResponse));
        assert!(sim.expected.is_none());
        Ok(())
    }
}
