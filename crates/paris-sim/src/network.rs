use crate::simulation::{Echo, Icmp, Response, Simulation};
use paris_core::{Error, Field, IpVersion, Probe};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The fate of a probe sent on the simulated network.
#[derive(Debug)]
pub enum Outcome {
    /// A reply arrives after `rtt`.
    Reply { rtt: Duration, reply: Probe },
    /// No reply ever arrives.
    Lost,
}

/// A network which answers probes from a script.
///
/// The `n`th probe sent receives the `n`th scripted response.
#[derive(Debug)]
pub struct ScriptedNetwork {
    sim: Arc<Simulation>,
    sent: usize,
}

impl ScriptedNetwork {
    pub const fn new(sim: Arc<Simulation>) -> Self {
        Self { sim, sent: 0 }
    }

    /// The number of probes accepted so far.
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// Send `probe` and decide its fate.
    pub fn send(&mut self, probe: &Probe) -> paris_core::Result<Outcome> {
        let index = self.sent;
        if self.sim.send_failure == Some(index) {
            return Err(Error::ProbeSendFailure(format!(
                "simulated send failure for probe {index}"
            )));
        }
        self.sent += 1;
        let response = self.sim.response(index);
        debug!(index, ?response, dst = ?probe.extract_opt::<IpAddr>("dst_ip"));
        Ok(match response {
            Response::NoResponse => Outcome::Lost,
            Response::Echo(Echo { rtt_ms }) => Outcome::Reply {
                rtt: Duration::from_millis(rtt_ms),
                reply: echo_reply(self.sim.target),
            },
            Response::Icmp(icmp) => Outcome::Reply {
                rtt: Duration::from_millis(icmp.rtt_ms),
                reply: icmp_message(icmp),
            },
        })
    }
}

fn version_of(addr: IpAddr) -> IpVersion {
    match addr {
        IpAddr::V4(_) => IpVersion::V4,
        IpAddr::V6(_) => IpVersion::V6,
    }
}

fn echo_reply(target: IpAddr) -> Probe {
    let version = version_of(target);
    let icmp_type = match version {
        IpVersion::V4 => 0,
        IpVersion::V6 => 129,
    };
    reply(version.id(), target, icmp_type, 0)
}

fn icmp_message(icmp: Icmp) -> Probe {
    let version = icmp.version.unwrap_or_else(|| version_of(icmp.addr).id());
    reply(version, icmp.addr, icmp.icmp_type, icmp.code)
}

fn reply(version: u8, src: IpAddr, icmp_type: u8, code: u8) -> Probe {
    Probe::new()
        .with_field(Field::int4("version", version))
        .with_field(Field::new("src_ip", src))
        .with_field(Field::int8("type", icmp_type))
        .with_field(Field::int8("code", code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paris_core::{classify, Classification};

    fn network(toml: &str) -> anyhow::Result<ScriptedNetwork> {
        let sim: Simulation = toml::from_str(toml)?;
        Ok(ScriptedNetwork::new(Arc::new(sim)))
    }

    #[test]
    fn test_scripted_responses() -> anyhow::Result<()> {
        let mut network = network(
            r#"
            name = "scripted"
            target = "fd00::1"
            [[responses]]
            tag = "Echo"
            rtt_ms = 12
            [[responses]]
            tag = "Icmp"
            addr = "fd00::fe"
            icmp_type = 1
            code = 0
            rtt_ms = 3
            [[responses]]
            tag = "NoResponse"
            "#,
        )?;
        let target = IpAddr::from([0xfd00, 0, 0, 0, 0, 0, 0, 1]);
        let probe = Probe::new();
        match network.send(&probe)? {
            Outcome::Reply { rtt, reply } => {
                assert_eq!(Duration::from_millis(12), rtt);
                assert_eq!(Ok(129_u8), reply.extract("type"));
                assert_eq!(Classification::Reached, classify(target, &reply));
            }
            Outcome::Lost => anyhow::bail!("expected a reply"),
        }
        match network.send(&probe)? {
            Outcome::Reply { reply, .. } => {
                assert_eq!(
                    Classification::NetworkUnreachable,
                    classify(target, &reply)
                );
            }
            Outcome::Lost => anyhow::bail!("expected a reply"),
        }
        assert!(matches!(network.send(&probe)?, Outcome::Lost));
        assert_eq!(3, network.sent());
        Ok(())
    }

    #[test]
    fn test_send_failure() -> anyhow::Result<()> {
        let mut network = network(
            r#"
            name = "failing"
            target = "10.0.0.1"
            send_failure = 1
            "#,
        )?;
        assert!(matches!(network.send(&Probe::new())?, Outcome::Lost));
        let err = network.send(&Probe::new()).unwrap_err();
        assert!(matches!(err, Error::ProbeSendFailure(_)));
        assert_eq!(1, network.sent());
        Ok(())
    }
}
