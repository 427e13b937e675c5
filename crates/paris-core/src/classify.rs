use crate::field::Nibble;
use crate::probe::Probe;
use crate::types::IpVersion;
use std::net::IpAddr;

/// The outcome of classifying a reply to a ping probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The reply came from the target.
    Reached,
    NetworkUnreachable,
    HostUnreachable,
    ProtocolUnreachable,
    PortUnreachable,
    TtlExceeded,
    ReassemblyTimeExceeded,
    Redirect,
    ParameterProblem,
    /// No rule matched.
    Other,
}

/// The ICMP header fields of a reply relevant for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub version: IpVersion,
    pub icmp_type: u8,
    pub code: u8,
}

impl IcmpHeader {
    /// Read the header from the `version`, `type` and `code` fields of a reply.
    ///
    /// Returns `None` if any field is missing, mistyped or the version is
    /// neither 4 nor 6.
    #[must_use]
    pub fn extract(reply: &Probe) -> Option<Self> {
        let version = reply
            .extract_opt::<Nibble>("version")
            .map(Nibble::get)
            .or_else(|| reply.extract_opt::<u8>("version"))?;
        let version = IpVersion::try_from(version).ok()?;
        let icmp_type = reply.extract_opt("type")?;
        let code = reply.extract_opt("code")?;
        Some(Self {
            version,
            icmp_type,
            code,
        })
    }
}

/// Matches a specific ICMP code or any code of a given type.
#[derive(Debug, Clone, Copy)]
enum Code {
    Exact(u8),
    Any,
}

/// A classification rule: the (type, code) pair for IPv4 and for IPv6.
#[derive(Debug, Clone, Copy)]
struct Rule {
    classification: Classification,
    v4: (u8, Code),
    v6: (u8, Code),
}

impl Rule {
    const fn new(classification: Classification, v4: (u8, Code), v6: (u8, Code)) -> Self {
        Self {
            classification,
            v4,
            v6,
        }
    }

    fn matches(&self, header: &IcmpHeader) -> bool {
        let (icmp_type, code) = match header.version {
            IpVersion::V4 => self.v4,
            IpVersion::V6 => self.v6,
        };
        icmp_type == header.icmp_type
            && match code {
                Code::Exact(code) => code == header.code,
                Code::Any => true,
            }
    }
}

/// The classification rules, evaluated in order.
const RULES: [Rule; 8] = [
    Rule::new(
        Classification::NetworkUnreachable,
        (3, Code::Exact(0)),
        (1, Code::Exact(0)),
    ),
    Rule::new(
        Classification::HostUnreachable,
        (3, Code::Exact(1)),
        (1, Code::Exact(3)),
    ),
    Rule::new(
        Classification::ProtocolUnreachable,
        (3, Code::Exact(2)),
        (4, Code::Exact(1)),
    ),
    Rule::new(
        Classification::PortUnreachable,
        (3, Code::Exact(3)),
        (1, Code::Exact(4)),
    ),
    Rule::new(
        Classification::TtlExceeded,
        (11, Code::Exact(0)),
        (3, Code::Exact(0)),
    ),
    Rule::new(
        Classification::ReassemblyTimeExceeded,
        (11, Code::Exact(1)),
        (3, Code::Exact(1)),
    ),
    Rule::new(Classification::Redirect, (5, Code::Any), (137, Code::Any)),
    Rule::new(
        Classification::ParameterProblem,
        (12, Code::Any),
        (4, Code::Any),
    ),
];

/// Classify a reply received for a probe sent to `target`.
///
/// A reply whose `src_ip` is the target is `Reached` whatever its ICMP
/// header says. Otherwise the first matching rule wins and a reply matching
/// no rule, or lacking a usable header, is `Other`.
#[must_use]
pub fn classify(target: IpAddr, reply: &Probe) -> Classification {
    if reply.extract_opt::<IpAddr>("src_ip") == Some(target) {
        return Classification::Reached;
    }
    IcmpHeader::extract(reply)
        .and_then(|header| {
            RULES
                .iter()
                .find(|rule| rule.matches(&header))
                .map(|rule| rule.classification)
        })
        .unwrap_or(Classification::Other)
}
