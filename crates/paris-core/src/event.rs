use crate::classify::Classification;
use crate::probe::{Probe, ProbeReply};
use crate::stats::PingSummary;
use derive_more::Display;
use std::sync::Arc;

/// An event delivered to, or raised by, an algorithm instance.
///
/// The payload is owned by the event; whoever holds the event when it is
/// dropped releases the payload, so an event is released exactly once.
/// Handlers take events by value and raising an event moves it to the loop.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// The instance has been started by its loop.
    AlgorithmInit,
    /// The instance has been stopped by its loop and must release its state.
    AlgorithmTerminated,
    /// The instance must abort.
    AlgorithmError,
    /// A reply has been matched to a probe sent by the instance.
    ProbeReply(ProbeReply),
    /// No reply was received in time for a probe sent by the instance.
    ProbeTimeout(Arc<Probe>),
    /// An outward event raised by a ping instance.
    Ping(PingEvent),
}

impl Event {
    /// The tag of this event.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::AlgorithmInit => EventType::AlgorithmInit,
            Self::AlgorithmTerminated => EventType::AlgorithmTerminated,
            Self::AlgorithmError => EventType::AlgorithmError,
            Self::ProbeReply(_) => EventType::ProbeReply,
            Self::ProbeTimeout(_) => EventType::ProbeTimeout,
            Self::Ping(ping) => ping.event_type(),
        }
    }
}

/// An outward event raised by a ping instance for its caller.
#[derive(Debug, PartialEq)]
pub enum PingEvent {
    /// The destination replied.
    ProbeReply(ProbeReply),
    DstNetUnreachable(ProbeReply),
    DstHostUnreachable(ProbeReply),
    DstProtUnreachable(ProbeReply),
    DstPortUnreachable(ProbeReply),
    TtlExceededTransit(ProbeReply),
    TimeExceededReassembly(ProbeReply),
    Redirect(ProbeReply),
    ParameterProblem(ProbeReply),
    /// The probe did not reach the destination for an unrecognised reason.
    GenError(ProbeReply),
    /// No reply was received for the probe.
    Timeout(Arc<Probe>),
    /// Every probe has been answered or timed out.
    AllProbesSent(PingSummary),
    /// Probes are still in flight.
    Wait,
}

impl PingEvent {
    /// Build the outward event for a classified reply.
    #[must_use]
    pub fn classified(classification: Classification, probe_reply: ProbeReply) -> Self {
        match classification {
            Classification::Reached => Self::ProbeReply(probe_reply),
            Classification::NetworkUnreachable => Self::DstNetUnreachable(probe_reply),
            Classification::HostUnreachable => Self::DstHostUnreachable(probe_reply),
            Classification::ProtocolUnreachable => Self::DstProtUnreachable(probe_reply),
            Classification::PortUnreachable => Self::DstPortUnreachable(probe_reply),
            Classification::TtlExceeded => Self::TtlExceededTransit(probe_reply),
            Classification::ReassemblyTimeExceeded => Self::TimeExceededReassembly(probe_reply),
            Classification::Redirect => Self::Redirect(probe_reply),
            Classification::ParameterProblem => Self::ParameterProblem(probe_reply),
            Classification::Other => Self::GenError(probe_reply),
        }
    }

    /// The (probe, reply) pair carried by this event, if any.
    #[must_use]
    pub const fn probe_reply(&self) -> Option<&ProbeReply> {
        match self {
            Self::ProbeReply(pr)
            | Self::DstNetUnreachable(pr)
            | Self::DstHostUnreachable(pr)
            | Self::DstProtUnreachable(pr)
            | Self::DstPortUnreachable(pr)
            | Self::TtlExceededTransit(pr)
            | Self::TimeExceededReassembly(pr)
            | Self::Redirect(pr)
            | Self::ParameterProblem(pr)
            | Self::GenError(pr) => Some(pr),
            Self::Timeout(_) | Self::AllProbesSent(_) | Self::Wait => None,
        }
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::ProbeReply(_) => EventType::PingProbeReply,
            Self::DstNetUnreachable(_) => EventType::PingDstNetUnreachable,
            Self::DstHostUnreachable(_) => EventType::PingDstHostUnreachable,
            Self::DstProtUnreachable(_) => EventType::PingDstProtUnreachable,
            Self::DstPortUnreachable(_) => EventType::PingDstPortUnreachable,
            Self::TtlExceededTransit(_) => EventType::PingTtlExceededTransit,
            Self::TimeExceededReassembly(_) => EventType::PingTimeExceededReassembly,
            Self::Redirect(_) => EventType::PingRedirect,
            Self::ParameterProblem(_) => EventType::PingParameterProblem,
            Self::GenError(_) => EventType::PingGenError,
            Self::Timeout(_) => EventType::PingTimeout,
            Self::AllProbesSent(_) => EventType::PingAllProbesSent,
            Self::Wait => EventType::PingWait,
        }
    }
}

/// The closed set of event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EventType {
    #[display("ALGORITHM_INIT")]
    AlgorithmInit,
    #[display("ALGORITHM_TERMINATED")]
    AlgorithmTerminated,
    #[display("ALGORITHM_ERROR")]
    AlgorithmError,
    #[display("PROBE_REPLY")]
    ProbeReply,
    #[display("PROBE_TIMEOUT")]
    ProbeTimeout,
    #[display("PING_PROBE_REPLY")]
    PingProbeReply,
    #[display("PING_DST_NET_UNREACHABLE")]
    PingDstNetUnreachable,
    #[display("PING_DST_HOST_UNREACHABLE")]
    PingDstHostUnreachable,
    #[display("PING_DST_PROT_UNREACHABLE")]
    PingDstProtUnreachable,
    #[display("PING_DST_PORT_UNREACHABLE")]
    PingDstPortUnreachable,
    #[display("PING_TTL_EXCEEDED_TRANSIT")]
    PingTtlExceededTransit,
    #[display("PING_TIME_EXCEEDED_REASSEMBLY")]
    PingTimeExceededReassembly,
    #[display("PING_REDIRECT")]
    PingRedirect,
    #[display("PING_PARAMETER_PROBLEM")]
    PingParameterProblem,
    #[display("PING_GEN_ERROR")]
    PingGenError,
    #[display("PING_TIMEOUT")]
    PingTimeout,
    #[display("PING_ALL_PROBES_SENT")]
    PingAllProbesSent,
    #[display("PING_WAIT")]
    PingWait,
}

impl EventType {
    /// Is this an event delivered by the owning loop?
    #[must_use]
    pub const fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::AlgorithmInit | Self::AlgorithmTerminated | Self::AlgorithmError
        )
    }

    /// Is this an event delivered by the network layer?
    #[must_use]
    pub const fn is_transport(self) -> bool {
        matches!(self, Self::ProbeReply | Self::ProbeTimeout)
    }

    /// Is this an event raised by an algorithm for its caller?
    #[must_use]
    pub const fn is_outward(self) -> bool {
        !self.is_lifecycle() && !self.is_transport()
    }
}
