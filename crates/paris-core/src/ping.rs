use crate::algorithm::{Algorithm, InstanceState, Loop};
use crate::classify::{classify, Classification};
use crate::config::PingConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventType, PingEvent};
use crate::field::Field;
use crate::probe::{Delay, Probe, ProbeReply};
use crate::stats::{PingSummary, Statistics};
use crate::types::{InstanceId, IpVersion};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::instrument;

pub use state::PingData;

/// A ping measurement.
///
/// Sends `count` duplicates of a skeleton probe to the target, keeping at
/// most [`PingConfig::burst_size`] of them in flight, and raises one
/// [`PingEvent`] for every reply or timeout it is given. Once every probe
/// has settled it raises [`PingEvent::AllProbesSent`] followed by the
/// terminated signal.
#[derive(Debug)]
pub struct Ping {
    config: PingConfig,
    skeleton: Probe,
    caller: Option<InstanceId>,
    state: InstanceState,
    data: Option<PingData>,
    burst_size: usize,
}

impl Ping {
    /// Create a ping instance in the `Created` state.
    ///
    /// Lifecycle events are forwarded to `caller`, or to the user if `None`.
    #[instrument(skip_all, level = "trace")]
    pub fn new(config: PingConfig, skeleton: Probe, caller: Option<InstanceId>) -> Self {
        tracing::debug!(?config, ?caller);
        Self {
            config,
            skeleton,
            caller,
            state: InstanceState::Created,
            data: None,
            burst_size: 0,
        }
    }

    /// The default ICMP echo skeleton for `config`.
    ///
    /// The skeleton is delayed by one interval so that each burst is spaced
    /// out, unless the interval is zero.
    #[must_use]
    pub fn echo_skeleton(config: &PingConfig) -> Probe {
        let (version, protocol) = match config.target_addr {
            IpAddr::V4(_) => (IpVersion::V4, "icmpv4"),
            IpAddr::V6(_) => (IpVersion::V6, "icmpv6"),
        };
        let delay = if config.interval.is_zero() {
            Delay::BestEffort
        } else {
            Delay::After(config.interval)
        };
        Probe::new()
            .with_field(Field::int4("version", version.id()))
            .with_field(Field::string("protocol", protocol))
            .with_field(Field::new("dst_ip", config.target_addr))
            .with_field(Field::int8("ttl", config.max_ttl.0))
            .with_delay(delay)
    }

    #[must_use]
    pub const fn config(&self) -> &PingConfig {
        &self.config
    }

    #[must_use]
    pub const fn skeleton(&self) -> &Probe {
        &self.skeleton
    }

    /// The per measurement data, available between init and termination.
    #[must_use]
    pub const fn data(&self) -> Option<&PingData> {
        self.data.as_ref()
    }

    /// The maximum number of probes in flight, computed at init.
    #[must_use]
    pub const fn burst_size(&self) -> usize {
        self.burst_size
    }

    /// The round trip time statistics of the replies from the target so far.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyInput` if no reply has been received from the
    /// target, or the instance holds no data.
    pub fn statistics(&self) -> Result<Statistics> {
        self.data
            .as_ref()
            .map_or(Err(Error::EmptyInput), PingData::statistics)
    }

    /// The tally of the measurement so far.
    #[must_use]
    pub fn summary(&self) -> Option<PingSummary> {
        self.data.as_ref().map(PingData::summary)
    }

    #[instrument(skip_all, level = "trace")]
    fn on_init<L: Loop>(&mut self, lp: &mut L) -> Result<()> {
        self.config.validate()?;
        let mut data = PingData::new(self.config.count)?;
        self.burst_size = self.config.burst_size();
        self.state = InstanceState::Running;
        tracing::debug!(burst_size = self.burst_size, state = %self.state);
        lp.throw(self.caller, Event::AlgorithmInit);
        let result = self.schedule(lp, &mut data);
        self.data = Some(data);
        result
    }

    #[instrument(skip_all, level = "trace")]
    fn on_reply<L: Loop>(
        &mut self,
        lp: &mut L,
        data: &mut PingData,
        probe_reply: ProbeReply,
    ) -> Result<()> {
        let classification = classify(self.config.target_addr, &probe_reply.reply);
        let rtt = match classification {
            Classification::Reached => probe_reply.rtt(),
            _ => None,
        };
        if !data.record_reply(&probe_reply.probe, rtt)? {
            tracing::warn!("dropping reply for a probe which is not in flight");
            return Ok(());
        }
        tracing::trace!(?classification, ?rtt);
        lp.raise_event(Event::Ping(PingEvent::classified(
            classification,
            probe_reply,
        )));
        self.schedule(lp, data)
    }

    #[instrument(skip_all, level = "trace")]
    fn on_timeout<L: Loop>(
        &mut self,
        lp: &mut L,
        data: &mut PingData,
        probe: Arc<Probe>,
    ) -> Result<()> {
        if !data.record_timeout(&probe) {
            tracing::warn!("dropping timeout for a probe which is not in flight");
            return Ok(());
        }
        lp.raise_event(Event::Ping(PingEvent::Timeout(probe)));
        self.schedule(lp, data)
    }

    #[instrument(skip_all, level = "trace")]
    fn on_terminated<L: Loop>(&mut self, lp: &mut L) {
        self.data = None;
        self.state = InstanceState::Terminated;
        tracing::debug!(state = %self.state);
        lp.throw(self.caller, Event::AlgorithmTerminated);
    }

    /// Decide whether to send more probes, wait, or finish.
    fn schedule<L: Loop>(&mut self, lp: &mut L, data: &mut PingData) -> Result<()> {
        let remaining = self.config.count.saturating_sub(data.num_sent());
        let available = self
            .burst_size
            .saturating_sub(data.num_probes_in_flight());
        let to_send = remaining.min(available);
        if to_send > 0 && data.num_replies() + data.num_probes_in_flight() != self.config.count {
            self.send_probes(lp, data, to_send)
        } else if data.num_probes_in_flight() == 0 {
            lp.raise_event(Event::Ping(PingEvent::AllProbesSent(data.summary())));
            lp.raise_terminated();
            self.state = InstanceState::Terminating;
            tracing::debug!(state = %self.state);
            Ok(())
        } else {
            lp.raise_event(Event::Ping(PingEvent::Wait));
            Ok(())
        }
    }

    /// Send `count` duplicates of the skeleton, the `i`th delayed by `i`
    /// times the skeleton delay.
    #[instrument(skip(self, lp, data), level = "trace")]
    fn send_probes<L: Loop>(&self, lp: &mut L, data: &mut PingData, count: usize) -> Result<()> {
        for i in 1..=count {
            let mut probe = self.skeleton.duplicate();
            if let Delay::After(delay) = self.skeleton.delay() {
                let factor = u32::try_from(i).unwrap_or(u32::MAX);
                probe.set_delay(Delay::After(delay.saturating_mul(factor)));
            }
            data.reserve()?;
            let sent = lp.send_probe(probe)?;
            data.record_sent(sent);
        }
        Ok(())
    }

    /// Run a step which needs the per measurement data.
    fn with_data<L, F>(&mut self, lp: &mut L, event_type: EventType, step: F) -> Result<()>
    where
        L: Loop,
        F: FnOnce(&mut Self, &mut L, &mut PingData) -> Result<()>,
    {
        let mut data = self.data.take().ok_or(Error::InvalidState {
            state: self.state,
            event: event_type,
        })?;
        let result = step(self, lp, &mut data);
        self.data = Some(data);
        result
    }

    /// Abort the instance, releasing its data and raising the error signal.
    fn fail<L: Loop>(&mut self, lp: &mut L, err: Error) -> Error {
        tracing::debug!(%err, state = %self.state, "instance failed");
        self.data = None;
        self.state = InstanceState::Errored;
        lp.raise_error();
        err
    }
}

impl Algorithm for Ping {
    #[instrument(skip_all, fields(event = %event.event_type()), level = "trace")]
    fn handle<L: Loop>(&mut self, lp: &mut L, event: Event) -> Result<()> {
        let event_type = event.event_type();
        if self.state.is_finished() {
            tracing::warn!(state = %self.state, event = %event_type, "dropping event");
            return Ok(());
        }
        let result = match (self.state, event) {
            (InstanceState::Created, Event::AlgorithmInit) => self.on_init(lp),
            (InstanceState::Running, Event::ProbeReply(probe_reply)) => {
                self.with_data(lp, event_type, |ping, lp, data| {
                    ping.on_reply(lp, data, probe_reply)
                })
            }
            (InstanceState::Running, Event::ProbeTimeout(probe)) => {
                self.with_data(lp, event_type, |ping, lp, data| {
                    ping.on_timeout(lp, data, probe)
                })
            }
            (InstanceState::Terminating, Event::ProbeReply(_) | Event::ProbeTimeout(_)) => {
                tracing::warn!(event = %event_type, "dropping event for a settled probe");
                Ok(())
            }
            (_, Event::AlgorithmTerminated) => {
                self.on_terminated(lp);
                Ok(())
            }
            (_, Event::AlgorithmError) => Err(Error::Aborted),
            (state, _) => Err(Error::InvalidState {
                state,
                event: event_type,
            }),
        };
        result.map_err(|err| self.fail(lp, err))
    }

    fn state(&self) -> InstanceState {
        self.state
    }
}

/// Mutable state of a ping measurement.
///
/// This is contained within a submodule to ensure that mutations are only
/// performed via methods on the `PingData` struct.
mod state {
    use crate::error::{Error, Result};
    use crate::probe::Probe;
    use crate::stats::{PingSummary, Statistics};
    use std::sync::Arc;
    use std::time::Duration;

    /// The probes and results of a ping measurement.
    #[derive(Debug, Default)]
    pub struct PingData {
        /// Every probe sent so far, in send order.
        probes: Vec<Arc<Probe>>,
        /// The probes sent which have neither been answered nor timed out.
        in_flight: Vec<Arc<Probe>>,
        /// Round trip times of the replies received from the target.
        rtt_results: Vec<Duration>,
        /// The number of replies and timeouts received.
        num_replies: usize,
        num_losses: usize,
    }

    impl PingData {
        /// Allocate the data for a measurement of `count` probes.
        pub fn new(count: usize) -> Result<Self> {
            let mut data = Self::default();
            data.probes
                .try_reserve_exact(count)
                .map_err(|_| Error::AllocationFailure)?;
            Ok(data)
        }

        /// The probes sent so far, in send order.
        pub fn probes(&self) -> &[Arc<Probe>] {
            &self.probes
        }

        pub fn rtt_results(&self) -> &[Duration] {
            &self.rtt_results
        }

        pub fn num_sent(&self) -> usize {
            self.probes.len()
        }

        pub const fn num_replies(&self) -> usize {
            self.num_replies
        }

        pub const fn num_losses(&self) -> usize {
            self.num_losses
        }

        pub fn num_probes_in_flight(&self) -> usize {
            self.in_flight.len()
        }

        /// Make room for one more sent probe.
        pub(super) fn reserve(&mut self) -> Result<()> {
            self.probes
                .try_reserve(1)
                .and_then(|()| self.in_flight.try_reserve(1))
                .map_err(|_| Error::AllocationFailure)
        }

        pub(super) fn record_sent(&mut self, probe: Arc<Probe>) {
            self.in_flight.push(Arc::clone(&probe));
            self.probes.push(probe);
        }

        /// Record a reply for `probe`, with its round trip time if it came
        /// from the target.
        ///
        /// Returns `false` if `probe` is not in flight.
        pub(super) fn record_reply(
            &mut self,
            probe: &Arc<Probe>,
            rtt: Option<Duration>,
        ) -> Result<bool> {
            if let Some(rtt) = rtt {
                self.rtt_results
                    .try_reserve(1)
                    .map_err(|_| Error::AllocationFailure)?;
                if !self.settle(probe) {
                    return Ok(false);
                }
                self.rtt_results.push(rtt);
            } else if !self.settle(probe) {
                return Ok(false);
            }
            self.num_replies += 1;
            Ok(true)
        }

        /// Record a timeout for `probe`.
        ///
        /// Returns `false` if `probe` is not in flight.
        pub(super) fn record_timeout(&mut self, probe: &Arc<Probe>) -> bool {
            if !self.settle(probe) {
                return false;
            }
            self.num_replies += 1;
            self.num_losses += 1;
            true
        }

        pub fn statistics(&self) -> Result<Statistics> {
            Statistics::from_durations(&self.rtt_results)
        }

        pub fn summary(&self) -> PingSummary {
            PingSummary {
                transmitted: self.probes.len(),
                received: self.num_replies - self.num_losses,
                losses: self.num_losses,
                rtt: self.statistics().ok(),
            }
        }

        /// Remove `probe` from the in flight set.
        fn settle(&mut self, probe: &Arc<Probe>) -> bool {
            match self.in_flight.iter().position(|p| Arc::ptr_eq(p, probe)) {
                Some(index) => {
                    self.in_flight.swap_remove(index);
                    true
                }
                None => false,
            }
        }
    }
}
