use crate::network::{Outcome, ScriptedNetwork};
use paris_core::{Algorithm, Event, InstanceId, Loop, Probe, ProbeReply};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, instrument, trace};

/// An event due at a point in virtual time.
#[derive(Debug)]
struct Timer {
    at: Duration,
    /// Breaks ties between timers due at the same time, in arming order.
    seq: u64,
    event: Event,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// A single threaded event loop running on a virtual clock.
///
/// Events for the instance are dispatched one at a time from a FIFO queue.
/// When the queue is empty the clock jumps to the earliest timer and its
/// event is queued.
#[derive(Debug)]
pub struct SimLoop {
    network: ScriptedNetwork,
    timeout: Duration,
    /// The virtual time elapsed since the loop started.
    clock: Duration,
    pending: VecDeque<Event>,
    timers: BinaryHeap<Reverse<Timer>>,
    next_seq: u64,
    /// Events raised for the user, not yet delivered.
    raised: VecDeque<Event>,
    errored: bool,
}

impl SimLoop {
    pub fn new(network: ScriptedNetwork, timeout: Duration) -> Self {
        Self {
            network,
            timeout,
            clock: Duration::ZERO,
            pending: VecDeque::new(),
            timers: BinaryHeap::new(),
            next_seq: 0,
            raised: VecDeque::new(),
            errored: false,
        }
    }

    /// The virtual time elapsed since the loop started.
    pub const fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Has an instance raised the error signal?
    pub const fn errored(&self) -> bool {
        self.errored
    }

    /// Run `algorithm` until it terminates or fails.
    ///
    /// Every event raised for the user is passed to `on_event` with the
    /// virtual time at which it was raised.
    #[instrument(skip_all, level = "trace")]
    pub fn run<A, F>(&mut self, algorithm: &mut A, mut on_event: F) -> anyhow::Result<()>
    where
        A: Algorithm,
        F: FnMut(Duration, Event),
    {
        self.pending.push_back(Event::AlgorithmInit);
        loop {
            while let Some(event) = self.pending.pop_front() {
                trace!(clock = ?self.clock, event = %event.event_type(), "dispatch");
                let result = algorithm.handle(self, event);
                while let Some(raised) = self.raised.pop_front() {
                    on_event(self.clock, raised);
                }
                result?;
                if algorithm.state().is_finished() {
                    debug!(clock = ?self.clock, state = %algorithm.state(), "finished");
                    return Ok(());
                }
            }
            let Some(Reverse(timer)) = self.timers.pop() else {
                anyhow::bail!("stalled in state {} with no pending timers", algorithm.state());
            };
            self.clock = timer.at;
            self.pending.push_back(timer.event);
        }
    }

    fn arm(&mut self, at: Duration, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(?at, seq, event = %event.event_type(), "arm");
        self.timers.push(Reverse(Timer { at, seq, event }));
    }
}

impl Loop for SimLoop {
    fn send_probe(&mut self, mut probe: Probe) -> paris_core::Result<Arc<Probe>> {
        let sent_at = self.clock + probe.delay().offset();
        probe.set_sending_time(SystemTime::UNIX_EPOCH + sent_at);
        let outcome = self.network.send(&probe)?;
        let probe = Arc::new(probe);
        match outcome {
            Outcome::Reply { rtt, mut reply } if rtt < self.timeout => {
                let received_at = sent_at + rtt;
                reply.set_recv_time(SystemTime::UNIX_EPOCH + received_at);
                let event = Event::ProbeReply(ProbeReply::new(Arc::clone(&probe), reply));
                self.arm(received_at, event);
            }
            _ => {
                self.arm(sent_at + self.timeout, Event::ProbeTimeout(Arc::clone(&probe)));
            }
        }
        Ok(probe)
    }

    fn raise_event(&mut self, event: Event) {
        self.raised.push_back(event);
    }

    fn raise_terminated(&mut self) {
        self.pending.push_back(Event::AlgorithmTerminated);
    }

    fn raise_error(&mut self) {
        self.errored = true;
    }

    fn throw(&mut self, target: Option<InstanceId>, event: Event) {
        match target {
            None => self.raised.push_back(event),
            Some(id) => debug!(%id, event = %event.event_type(), "no such instance, dropping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulation;
    use paris_core::{Builder, EventType, InstanceState};
    use std::net::IpAddr;

    fn sim_loop(toml: &str, timeout_ms: u64) -> anyhow::Result<SimLoop> {
        let sim: Simulation = toml::from_str(toml)?;
        let network = ScriptedNetwork::new(Arc::new(sim));
        Ok(SimLoop::new(network, Duration::from_millis(timeout_ms)))
    }

    #[test]
    fn test_timers_fire_in_time_order() -> anyhow::Result<()> {
        let mut lp = sim_loop(
            r#"
            name = "order"
            target = "10.0.0.1"
            [[responses]]
            tag = "Echo"
            rtt_ms = 50
            [[responses]]
            tag = "Echo"
            rtt_ms = 10
            "#,
            1000,
        )?;
        let mut ping = Builder::new(IpAddr::from([10, 0, 0, 1]))
            .count(2)
            .interval(Duration::ZERO)
            .build()?;
        let mut times = vec![];
        lp.run(&mut ping, |at, event| {
            if event.event_type() == EventType::PingProbeReply {
                times.push(at);
            }
        })?;
        assert_eq!(
            vec![Duration::from_millis(10), Duration::from_millis(50)],
            times
        );
        assert_eq!(InstanceState::Terminated, ping.state());
        assert!(!lp.errored());
        Ok(())
    }

    #[test]
    fn test_slow_reply_times_out() -> anyhow::Result<()> {
        let mut lp = sim_loop(
            r#"
            name = "slow"
            target = "10.0.0.1"
            [[responses]]
            tag = "Echo"
            rtt_ms = 1500
            "#,
            1000,
        )?;
        let mut ping = Builder::new(IpAddr::from([10, 0, 0, 1]))
            .count(1)
            .timeout(Duration::from_millis(1000))
            .build()?;
        let mut events = vec![];
        lp.run(&mut ping, |_, event| events.push(event.event_type()))?;
        assert_eq!(
            vec![
                EventType::AlgorithmInit,
                EventType::PingTimeout,
                EventType::PingAllProbesSent,
                EventType::AlgorithmTerminated
            ],
            events
        );
        // first probe is delayed by one interval
        assert_eq!(Duration::from_millis(2000), lp.elapsed());
        Ok(())
    }

    #[test]
    fn test_send_failure_stops_the_loop() -> anyhow::Result<()> {
        let mut lp = sim_loop(
            r#"
            name = "failing"
            target = "10.0.0.1"
            send_failure = 0
            "#,
            1000,
        )?;
        let mut ping = Builder::new(IpAddr::from([10, 0, 0, 1])).build()?;
        let err = lp.run(&mut ping, |_, _| {}).unwrap_err();
        assert!(err.to_string().contains("simulated send failure"));
        assert!(lp.errored());
        assert_eq!(InstanceState::Errored, ping.state());
        Ok(())
    }
}
