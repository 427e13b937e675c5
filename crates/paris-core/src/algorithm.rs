use crate::error::Result;
use crate::event::Event;
use crate::probe::Probe;
use crate::types::InstanceId;
use derive_more::Display;
use std::sync::Arc;

/// The services an event loop provides to the algorithm instances it drives.
///
/// An instance never blocks on any of these: a probe handed to
/// [`Loop::send_probe`] is scheduled and its reply or timeout is delivered
/// later as an event.
#[cfg_attr(test, mockall::automock)]
pub trait Loop {
    /// Schedule `probe` for sending according to its delay.
    ///
    /// The loop stamps the sending time and returns the sealed probe, which
    /// is the handle later carried by the reply or timeout event.
    fn send_probe(&mut self, probe: Probe) -> Result<Arc<Probe>>;

    /// Raise an outward event for the caller of the current instance.
    fn raise_event(&mut self, event: Event);

    /// Signal that the current instance has finished.
    fn raise_terminated(&mut self);

    /// Signal that the current instance has failed.
    fn raise_error(&mut self);

    /// Deliver `event` to the instance `target`, or to the user if `None`.
    fn throw(&mut self, target: Option<InstanceId>, event: Event);
}

/// The lifecycle state of an algorithm instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum InstanceState {
    /// Created but not yet initialised.
    #[default]
    #[display("created")]
    Created,
    /// Sending probes and waiting for replies.
    #[display("running")]
    Running,
    /// All probes settled, waiting for the loop to terminate the instance.
    #[display("terminating")]
    Terminating,
    #[display("terminated")]
    Terminated,
    /// Aborted after a fatal error.
    #[display("errored")]
    Errored,
}

impl InstanceState {
    /// Has the instance stopped handling events?
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Terminated | Self::Errored)
    }
}

/// An algorithm driven by an event [`Loop`].
pub trait Algorithm {
    /// Handle a single event.
    ///
    /// The event is consumed whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error if the event caused the instance to fail, in which
    /// case the instance has already raised its error signal.
    fn handle<L: Loop>(&mut self, lp: &mut L, event: Event) -> Result<()>;

    /// The current lifecycle state.
    fn state(&self) -> InstanceState;
}
