use crate::error::{FieldError, FieldResult};
use crate::field::{Field, Value};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// When a probe should be sent, relative to the moment it is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delay {
    /// Send as soon as possible, without any artificial spacing.
    #[default]
    BestEffort,
    /// Send after the given offset.
    After(Duration),
}

impl Delay {
    /// The scheduling offset, zero for `BestEffort`.
    #[must_use]
    pub const fn offset(self) -> Duration {
        match self {
            Self::BestEffort => Duration::ZERO,
            Self::After(offset) => offset,
        }
    }
}

/// Represents a network probe, or a reply received for a probe.
///
/// A `Probe` is an ordered collection of header [`Field`] keyed by name,
/// together with timing metadata.
///
/// Once a probe has been submitted for sending it is held as an
/// `Arc<Probe>` and can no longer be mutated; per-send customisation must be
/// applied to a [`Probe::duplicate`] of a shared skeleton instead.
///
/// # Examples
///
/// ```
/// use paris_core::{Delay, Field, Probe};
/// use std::time::Duration;
///
/// let skeleton = Probe::new()
///     .with_field(Field::int8("ttl", 64))
///     .with_field(Field::string("protocol", "icmp"))
///     .with_delay(Delay::After(Duration::from_secs(1)));
///
/// let mut probe = skeleton.duplicate();
/// probe.set_delay(Delay::After(Duration::from_secs(2)));
/// assert_eq!(Ok(64_u8), probe.extract("ttl"));
/// assert_eq!(Delay::After(Duration::from_secs(1)), skeleton.delay());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Probe {
    /// The header fields, in insertion order.
    fields: IndexMap<String, Field>,
    /// Timestamp when the probe was sent.
    sending_time: Option<SystemTime>,
    /// Timestamp when the probe (as a reply) was received.
    recv_time: Option<SystemTime>,
    /// The scheduling offset of the probe.
    delay: Delay,
}

impl Probe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any field with the same key.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.set_field(field);
        self
    }

    #[must_use]
    pub fn with_delay(self, delay: Delay) -> Self {
        Self { delay, ..self }
    }

    /// Deep copy all fields and timing metadata into a new probe.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Insert a field, replacing any existing field with the same key.
    ///
    /// A replaced field keeps its original position.
    pub fn set_field(&mut self, field: Field) {
        self.fields.insert(field.key().to_owned(), field);
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    /// The fields of the probe in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The total size in bytes of all field values.
    #[must_use]
    pub fn size(&self) -> usize {
        self.fields.values().map(Field::size).sum()
    }

    /// Extract the value of the field `key`.
    ///
    /// # Errors
    ///
    /// Returns `FieldError::KeyNotFound` if the probe has no such field and
    /// `FieldError::TypeMismatch` if `T` does not match the field type.
    pub fn extract<T>(&self, key: &str) -> FieldResult<T>
    where
        T: for<'a> TryFrom<&'a Value, Error = FieldError>,
    {
        let field = self
            .fields
            .get(key)
            .ok_or_else(|| FieldError::KeyNotFound(key.to_owned()))?;
        T::try_from(field.value())
    }

    /// Extract the value of the field `key`, if present and of type `T`.
    #[must_use]
    pub fn extract_opt<T>(&self, key: &str) -> Option<T>
    where
        T: for<'a> TryFrom<&'a Value, Error = FieldError>,
    {
        match self.extract(key) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::trace!(%err, key, "no information");
                None
            }
        }
    }

    #[must_use]
    pub const fn sending_time(&self) -> Option<SystemTime> {
        self.sending_time
    }

    pub fn set_sending_time(&mut self, sending_time: SystemTime) {
        self.sending_time = Some(sending_time);
    }

    #[must_use]
    pub const fn recv_time(&self) -> Option<SystemTime> {
        self.recv_time
    }

    pub fn set_recv_time(&mut self, recv_time: SystemTime) {
        self.recv_time = Some(recv_time);
    }

    #[must_use]
    pub const fn delay(&self) -> Delay {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Delay) {
        self.delay = delay;
    }
}

/// A probe which has been sent, paired with the reply it elicited.
///
/// The sent probe is shared with the algorithm instance which owns it, the
/// reply is owned by the pair.
#[derive(Debug, PartialEq, Eq)]
pub struct ProbeReply {
    /// The probe as it was sent.
    pub probe: Arc<Probe>,
    /// The reply received for the probe.
    pub reply: Probe,
}

impl ProbeReply {
    #[must_use]
    pub const fn new(probe: Arc<Probe>, reply: Probe) -> Self {
        Self { probe, reply }
    }

    /// The round trip time between sending the probe and receiving the reply.
    ///
    /// Returns `None` if either timestamp is missing or the reply predates the probe.
    #[must_use]
    pub fn rtt(&self) -> Option<Duration> {
        let sent = self.probe.sending_time()?;
        let received = self.reply.recv_time()?;
        received.duration_since(sent).ok()
    }
}
