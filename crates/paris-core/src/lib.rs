//! Paris - A network probing engine.
//!
//! This crate provides the typed probe model and the event driven ping
//! algorithm used by the `paris-sim` application.
//!
//! Probes are ordered collections of typed header [`Field`]s. An algorithm
//! instance such as [`Ping`] is driven by an event [`Loop`]: the loop
//! delivers lifecycle and transport [`Event`]s to the instance, which sends
//! probes through the loop and raises outward [`PingEvent`]s for its caller.
//!
//! # Example
//!
//! The following example builds a ping instance and starts it on a loop:
//!
//! ```
//! use paris_core::{Algorithm, Builder, Event, Loop};
//! use std::net::IpAddr;
//!
//! fn start<L: Loop>(lp: &mut L) -> anyhow::Result<()> {
//!     let addr = IpAddr::from([192, 0, 2, 1]);
//!     let mut ping = Builder::new(addr).count(3).build()?;
//!     ping.handle(lp, Event::AlgorithmInit)?;
//!     Ok(())
//! }
//! ```
//!
//! # See Also
//!
//! - [`Builder`] - Build a [`Ping`].
//! - [`Loop`] - The services an event loop provides.
//! - [`classify`] - Classify a reply.
#![warn(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::use_self,
    clippy::option_if_let_else,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod algorithm;
mod builder;
mod classify;
mod config;
mod error;
mod event;
mod field;
mod ping;
mod probe;
mod stats;
mod types;

pub use algorithm::{Algorithm, InstanceState, Loop};
pub use builder::Builder;
pub use classify::{classify, Classification, IcmpHeader};
pub use config::{defaults, PingConfig, PingFlags};
pub use error::{Error, FieldError, FieldResult, Result};
pub use event::{Event, EventType, PingEvent};
pub use field::{Field, FieldType, IntMax, Nibble, Value};
pub use ping::{Ping, PingData};
pub use probe::{Delay, Probe, ProbeReply};
pub use stats::{PingSummary, Statistics};
pub use types::{InstanceId, IpVersion, TimeToLive};
