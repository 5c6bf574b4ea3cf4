//! A client for sending metrics to [Telegraf][telegraf] over UDP using the
//! [InfluxDB line protocol][line-protocol].
//!
//! [telegraf]: https://github.com/influxdata/telegraf
//! [line-protocol]: https://docs.influxdata.com/influxdb/latest/reference/syntax/line-protocol/
//!
//! # Usage
//!
//! Build a client once at startup and record through it:
//!
//! ```no_run
//! # use telegraf_client::TelegrafClient;
//! let client = TelegrafClient::builder()
//!     .with_remote_address("localhost:8094")
//!     .expect("failed to resolve remote address")
//!     .with_tag("env", "prod")
//!     .with_batched_delivery()
//!     .build()
//!     .expect("failed to build client");
//!
//! client.record_count("requests", 1, &[("handler", "index")], 1.0).expect("invalid point");
//! ```
//!
//! Alternatively, `install()` registers the client as the process-wide default, which backs the
//! crate-level [`record_count`], [`record_value`] and [`record`] functions. Installation happens
//! at most once; a second attempt returns an error instead of silently reconfiguring the
//! process. Until a client is installed, the crate-level functions are no-ops.
//!
//! # Delivery model
//!
//! Delivery is best-effort and at most once, everywhere. Once a [`Point`] has been built, no
//! failure downstream of it ever reaches the recording call site: transport errors are counted
//! and logged inside the transport, and an overloaded batched client sheds new points rather
//! than blocking producers. Nothing is retried, persisted or replayed.
//!
//! Two senders implement this contract:
//!
//! - [`SyncSender`] encodes and transmits inline on the recording thread.
//! - [`BatchSender`] enqueues points onto an advisory-bounded queue drained by a dedicated
//!   delivery thread, which flushes up to a configured batch of points per cycle as a single
//!   newline-joined datagram payload.
//!
//! Encoded payloads longer than the configured maximum datagram size are split at record
//! boundaries before they hit the socket, since a datagram may carry several newline-joined
//! records but never a partial one.
//!
//! # Sampling
//!
//! Recording methods take a sample rate in `(0, 1]`; occurrences are gated through a cheap,
//! lock-free [`Sampler`] before a point is even built. The default [`TickSampler`] favors
//! speed over perfect statistical uniformity.
//!
//! # Legacy statsd mode
//!
//! The [`statsd`] module speaks the classic `name:value|unit` command format for the
//! statsd-compatible listener, including signed delta gauges. New code should prefer
//! line-protocol points.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![deny(missing_docs)]

mod builder;
pub use self::builder::{BuildError, TelegrafBuilder};

mod client;
pub use self::client::{global, record, record_count, record_value, TelegrafClient};

mod point;
pub use self::point::{FieldValue, Point, PointBuilder, PointError};

mod sampler;
pub use self::sampler::{Sampler, TickSampler};

mod sender;
pub use self::sender::{BatchSender, NullSender, Sender, SyncSender};

pub mod statsd;

mod transport;
pub use self::transport::{Transport, UdpTransport};

mod writer;
