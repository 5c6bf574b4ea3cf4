//! Legacy statsd command formatting and sending.
//!
//! Telegraf's statsd-compatible listener (conventionally port 8125) accepts the classic
//! `name:value|unit` commands rather than line-protocol points. This surface predates the
//! point pipeline and stays non-batched: every `send_*` call is one inline transmission, with
//! an optional command buffer for callers that want to accumulate and flush by hand.

use parking_lot::Mutex;

use crate::{
    sampler::{Sampler, TickSampler},
    transport::Transport,
};

/// Metric kinds carried by the legacy statsd surface.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricKind {
    /// A monotonically accumulated count.
    Counter,

    /// A duration, in milliseconds.
    Timer,

    /// A sampled value distribution.
    Histogram,

    /// A rate-per-second meter.
    Meter,
}

impl MetricKind {
    const fn unit(self) -> &'static str {
        match self {
            MetricKind::Counter => "c",
            MetricKind::Timer => "ms",
            MetricKind::Histogram => "h",
            MetricKind::Meter => "m",
        }
    }
}

/// A non-batched statsd command sender.
///
/// The prefix, if any, is prepended verbatim to every metric name, separator included.
/// Sampled commands carry their rate as an `|@rate` suffix so the server can scale them back
/// up. Failures are entirely the transport's concern and never reach the caller.
pub struct Statsd<T, S = TickSampler> {
    transport: T,
    sampler: S,
    prefix: String,
    commands: Mutex<Vec<String>>,
}

impl<T: Transport> Statsd<T> {
    /// Creates a statsd sender with the default sampler.
    pub fn new(transport: T, prefix: impl Into<String>) -> Self {
        Self::with_sampler(transport, TickSampler::new(), prefix)
    }
}

impl<T: Transport, S: Sampler> Statsd<T, S> {
    /// Creates a statsd sender with the given sampler.
    pub fn with_sampler(transport: T, sampler: S, prefix: impl Into<String>) -> Self {
        Self { transport, sampler, prefix: prefix.into(), commands: Mutex::new(Vec::new()) }
    }

    /// Sends one integral metric immediately, subject to sampling.
    pub fn send_integer(&self, kind: MetricKind, name: &str, value: i64, sample_rate: f64) {
        if !self.sampler.should_send(sample_rate) {
            return;
        }

        let mut int_writer = itoa::Buffer::new();
        let command = self.command(name, int_writer.format(value), kind.unit(), sample_rate);
        self.transport.send(command.as_bytes());
    }

    /// Buffers one integral metric for a later [`flush`](Self::flush), subject to sampling.
    pub fn add_integer(&self, kind: MetricKind, name: &str, value: i64, sample_rate: f64) {
        if !self.sampler.should_send(sample_rate) {
            return;
        }

        let mut int_writer = itoa::Buffer::new();
        let command = self.command(name, int_writer.format(value), kind.unit(), sample_rate);
        self.commands.lock().push(command);
    }

    /// Sends a gauge immediately.
    ///
    /// Delta gauges always carry an explicit `+` or `-` sign (zero renders as `+0`) so the
    /// server treats the value as an adjustment instead of an absolute level. Absolute gauges
    /// render in fixed fifteen-fractional-digit form.
    pub fn send_gauge(&self, name: &str, value: f64, delta: bool) {
        let rendered = if delta { format_delta(value) } else { format_fixed(value) };
        let command = self.command(name, &rendered, "g", 1.0);
        self.transport.send(command.as_bytes());
    }

    /// Buffers an absolute gauge for a later [`flush`](Self::flush).
    pub fn add_gauge(&self, name: &str, value: f64) {
        let command = self.command(name, &format_fixed(value), "g", 1.0);
        self.commands.lock().push(command);
    }

    /// Sends a set member immediately.
    pub fn send_set(&self, name: &str, value: &str) {
        let command = self.command(name, value, "s", 1.0);
        self.transport.send(command.as_bytes());
    }

    /// Sends all buffered commands as one newline-joined payload.
    pub fn flush(&self) {
        let commands = std::mem::take(&mut *self.commands.lock());
        if commands.is_empty() {
            return;
        }

        self.transport.send(commands.join("\n").as_bytes());
    }

    fn command(&self, name: &str, value: &str, unit: &str, sample_rate: f64) -> String {
        let mut command =
            String::with_capacity(self.prefix.len() + name.len() + value.len() + unit.len() + 2);
        command.push_str(&self.prefix);
        command.push_str(name);
        command.push(':');
        command.push_str(value);
        command.push('|');
        command.push_str(unit);

        if sample_rate != 1.0 {
            let mut float_writer = ryu::Buffer::new();
            command.push_str("|@");
            command.push_str(float_writer.format(sample_rate));
        }

        command
    }
}

/// Fixed fifteen-fractional-digit rendering for absolute gauges, so large magnitudes keep
/// their full integral part instead of collapsing into scientific notation.
fn format_fixed(value: f64) -> String {
    format!("{value:.15}")
}

/// Signed delta rendering: `+10`, `-10`, `+0`. Magnitudes keep at most three fractional
/// digits, trailing zeros trimmed, and sub-one magnitudes drop the leading zero.
fn format_delta(value: f64) -> String {
    let magnitude = format!("{:.3}", value.abs());
    let magnitude = magnitude.trim_end_matches('0').trim_end_matches('.');

    // Rounded away entirely; the zero form carries a sign too.
    if magnitude == "0" {
        return "+0".to_string();
    }

    let sign = if value < 0.0 { '-' } else { '+' };
    match magnitude.strip_prefix("0.") {
        Some(fraction) => format!("{sign}.{fraction}"),
        None => format!("{sign}{magnitude}"),
    }
}
