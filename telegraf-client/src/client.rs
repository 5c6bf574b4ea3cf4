use std::{sync::Arc, thread::JoinHandle};

use crossbeam_channel::Sender as ChannelSender;
use once_cell::sync::OnceCell;
use tracing::error;

use crate::{
    builder::TelegrafBuilder,
    point::{FieldValue, Point, PointBuilder, PointError},
    sampler::Sampler,
    sender::{BatchSender, Sender as _, SyncSender},
    transport::UdpTransport,
};

static GLOBAL_CLIENT: OnceCell<TelegrafClient> = OnceCell::new();

pub(crate) fn install_global(client: TelegrafClient) -> Result<(), ()> {
    GLOBAL_CLIENT.set(client).map_err(|_| ())
}

/// Returns the installed process-wide client, if any.
pub fn global() -> Option<&'static TelegrafClient> {
    GLOBAL_CLIENT.get()
}

enum Backend {
    Sync(SyncSender<UdpTransport>),
    Batched(Arc<BatchSender<UdpTransport>>),
}

struct DeliveryWorker {
    shutdown_tx: ChannelSender<()>,
    handle: JoinHandle<()>,
}

/// A configured metrics client.
///
/// Recording methods gate each occurrence through the configured sampler, build a [`Point`] and
/// hand it to the configured sender. Everything past point construction is fire-and-forget;
/// only validation errors ever reach the caller.
pub struct TelegrafClient {
    backend: Backend,
    sampler: Arc<dyn Sampler>,
    delivery: Option<DeliveryWorker>,
}

impl TelegrafClient {
    /// Creates a builder with default settings.
    pub fn builder() -> TelegrafBuilder {
        TelegrafBuilder::default()
    }

    pub(crate) fn from_sync(sender: SyncSender<UdpTransport>, sampler: Arc<dyn Sampler>) -> Self {
        Self { backend: Backend::Sync(sender), sampler, delivery: None }
    }

    pub(crate) fn from_batched(
        sender: Arc<BatchSender<UdpTransport>>,
        sampler: Arc<dyn Sampler>,
        shutdown_tx: ChannelSender<()>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            backend: Backend::Batched(sender),
            sampler,
            delivery: Some(DeliveryWorker { shutdown_tx, handle }),
        }
    }

    /// Records a counter occurrence as a point with a single `count` field.
    ///
    /// # Errors
    ///
    /// Returns a [`PointError`] if the measurement or any tag name is empty.
    pub fn record_count(
        &self,
        measurement: &str,
        count: i64,
        tags: &[(&str, &str)],
        sample_rate: f64,
    ) -> Result<(), PointError> {
        if !self.sampler.should_send(sample_rate) {
            return Ok(());
        }

        let point = tagged_builder(measurement, tags).field("count", count).build()?;
        self.send(point);
        Ok(())
    }

    /// Records a gauge-style absolute value as a point with a single `value` field.
    ///
    /// # Errors
    ///
    /// Returns a [`PointError`] if the measurement or any tag name is empty.
    pub fn record_value<V>(
        &self,
        measurement: &str,
        value: V,
        tags: &[(&str, &str)],
        sample_rate: f64,
    ) -> Result<(), PointError>
    where
        V: Into<FieldValue>,
    {
        if !self.sampler.should_send(sample_rate) {
            return Ok(());
        }

        let point = tagged_builder(measurement, tags).field("value", value).build()?;
        self.send(point);
        Ok(())
    }

    /// Records a point carrying arbitrary named fields.
    ///
    /// # Errors
    ///
    /// Returns a [`PointError`] if the measurement, any field name or any tag name is empty, or
    /// if no fields were given.
    pub fn record<I, K, V>(
        &self,
        measurement: &str,
        fields: I,
        tags: &[(&str, &str)],
        sample_rate: f64,
    ) -> Result<(), PointError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        if !self.sampler.should_send(sample_rate) {
            return Ok(());
        }

        let mut builder = tagged_builder(measurement, tags);
        for (name, value) in fields {
            builder = builder.field(name, value);
        }

        self.send(builder.build()?);
        Ok(())
    }

    /// Hands a pre-built point to the configured sender.
    pub fn send(&self, point: Point) {
        match &self.backend {
            Backend::Sync(sender) => sender.send(point),
            Backend::Batched(sender) => sender.send(point),
        }
    }

    /// Number of points discarded due to queue overload. Always zero in synchronous mode.
    pub fn count_discarded(&self) -> u64 {
        match &self.backend {
            Backend::Sync(_) => 0,
            Backend::Batched(sender) => sender.count_discarded(),
        }
    }

    /// Number of failed delivery cycles. Always zero in synchronous mode.
    pub fn count_failed(&self) -> u64 {
        match &self.backend {
            Backend::Sync(_) => 0,
            Backend::Batched(sender) => sender.count_failed(),
        }
    }

    /// Stops the background delivery thread, if one is running.
    ///
    /// Points still queued when the signal is observed are lost; delivery is best-effort at
    /// most once, including across shutdown. Never panics: a delivery thread that died early
    /// is logged and otherwise ignored. Dropping the client without calling this has the same
    /// effect, since the delivery loop also stops when its shutdown channel disconnects.
    pub fn shutdown(mut self) {
        if let Some(worker) = self.delivery.take() {
            let _ = worker.shutdown_tx.send(());
            if worker.handle.join().is_err() {
                error!("Delivery thread panicked before shutdown.");
            }
        }
    }
}

fn tagged_builder(measurement: &str, tags: &[(&str, &str)]) -> PointBuilder {
    let mut builder = Point::builder(measurement);
    for (key, value) in tags {
        builder = builder.tag(*key, *value);
    }
    builder
}

/// Records a counter through the installed process-wide client.
///
/// A no-op when no client has been installed.
///
/// # Errors
///
/// Returns a [`PointError`] if the measurement or any tag name is empty.
pub fn record_count(
    measurement: &str,
    count: i64,
    tags: &[(&str, &str)],
    sample_rate: f64,
) -> Result<(), PointError> {
    match global() {
        Some(client) => client.record_count(measurement, count, tags, sample_rate),
        None => Ok(()),
    }
}

/// Records a gauge-style absolute value through the installed process-wide client.
///
/// A no-op when no client has been installed.
///
/// # Errors
///
/// Returns a [`PointError`] if the measurement or any tag name is empty.
pub fn record_value<V>(
    measurement: &str,
    value: V,
    tags: &[(&str, &str)],
    sample_rate: f64,
) -> Result<(), PointError>
where
    V: Into<FieldValue>,
{
    match global() {
        Some(client) => client.record_value(measurement, value, tags, sample_rate),
        None => Ok(()),
    }
}

/// Records a multi-field point through the installed process-wide client.
///
/// A no-op when no client has been installed.
///
/// # Errors
///
/// Returns a [`PointError`] if the measurement, any field name or any tag name is empty, or if
/// no fields were given.
pub fn record<I, K, V>(
    measurement: &str,
    fields: I,
    tags: &[(&str, &str)],
    sample_rate: f64,
) -> Result<(), PointError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    match global() {
        Some(client) => client.record(measurement, fields, tags, sample_rate),
        None => Ok(()),
    }
}
