use std::{net::SocketAddr, sync::Arc, thread};

use crossbeam_channel::bounded;
use indexmap::IndexMap;
use thiserror::Error;

use crate::{
    client::{self, TelegrafClient},
    sampler::{Sampler, TickSampler},
    sender::{BatchSender, SyncSender},
    transport::{self, UdpTransport},
};

/// Default maximum UDP datagram size, in bytes. Conservative enough to survive most MTU setups.
const DEFAULT_MAX_DATAGRAM_SIZE: usize = 512;

/// Default number of points drained per delivery cycle in batched mode.
const DEFAULT_BATCH_SIZE: usize = 64;

/// Default queue depth above which batched senders start shedding new points.
const DEFAULT_MAX_QUEUE_LEVEL: usize = 10_000;

/// Errors that could occur while building or installing a client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to resolve the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the resolution failure.
        reason: String,
    },

    /// Failed to create or connect the local socket.
    #[error("failed to create socket: {0}")]
    Socket(#[from] std::io::Error),

    /// Failed to spawn the background delivery thread in batched mode.
    #[error("failed to spawn background delivery thread")]
    Backend,

    /// A client has already been installed as the process-wide default.
    #[error("a client was already installed as the process-wide default")]
    AlreadyInstalled,
}

/// Builder for a Telegraf client.
pub struct TelegrafBuilder {
    remote_addrs: Vec<SocketAddr>,
    max_datagram_size: usize,
    static_tags: IndexMap<String, String>,
    max_queue_level: usize,
    batch_size: usize,
    batched: bool,
    sampler: Arc<dyn Sampler>,
}

impl TelegrafBuilder {
    /// Set the remote address to deliver metrics to.
    ///
    /// The address is either a literal `<host>:<port>` pair or a name that resolves to one;
    /// resolution happens here, once, and never again per send.
    ///
    /// Defaults to sending to `127.0.0.1:8094`, the native Telegraf socket listener. The
    /// statsd-compatible listener conventionally sits on port 8125 instead.
    ///
    /// # Errors
    ///
    /// If the given address cannot be resolved to a routable address, an error will be returned
    /// indicating the reason.
    pub fn with_remote_address<A>(mut self, addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        self.remote_addrs = transport::resolve(addr.as_ref())
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;
        Ok(self)
    }

    /// Set the maximum datagram size for delivering metrics.
    ///
    /// Buffers longer than this are split at record boundaries before sending. Worth tweaking
    /// when the path MTU differs from the usual, and `0` disables splitting entirely.
    ///
    /// Defaults to 512 bytes.
    #[must_use]
    pub fn with_max_datagram_size(mut self, max_datagram_size: usize) -> Self {
        self.max_datagram_size = max_datagram_size;
        self
    }

    /// Add a static tag merged into every point this client sends.
    ///
    /// Point-level tags win when both carry the same key.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_tags.insert(key.into(), value.into());
        self
    }

    /// Set the queue depth above which a batched client sheds new points.
    ///
    /// The bound is advisory: concurrent producers can push the depth slightly past it before
    /// drops kick in. Shed points are counted, never retried.
    ///
    /// Defaults to 10,000 points.
    #[must_use]
    pub fn with_max_queue_level(mut self, max_queue_level: usize) -> Self {
        self.max_queue_level = max_queue_level;
        self
    }

    /// Set the number of points drained per delivery cycle in batched mode.
    ///
    /// Defaults to 64.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Deliver points inline on the recording thread.
    ///
    /// This is the default.
    #[must_use]
    pub fn with_synchronous_delivery(mut self) -> Self {
        self.batched = false;
        self
    }

    /// Queue points and deliver them in batches from a background thread.
    ///
    /// Recording never blocks in this mode; under overload the queue sheds new points instead
    /// of applying backpressure.
    #[must_use]
    pub fn with_batched_delivery(mut self) -> Self {
        self.batched = true;
        self
    }

    /// Set the sampler consulted by the recording methods.
    ///
    /// Defaults to [`TickSampler`].
    #[must_use]
    pub fn with_sampler<S>(mut self, sampler: S) -> Self
    where
        S: Sampler + 'static,
    {
        self.sampler = Arc::new(sampler);
        self
    }

    /// Builds the client.
    ///
    /// In batched mode this spawns the dedicated delivery thread; the client owns its shutdown
    /// signal and stops it on [`TelegrafClient::shutdown`].
    ///
    /// # Errors
    ///
    /// Returns an error if the local socket cannot be created and connected, or if the delivery
    /// thread cannot be spawned.
    pub fn build(self) -> Result<TelegrafClient, BuildError> {
        let transport = UdpTransport::connect(&self.remote_addrs[..], self.max_datagram_size)?;

        if self.batched {
            let sender = Arc::new(BatchSender::new(
                transport,
                self.static_tags,
                self.max_queue_level,
                self.batch_size,
            ));

            let (shutdown_tx, shutdown_rx) = bounded(1);
            let worker = Arc::clone(&sender);
            let handle = thread::Builder::new()
                .name("telegraf-client-delivery".to_string())
                .spawn(move || worker.run_delivery_loop(&shutdown_rx))
                .map_err(|_| BuildError::Backend)?;

            Ok(TelegrafClient::from_batched(sender, self.sampler, shutdown_tx, handle))
        } else {
            let sender = SyncSender::new(transport, self.static_tags);
            Ok(TelegrafClient::from_sync(sender, self.sampler))
        }
    }

    /// Builds the client and installs it as the process-wide default.
    ///
    /// The installed client backs the crate-level recording functions. Installation happens at
    /// most once per process.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built, or if a client has already been
    /// installed.
    pub fn install(self) -> Result<(), BuildError> {
        let telegraf_client = self.build()?;
        client::install_global(telegraf_client).map_err(|_| BuildError::AlreadyInstalled)
    }
}

impl Default for TelegrafBuilder {
    fn default() -> Self {
        TelegrafBuilder {
            remote_addrs: vec![SocketAddr::from(([127, 0, 0, 1], 8094))],
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            static_tags: IndexMap::new(),
            max_queue_level: DEFAULT_MAX_QUEUE_LEVEL,
            batch_size: DEFAULT_BATCH_SIZE,
            batched: false,
            sampler: Arc::new(TickSampler::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BuildError, TelegrafBuilder};

    #[test]
    fn unresolvable_address_is_rejected_eagerly() {
        let result = TelegrafBuilder::default().with_remote_address("not an address");
        assert!(matches!(result, Err(BuildError::InvalidRemoteAddress { .. })));
    }

    #[test]
    fn literal_addresses_resolve() {
        assert!(TelegrafBuilder::default().with_remote_address("127.0.0.1:8094").is_ok());
    }

    #[test]
    fn default_builder_builds_a_synchronous_client() {
        // UDP connect needs no listening peer, so the default endpoint always binds.
        let client = TelegrafBuilder::default().build().expect("failed to build client");
        assert_eq!(client.count_discarded(), 0);
        assert_eq!(client.count_failed(), 0);
    }
}
