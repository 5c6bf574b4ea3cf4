use std::{
    panic::{self, AssertUnwindSafe},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender as ChannelSender, TryRecvError};
use indexmap::IndexMap;
use tracing::{debug, error};

use super::Sender;
use crate::{point::Point, transport::Transport, writer};

/// How long the delivery loop waits for new points when the queue is empty. Caps the loop's
/// busy-wait overhead while keeping flush latency bounded.
const IDLE_WAIT: Duration = Duration::from_millis(200);

/// A sender that queues points and delivers them in batches from a dedicated thread.
///
/// Producers enqueue without ever blocking. When the queue sits above `max_queue_level`, new
/// points are discarded instead of enqueued (drop-newest) and counted. The delivery loop drains
/// up to `batch_size` points per cycle, joins their encodings with newlines and hands the result
/// to the transport in a single call.
///
/// The queue bound is advisory: the depth check and the enqueue are not atomic with each other,
/// so concurrent producers can push the depth slightly past the limit before drops kick in.
pub struct BatchSender<T> {
    transport: T,
    static_tags: IndexMap<String, String>,
    tx: ChannelSender<Point>,
    rx: Receiver<Point>,
    max_queue_level: usize,
    batch_size: usize,
    discarded: AtomicU64,
    failed_flushes: AtomicU64,
}

impl<T: Transport> BatchSender<T> {
    /// Creates a `BatchSender` that merges `static_tags` into every point it encodes.
    ///
    /// A `batch_size` of zero is treated as one.
    pub fn new(
        transport: T,
        static_tags: IndexMap<String, String>,
        max_queue_level: usize,
        batch_size: usize,
    ) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();

        Self {
            transport,
            static_tags,
            tx,
            rx,
            max_queue_level,
            batch_size: batch_size.max(1),
            discarded: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
        }
    }

    /// Number of points discarded because the queue was over its limit.
    pub fn count_discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Number of delivery cycles that failed and were skipped.
    pub fn count_failed(&self) -> u64 {
        self.failed_flushes.load(Ordering::Relaxed)
    }

    /// Runs the delivery loop until `shutdown` yields a value or disconnects.
    ///
    /// Blocks the calling thread for the lifetime of the loop; run it on a dedicated thread.
    /// The shutdown signal is polled once per cycle and interrupts the idle wait, so the loop
    /// stops within one cycle of cancellation. Points still queued at that moment are discarded
    /// without a final drain: delivery is best-effort at most once, including across shutdown.
    pub fn run_delivery_loop(&self, shutdown: &Receiver<()>) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut buf = String::new();

        loop {
            match shutdown.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            if !self.deliver_batch(&mut batch, &mut buf) {
                match shutdown.recv_timeout(IDLE_WAIT) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }

        debug!("Delivery loop stopped.");
    }

    /// Drains and delivers one batch. Returns `false` if the queue was empty.
    fn deliver_batch(&self, batch: &mut Vec<Point>, buf: &mut String) -> bool {
        batch.clear();
        while batch.len() < self.batch_size {
            match self.rx.try_recv() {
                Ok(point) => batch.push(point),
                Err(_) => break,
            }
        }

        if batch.is_empty() {
            return false;
        }

        // One bad batch must never stop delivery: anything that blows up while encoding or
        // dispatching is contained here, counted, and the next cycle proceeds.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            buf.clear();
            for (i, point) in batch.iter().enumerate() {
                if i > 0 {
                    buf.push('\n');
                }
                writer::encode_point(point, &self.static_tags, buf);
            }

            self.transport.send(buf.as_bytes());
        }));

        if result.is_err() {
            self.failed_flushes.fetch_add(1, Ordering::Relaxed);
            error!("Failed to deliver metrics batch.");
        }

        true
    }
}

impl<T: Transport> Sender for BatchSender<T> {
    fn send(&self, point: Point) {
        if self.tx.len() > self.max_queue_level {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return;
        }

        // The receiving side lives as long as `self`, so the enqueue cannot fail.
        let _ = self.tx.send(point);
    }
}
