use indexmap::IndexMap;

use super::Sender;
use crate::{point::Point, transport::Transport, writer};

/// A sender that encodes and transmits each point inline on the caller's thread.
///
/// There is no queue and no background thread; the cost of the encode and the network call is
/// paid by whoever records the metric.
pub struct SyncSender<T> {
    transport: T,
    static_tags: IndexMap<String, String>,
}

impl<T: Transport> SyncSender<T> {
    /// Creates a `SyncSender` that merges `static_tags` into every point it encodes.
    pub fn new(transport: T, static_tags: IndexMap<String, String>) -> Self {
        Self { transport, static_tags }
    }
}

impl<T: Transport> Sender for SyncSender<T> {
    fn send(&self, point: Point) {
        let mut buf = String::new();
        writer::encode_point(&point, &self.static_tags, &mut buf);
        self.transport.send(buf.as_bytes());
    }
}
