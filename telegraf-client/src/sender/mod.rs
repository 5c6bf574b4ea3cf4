use crate::point::Point;

mod batch;
pub use self::batch::BatchSender;

mod sync;
pub use self::sync::SyncSender;

/// A destination for recorded points.
///
/// Senders are fire-and-forget: delivery is best-effort and at most once, and anything that goes
/// wrong downstream of a successfully built [`Point`] is only observable through counters and
/// logs, never as an error to the producer.
pub trait Sender: Send + Sync {
    /// Accepts one point for delivery.
    fn send(&self, point: Point);
}

/// A sender that discards every point.
pub struct NullSender;

impl Sender for NullSender {
    fn send(&self, _point: Point) {}
}
