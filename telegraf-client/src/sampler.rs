use std::sync::atomic::{AtomicU64, Ordering};

use quanta::Clock;

/// Decides whether an individual metric occurrence should be emitted.
///
/// A sample rate of `1` (or anything above it) means unconditional emission; rates between zero
/// and one emit roughly that fraction of occurrences over time. Implementations must be safe
/// under unbounded concurrent invocation without external locking.
pub trait Sampler: Send + Sync {
    /// Returns `true` if this occurrence should be sent.
    fn should_send(&self, rate: f64) -> bool;
}

impl<F> Sampler for F
where
    F: Fn(f64) -> bool + Send + Sync,
{
    fn should_send(&self, rate: f64) -> bool {
        (self)(rate)
    }
}

/// The default sampling decision.
///
/// Combines an atomically advancing counter with a coarse clock reading and a modulo test
/// against the inverse rate. The mix is not statistically uniform, but it is branch-light and
/// lock-free, which matters more for a gate that runs on every recording call.
pub struct TickSampler {
    clock: Clock,
    counter: AtomicU64,
}

impl TickSampler {
    /// Creates a new `TickSampler`.
    pub fn new() -> Self {
        Self { clock: Clock::new(), counter: AtomicU64::new(0) }
    }
}

impl Default for TickSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for TickSampler {
    fn should_send(&self, rate: f64) -> bool {
        if rate >= 1.0 {
            return true;
        }

        // A gate must never fail, so a nonsensical rate suppresses instead of erroring.
        if rate <= 0.0 {
            return false;
        }

        let interval = (1.0 / rate).round() as u64;
        let ticks = self.clock.raw();

        (ticks ^ self.counter.fetch_add(1, Ordering::Relaxed)) % interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Sampler, TickSampler};

    #[test]
    fn rate_of_one_always_sends() {
        let sampler = TickSampler::new();
        assert!((0..1000).all(|_| sampler.should_send(1.0)));
    }

    #[test]
    fn rates_above_one_always_send() {
        let sampler = TickSampler::new();
        assert!(sampler.should_send(2.0));
    }

    #[test]
    fn nonpositive_rates_never_send() {
        let sampler = TickSampler::new();
        assert!(!sampler.should_send(0.0));
        assert!(!sampler.should_send(-1.0));
    }

    #[test]
    fn fractional_rate_sends_some_and_drops_some() {
        let sampler = TickSampler::new();
        let sent = (0..10_000).filter(|_| sampler.should_send(0.5)).count();

        assert!(sent > 0, "expected at least one occurrence to be sent");
        assert!(sent < 10_000, "expected at least one occurrence to be dropped");
    }

    #[test]
    fn closures_are_samplers() {
        let always = |_: f64| true;
        let never = |_: f64| false;

        assert!(always.should_send(0.1));
        assert!(!never.should_send(1.0));
    }
}
