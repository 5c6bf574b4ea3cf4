use std::net::{SocketAddr, ToSocketAddrs as _};

mod udp;
pub use self::udp::UdpTransport;

/// A best-effort, fire-and-forget byte transport.
///
/// Implementations absorb their own failures: `send` never blocks beyond the underlying network
/// call and never reports an error to the caller. Failures are only observable through the
/// implementation's own counters and logs.
pub trait Transport: Send + Sync {
    /// Sends one encoded buffer.
    fn send(&self, buf: &[u8]);
}

/// Resolves a `host:port` string, literal or named, to routable addresses.
///
/// Resolution happens exactly once, when a transport is configured; a destination that stops
/// resolving later does not affect an already-built transport.
pub(crate) fn resolve(addr: &str) -> Result<Vec<SocketAddr>, String> {
    match addr.to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<_> = addrs.collect();
            if addrs.is_empty() {
                Err(format!("'{addr}' did not resolve to any address"))
            } else {
                Ok(addrs)
            }
        }
        Err(e) => Err(e.to_string()),
    }
}
