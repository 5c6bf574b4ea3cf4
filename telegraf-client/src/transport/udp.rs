use std::{
    io,
    net::{Ipv4Addr, ToSocketAddrs, UdpSocket},
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tracing::error;

use super::Transport;

/// A UDP datagram transport bound to a single resolved destination.
///
/// The destination is resolved once at construction; the socket is owned exclusively by this
/// transport and released when it is dropped. Sends are fire-and-forget: socket-level failures
/// are counted, retained for inspection and logged, but never surfaced to the caller.
pub struct UdpTransport {
    socket: UdpSocket,
    max_datagram_size: usize,
    send_errors: AtomicU64,
    last_error: Mutex<Option<io::Error>>,
}

impl UdpTransport {
    /// Creates a transport connected to the given destination.
    ///
    /// The address may be a literal or a name; names are resolved here, and failing to resolve
    /// is a construction error rather than a per-send one. Buffers longer than
    /// `max_datagram_size` are split at record boundaries before sending; `0` disables
    /// splitting.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be resolved or the local socket cannot be
    /// created and connected.
    pub fn connect<A>(addr: A, max_datagram_size: usize) -> io::Result<Self>
    where
        A: ToSocketAddrs,
    {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(addr)?;

        Ok(Self {
            socket,
            max_datagram_size,
            send_errors: AtomicU64::new(0),
            last_error: Mutex::new(None),
        })
    }

    /// Number of socket-level send failures observed so far.
    pub fn send_error_count(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    /// A description of the most recent socket-level send failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().as_ref().map(ToString::to_string)
    }

    fn transmit(&self, buf: &[u8]) {
        if let Err(e) = self.socket.send(buf) {
            self.send_errors.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, "Failed to send datagram.");
            *self.last_error.lock() = Some(e);
        }
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8]) {
        if self.max_datagram_size > 0 && buf.len() > self.max_datagram_size {
            // Scan backwards from the size limit for a newline between records. Records never
            // contain newlines, so a newline is the only safe place to cut.
            for i in (1..=self.max_datagram_size).rev() {
                if buf[i] != b'\n' {
                    continue;
                }

                self.send(&buf[..i]);
                if i + 1 < buf.len() {
                    self.send(&buf[i + 1..]);
                }

                return;
            }

            // No record boundary below the limit: a single record longer than the maximum.
            // Send it anyway and let the socket layer reject or truncate it, rather than
            // silently dropping data.
        }

        self.transmit(buf);
    }
}
