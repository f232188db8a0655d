//! Connected UDP socket for outbound datagrams.
//!
//! Bound to a local address and connected to the remote peer before the
//! flow starts, matching the host engine's bind+connect setup. The socket
//! is non-blocking: a send that cannot complete fails immediately instead
//! of stalling the audio callback.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddrV4, UdpSocket};

/// Connected, non-blocking UDP socket for one outbound flow.
pub struct UnicastSocket {
    /// The underlying UDP socket
    socket: UdpSocket,
    /// Local address this socket is bound to
    local_addr: SocketAddrV4,
    /// Remote address the socket is connected to
    remote_addr: SocketAddrV4,
}

impl UnicastSocket {
    /// Bind to `local_addr` and connect to `remote_addr`.
    ///
    /// # Arguments
    /// * `local_addr` - Local address to bind (port 0 = ephemeral)
    /// * `remote_addr` - Destination for all datagrams
    ///
    /// # Returns
    /// A connected socket, or the first setup error. No partial state is
    /// retained on failure.
    pub fn connect(local_addr: SocketAddrV4, remote_addr: SocketAddrV4) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        // Allow address reuse (important for quick restarts)
        socket.set_reuse_address(true)?;

        // Never block the audio callback on a full kernel buffer
        socket.set_nonblocking(true)?;

        socket.bind(&local_addr.into())?;
        socket.connect(&remote_addr.into())?;

        // Increase send buffer for bunched audio bursts
        let _ = socket.set_send_buffer_size(1024 * 1024);

        let socket: UdpSocket = socket.into();

        // Get the actual bound address (in case port was 0)
        let actual_local = match socket.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "IPv4 only")),
        };

        Ok(UnicastSocket {
            socket,
            local_addr: actual_local,
            remote_addr,
        })
    }

    /// Send one datagram to the connected peer.
    ///
    /// Best effort: the caller on the frame path swallows the error, a
    /// dropped packet must never stall or abort live audio.
    pub fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data)
    }

    /// Get the local address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local_addr
    }

    /// Get the remote address this socket is connected to.
    pub fn remote_addr(&self) -> SocketAddrV4 {
        self.remote_addr
    }
}

impl std::fmt::Debug for UnicastSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnicastSocket")
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}
