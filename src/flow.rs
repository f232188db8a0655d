//! Outbound flow context: one buncher, one packetizer, one socket.
//!
//! A `UnicastFlow` is created on the administrative start call and lives
//! for exactly one tap attachment. The host's media callback hands it one
//! frame at a time; everything on that path is non-blocking, allocation
//! free, and swallows transmission failures — partial audio loss is
//! preferable to stalling a live call.

use std::fmt;
use std::io;
use std::net::SocketAddrV4;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::buncher::{BunchError, FrameBuncher};
use crate::config::{ConfigError, FlowConfig};
use crate::packetizer::{Framing, Packetizer};
use crate::rtp::socket::UnicastSocket;

/// Errors surfaced from flow lifecycle calls. Only start/stop report
/// user-visible failure; the per-frame path never does.
#[derive(Debug)]
pub enum FlowError {
    /// Invalid or missing start parameter
    Config(ConfigError),
    /// Address resolution, socket creation, bind, or connect failed
    Transport(io::Error),
    /// A flow is already active for this session
    AlreadyActive,
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowError::Config(e) => write!(f, "configuration error: {}", e),
            FlowError::Transport(e) => write!(f, "transport setup error: {}", e),
            FlowError::AlreadyActive => write!(f, "flow already active"),
        }
    }
}

impl std::error::Error for FlowError {}

impl From<ConfigError> for FlowError {
    fn from(e: ConfigError) -> Self {
        FlowError::Config(e)
    }
}

impl From<io::Error> for FlowError {
    fn from(e: io::Error) -> Self {
        FlowError::Transport(e)
    }
}

/// Flow statistics (lock-free atomic updates).
#[derive(Default)]
struct AtomicFlowStats {
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    send_errors: AtomicU64,
    overflows: AtomicU64,
}

/// Snapshot of flow statistics for external access.
#[derive(Debug, Clone, Default)]
pub struct FlowStats {
    /// Datagrams handed to the socket successfully
    pub packets_sent: u64,
    /// Total datagram bytes sent
    pub bytes_sent: u64,
    /// Send attempts that failed (never retried)
    pub send_errors: u64,
    /// Oversized frames truncated by the buncher
    pub overflows: u64,
}

/// One outbound unicast audio flow.
pub struct UnicastFlow {
    buncher: FrameBuncher,
    packetizer: Packetizer,
    socket: UnicastSocket,
    stats: AtomicFlowStats,
}

impl UnicastFlow {
    /// Create a flow from validated parameters: allocate the buffers and
    /// connect the socket.
    ///
    /// # Returns
    /// The ready flow, or `FlowError::Config` / `FlowError::Transport`.
    /// On failure no partial state is retained.
    pub fn new(config: &FlowConfig) -> Result<Self, FlowError> {
        config.validate()?;

        let socket = UnicastSocket::connect(config.local_addr(), config.remote_addr())?;

        let framing = match config.rtp_ssrc {
            Some(ssrc) => Framing::rtp_l16(ssrc),
            None => Framing::plain(),
        };

        Ok(Self {
            buncher: FrameBuncher::new(config.frames_per_packet),
            packetizer: Packetizer::new(framing),
            socket,
            stats: AtomicFlowStats::default(),
        })
    }

    /// Handle one frame from the media tap.
    ///
    /// Appends to the bunch buffer and flushes when a threshold is
    /// reached. An oversized frame is truncated and counted, never
    /// propagated: nothing on this path may abort the host session.
    pub fn on_frame(&mut self, frame: &[u8]) {
        let flush_now = match self.buncher.append(frame) {
            Ok(due) => due,
            Err(BunchError::Overflow { .. }) => {
                self.stats.overflows.fetch_add(1, Ordering::Relaxed);
                true
            }
        };

        if flush_now {
            self.flush();
        }
    }

    /// Stream-close signal from the tap: flush any retained partial
    /// buffer so no audio is silently dropped at teardown.
    pub fn close(&mut self) {
        if !self.buncher.is_empty() {
            self.flush();
        }
    }

    /// Packetize the accumulated span, send it best-effort, and reset the
    /// accumulation state. This is the single point where the buncher is
    /// cleared.
    fn flush(&mut self) {
        let result = {
            let datagram = self.packetizer.frame(self.buncher.filled());
            let len = datagram.len();
            self.socket.send(datagram).map(|_| len)
        };

        match result {
            Ok(len) => {
                self.stats.packets_sent.fetch_add(1, Ordering::Relaxed);
                self.stats.bytes_sent.fetch_add(len as u64, Ordering::Relaxed);
            }
            Err(_) => {
                // Deliberately not retried and not surfaced.
                self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.buncher.reset();
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> FlowStats {
        FlowStats {
            packets_sent: self.stats.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.stats.bytes_sent.load(Ordering::Relaxed),
            send_errors: self.stats.send_errors.load(Ordering::Relaxed),
            overflows: self.stats.overflows.load(Ordering::Relaxed),
        }
    }

    /// Local address the flow's socket is bound to.
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.socket.local_addr()
    }

    /// Remote address the flow sends to.
    pub fn remote_addr(&self) -> SocketAddrV4 {
        self.socket.remote_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtp::header::{RtpHeader, L16_PAYLOAD_TYPE, RTP_HEADER_LEN};
    use std::net::{Ipv4Addr, UdpSocket};
    use std::time::Duration;

    /// Receiver socket plus a config pointing a flow at it.
    fn loopback_pair(frames_per_packet: u32, rtp_ssrc: Option<u32>) -> (UdpSocket, FlowConfig) {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let remote_port = receiver.local_addr().unwrap().port();

        // Probe an unused local port; SO_REUSEADDR lets the flow rebind it.
        let local_port = {
            let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };

        let config = FlowConfig {
            local_ip: Ipv4Addr::LOCALHOST,
            local_port,
            remote_ip: Ipv4Addr::LOCALHOST,
            remote_port,
            frames_per_packet,
            rtp_ssrc,
        };

        (receiver, config)
    }

    fn recv_datagram(receiver: &UdpSocket) -> Vec<u8> {
        let mut buffer = [0u8; 2048];
        let (len, _) = receiver.recv_from(&mut buffer).unwrap();
        buffer[..len].to_vec()
    }

    #[test]
    fn test_plain_flow_bunches_frames() {
        let (receiver, config) = loopback_pair(2, None);
        let mut flow = UnicastFlow::new(&config).unwrap();

        flow.on_frame(&[1u8; 160]);
        flow.on_frame(&[2u8; 160]);

        let datagram = recv_datagram(&receiver);
        assert_eq!(datagram.len(), 320);
        assert_eq!(&datagram[..160], &[1u8; 160][..]);
        assert_eq!(&datagram[160..], &[2u8; 160][..]);

        let stats = flow.stats();
        assert_eq!(stats.packets_sent, 1);
        assert_eq!(stats.bytes_sent, 320);
        assert_eq!(stats.send_errors, 0);
    }

    #[test]
    fn test_forced_flush_on_close() {
        let (receiver, config) = loopback_pair(5, None);
        let mut flow = UnicastFlow::new(&config).unwrap();

        flow.on_frame(&[9u8; 100]);
        assert_eq!(flow.stats().packets_sent, 0);

        flow.close();
        assert_eq!(recv_datagram(&receiver), vec![9u8; 100]);
        assert_eq!(flow.stats().packets_sent, 1);

        // Nothing retained: closing again sends nothing.
        flow.close();
        assert_eq!(flow.stats().packets_sent, 1);
    }

    #[test]
    fn test_rtp_flow_frames_and_advances() {
        let (receiver, config) = loopback_pair(1, Some(0xABCD));
        let mut flow = UnicastFlow::new(&config).unwrap();

        flow.on_frame(&[0x01, 0x02, 0x03, 0x04]);
        let first = recv_datagram(&receiver);
        assert_eq!(first.len(), RTP_HEADER_LEN + 4);

        let header = RtpHeader::parse(&first).unwrap();
        assert_eq!(header.payload_type, L16_PAYLOAD_TYPE);
        assert_eq!(header.ssrc, 0xABCD);

        if cfg!(target_endian = "little") {
            assert_eq!(&first[RTP_HEADER_LEN..], &[0x02, 0x01, 0x04, 0x03]);
        }

        flow.on_frame(&[0x05, 0x06, 0x07, 0x08]);
        let second = recv_datagram(&receiver);
        let header2 = RtpHeader::parse(&second).unwrap();
        assert_eq!(header2.sequence, header.sequence.wrapping_add(1));
        assert_eq!(header2.timestamp, header.timestamp.wrapping_add(4));
    }

    #[test]
    fn test_invalid_config_creates_no_flow() {
        let config = FlowConfig::default(); // remote_port missing
        match UnicastFlow::new(&config) {
            Err(FlowError::Config(ConfigError::MissingRemotePort)) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
