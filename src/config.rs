//! Flow configuration and parameter parsing.
//!
//! The host's administrative surface hands over `key=value` tokens:
//!
//! - `remote_ip=` / `remote_port=`: destination of the datagrams
//! - `local_ip=` / `local_port=`: local bind address
//! - `frames_per_packet=`: bunching threshold (1-10)
//! - `rtp_ssrc=`: presence selects RTP/L16 framing; absence selects plain
//!
//! `local_port` and `remote_port` are independent fields.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;

use crate::buncher::MAX_FRAMES_PER_PACKET;

/// Configuration error: invalid or missing start parameter. Surfaced
/// synchronously from flow creation; no flow state is retained.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Token without a `key=value` shape, or with an empty value
    MalformedParameter(String),
    /// Key this surface does not recognize
    UnknownParameter(String),
    /// Value failed to parse for the named key
    InvalidValue { key: &'static str, value: String },
    /// `remote_port` missing or zero
    MissingRemotePort,
    /// `local_port` zero
    InvalidLocalPort,
    /// `frames_per_packet` outside 1..=MAX_FRAMES_PER_PACKET
    FramesPerPacketOutOfRange(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MalformedParameter(token) => {
                write!(f, "malformed parameter: {}", token)
            }
            ConfigError::UnknownParameter(key) => write!(f, "unknown parameter: {}", key),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: {}", key, value)
            }
            ConfigError::MissingRemotePort => write!(f, "remote_port is required"),
            ConfigError::InvalidLocalPort => write!(f, "local_port must be non-zero"),
            ConfigError::FramesPerPacketOutOfRange(n) => write!(
                f,
                "frames_per_packet {} outside 1..={}",
                n, MAX_FRAMES_PER_PACKET
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parameters for one outbound flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    /// Local bind address
    pub local_ip: Ipv4Addr,
    /// Local bind port
    pub local_port: u16,
    /// Destination address
    pub remote_ip: Ipv4Addr,
    /// Destination port (required)
    pub remote_port: u16,
    /// Bunching threshold (1..=MAX_FRAMES_PER_PACKET)
    pub frames_per_packet: u32,
    /// RTP synchronization source; `Some` selects RTP/L16 framing
    pub rtp_ssrc: Option<u32>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            local_ip: Ipv4Addr::LOCALHOST,
            local_port: 5876,
            remote_ip: Ipv4Addr::LOCALHOST,
            remote_port: 0,
            frames_per_packet: MAX_FRAMES_PER_PACKET,
            rtp_ssrc: None,
        }
    }
}

impl FlowConfig {
    /// Parse `key=value` tokens from the administrative surface into a
    /// config, starting from the defaults.
    ///
    /// # Returns
    /// A validated configuration, or the first `ConfigError` encountered.
    pub fn parse_flow_args(args: &[&str]) -> Result<Self, ConfigError> {
        let mut config = FlowConfig::default();

        for token in args {
            let (key, value) = match token.split_once('=') {
                Some((key, value)) if !value.is_empty() => (key, value),
                _ => return Err(ConfigError::MalformedParameter(token.to_string())),
            };

            match key {
                "remote_ip" => {
                    config.remote_ip = Ipv4Addr::from_str(value).map_err(|_| {
                        ConfigError::InvalidValue {
                            key: "remote_ip",
                            value: value.to_string(),
                        }
                    })?;
                }
                "remote_port" => {
                    config.remote_port =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            key: "remote_port",
                            value: value.to_string(),
                        })?;
                }
                "local_ip" => {
                    config.local_ip = Ipv4Addr::from_str(value).map_err(|_| {
                        ConfigError::InvalidValue {
                            key: "local_ip",
                            value: value.to_string(),
                        }
                    })?;
                }
                "local_port" => {
                    config.local_port =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            key: "local_port",
                            value: value.to_string(),
                        })?;
                }
                "frames_per_packet" => {
                    config.frames_per_packet =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            key: "frames_per_packet",
                            value: value.to_string(),
                        })?;
                }
                "rtp_ssrc" => {
                    config.rtp_ssrc =
                        Some(value.parse().map_err(|_| ConfigError::InvalidValue {
                            key: "rtp_ssrc",
                            value: value.to_string(),
                        })?);
                }
                _ => return Err(ConfigError::UnknownParameter(key.to_string())),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a flow requires before any socket is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_port == 0 {
            return Err(ConfigError::MissingRemotePort);
        }
        if self.local_port == 0 {
            return Err(ConfigError::InvalidLocalPort);
        }
        if self.frames_per_packet < 1 || self.frames_per_packet > MAX_FRAMES_PER_PACKET {
            return Err(ConfigError::FramesPerPacketOutOfRange(self.frames_per_packet));
        }
        Ok(())
    }

    /// Local bind address as a socket address.
    pub fn local_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.local_ip, self.local_port)
    }

    /// Destination as a socket address.
    pub fn remote_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.remote_ip, self.remote_port)
    }
}
