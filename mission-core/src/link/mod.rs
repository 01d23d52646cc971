//! Wireless transport seam between the mission and the remote camera.
//!
//! The sequencer never touches sockets. It drives a [`RemoteLink`], which the
//! firmware implements over an ESP-AT co-processor (see [`at`]) and the emulator
//! implements over host sockets. Addresses, ports and the camera's hardware
//! identifier are plain value types so they can live in `const` configuration.

pub mod at;
pub mod modem;
pub mod request;
pub mod wake;

use core::fmt;

/// IPv4 address in network order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ipv4(pub [u8; 4]);

impl Ipv4 {
    #[must_use]
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self([a, b, c, d])
    }

    #[must_use]
    pub const fn octets(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// Address and port of a remote peer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Endpoint {
    pub address: Ipv4,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub const fn new(address: Ipv4, port: u16) -> Self {
        Self { address, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Six-byte hardware identifier of the camera's network interface.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HardwareId(pub [u8; 6]);

impl HardwareId {
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Result of one remote operation as seen by the sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkOutcome {
    /// The request left the controller. Delivery is not confirmed.
    Sent,
    /// The peer could not be reached; nothing was sent.
    Unreachable,
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => f.write_str("sent"),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// Errors surfaced by a [`RemoteLink`] implementation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkError {
    /// Network hardware did not answer.
    HardwareAbsent,
    /// Not associated with the configured network.
    NotJoined,
    /// The network refused the configured credentials.
    JoinRejected,
    /// The peer refused or could not be reached.
    Refused,
    /// The transport did not answer within its own response window.
    Timeout,
    /// A payload or command did not fit the transport's buffers.
    TooLarge,
    /// A channel was used without being opened.
    NotOpen,
    /// Lower-level I/O failure.
    Io,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareAbsent => f.write_str("network hardware absent"),
            Self::NotJoined => f.write_str("not joined to a network"),
            Self::JoinRejected => f.write_str("network join rejected"),
            Self::Refused => f.write_str("connection refused"),
            Self::Timeout => f.write_str("timed out"),
            Self::TooLarge => f.write_str("payload too large"),
            Self::NotOpen => f.write_str("channel not open"),
            Self::Io => f.write_str("i/o error"),
        }
    }
}

/// Transport used by the remote device controller.
///
/// One datagram channel and one stream may be open at a time; callers always
/// close what they open before opening the next.
pub trait RemoteLink {
    /// Returns `true` when the network hardware responds.
    async fn probe(&mut self) -> bool;

    /// Joins the configured network.
    async fn join(&mut self) -> Result<(), LinkError>;

    /// Opens a connectionless channel to `remote`, bound to `local_port`.
    async fn open_datagram(&mut self, remote: Endpoint, local_port: u16) -> Result<(), LinkError>;

    /// Sends one datagram on the open channel.
    async fn send_datagram(&mut self, payload: &[u8]) -> Result<(), LinkError>;

    /// Discards inbound datagrams, returning how many bytes were dropped.
    async fn drain_inbound(&mut self) -> usize;

    /// Closes the datagram channel. Closing an unopened channel is a no-op.
    async fn close_datagram(&mut self);

    /// Opens a stream connection to `remote`.
    async fn connect(&mut self, remote: Endpoint) -> Result<(), LinkError>;

    /// Writes `bytes` to the open stream.
    async fn write_stream(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// Closes the stream. Closing an unopened stream is a no-op.
    async fn close_stream(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn identities_render_in_conventional_notation() {
        let mut text = heapless::String::<64>::new();
        write!(
            text,
            "{} {}",
            Endpoint::new(Ipv4::new(10, 5, 5, 9), 80),
            HardwareId::new([0x04, 0x41, 0x69, 0x5a, 0x3c, 0x01])
        )
        .unwrap();
        assert_eq!(text.as_str(), "10.5.5.9:80 04:41:69:5A:3C:01");
    }
}
