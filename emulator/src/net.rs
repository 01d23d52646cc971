//! Camera link over the host's own network stack.
//!
//! The host is assumed to already be on the camera's network, so `join` only
//! reports the network name. Errors are folded into [`LinkError`] the same way
//! the co-processor driver folds its AT failures.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

use mission_core::link::{Endpoint, LinkError, RemoteLink};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_BUFFER: usize = 1_536;

pub struct SocketLink {
    ssid: String,
    datagram: Option<UdpSocket>,
    stream: Option<TcpStream>,
}

impl SocketLink {
    pub fn new(ssid: String) -> Self {
        Self {
            ssid,
            datagram: None,
            stream: None,
        }
    }
}

fn socket_addr(endpoint: Endpoint) -> SocketAddr {
    SocketAddr::from((endpoint.address.octets(), endpoint.port))
}

fn link_error(error: &io::Error) -> LinkError {
    match error.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => LinkError::Timeout,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::AddrNotAvailable
        | ErrorKind::PermissionDenied => LinkError::Refused,
        _ => LinkError::Io,
    }
}

impl RemoteLink for SocketLink {
    async fn probe(&mut self) -> bool {
        true
    }

    async fn join(&mut self) -> Result<(), LinkError> {
        println!("network: using host connection to `{}`", self.ssid);
        Ok(())
    }

    async fn open_datagram(&mut self, remote: Endpoint, local_port: u16) -> Result<(), LinkError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))
            .map_err(|err| link_error(&err))?;
        socket.set_broadcast(true).map_err(|err| link_error(&err))?;
        socket
            .connect(socket_addr(remote))
            .map_err(|err| link_error(&err))?;
        self.datagram = Some(socket);
        Ok(())
    }

    async fn send_datagram(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        let socket = self.datagram.as_ref().ok_or(LinkError::NotOpen)?;
        let sent = socket.send(payload).map_err(|err| link_error(&err))?;
        if sent == payload.len() {
            Ok(())
        } else {
            Err(LinkError::TooLarge)
        }
    }

    async fn drain_inbound(&mut self) -> usize {
        let Some(socket) = self.datagram.as_ref() else {
            return 0;
        };
        if socket.set_nonblocking(true).is_err() {
            return 0;
        }
        let mut buffer = [0u8; DRAIN_BUFFER];
        let mut drained = 0;
        while let Ok(len) = socket.recv(&mut buffer) {
            drained += len;
        }
        drained
    }

    async fn close_datagram(&mut self) {
        self.datagram = None;
    }

    async fn connect(&mut self, remote: Endpoint) -> Result<(), LinkError> {
        let stream = TcpStream::connect_timeout(&socket_addr(remote), CONNECT_TIMEOUT)
            .map_err(|err| link_error(&err))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn write_stream(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let stream = self.stream.as_mut().ok_or(LinkError::NotOpen)?;
        stream
            .write_all(bytes)
            .and_then(|()| stream.flush())
            .map_err(|err| link_error(&err))
    }

    async fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // The reply is never read; drop whatever already arrived.
            let _ = stream.set_nonblocking(true);
            let mut scratch = [0u8; 256];
            let _ = stream.read(&mut scratch);
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use mission_core::link::Ipv4;
    use std::net::TcpListener;

    fn loopback(port: u16) -> Endpoint {
        Endpoint::new(Ipv4::new(127, 0, 0, 1), port)
    }

    #[test]
    fn command_is_written_to_the_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let mut link = SocketLink::new(String::from("bench"));

        block_on(link.connect(loopback(port))).expect("connect");
        block_on(link.write_stream(b"GET / HTTP/1.1\r\n\r\n")).expect("write");
        block_on(link.close_stream());

        let (mut peer, _) = listener.accept().expect("accept");
        let mut received = Vec::new();
        peer.read_to_end(&mut received).expect("read request");
        assert_eq!(received, b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn datagram_reaches_the_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
        let port = peer.local_addr().expect("local addr").port();
        let mut link = SocketLink::new(String::from("bench"));

        block_on(link.open_datagram(loopback(port), 0)).expect("open");
        block_on(link.send_datagram(&[0xFF; 6])).expect("send");
        assert_eq!(block_on(link.drain_inbound()), 0);
        block_on(link.close_datagram());

        let mut buffer = [0u8; 16];
        let len = peer.recv(&mut buffer).expect("recv");
        assert_eq!(&buffer[..len], &[0xFF; 6]);
    }

    #[test]
    fn writes_without_a_connection_fail() {
        let mut link = SocketLink::new(String::from("bench"));
        assert_eq!(block_on(link.write_stream(b"x")), Err(LinkError::NotOpen));
        assert_eq!(block_on(link.send_datagram(b"x")), Err(LinkError::NotOpen));
    }
}
