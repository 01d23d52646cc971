//! [`RemoteLink`] over an ESP-AT radio attached to a byte stream.
//!
//! Each operation is a strict request/response exchange: write one command
//! line, then read lines until the expected final response, a failure line, or
//! the exchange deadline. The deadline is the only timeout on the link; when it
//! expires the operation fails and the caller reports the peer unreachable.

use core::time::Duration;

use embassy_futures::select::{Either, select};
use embedded_io_async::{Read, Write};
use heapless::Vec;

use super::at::{AtCommand, AtError, AtResponse, inbound_header};
use super::{Endpoint, LinkError, RemoteLink};
use crate::clock::{MissionClock, MissionInstant};

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(20);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);
/// Inbound traffic is considered drained after this much silence.
pub const DRAIN_QUIET: Duration = Duration::from_millis(50);
/// A peer that never goes quiet is abandoned after this long.
pub const DRAIN_LIMIT: Duration = Duration::from_secs(1);
/// Largest payload accepted by one `AT+CIPSEND`.
pub const MAX_SEND_CHUNK: usize = 2048;

const PROBE_ATTEMPTS: u8 = 3;
const RX_CAPACITY: usize = 256;
const READ_CHUNK: usize = 64;

/// Network credentials handed to the radio on join.
#[derive(Copy, Clone, Debug)]
pub struct Credentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

impl From<AtError> for LinkError {
    fn from(error: AtError) -> Self {
        match error {
            AtError::Timeout => Self::Timeout,
            AtError::Rejected => Self::Refused,
            AtError::JoinFailed(_) => Self::JoinRejected,
            AtError::CommandTooLong => Self::TooLarge,
            AtError::SendFailed | AtError::Transport => Self::Io,
        }
    }
}

/// ESP-AT radio driver.
pub struct AtModem<'a, U, C> {
    uart: U,
    clock: C,
    credentials: Credentials<'a>,
    rx: Vec<u8, RX_CAPACITY>,
    discard: usize,
    joined: bool,
    datagram_open: bool,
    stream_open: bool,
}

impl<'a, U, C> AtModem<'a, U, C>
where
    U: Read + Write,
    C: MissionClock,
{
    pub fn new(uart: U, clock: C, credentials: Credentials<'a>) -> Self {
        Self {
            uart,
            clock,
            credentials,
            rx: Vec::new(),
            discard: 0,
            joined: false,
            datagram_open: false,
            stream_open: false,
        }
    }

    #[must_use]
    pub const fn is_joined(&self) -> bool {
        self.joined
    }

    async fn exchange(
        &mut self,
        command: &AtCommand<'_>,
        expect: AtResponse,
        timeout: Duration,
    ) -> Result<(), AtError> {
        let line = command.encode()?;
        self.uart
            .write_all(line.as_bytes())
            .await
            .map_err(|_| AtError::Transport)?;
        self.await_response(expect, timeout).await
    }

    async fn await_response(
        &mut self,
        expect: AtResponse,
        timeout: Duration,
    ) -> Result<(), AtError> {
        let deadline = self.clock.now() + timeout;
        let mut join_code = None;
        loop {
            match self.next_response(deadline).await? {
                response if response == expect => return Ok(()),
                AtResponse::JoinFailed(code) => join_code = Some(code),
                AtResponse::Error | AtResponse::Fail => {
                    return Err(join_code.map_or(AtError::Rejected, AtError::JoinFailed));
                }
                AtResponse::SendFail => return Err(AtError::SendFailed),
                _ => {}
            }
        }
    }

    async fn send(&mut self, payload: &[u8]) -> Result<(), AtError> {
        self.exchange(
            &AtCommand::Send { len: payload.len() },
            AtResponse::Prompt,
            COMMAND_TIMEOUT,
        )
        .await?;
        self.uart
            .write_all(payload)
            .await
            .map_err(|_| AtError::Transport)?;
        self.await_response(AtResponse::SendOk, SEND_TIMEOUT).await
    }

    async fn next_response(&mut self, deadline: MissionInstant) -> Result<AtResponse, AtError> {
        loop {
            if let Some(response) = self.take_response() {
                return Ok(response);
            }
            self.fill(deadline).await?;
        }
    }

    async fn fill(&mut self, deadline: MissionInstant) -> Result<(), AtError> {
        if self.rx.is_full() {
            // Unterminated garbage; nothing useful can be recovered from it.
            self.rx.clear();
        }
        let mut chunk = [0u8; READ_CHUNK];
        let room = (RX_CAPACITY - self.rx.len()).min(READ_CHUNK);
        match select(
            self.uart.read(&mut chunk[..room]),
            self.clock.sleep_until(deadline),
        )
        .await
        {
            Either::First(Ok(0) | Err(_)) => Err(AtError::Transport),
            Either::First(Ok(count)) => self
                .rx
                .extend_from_slice(&chunk[..count])
                .map_err(|_| AtError::Transport),
            Either::Second(()) => Err(AtError::Timeout),
        }
    }

    fn take_response(&mut self) -> Option<AtResponse> {
        if self.discard > 0 {
            let count = self.discard.min(self.rx.len());
            self.consume(count);
            self.discard -= count;
            if self.discard > 0 {
                return None;
            }
        }

        let blank = self
            .rx
            .iter()
            .take_while(|&&byte| matches!(byte, b'\r' | b'\n'))
            .count();
        self.consume(blank);

        match self.rx.first() {
            None => return None,
            Some(b'>') => {
                let len = if self.rx.get(1) == Some(&b' ') { 2 } else { 1 };
                self.consume(len);
                return Some(AtResponse::Prompt);
            }
            Some(_) => {}
        }

        if self.rx.starts_with(b"+IPD,") {
            let (len, header) = inbound_header(&self.rx)?;
            self.consume(header);
            self.discard = len;
            return Some(AtResponse::Inbound(len));
        }

        let end = self.rx.iter().position(|&byte| byte == b'\n')?;
        let response =
            core::str::from_utf8(&self.rx[..end]).map_or(AtResponse::Other, AtResponse::parse);
        self.consume(end + 1);
        Some(response)
    }

    fn consume(&mut self, count: usize) {
        let remaining = self.rx.len() - count;
        self.rx.copy_within(count.., 0);
        self.rx.truncate(remaining);
    }

    async fn close_channel(&mut self) {
        if self
            .exchange(&AtCommand::Close, AtResponse::Ok, COMMAND_TIMEOUT)
            .await
            .is_err()
        {
            self.rx.clear();
            self.discard = 0;
        }
    }
}

impl<U, C> RemoteLink for AtModem<'_, U, C>
where
    U: Read + Write,
    C: MissionClock,
{
    async fn probe(&mut self) -> bool {
        for _ in 0..PROBE_ATTEMPTS {
            if self
                .exchange(&AtCommand::Probe, AtResponse::Ok, COMMAND_TIMEOUT)
                .await
                .is_ok()
            {
                return self
                    .exchange(&AtCommand::EchoOff, AtResponse::Ok, COMMAND_TIMEOUT)
                    .await
                    .is_ok();
            }
        }
        false
    }

    async fn join(&mut self) -> Result<(), LinkError> {
        let Credentials { ssid, password } = self.credentials;
        self.exchange(&AtCommand::StationMode, AtResponse::Ok, COMMAND_TIMEOUT)
            .await?;
        self.exchange(
            &AtCommand::Join { ssid, password },
            AtResponse::Ok,
            JOIN_TIMEOUT,
        )
        .await?;
        self.exchange(&AtCommand::SingleConnection, AtResponse::Ok, COMMAND_TIMEOUT)
            .await?;
        self.joined = true;
        Ok(())
    }

    async fn open_datagram(&mut self, remote: Endpoint, local_port: u16) -> Result<(), LinkError> {
        if !self.joined {
            return Err(LinkError::NotJoined);
        }
        self.exchange(
            &AtCommand::OpenUdp { remote, local_port },
            AtResponse::Ok,
            CONNECT_TIMEOUT,
        )
        .await?;
        self.datagram_open = true;
        Ok(())
    }

    async fn send_datagram(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if !self.datagram_open {
            return Err(LinkError::NotOpen);
        }
        if payload.len() > MAX_SEND_CHUNK {
            return Err(LinkError::TooLarge);
        }
        self.send(payload).await?;
        Ok(())
    }

    async fn drain_inbound(&mut self) -> usize {
        let limit = self.clock.now() + DRAIN_LIMIT;
        let mut dropped = 0;
        loop {
            while let Some(response) = self.take_response() {
                if let AtResponse::Inbound(len) = response {
                    dropped += len;
                }
            }
            let now = self.clock.now();
            if now >= limit {
                return dropped;
            }
            let deadline = (now + DRAIN_QUIET).min(limit);
            if self.fill(deadline).await.is_err() {
                return dropped;
            }
        }
    }

    async fn close_datagram(&mut self) {
        if self.datagram_open {
            self.datagram_open = false;
            self.close_channel().await;
        }
    }

    async fn connect(&mut self, remote: Endpoint) -> Result<(), LinkError> {
        if !self.joined {
            return Err(LinkError::NotJoined);
        }
        self.exchange(&AtCommand::OpenTcp { remote }, AtResponse::Ok, CONNECT_TIMEOUT)
            .await?;
        self.stream_open = true;
        Ok(())
    }

    async fn write_stream(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if !self.stream_open {
            return Err(LinkError::NotOpen);
        }
        for chunk in bytes.chunks(MAX_SEND_CHUNK) {
            self.send(chunk).await?;
        }
        Ok(())
    }

    async fn close_stream(&mut self) {
        if self.stream_open {
            self.stream_open = false;
            self.close_channel().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::link::Ipv4;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use heapless::Deque;

    const CREDENTIALS: Credentials<'static> = Credentials {
        ssid: "rig",
        password: "secret",
    };

    /// UART that answers every write with the next scripted reply and then
    /// stays silent.
    #[derive(Default)]
    struct ScriptedUart {
        replies: Deque<&'static [u8], 16>,
        pending: &'static [u8],
        written: Vec<u8, 2048>,
    }

    impl ScriptedUart {
        fn with_replies(replies: &[&'static [u8]]) -> Self {
            let mut uart = Self::default();
            for &reply in replies {
                uart.replies.push_back(reply).expect("script capacity");
            }
            uart
        }

        fn written(&self) -> &[u8] {
            &self.written
        }
    }

    impl embedded_io_async::ErrorType for ScriptedUart {
        type Error = Infallible;
    }

    impl Read for ScriptedUart {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
            if self.pending.is_empty() {
                core::future::pending::<()>().await;
            }
            let count = buf.len().min(self.pending.len());
            buf[..count].copy_from_slice(&self.pending[..count]);
            self.pending = &self.pending[count..];
            Ok(count)
        }
    }

    impl Write for ScriptedUart {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
            self.written.extend_from_slice(buf).expect("write capacity");
            if let Some(reply) = self.replies.pop_front() {
                self.pending = reply;
            }
            Ok(buf.len())
        }
    }

    const JOIN_SCRIPT: [&[u8]; 5] = [
        b"AT\r\r\n\r\nOK\r\n",
        b"ATE0\r\r\n\r\nOK\r\n",
        b"\r\nOK\r\n",
        b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n",
        b"\r\nOK\r\n",
    ];

    fn joined_modem(extra: &[&'static [u8]]) -> AtModem<'static, ScriptedUart, FakeClock> {
        let mut uart = ScriptedUart::with_replies(&JOIN_SCRIPT);
        for &reply in extra {
            uart.replies.push_back(reply).expect("script capacity");
        }
        let mut modem = AtModem::new(uart, FakeClock::new(), CREDENTIALS);
        assert!(block_on(modem.probe()));
        block_on(modem.join()).expect("join succeeds");
        modem
    }

    #[test]
    fn probe_and_join_configure_station_mode() {
        let modem = joined_modem(&[]);
        assert!(modem.is_joined());
        assert_eq!(
            modem.uart.written(),
            b"AT\r\nATE0\r\nAT+CWMODE=1\r\nAT+CWJAP=\"rig\",\"secret\"\r\nAT+CIPMUX=0\r\n"
        );
    }

    #[test]
    fn join_failure_maps_to_rejection() {
        let uart = ScriptedUart::with_replies(&[b"\r\nOK\r\n", b"+CWJAP:2\r\n\r\nFAIL\r\n"]);
        let mut modem = AtModem::new(uart, FakeClock::new(), CREDENTIALS);
        assert_eq!(block_on(modem.join()), Err(LinkError::JoinRejected));
        assert!(!modem.is_joined());
    }

    #[test]
    fn silent_radio_is_reported_absent() {
        let mut modem = AtModem::new(ScriptedUart::default(), FakeClock::new(), CREDENTIALS);
        assert!(!block_on(modem.probe()));
        assert_eq!(modem.uart.written(), b"AT\r\nAT\r\nAT\r\n");
    }

    #[test]
    fn datagram_round_trip_drains_inbound_traffic() {
        let mut modem = joined_modem(&[
            b"CONNECT\r\n\r\nOK\r\n",
            b"\r\nOK\r\n> ",
            b"\r\nRecv 102 bytes\r\n\r\nSEND OK\r\n+IPD,4:abcd",
            b"CLOSED\r\n\r\nOK\r\n",
        ]);
        let broadcast = Endpoint::new(Ipv4::new(10, 5, 5, 255), 9);

        block_on(async {
            modem.open_datagram(broadcast, 9).await.expect("open");
            modem.send_datagram(&[0xFF; 102]).await.expect("send");
            assert_eq!(modem.drain_inbound().await, 4);
            modem.close_datagram().await;
        });

        let written = modem.uart.written();
        assert!(written.windows(102).any(|window| window == [0xFF; 102]));
        assert!(written.ends_with(b"AT+CIPCLOSE\r\n"));
        assert!(!modem.datagram_open);
    }

    #[test]
    fn refused_connection_leaves_no_stream_to_close() {
        let mut modem = joined_modem(&[b"\r\nERROR\r\nCLOSED\r\n"]);
        let camera = Endpoint::new(Ipv4::new(10, 5, 5, 9), 80);

        let written_before = block_on(async {
            assert_eq!(modem.connect(camera).await, Err(LinkError::Refused));
            let before = modem.uart.written.len();
            modem.close_stream().await;
            before
        });
        assert_eq!(modem.uart.written.len(), written_before);
    }

    #[test]
    fn stream_write_announces_payload_length() {
        let mut modem = joined_modem(&[
            b"CONNECT\r\n\r\nOK\r\n",
            b"\r\nOK\r\n> ",
            b"\r\nRecv 5 bytes\r\n\r\nSEND OK\r\n",
            b"CLOSED\r\n\r\nOK\r\n",
        ]);
        let camera = Endpoint::new(Ipv4::new(10, 5, 5, 9), 80);

        block_on(async {
            modem.connect(camera).await.expect("connect");
            modem.write_stream(b"hello").await.expect("write");
            modem.close_stream().await;
        });

        let tail = b"AT+CIPSTART=\"TCP\",\"10.5.5.9\",80\r\nAT+CIPSEND=5\r\nhelloAT+CIPCLOSE\r\n";
        assert!(modem.uart.written().ends_with(tail));
    }

    /// Camera that never stops sending datagrams.
    struct FloodingUart {
        offset: usize,
    }

    const FLOOD_FRAME: &[u8] = b"+IPD,4:abcd\r\n";

    impl embedded_io_async::ErrorType for FloodingUart {
        type Error = Infallible;
    }

    impl Read for FloodingUart {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
            for byte in buf.iter_mut() {
                *byte = FLOOD_FRAME[self.offset];
                self.offset = (self.offset + 1) % FLOOD_FRAME.len();
            }
            Ok(buf.len())
        }
    }

    impl Write for FloodingUart {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
            Ok(buf.len())
        }
    }

    /// Clock that moves a fixed step every time it is read, standing in for
    /// the time each UART read takes.
    struct SteppingClock {
        now: Cell<MissionInstant>,
        step: Duration,
    }

    impl MissionClock for SteppingClock {
        fn now(&self) -> MissionInstant {
            let now = self.now.get();
            self.now.set(now + self.step);
            now
        }

        async fn sleep_until(&mut self, deadline: MissionInstant) {
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
        }
    }

    #[test]
    fn endless_inbound_traffic_stops_draining_at_the_limit() {
        let clock = SteppingClock {
            now: Cell::new(MissionInstant::BOOT),
            step: Duration::from_millis(1),
        };
        let mut modem = AtModem::new(FloodingUart { offset: 0 }, clock, CREDENTIALS);

        let dropped = block_on(modem.drain_inbound());

        assert!(dropped > 0);
        assert_eq!(dropped % 4, 0);
        let elapsed = modem.clock.now.get().saturating_duration_since(MissionInstant::BOOT);
        assert!(elapsed >= DRAIN_LIMIT);
        assert!(elapsed < DRAIN_LIMIT + Duration::from_millis(10));
    }

    #[test]
    fn unopened_channels_refuse_traffic() {
        let mut modem = AtModem::new(ScriptedUart::default(), FakeClock::new(), CREDENTIALS);
        assert_eq!(
            block_on(modem.open_datagram(Endpoint::new(Ipv4::new(10, 5, 5, 255), 9), 9)),
            Err(LinkError::NotJoined)
        );
        assert_eq!(block_on(modem.write_stream(b"x")), Err(LinkError::NotOpen));
    }
}
