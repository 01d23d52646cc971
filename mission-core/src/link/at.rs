#![allow(clippy::module_name_repetitions)]

//! ESP-AT command encoding and response-line parsing.
//!
//! The rig's Wi-Fi radio is an ESP co-processor running the stock AT firmware
//! on a UART. Commands are single lines terminated by CRLF; responses arrive as
//! CRLF-terminated lines, except the `>` data prompt, which is not terminated.
//! Only the single-connection subset the mission needs is modelled here. The
//! exchange logic that drives these lines lives in [`super::modem`].

use core::fmt::{self, Write};

use heapless::String;
use winnow::ascii::dec_uint;
use winnow::combinator::{alt, delimited, eof, preceded, terminated};
use winnow::prelude::*;
use winnow::token::rest;

use super::Endpoint;

/// Longest command line this controller emits, CRLF included.
pub const MAX_COMMAND_LEN: usize = 160;

pub type CommandLine = String<MAX_COMMAND_LEN>;

/// Commands issued to the co-processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtCommand<'a> {
    /// `AT`: liveness probe.
    Probe,
    /// `ATE0`: stop echoing commands back.
    EchoOff,
    /// `AT+CWMODE=1`: station mode.
    StationMode,
    /// `AT+CWJAP="ssid","password"`.
    Join { ssid: &'a str, password: &'a str },
    /// `AT+CIPMUX=0`: one connection at a time.
    SingleConnection,
    /// `AT+CIPSTART="UDP",...` with a fixed local port.
    OpenUdp { remote: Endpoint, local_port: u16 },
    /// `AT+CIPSTART="TCP",...`.
    OpenTcp { remote: Endpoint },
    /// `AT+CIPSEND=<len>`: announces a payload; the radio answers with `>`.
    Send { len: usize },
    /// `AT+CIPCLOSE`.
    Close,
}

impl AtCommand<'_> {
    /// Renders the command line including the trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`AtError::CommandTooLong`] when the line does not fit
    /// [`MAX_COMMAND_LEN`].
    pub fn encode(&self) -> Result<CommandLine, AtError> {
        let mut line = CommandLine::new();
        self.write_into(&mut line)
            .map_err(|_| AtError::CommandTooLong)?;
        Ok(line)
    }

    fn write_into(&self, out: &mut CommandLine) -> fmt::Result {
        match self {
            Self::Probe => out.write_str("AT")?,
            Self::EchoOff => out.write_str("ATE0")?,
            Self::StationMode => out.write_str("AT+CWMODE=1")?,
            Self::Join { ssid, password } => {
                out.write_str("AT+CWJAP=")?;
                write_quoted(out, ssid)?;
                out.write_char(',')?;
                write_quoted(out, password)?;
            }
            Self::SingleConnection => out.write_str("AT+CIPMUX=0")?,
            Self::OpenUdp { remote, local_port } => write!(
                out,
                "AT+CIPSTART=\"UDP\",\"{}\",{},{local_port},0",
                remote.address, remote.port
            )?,
            Self::OpenTcp { remote } => write!(
                out,
                "AT+CIPSTART=\"TCP\",\"{}\",{}",
                remote.address, remote.port
            )?,
            Self::Send { len } => write!(out, "AT+CIPSEND={len}")?,
            Self::Close => out.write_str("AT+CIPCLOSE")?,
        }
        out.write_str("\r\n")
    }
}

// The AT firmware requires `"`, `,` and `\` inside quoted arguments to be
// escaped with a backslash.
fn write_quoted(out: &mut CommandLine, value: &str) -> fmt::Result {
    out.write_char('"')?;
    for ch in value.chars() {
        if matches!(ch, '"' | ',' | '\\') {
            out.write_char('\\')?;
        }
        out.write_char(ch)?;
    }
    out.write_char('"')
}

/// One classified response line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtResponse {
    Ok,
    Error,
    Fail,
    SendOk,
    SendFail,
    /// `>`: the radio is ready for payload bytes.
    Prompt,
    Ready,
    Busy,
    Connect,
    Closed,
    AlreadyConnected,
    WifiConnected,
    WifiGotIp,
    WifiDisconnect,
    /// `+CWJAP:<code>`: join failure reason preceding `FAIL`.
    JoinFailed(u8),
    /// `+IPD,<len>:`: inbound payload of `len` bytes follows.
    Inbound(usize),
    /// Anything else (echo, `Recv N bytes`, banners).
    Other,
}

impl AtResponse {
    /// Parses one response line with its line terminator removed.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        response
            .parse(line.trim_end_matches(['\r', '\n']))
            .unwrap_or(Self::Other)
    }
}

fn response(input: &mut &str) -> ModalResult<AtResponse> {
    alt((
        inbound,
        join_failure,
        terminated(status, eof),
        preceded("busy", rest).value(AtResponse::Busy),
        terminated(">", rest).value(AtResponse::Prompt),
    ))
    .parse_next(input)
}

fn status(input: &mut &str) -> ModalResult<AtResponse> {
    alt((
        "OK".value(AtResponse::Ok),
        "ERROR".value(AtResponse::Error),
        "FAIL".value(AtResponse::Fail),
        "SEND OK".value(AtResponse::SendOk),
        "SEND FAIL".value(AtResponse::SendFail),
        "ready".value(AtResponse::Ready),
        "CONNECT".value(AtResponse::Connect),
        "CLOSED".value(AtResponse::Closed),
        "ALREADY CONNECTED".value(AtResponse::AlreadyConnected),
        "WIFI CONNECTED".value(AtResponse::WifiConnected),
        "WIFI GOT IP".value(AtResponse::WifiGotIp),
        "WIFI DISCONNECT".value(AtResponse::WifiDisconnect),
    ))
    .parse_next(input)
}

fn inbound(input: &mut &str) -> ModalResult<AtResponse> {
    terminated(delimited("+IPD,", dec_uint, ":"), rest)
        .map(AtResponse::Inbound)
        .parse_next(input)
}

fn join_failure(input: &mut &str) -> ModalResult<AtResponse> {
    terminated(preceded("+CWJAP:", dec_uint), eof)
        .map(AtResponse::JoinFailed)
        .parse_next(input)
}

/// Splits an `+IPD,<len>:` header off the front of `bytes`.
///
/// Returns the payload length and the header length in bytes, or `None` when
/// `bytes` does not start with a complete header.
#[must_use]
pub fn inbound_header(bytes: &[u8]) -> Option<(usize, usize)> {
    let colon = bytes.iter().position(|&byte| byte == b':')?;
    let header = core::str::from_utf8(&bytes[..=colon]).ok()?;
    match AtResponse::parse(header) {
        AtResponse::Inbound(len) => Some((len, colon + 1)),
        _ => None,
    }
}

/// Failures of a single AT exchange.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtError {
    /// No final response before the exchange deadline.
    Timeout,
    /// The radio answered `ERROR` or `FAIL`.
    Rejected,
    /// The radio answered `SEND FAIL`.
    SendFailed,
    /// Join failed with the radio's reason code (1 timeout, 2 wrong password,
    /// 3 no access point, 4 connection failed).
    JoinFailed(u8),
    /// A command line did not fit the encode buffer.
    CommandTooLong,
    /// The UART reported an error.
    Transport,
}

impl fmt::Display for AtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("no response from radio"),
            Self::Rejected => f.write_str("radio rejected command"),
            Self::SendFailed => f.write_str("radio failed to send"),
            Self::JoinFailed(code) => write!(f, "join failed (reason {code})"),
            Self::CommandTooLong => f.write_str("command line too long"),
            Self::Transport => f.write_str("uart error"),
        }
    }
}
