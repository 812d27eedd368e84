//! Line-by-line response parsers, one per kind of BG96 dialogue.
//!
//! Each parser sees the lines the modem sends back after a command, numbered
//! from 1, and decides whether the dialogue goes on, is complete or has
//! failed. A timeout is delivered as [`LineEvent::Timeout`] and always fails
//! the command.
use core::fmt;

use super::types::{Action, LineEvent, Output};

const OK: &[u8] = b"OK";
const ERROR: &[u8] = b"ERROR";
const PROMPT: &[u8] = b">";
const SEND_OK: &[u8] = b"SEND OK";
const QIURC: &[u8] = b"+QIURC:";
const COPS: &[u8] = b"+COPS:";
const QIACT: &[u8] = b"+QIACT:";
const QIRD: &[u8] = b"+QIRD:";
const QIOPEN: &[u8] = b"+QIOPEN:";
const QISTATE: &[u8] = b"+QISTATE:";
const QGPSLOC: &[u8] = b"+QGPSLOC:";

/// User supplied parser for commands not covered by [`ResponseParser`].
pub type LineHandler = fn(LineEvent<'_>, &mut Output) -> Action;

#[derive(Clone, Copy)]
pub enum ResponseParser {
    /// Single `OK` or `ERROR` line
    OkError,
    /// `>` prompt of `AT+QISEND`
    SendPrompt,
    /// Payload echo, `SEND OK` and the peer's `+QIURC: "recv"` answer
    DataTransfer,
    /// `+COPS:` operator query
    Operator,
    /// `+QIACT:` context query, the IP address is captured
    IpAddress,
    /// First line captured verbatim, then `OK` (IMEI and similar)
    Capture,
    /// `+QIRD:` followed by an optional payload line
    ReceiveData { data_available: bool },
    /// `OK` followed by the asynchronous `+QIOPEN:` result
    SocketOpen,
    /// `+QISTATE:` connection state query
    ConnectionState,
    /// `+QGPSLOC:` position fix
    GnssLocation,
    Custom(LineHandler),
}

impl ResponseParser {
    pub const fn receive_data() -> Self {
        Self::ReceiveData {
            data_available: false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OkError => "OkError",
            Self::SendPrompt => "SendPrompt",
            Self::DataTransfer => "DataTransfer",
            Self::Operator => "Operator",
            Self::IpAddress => "IpAddress",
            Self::Capture => "Capture",
            Self::ReceiveData { .. } => "ReceiveData",
            Self::SocketOpen => "SocketOpen",
            Self::ConnectionState => "ConnectionState",
            Self::GnssLocation => "GnssLocation",
            Self::Custom(_) => "Custom",
        }
    }

    /// Forget whatever was learned from a previous dialogue.
    pub fn reset(&mut self) {
        if let Self::ReceiveData { data_available } = self {
            *data_available = false;
        }
    }

    pub fn on_event(&mut self, event: LineEvent<'_>, output: &mut Output) -> Action {
        let (line, number) = match event {
            LineEvent::Line { data, number } => (data, number),
            LineEvent::Timeout => {
                // Custom handlers observe the timeout but cannot overrule it
                if let Self::Custom(handler) = self {
                    handler(event, output);
                }
                return Action::timeout();
            }
        };

        match self {
            Self::OkError => match number {
                1 if contains(line, OK) => Action::Advance,
                1 if contains(line, ERROR) => {
                    output.report_data(line);
                    Action::fail()
                }
                _ => Action::fail(),
            },
            Self::SendPrompt => match number {
                1 => require(line, PROMPT, Action::Advance),
                _ => Action::fail(),
            },
            Self::DataTransfer => match number {
                1 => require(line, b" ", Action::Continue),
                2 => require(line, SEND_OK, Action::Continue),
                3 => require(line, QIURC, Action::Continue),
                4 if contains(line, b"[") => {
                    output.report_data(line);
                    Action::fail()
                }
                4 => Action::Continue,
                5 if contains(line, QIURC) => Action::fail(),
                5 => Action::Advance,
                _ => Action::fail(),
            },
            Self::Operator => capture_then_ok(line, number, COPS, output),
            Self::ConnectionState => capture_then_ok(line, number, QISTATE, output),
            Self::GnssLocation => capture_then_ok(line, number, QGPSLOC, output),
            Self::IpAddress => match number {
                1 if contains(line, QIACT) => {
                    if let Some(ip) = extract_ip(line) {
                        output.report_data(ip);
                    }
                    Action::Continue
                }
                2 => require(line, OK, Action::Advance),
                _ => Action::fail(),
            },
            Self::Capture => match number {
                1 => {
                    output.report_data(line);
                    Action::Continue
                }
                2 => require(line, OK, Action::Advance),
                _ => Action::fail(),
            },
            Self::ReceiveData { data_available } => match number {
                1 if !contains(line, QIRD) => {
                    output.report_data(line);
                    Action::fail()
                }
                1 => match after(line, b' ') {
                    Some(rest) => {
                        if parse_int(rest) > 0 {
                            *data_available = true;
                        }
                        Action::Continue
                    }
                    None => Action::fail(),
                },
                2 => {
                    let payload = core::mem::replace(data_available, false);
                    if payload {
                        output.report_data(line);
                        Action::Continue
                    } else {
                        require(line, OK, Action::Advance)
                    }
                }
                3 => require(line, OK, Action::Advance),
                _ => Action::fail(),
            },
            Self::SocketOpen => match number {
                1 => require(line, OK, Action::Continue),
                2 => {
                    output.report_data(line);
                    if !contains(line, QIOPEN) {
                        return Action::fail();
                    }
                    match after(line, b',') {
                        Some(rest) if parse_int(rest) == 0 => Action::Advance,
                        _ => Action::fail(),
                    }
                }
                _ => Action::fail(),
            },
            Self::Custom(handler) => handler(event, output),
        }
    }
}

impl fmt::Debug for ResponseParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReceiveData { data_available } => f
                .debug_struct("ReceiveData")
                .field("data_available", data_available)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ResponseParser {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.name())
    }
}

/// Line 1 is captured and must carry `tag`, line 2 must be `OK`.
fn capture_then_ok(line: &[u8], number: u32, tag: &[u8], output: &mut Output) -> Action {
    match number {
        1 => {
            output.report_data(line);
            require(line, tag, Action::Continue)
        }
        2 => require(line, OK, Action::Advance),
        _ => Action::fail(),
    }
}

fn require(line: &[u8], needle: &[u8], then: Action) -> Action {
    if contains(line, needle) {
        then
    } else {
        Action::fail()
    }
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Everything following the first occurrence of `delimiter`.
fn after(line: &[u8], delimiter: u8) -> Option<&[u8]> {
    line.iter()
        .position(|b| *b == delimiter)
        .map(|pos| &line[pos + 1..])
}

/// Leading decimal integer, `strtol` style: leading blanks and a sign are
/// accepted, parsing stops at the first non-digit and yields 0 if there is none.
fn parse_int(bytes: &[u8]) -> i64 {
    let mut iter = bytes
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .peekable();

    let negative = match iter.peek() {
        Some(b'-') => {
            iter.next();
            true
        }
        Some(b'+') => {
            iter.next();
            false
        }
        _ => false,
    };

    let value = iter
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });

    if negative {
        -value
    } else {
        value
    }
}

/// Address between the first two `"` of a `+QIACT:` line.
///
/// A single trailing byte that cannot be part of an IPv4/IPv6 address, such
/// as a stray blank before the closing quote, is dropped.
pub(crate) fn extract_ip(line: &[u8]) -> Option<&[u8]> {
    let start = line.iter().position(|b| *b == b'"')? + 1;
    let len = line[start..].iter().position(|b| *b == b'"')?;
    let ip = &line[start..start + len];

    match ip.split_last() {
        Some((last, rest)) if !is_address_byte(*last) => Some(rest),
        _ => Some(ip),
    }
}

fn is_address_byte(b: u8) -> bool {
    b.is_ascii_hexdigit() || b == b'.' || b == b':'
}
