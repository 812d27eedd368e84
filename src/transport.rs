//! Byte-level link to the modem.
//!
//! The scheduler only needs to put a command on the wire and to be told when
//! the exchange is over; both are captured by [`Transport`]. [`SerialTransport`]
//! implements it on top of any blocking [`embedded_io::Write`] and splits the
//! modem's output into numbered lines with a [`LineReader`].
use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::clock::Clock;
use crate::command::LineEvent;
use crate::config::{IN_BUFFER_SIZE, OUT_BUFFER_SIZE};
use crate::error::Error;
use crate::fmt::LossyStr;

const CRLF: &[u8] = b"\r\n";

pub trait Transport {
    /// Put `text` on the wire, terminated by `\r\n`, and arm a response
    /// deadline of `timeout`.
    fn send(&mut self, text: &[u8], timeout: Duration) -> Result<(), Error>;

    /// The exchange is over, disarm the deadline and stop listening.
    fn finish(&mut self);
}

/// Splits received bytes into lines and numbers them from 1.
///
/// `\r` is dropped, `\n` ends a non-empty line. The `>` prompt of
/// `AT+QISEND` never gets a line terminator, so it ends a line too and is kept
/// in it. A line that fills the buffer is handed out as is.
#[derive(Debug)]
pub struct LineReader<const N: usize = IN_BUFFER_SIZE> {
    buf: Vec<u8, N>,
    line_number: u32,
    emitted: bool,
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            line_number: 0,
            emitted: false,
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<LineEvent<'_>> {
        if self.emitted {
            self.buf.clear();
            self.emitted = false;
        }

        match byte {
            b'\r' => None,
            b'\n' if self.buf.is_empty() => None,
            b'\n' => self.emit(),
            b'>' => {
                self.buf.push(byte).ok();
                self.emit()
            }
            _ => {
                self.buf.push(byte).ok();
                if self.buf.is_full() {
                    self.emit()
                } else {
                    None
                }
            }
        }
    }

    /// Start numbering from 1 again and drop any partial line.
    pub fn restart(&mut self) {
        self.buf.clear();
        self.emitted = false;
        self.line_number = 0;
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// Bytes of the line being received
    pub fn pending(&self) -> &[u8] {
        if self.emitted {
            &[]
        } else {
            &self.buf
        }
    }

    fn emit(&mut self) -> Option<LineEvent<'_>> {
        self.line_number += 1;
        self.emitted = true;
        Some(LineEvent::Line {
            data: &self.buf,
            number: self.line_number,
        })
    }
}

/// [`Transport`] over a blocking serial writer.
///
/// Received bytes are fed with [`SerialTransport::receive`], typically from
/// the UART receive interrupt, and [`SerialTransport::poll_timeout`] is polled
/// from the main loop. Both are usually reached through the scheduler, see
/// [`Scheduler::receive`](crate::scheduler::Scheduler::receive).
pub struct SerialTransport<W, C> {
    writer: W,
    clock: C,
    reader: LineReader<IN_BUFFER_SIZE>,
    frame: Vec<u8, OUT_BUFFER_SIZE>,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl<W, C> SerialTransport<W, C>
where
    W: embedded_io::Write,
    C: Clock,
{
    pub fn new(writer: W, clock: C) -> Self {
        Self {
            writer,
            clock,
            reader: LineReader::new(),
            frame: Vec::new(),
            timeout: Duration::from_ticks(0),
            deadline: None,
        }
    }

    /// Feed one received byte.
    ///
    /// Bytes are dropped while no exchange is running. Every complete line
    /// restarts the deadline.
    pub fn receive(&mut self, byte: u8) -> Option<LineEvent<'_>> {
        if self.deadline.is_none() {
            return None;
        }

        let now = self.clock.now();
        match self.reader.push(byte) {
            Some(event) => {
                self.deadline = Some(now + self.timeout);
                if let LineEvent::Line { data, number } = event {
                    trace!("Line {}: {:?}", number, LossyStr(data));
                }
                Some(event)
            }
            None => None,
        }
    }

    /// Yields [`LineEvent::Timeout`] once when the deadline has passed.
    pub fn poll_timeout(&mut self) -> Option<LineEvent<'static>> {
        let deadline = self.deadline?;
        if self.clock.now() >= deadline {
            warn!("No response within {} ms", self.timeout.as_millis());
            self.deadline = None;
            Some(LineEvent::Timeout)
        } else {
            None
        }
    }

    /// An exchange is running and its deadline is armed
    pub fn is_waiting(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn release(self) -> (W, C) {
        (self.writer, self.clock)
    }

    fn build_frame(&mut self, text: &[u8]) -> Result<(), Error> {
        self.frame.clear();
        self.frame
            .extend_from_slice(text)
            .map_err(|_| Error::AllocationFailed)?;

        if !crate::command::parser::contains(text, CRLF) {
            self.frame
                .extend_from_slice(CRLF)
                .map_err(|_| Error::AllocationFailed)?;
        }
        Ok(())
    }
}

impl<W, C> Transport for SerialTransport<W, C>
where
    W: embedded_io::Write,
    C: Clock,
{
    fn send(&mut self, text: &[u8], timeout: Duration) -> Result<(), Error> {
        self.build_frame(text)?;
        self.reader.restart();

        trace!("Sending {:?}", LossyStr(text));
        self.writer
            .write_all(&self.frame)
            .map_err(|_| Error::Transport)?;
        self.writer.flush().map_err(|_| Error::Transport)?;

        self.timeout = timeout;
        self.deadline = Some(self.clock.now() + timeout);
        Ok(())
    }

    fn finish(&mut self) {
        self.deadline = None;
        self.reader.restart();
    }
}
