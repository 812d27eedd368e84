//! AT commands for the Quectel BG96 module family
//!
//! Commands are plain [`CommandDescriptor`]s: the text to put on the wire,
//! the parser that judges the modem's answer and the time the modem gets to
//! give it. The submodules group builders the same way the BG96 AT manual
//! groups the commands.
pub mod general;
pub mod gnss;
pub mod ip_transport_layer;
pub mod network_service;
pub mod parser;
mod types;

use core::fmt::Write as _;

use embassy_time::Duration;
use heapless::{String, Vec};

use crate::config::{AT_DEFAULT_TIMEOUT, CMD_MAX_SIZE};
use crate::error::Error;

pub use parser::{LineHandler, ResponseParser};
pub use types::*;

/// One queued AT command.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    text: Vec<u8, CMD_MAX_SIZE>,
    parser: ResponseParser,
    timeout: Duration,
}

impl CommandDescriptor {
    /// Fails with [`Error::AllocationFailed`] if `text` does not fit.
    pub fn new(text: &str, parser: ResponseParser, timeout: Duration) -> Result<Self, Error> {
        let mut cmd = Self::empty(parser, timeout);
        cmd.extend(text.as_bytes())?;
        Ok(cmd)
    }

    /// Command with no text yet, to be filled with [`CommandDescriptor::extend`].
    pub const fn empty(parser: ResponseParser, timeout: Duration) -> Self {
        Self {
            text: Vec::new(),
            parser,
            timeout,
        }
    }

    /// Build the command text from format arguments.
    pub fn from_fmt(
        args: core::fmt::Arguments<'_>,
        parser: ResponseParser,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let mut cmd = Self::empty(parser, timeout);
        cmd.extend_fmt(args)?;
        Ok(cmd)
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn parser(&self) -> &ResponseParser {
        &self.parser
    }

    pub(crate) fn parser_mut(&mut self) -> &mut ResponseParser {
        &mut self.parser
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_parser(&mut self, parser: ResponseParser) {
        self.parser = parser;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Empty the text, keeping parser and timeout.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Append `data` to the text.
    ///
    /// If the result would not fit, the text is left untouched and
    /// [`Error::AllocationFailed`] is returned.
    pub fn extend(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.text.len() + data.len() > CMD_MAX_SIZE {
            return Err(Error::AllocationFailed);
        }
        self.text
            .extend_from_slice(data)
            .map_err(|_| Error::AllocationFailed)
    }

    /// Append formatted text, all or nothing like [`CommandDescriptor::extend`].
    pub fn extend_fmt(&mut self, args: core::fmt::Arguments<'_>) -> Result<(), Error> {
        let mut buf: String<CMD_MAX_SIZE> = String::new();
        buf.write_fmt(args).map_err(|_| Error::AllocationFailed)?;
        self.extend(buf.as_bytes())
    }
}

impl Default for CommandDescriptor {
    fn default() -> Self {
        Self::empty(ResponseParser::OkError, AT_DEFAULT_TIMEOUT)
    }
}

/// `AT+<cmd>` with the OK/ERROR parser and the default timeout.
pub(crate) fn simple(text: &str) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::new(text, ResponseParser::OkError, AT_DEFAULT_TIMEOUT)
}
