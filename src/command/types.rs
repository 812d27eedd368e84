//! Argument and result types shared by the scheduler and the response parsers
use heapless::Vec;

use crate::config::RESPONSE_MAX_SIZE;

/// Result codes reported through [`Output`].
///
/// The discriminants follow the Silicon Labs `sl_status_t` values the
/// gateway firmware reports to its BLE peer, so `error_code` can be forwarded
/// as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Status {
    Ok = 0x0000,
    Fail = 0x0001,
    Busy = 0x0004,
    Timeout = 0x0007,
    NotInitialized = 0x0011,
    AllocationFailed = 0x0019,
}

impl Status {
    pub const fn code(self) -> u16 {
        self as u16
    }
}

/// Input to a response parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineEvent<'a> {
    /// A complete line, `number` counting from 1 since the command was sent.
    Line { data: &'a [u8], number: u32 },
    /// The command's deadline elapsed before the dialogue concluded.
    Timeout,
}

/// Scheduler transition requested by a response parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Dialogue still in progress, wait for the next line
    Continue,
    /// Command satisfied, move on to the next queued command
    Advance,
    /// Command failed with the given error code, flush the queue
    Fail(u16),
}

impl Action {
    pub const fn fail() -> Self {
        Self::Fail(Status::Fail.code())
    }

    pub const fn timeout() -> Self {
        Self::Fail(Status::Timeout.code())
    }
}

/// Result of one scheduling run.
///
/// A finished run always carries [`Status::Ok`]; whether the commands
/// actually succeeded is told by [`Output::error_code`], which is `0` on
/// success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub(crate) status: Status,
    pub(crate) error_code: u16,
    response: Vec<u8, RESPONSE_MAX_SIZE>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub const fn new() -> Self {
        Self {
            status: Status::NotInitialized,
            error_code: 0,
            response: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.status = Status::NotInitialized;
        self.error_code = 0;
        self.response.clear();
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error_code(&self) -> u16 {
        self.error_code
    }

    /// Run finished and no command reported an error
    pub fn is_success(&self) -> bool {
        self.status == Status::Ok && self.error_code == 0
    }

    pub fn response_data(&self) -> &[u8] {
        &self.response
    }

    pub fn response_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.response).ok()
    }

    /// Replace the captured response with `data`, truncated to capacity.
    pub fn report_data(&mut self, data: &[u8]) {
        let len = data.len().min(RESPONSE_MAX_SIZE);
        self.response.clear();
        // Cannot fail, `len` is bounded by the capacity
        self.response.extend_from_slice(&data[..len]).ok();
    }
}
