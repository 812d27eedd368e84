//! ### General commands
use super::{simple, CommandDescriptor, ResponseParser};
use crate::config::AT_DEFAULT_TIMEOUT;
use crate::error::Error;

/// Level of functionality set with `AT+CFUN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Functionality {
    /// Minimum functionality, RF and SIM off
    Minimum = 0,
    Full = 1,
    /// RF off, SIM still accessible
    DisableRf = 4,
}

/// Attention, checks that the modem answers at all.
pub fn at() -> Result<CommandDescriptor, Error> {
    simple("AT")
}

/// Request the IMEI with `AT+GSN`. The number is captured as response data.
pub fn read_imei() -> Result<CommandDescriptor, Error> {
    CommandDescriptor::new("AT+GSN", ResponseParser::Capture, AT_DEFAULT_TIMEOUT)
}

/// `AT+CFUN=<fun>`
pub fn set_module_functionality(fun: Functionality) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+CFUN={}", fun as u8),
        ResponseParser::OkError,
        AT_DEFAULT_TIMEOUT,
    )
}
