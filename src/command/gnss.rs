//! ### GNSS commands
use super::{simple, CommandDescriptor, ResponseParser};
use crate::config::AT_DEFAULT_TIMEOUT;
use crate::error::Error;

/// Turn on the GNSS engine in stand-alone mode, `AT+QGPS=1`
pub fn start() -> Result<CommandDescriptor, Error> {
    simple("AT+QGPS=1")
}

/// `AT+QGPSEND`
pub fn stop() -> Result<CommandDescriptor, Error> {
    simple("AT+QGPSEND")
}

/// Latest position fix, the `+QGPSLOC:` line is captured.
///
/// Answers `+CME ERROR: 516` until the engine has a fix.
pub fn location() -> Result<CommandDescriptor, Error> {
    CommandDescriptor::new("AT+QGPSLOC?", ResponseParser::GnssLocation, AT_DEFAULT_TIMEOUT)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gnss_commands() {
        assert_eq!(start().unwrap().text(), b"AT+QGPS=1");
        assert_eq!(stop().unwrap().text(), b"AT+QGPSEND");

        let loc = location().unwrap();
        assert_eq!(loc.text(), b"AT+QGPSLOC?");
        assert!(matches!(loc.parser(), ResponseParser::GnssLocation));
    }
}
