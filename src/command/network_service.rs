//! ### Network service commands
//!
//! Operator selection, radio configuration and the registration script the
//! gateway runs to attach to an NB-IoT/LTE-M network.
use super::general::{set_module_functionality, Functionality};
use super::{simple, CommandDescriptor, ResponseParser};
use crate::config::AT_DEFAULT_TIMEOUT;
use crate::error::Error;

/// Number of commands in [`registration_sequence`]
pub const REGISTRATION_STEPS: usize = 14;

/// Current operator with `AT+COPS?`, the `+COPS:` line is captured.
pub fn get_operator() -> Result<CommandDescriptor, Error> {
    CommandDescriptor::new("AT+COPS?", ResponseParser::Operator, AT_DEFAULT_TIMEOUT)
}

/// Automatic operator selection, `AT+COPS=0`
pub fn automatic_operator_selection() -> Result<CommandDescriptor, Error> {
    simple("AT+COPS=0")
}

/// Enable registration URCs for CS, PS and EPS domains
pub fn enable_registration_urcs() -> Result<CommandDescriptor, Error> {
    simple("AT+CREG=1;+CGREG=1;+CEREG=1")
}

/// PDP context 1 as plain IP towards `apn`
pub fn define_pdp_context(apn: &str) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+CGDCONT=1,\"IP\",\"{}\"", apn),
        ResponseParser::OkError,
        AT_DEFAULT_TIMEOUT,
    )
}

/// TCP/IP context 1, IPv4, no authentication
pub fn configure_tcpip_context(apn: &str) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+QICSGP=1,1,\"{}\",\"\",\"\",1", apn),
        ResponseParser::OkError,
        AT_DEFAULT_TIMEOUT,
    )
}

/// Extended configuration, `AT+QCFG="<setting>",<value>`
pub fn extended_config(setting: &str, value: &str) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+QCFG=\"{}\",{}", setting, value),
        ResponseParser::OkError,
        AT_DEFAULT_TIMEOUT,
    )
}

/// Radio configuration applied with the RF switched off: scrambling, scan
/// mode, roaming, RAT scan order (NB-IoT, GSM, LTE-M), all bands, both IoT
/// modes and PS only.
const RADIO_CONFIG: [(&str, &str); 7] = [
    ("nbsibscramble", "0"),
    ("nwscanmode", "0,1"),
    ("roamservice", "2,1"),
    ("nwscanseq", "020103,1"),
    ("band", "0,0,80,1"),
    ("iotopmode", "1,1"),
    ("servicedomain", "1,1"),
];

/// The full network registration script, in execution order.
pub fn registration_sequence(apn: &str) -> Result<[CommandDescriptor; REGISTRATION_STEPS], Error> {
    let [c0, c1, c2, c3, c4, c5, c6] = RADIO_CONFIG;

    Ok([
        set_module_functionality(Functionality::Minimum)?,
        extended_config(c0.0, c0.1)?,
        extended_config(c1.0, c1.1)?,
        extended_config(c2.0, c2.1)?,
        extended_config(c3.0, c3.1)?,
        extended_config(c4.0, c4.1)?,
        extended_config(c5.0, c5.1)?,
        extended_config(c6.0, c6.1)?,
        define_pdp_context(apn)?,
        set_module_functionality(Functionality::Full)?,
        get_operator()?,
        enable_registration_urcs()?,
        automatic_operator_selection()?,
        configure_tcpip_context(apn)?,
    ])
}
