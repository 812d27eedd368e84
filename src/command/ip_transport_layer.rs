//! ### TCP/IP commands
//!
//! Sockets are addressed by the BG96 `connectID` (0..=11) and always live in
//! PDP context 1.
use core::fmt;

use super::{simple, CommandDescriptor, ResponseParser};
use crate::config::{AT_DEFAULT_TIMEOUT, AT_OPEN_TIMEOUT, AT_SEND_TIMEOUT, DATA_MAX_LENGTH};
use crate::error::Error;

/// `<service_type>` argument of `AT+QIOPEN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServiceType {
    Tcp,
    Udp,
    TcpListener,
    UdpListener,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::TcpListener => "TCP LISTENER",
            Self::UdpListener => "UDP LISTENER",
        }
    }

    pub fn is_listener(&self) -> bool {
        matches!(self, Self::TcpListener | Self::UdpListener)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A socket on the modem.
///
/// For client services `address` is the remote host and `port` the remote
/// port. For listeners `address` is the local address (usually
/// `"127.0.0.1"`) and `port` the local port to listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection<'a> {
    pub socket: u8,
    pub service_type: ServiceType,
    pub address: &'a str,
    pub port: u16,
}

/// Activate PDP context 1, `AT+QIACT=1`
pub fn activate_context() -> Result<CommandDescriptor, Error> {
    simple("AT+QIACT=1")
}

/// `AT+QIACT?`, the local IP address of the context is captured.
pub fn read_ip() -> Result<CommandDescriptor, Error> {
    CommandDescriptor::new("AT+QIACT?", ResponseParser::IpAddress, AT_DEFAULT_TIMEOUT)
}

/// `AT+QIOPEN` in direct push mode.
///
/// Clients wait for the `+QIOPEN:` result. Listeners bind `port` as the
/// local port and report through the buffer access mode.
pub fn open_socket(connection: &Connection<'_>) -> Result<CommandDescriptor, Error> {
    let Connection {
        socket,
        service_type,
        address,
        port,
    } = *connection;

    if service_type.is_listener() {
        CommandDescriptor::from_fmt(
            format_args!(
                "AT+QIOPEN=1,{},\"{}\",\"{}\",0,{},0",
                socket, service_type, address, port
            ),
            ResponseParser::OkError,
            AT_OPEN_TIMEOUT,
        )
    } else {
        CommandDescriptor::from_fmt(
            format_args!(
                "AT+QIOPEN=1,{},\"{}\",\"{}\",{},0,1",
                socket, service_type, address, port
            ),
            ResponseParser::SocketOpen,
            AT_OPEN_TIMEOUT,
        )
    }
}

/// `AT+QICLOSE=<socket>`
pub fn close_socket(socket: u8) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+QICLOSE={}", socket),
        ResponseParser::OkError,
        AT_OPEN_TIMEOUT,
    )
}

/// `AT+QISTATE=1,<socket>`, state of a single socket
pub fn connection_state(socket: u8) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+QISTATE=1,{}", socket),
        ResponseParser::ConnectionState,
        AT_DEFAULT_TIMEOUT,
    )
}

/// `AT+QISTATE=0,1`, sockets of PDP context 1
pub fn context_state() -> Result<CommandDescriptor, Error> {
    CommandDescriptor::new(
        "AT+QISTATE=0,1",
        ResponseParser::ConnectionState,
        AT_DEFAULT_TIMEOUT,
    )
}

/// `AT+QISEND=<socket>,<len>`, answered by the `>` prompt.
pub fn send_prompt(socket: u8, len: usize) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+QISEND={},{}", socket, len),
        ResponseParser::SendPrompt,
        AT_DEFAULT_TIMEOUT,
    )
}

/// The payload following a [`send_prompt`].
pub fn send_payload(data: &[u8]) -> Result<CommandDescriptor, Error> {
    if data.len() >= DATA_MAX_LENGTH {
        return Err(Error::AllocationFailed);
    }
    let mut cmd = CommandDescriptor::empty(ResponseParser::DataTransfer, AT_SEND_TIMEOUT);
    cmd.extend(data)?;
    Ok(cmd)
}

/// `AT+QIRD=<socket>,<len>`
pub fn read_data(socket: u8, len: u16) -> Result<CommandDescriptor, Error> {
    CommandDescriptor::from_fmt(
        format_args!("AT+QIRD={},{}", socket, len),
        ResponseParser::receive_data(),
        AT_DEFAULT_TIMEOUT,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn open_tcp_client() {
        let conn = Connection {
            socket: 0,
            service_type: ServiceType::Tcp,
            address: "cloudsocket.hologram.io",
            port: 9999,
        };
        let cmd = open_socket(&conn).unwrap();

        assert_eq!(
            cmd.text(),
            b"AT+QIOPEN=1,0,\"TCP\",\"cloudsocket.hologram.io\",9999,0,1"
        );
        assert!(matches!(cmd.parser(), ResponseParser::SocketOpen));
        assert_eq!(cmd.timeout(), AT_OPEN_TIMEOUT);
    }

    #[test]
    fn open_udp_listener() {
        let conn = Connection {
            socket: 11,
            service_type: ServiceType::UdpListener,
            address: "127.0.0.1",
            port: 2020,
        };
        let cmd = open_socket(&conn).unwrap();

        assert_eq!(
            cmd.text(),
            b"AT+QIOPEN=1,11,\"UDP LISTENER\",\"127.0.0.1\",0,2020,0"
        );
        assert!(matches!(cmd.parser(), ResponseParser::OkError));
    }

    #[test]
    fn send_sequence() {
        let prompt = send_prompt(2, 5).unwrap();
        assert_eq!(prompt.text(), b"AT+QISEND=2,5");
        assert_eq!(prompt.timeout(), AT_DEFAULT_TIMEOUT);

        let payload = send_payload(b"hello").unwrap();
        assert_eq!(payload.text(), b"hello");
        assert_eq!(payload.timeout(), AT_SEND_TIMEOUT);
        assert!(matches!(payload.parser(), ResponseParser::DataTransfer));
    }

    #[test]
    fn payload_must_fit() {
        let big = [0u8; 150];
        assert_eq!(send_payload(&big).unwrap_err(), Error::AllocationFailed);

        let huge = [0u8; DATA_MAX_LENGTH];
        assert_eq!(send_payload(&huge).unwrap_err(), Error::AllocationFailed);
    }

    #[test]
    fn close_and_read() {
        assert_eq!(close_socket(3).unwrap().text(), b"AT+QICLOSE=3");
        assert_eq!(close_socket(3).unwrap().timeout(), AT_OPEN_TIMEOUT);

        let read = read_data(11, 100).unwrap();
        assert_eq!(read.text(), b"AT+QIRD=11,100");
        assert!(matches!(
            read.parser(),
            ResponseParser::ReceiveData {
                data_available: false
            }
        ));
    }

    #[test]
    fn states() {
        assert_eq!(context_state().unwrap().text(), b"AT+QISTATE=0,1");
        assert_eq!(connection_state(4).unwrap().text(), b"AT+QISTATE=1,4");
    }
}
