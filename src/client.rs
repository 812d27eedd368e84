use crate::command::{
    general, gnss,
    ip_transport_layer::{self, Connection},
    network_service, CommandDescriptor, Output,
};
use crate::config::{CMD_QUEUE_SIZE, DATA_MAX_LENGTH};
use crate::error::Error;
use crate::scheduler::{Scheduler, State};
use crate::transport::{SerialTransport, Transport};

/// `connectID` and length used by [`Client::receive_data`]
const DEFAULT_READ_SOCKET: u8 = 11;
const DEFAULT_READ_LENGTH: u16 = 100;

/// BG96 operations on top of the [`Scheduler`].
///
/// Every operation queues its commands and starts a run. It returns as soon
/// as the first command is on the wire; completion is observed by polling
/// [`Client::process`] until [`Client::state`] is back to [`State::Ready`],
/// then reading [`Client::output`].
///
/// An operation is refused without touching the queue if a run is still in
/// progress ([`Error::Busy`]) or if its commands do not all fit
/// ([`Error::AllocationFailed`]).
pub struct Client<T, const N: usize = CMD_QUEUE_SIZE> {
    scheduler: Scheduler<T, N>,
}

impl<T, const N: usize> Client<T, N>
where
    T: Transport,
{
    pub const fn new(transport: T) -> Self {
        Self {
            scheduler: Scheduler::new(transport),
        }
    }

    /// Attach to the network: radio configuration, PDP context for `apn`
    /// and automatic operator selection.
    pub fn network_registration(&mut self, apn: &str) -> Result<(), Error> {
        self.check_room(network_service::REGISTRATION_STEPS)?;
        info!("Registering to network with APN {}", apn);
        self.submit(network_service::registration_sequence(apn)?)
    }

    /// Open a client socket, or start listening for listener service types.
    pub fn open_connection(&mut self, connection: &Connection<'_>) -> Result<(), Error> {
        debug!(
            "Opening {} connection {} to {}:{}",
            connection.service_type.as_str(),
            connection.socket,
            connection.address,
            connection.port
        );

        let open = ip_transport_layer::open_socket(connection)?;
        if connection.service_type.is_listener() {
            self.submit([
                ip_transport_layer::activate_context()?,
                open,
                ip_transport_layer::context_state()?,
            ])
        } else {
            self.submit([open])
        }
    }

    pub fn close_connection(&mut self, connection: &Connection<'_>) -> Result<(), Error> {
        self.submit([ip_transport_layer::close_socket(connection.socket)?])
    }

    /// Send `data` on an open socket and wait for the peer's answer.
    pub fn send_data(&mut self, connection: &Connection<'_>, data: &[u8]) -> Result<(), Error> {
        if data.len() >= DATA_MAX_LENGTH {
            return Err(Error::AllocationFailed);
        }

        self.submit([
            ip_transport_layer::send_prompt(connection.socket, data.len())?,
            ip_transport_layer::send_payload(data)?,
        ])
    }

    /// Read up to 100 bytes buffered on socket 11.
    pub fn receive_data(&mut self) -> Result<(), Error> {
        self.receive_from(DEFAULT_READ_SOCKET, DEFAULT_READ_LENGTH)
    }

    pub fn receive_from(&mut self, socket: u8, length: u16) -> Result<(), Error> {
        self.submit([ip_transport_layer::read_data(socket, length)?])
    }

    /// Local IP address of PDP context 1, captured as response data.
    pub fn read_ip(&mut self) -> Result<(), Error> {
        self.submit([ip_transport_layer::read_ip()?])
    }

    pub fn read_imei(&mut self) -> Result<(), Error> {
        self.submit([general::read_imei()?])
    }

    pub fn get_operator(&mut self) -> Result<(), Error> {
        self.submit([network_service::get_operator()?])
    }

    pub fn gnss_start(&mut self) -> Result<(), Error> {
        self.submit([gnss::start()?])
    }

    pub fn gnss_get_position(&mut self) -> Result<(), Error> {
        self.submit([gnss::location()?])
    }

    pub fn gnss_stop(&mut self) -> Result<(), Error> {
        self.submit([gnss::stop()?])
    }

    /// Queue `commands` and start a run, all or nothing.
    pub fn submit<const K: usize>(&mut self, commands: [CommandDescriptor; K]) -> Result<(), Error> {
        self.check_room(K)?;
        for cmd in commands {
            self.scheduler.add(cmd)?;
        }
        self.scheduler.start()
    }

    pub fn process(&mut self) {
        self.scheduler.process();
    }

    pub fn output(&self) -> &Output {
        self.scheduler.output()
    }

    pub fn state(&self) -> State {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &Scheduler<T, N> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<T, N> {
        &mut self.scheduler
    }

    fn check_room(&self, count: usize) -> Result<(), Error> {
        if !self.scheduler.is_ready() {
            return Err(Error::Busy);
        }
        if self.scheduler.queue().free() < count {
            return Err(Error::AllocationFailed);
        }
        Ok(())
    }
}

impl<W, C, const N: usize> Client<SerialTransport<W, C>, N>
where
    W: embedded_io::Write,
    C: crate::clock::Clock,
{
    pub fn receive(&mut self, byte: u8) {
        self.scheduler.receive(byte);
    }

    pub fn poll_timeout(&mut self) {
        self.scheduler.poll_timeout();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::{ip_transport_layer::ServiceType, LineEvent, Status};
    use crate::config::{GatewayConfig, AT_OPEN_TIMEOUT, AT_SEND_TIMEOUT};
    use crate::test_helpers::{MockClock, MockSerial, MockTransport, TestConfig};

    const TCP: Connection<'static> = Connection {
        socket: 0,
        service_type: ServiceType::Tcp,
        address: "cloudsocket.hologram.io",
        port: 9999,
    };

    fn reply<T: Transport, const N: usize>(client: &mut Client<T, N>, lines: &[&[u8]]) {
        for (i, data) in lines.iter().enumerate() {
            client.scheduler_mut().handle(LineEvent::Line {
                data,
                number: i as u32 + 1,
            });
        }
        client.process();
    }

    #[test]
    fn registration_runs_all_steps() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        client.network_registration(TestConfig::APN).unwrap();

        for step in 0..network_service::REGISTRATION_STEPS {
            assert_eq!(client.state(), State::Sending);
            if step == 10 {
                reply(&mut client, &[b"+COPS: 0", b"OK"]);
            } else {
                reply(&mut client, &[b"OK"]);
            }
        }

        assert_eq!(client.state(), State::Ready);
        assert!(client.output().is_success());

        let sent = client.scheduler().transport().sent();
        assert_eq!(sent.len(), network_service::REGISTRATION_STEPS);
        assert_eq!(sent[0], "AT+CFUN=0");
        assert_eq!(sent[13], "AT+QICSGP=1,1,\"hologram\",\"\",\"\",1");
    }

    #[test]
    fn registration_needs_room_for_every_step() {
        let mut client: Client<_, 10> = Client::new(MockTransport::new());

        assert_eq!(
            client.network_registration("hologram"),
            Err(Error::AllocationFailed)
        );
        assert!(client.scheduler().queue().is_empty());
        assert!(client.scheduler().transport().sent().is_empty());
    }

    #[test]
    fn operations_are_refused_while_busy() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        client.read_imei().unwrap();

        assert_eq!(client.get_operator(), Err(Error::Busy));
        assert_eq!(client.scheduler().queue().len(), 1);

        reply(&mut client, &[b"866425030000000", b"OK"]);
        assert_eq!(client.output().response_str(), Some("866425030000000"));
        assert!(client.get_operator().is_ok());
    }

    #[test]
    fn open_tcp_connection() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        client.open_connection(&TCP).unwrap();

        assert_eq!(
            client.scheduler().transport().sent(),
            ["AT+QIOPEN=1,0,\"TCP\",\"cloudsocket.hologram.io\",9999,0,1"]
        );
        assert_eq!(
            client.scheduler().transport().timeouts(),
            [AT_OPEN_TIMEOUT]
        );

        reply(&mut client, &[b"OK", b"+QIOPEN: 0,0"]);
        assert!(client.output().is_success());
    }

    #[test]
    fn open_listener() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        let listener = Connection {
            socket: 1,
            service_type: ServiceType::TcpListener,
            address: "127.0.0.1",
            port: 2020,
        };
        client.open_connection(&listener).unwrap();
        reply(&mut client, &[b"OK"]);
        reply(&mut client, &[b"OK"]);
        reply(
            &mut client,
            &[
                b"+QISTATE: 1,\"TCP LISTENER\",\"127.0.0.1\",0,2020,3,1,1,0,\"uart1\"",
                b"OK",
            ],
        );

        assert_eq!(
            client.scheduler().transport().sent(),
            [
                "AT+QIACT=1",
                "AT+QIOPEN=1,1,\"TCP LISTENER\",\"127.0.0.1\",0,2020,0",
                "AT+QISTATE=0,1",
            ]
        );
        assert!(client.output().is_success());
        assert!(client
            .output()
            .response_str()
            .unwrap()
            .starts_with("+QISTATE: 1,"));
    }

    #[test]
    fn send_data_dialogue() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        client.send_data(&TCP, b"hello world").unwrap();

        reply(&mut client, &[b">"]);
        reply(
            &mut client,
            &[
                b"hello world",
                b"SEND OK",
                b"+QIURC: \"recv\",0,2",
                b"hi",
                b"OK",
            ],
        );

        let transport = client.scheduler().transport();
        assert_eq!(transport.sent(), ["AT+QISEND=0,11", "hello world"]);
        assert_eq!(transport.timeouts()[1], AT_SEND_TIMEOUT);
        assert_eq!(client.state(), State::Ready);
        assert!(client.output().is_success());
    }

    #[test]
    fn send_data_rejected_without_prompt() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        client.send_data(&TCP, b"hello").unwrap();

        reply(&mut client, &[b"ERROR"]);
        assert_eq!(client.state(), State::Ready);
        assert_eq!(client.output().error_code(), Status::Fail.code());
        assert_eq!(client.scheduler().transport().sent().len(), 1);
    }

    #[test]
    fn send_data_too_large() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        let data = [b'x'; DATA_MAX_LENGTH];

        assert_eq!(client.send_data(&TCP, &data), Err(Error::AllocationFailed));
        assert!(client.scheduler().queue().is_empty());
    }

    #[test]
    fn close_and_receive() {
        let mut client: Client<_> = Client::new(MockTransport::new());
        client.close_connection(&TCP).unwrap();
        reply(&mut client, &[b"OK"]);

        client.receive_data().unwrap();
        reply(&mut client, &[b"+QIRD: 3", b"abc", b"OK"]);
        assert_eq!(client.output().response_data(), b"abc");

        assert_eq!(
            client.scheduler().transport().sent(),
            ["AT+QICLOSE=0", "AT+QIRD=11,100"]
        );
    }

    #[test]
    fn queries() {
        let mut client: Client<_> = Client::new(MockTransport::new());

        client.read_ip().unwrap();
        reply(&mut client, &[b"+QIACT: 1,1,1,\"10.0.0.5\"", b"OK"]);
        assert_eq!(client.output().response_str(), Some("10.0.0.5"));

        client.get_operator().unwrap();
        reply(&mut client, &[b"+COPS: 0,0,\"T-Mobile\",9", b"OK"]);
        assert_eq!(
            client.output().response_str(),
            Some("+COPS: 0,0,\"T-Mobile\",9")
        );
    }

    #[test]
    fn gnss() {
        let mut client: Client<_> = Client::new(MockTransport::new());

        client.gnss_start().unwrap();
        reply(&mut client, &[b"OK"]);
        client.gnss_get_position().unwrap();
        reply(&mut client, &[b"+CME ERROR: 516"]);
        assert_eq!(client.output().error_code(), Status::Fail.code());
        assert_eq!(client.output().response_data(), b"+CME ERROR: 516");
        client.gnss_stop().unwrap();
        reply(&mut client, &[b"OK"]);

        assert_eq!(
            client.scheduler().transport().sent(),
            ["AT+QGPS=1", "AT+QGPSLOC?", "AT+QGPSEND"]
        );
    }

    #[test]
    fn over_serial() {
        let clock = MockClock::new();
        let mut client: Client<_> = Client::new(SerialTransport::new(MockSerial::new(), &clock));

        client.get_operator().unwrap();
        for b in b"\r\n+COPS: 0,0,\"Hologram\",9\r\n\r\nOK\r\n" {
            client.receive(*b);
        }
        client.poll_timeout();
        client.process();

        assert_eq!(
            client.scheduler().transport().writer().written(),
            b"AT+COPS?\r\n"
        );
        assert!(client.output().is_success());
        assert_eq!(
            client.output().response_str(),
            Some("+COPS: 0,0,\"Hologram\",9")
        );
    }
}
