use core::cell::Cell;
use core::convert::Infallible;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::error::Error;
use crate::transport::Transport;

/// Records every transmission instead of writing it anywhere.
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<String>,
    timeouts: Vec<Duration>,
    finished: usize,
    fail_sends: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    pub fn timeouts(&self) -> &[Duration] {
        &self.timeouts
    }

    pub fn finished(&self) -> usize {
        self.finished
    }
}

impl Transport for MockTransport {
    fn send(&mut self, text: &[u8], timeout: Duration) -> Result<(), Error> {
        if self.fail_sends {
            return Err(Error::Transport);
        }
        self.sent.push(String::from_utf8_lossy(text).into_owned());
        self.timeouts.push(timeout);
        Ok(())
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

/// Serial port capturing written bytes.
#[derive(Debug, Default)]
pub struct MockSerial {
    written: Vec<u8>,
    fail_writes: bool,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn clear(&mut self) {
        self.written.clear();
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes {
            return Err(embedded_io::ErrorKind::BrokenPipe);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Clock that only moves when told to, starting at zero.
#[derive(Debug, Default)]
pub struct MockClock {
    now: Cell<u64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by.as_ticks());
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.now.get())
    }
}

/// Digital pin whose level is shared between its clones, so a test can
/// drive a pin owned by the code under test and observe it.
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    level: Rc<Cell<bool>>,
}

impl MockPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(high)),
        }
    }

    pub fn set(&self, high: bool) {
        self.level.set(high);
    }

    pub fn is_set(&self) -> bool {
        self.level.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level.get())
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.set(true);
        Ok(())
    }
}

pub struct TestConfig {
    power_key: Option<MockPin>,
    status: Option<MockPin>,
}

impl TestConfig {
    pub fn new(power_key: MockPin, status: MockPin) -> Self {
        Self {
            power_key: Some(power_key),
            status: Some(status),
        }
    }

    pub fn without_pins() -> Self {
        Self {
            power_key: None,
            status: None,
        }
    }
}

impl GatewayConfig for TestConfig {
    type PowerKeyPin = MockPin;
    type StatusPin = MockPin;

    fn power_key_pin(&mut self) -> Option<&mut Self::PowerKeyPin> {
        self.power_key.as_mut()
    }

    fn status_pin(&mut self) -> Option<&mut Self::StatusPin> {
        self.status.as_mut()
    }
}
