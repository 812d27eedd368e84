use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// Number of command descriptors the scheduler queue can hold
pub const CMD_QUEUE_SIZE: usize = 20;

/// Capacity of a command descriptor's text buffer
pub const CMD_MAX_SIZE: usize = 100;

/// Capacity of the captured response in an [`Output`](crate::command::Output)
pub const RESPONSE_MAX_SIZE: usize = CMD_MAX_SIZE;

/// Capacity of the outgoing frame, including the appended `\r\n`
pub const OUT_BUFFER_SIZE: usize = 100;

/// Capacity of a single received line
pub const IN_BUFFER_SIZE: usize = 100;

/// Upper bound for a payload handed to `AT+QISEND`
pub const DATA_MAX_LENGTH: usize = 2000;

pub const AT_DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
pub const AT_OPEN_TIMEOUT: Duration = Duration::from_millis(6000);
pub const AT_SEND_TIMEOUT: Duration = Duration::from_millis(20000);

/// High time of `PWRKEY` to toggle the module between sleep and active
pub const PWRKEY_PULSE_TIME: Duration = Duration::from_millis(800);

/// Time allowed for `STATUS` to follow a `PWRKEY` pulse
pub const POWER_STATE_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub trait GatewayConfig {
    type PowerKeyPin: OutputPin;
    type StatusPin: InputPin;

    const APN: &'static str = "hologram";

    fn power_key_pin(&mut self) -> Option<&mut Self::PowerKeyPin>;
    fn status_pin(&mut self) -> Option<&mut Self::StatusPin>;
}
