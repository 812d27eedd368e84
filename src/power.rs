use embassy_time::Instant;
use embedded_hal::digital::{InputPin as _, OutputPin as _};

use crate::clock::Clock;
use crate::command::{Output, Status};
use crate::config::{GatewayConfig, POWER_STATE_TIMEOUT, PWRKEY_PULSE_TIME};
use crate::error::Error;

/// Power state as reported by the BG96 `STATUS` pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Sleep,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// `PWRKEY` held high until the instant
    Pulse { until: Instant, target: PowerState },
    /// `PWRKEY` released, waiting for `STATUS` to follow
    Settle { until: Instant, target: PowerState },
}

/// Non-blocking sleep/wake sequencing of the modem.
///
/// A toggle is a `PWRKEY` pulse, after which `STATUS` is watched until it
/// reports the requested state. The sequence advances in
/// [`PowerControl::process`], polled from the main loop next to the
/// scheduler. Its result lands in [`PowerControl::output`] the same way a
/// scheduler run reports: status ok once finished, and a non-zero error code
/// if `STATUS` never followed.
pub struct PowerControl<G, K> {
    config: G,
    clock: K,
    phase: Phase,
    output: Output,
}

impl<G, K> PowerControl<G, K>
where
    G: GatewayConfig,
    K: Clock,
{
    pub fn new(config: G, clock: K) -> Self {
        Self {
            config,
            clock,
            phase: Phase::Idle,
            output: Output::new(),
        }
    }

    /// `STATUS` level, the modem is considered alive without a status pin.
    pub fn is_alive(&mut self) -> Result<bool, Error> {
        if let Some(pin) = self.config.status_pin() {
            pin.is_high().map_err(|_| Error::IoPin)
        } else {
            warn!("No status pin configured");
            Ok(true)
        }
    }

    pub fn power_state(&mut self) -> Result<PowerState, Error> {
        Ok(if self.is_alive()? {
            PowerState::Active
        } else {
            PowerState::Sleep
        })
    }

    pub fn sleep(&mut self) -> Result<(), Error> {
        self.request(PowerState::Sleep)
    }

    pub fn wake_up(&mut self) -> Result<(), Error> {
        self.request(PowerState::Active)
    }

    /// Advance a running sleep/wake sequence.
    pub fn process(&mut self) -> Result<(), Error> {
        let now = self.clock.now();

        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Pulse { until, target } => {
                if now < until {
                    return Ok(());
                }
                if let Err(e) = self.set_power_key(false) {
                    self.conclude(e.code());
                    return Err(e);
                }
                self.phase = Phase::Settle {
                    until: now + POWER_STATE_TIMEOUT,
                    target,
                };
                Ok(())
            }
            Phase::Settle { until, target } => match self.power_state() {
                Ok(state) if state == target => {
                    debug!("Modem reached {:?}", target);
                    self.conclude(0);
                    Ok(())
                }
                Ok(_) if now >= until => {
                    warn!("Modem did not reach {:?} in time", target);
                    self.conclude(Status::Timeout.code());
                    Ok(())
                }
                Ok(_) => Ok(()),
                Err(e) => {
                    self.conclude(e.code());
                    Err(e)
                }
            },
        }
    }

    /// A sleep or wake sequence is running
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn config(&self) -> &G {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut G {
        &mut self.config
    }

    fn request(&mut self, target: PowerState) -> Result<(), Error> {
        if self.is_busy() {
            return Err(Error::Busy);
        }

        self.output.reset();
        if self.power_state()? == target {
            debug!("Modem already in {:?}", target);
            self.output.status = Status::Ok;
            return Ok(());
        }

        debug!("Toggling modem to {:?}", target);
        self.set_power_key(true)?;
        self.phase = Phase::Pulse {
            until: self.clock.now() + PWRKEY_PULSE_TIME,
            target,
        };
        self.output.status = Status::Busy;
        self.output.error_code = 0;
        Ok(())
    }

    fn set_power_key(&mut self, high: bool) -> Result<(), Error> {
        if let Some(pin) = self.config.power_key_pin() {
            if high {
                pin.set_high().map_err(|_| Error::IoPin)
            } else {
                pin.set_low().map_err(|_| Error::IoPin)
            }
        } else {
            warn!("No power key pin configured");
            Ok(())
        }
    }

    fn conclude(&mut self, error_code: u16) {
        self.output.status = Status::Ok;
        self.output.error_code = error_code;
        self.phase = Phase::Idle;
    }
}
