use crate::command::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    // Scheduler / sequencer state errors
    Busy,

    // Capacity errors: command queue full, command text or transmit frame overflow
    AllocationFailed,

    // The transport failed to push a command onto the wire
    Transport,

    IoPin,

    Timeout,
}

impl Error {
    /// Numeric code written to `Output::error_code` when this error ends a run.
    pub fn code(&self) -> u16 {
        self.status() as u16
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Busy => Status::Busy,
            Self::AllocationFailed => Status::AllocationFailed,
            Self::Timeout => Status::Timeout,
            Self::Transport | Self::IoPin => Status::Fail,
        }
    }
}
