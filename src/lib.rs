#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod client;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod power;
pub mod queue;
pub mod scheduler;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use client::Client;
pub use clock::{Clock, SystemClock};
pub use command::{CommandDescriptor, Output, ResponseParser, Status};
pub use error::Error;
pub use event::{EventListener, StatusFlag};
pub use scheduler::{Scheduler, SharedScheduler, State};
pub use transport::{SerialTransport, Transport};
