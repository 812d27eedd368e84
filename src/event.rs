//! One-shot event listener
//!
//! Lets the main loop react once when a flag, typically written from an
//! interrupt or by a finished run, reaches a value. There is a single slot:
//! a second registration is refused until the first one fired or was
//! cancelled.
//!
//! A run's completion is watched through a [`StatusFlag`] mirrored from the
//! scheduler's output on every loop iteration:
//!
//! ```rust,ignore
//! static RUN_STATUS: StatusFlag = StatusFlag::new();
//!
//! client.read_imei()?;
//! RUN_STATUS.publish(client.output());
//! listener.listen(RUN_STATUS.as_atomic(), StatusFlag::OK, on_imei, &ctx)?;
//!
//! loop {
//!     client.process();
//!     RUN_STATUS.publish(client.output());
//!     listener.poll();
//! }
//! ```
use core::sync::atomic::{AtomicU8, Ordering};

use crate::command::{Output, Status};
use crate::error::Error;

/// [`Output::status`] of a run, readable as an `AtomicU8`.
pub struct StatusFlag(AtomicU8);

impl Default for StatusFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusFlag {
    /// Value once the run has finished, successful or not
    pub const OK: u8 = Status::Ok.code() as u8;

    pub const fn new() -> Self {
        Self(AtomicU8::new(Status::NotInitialized.code() as u8))
    }

    pub fn publish(&self, output: &Output) {
        self.set(output.status());
    }

    pub fn set(&self, status: Status) {
        // All status codes fit in a byte
        self.0.store(status.code() as u8, Ordering::Release);
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    pub fn as_atomic(&self) -> &AtomicU8 {
        &self.0
    }
}

struct Armed<'a, P> {
    flag: &'a AtomicU8,
    target: u8,
    callback: fn(P),
    payload: P,
}

pub struct EventListener<'a, P> {
    slot: Option<Armed<'a, P>>,
}

impl<P> Default for EventListener<'_, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, P> EventListener<'a, P> {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Call `callback(payload)` once `flag` equals `target`.
    ///
    /// Returns [`Error::Busy`] and keeps the current registration if one is
    /// already armed.
    pub fn listen(
        &mut self,
        flag: &'a AtomicU8,
        target: u8,
        callback: fn(P),
        payload: P,
    ) -> Result<(), Error> {
        if self.slot.is_some() {
            return Err(Error::Busy);
        }

        trace!("Listening for flag value {}", target);
        self.slot = Some(Armed {
            flag,
            target,
            callback,
            payload,
        });
        Ok(())
    }

    /// Fire and disarm if the watched flag has reached its target.
    ///
    /// Returns `true` if the callback ran.
    pub fn poll(&mut self) -> bool {
        let fired = match &self.slot {
            Some(armed) => armed.flag.load(Ordering::Acquire) == armed.target,
            None => false,
        };

        if !fired {
            return false;
        }

        match self.slot.take() {
            Some(Armed {
                callback, payload, ..
            }) => {
                callback(payload);
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// Drop the registration without calling it, handing back the payload.
    pub fn cancel(&mut self) -> Option<P> {
        self.slot.take().map(|armed| armed.payload)
    }
}
