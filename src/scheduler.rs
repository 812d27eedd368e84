//! Command scheduler
//!
//! Runs the queued commands one at a time, strictly in FIFO order. A command
//! is transmitted, then every line the modem answers with is handed to the
//! command's [`ResponseParser`](crate::command::ResponseParser) until it declares the dialogue complete or
//! failed. A failure flushes the rest of the queue.
//!
//! Line and timeout events only flip the state; the next command is
//! transmitted from [`Scheduler::process`], which the main loop polls.
//!
//! ```text
//!            start()                 Advance
//!   Ready ────────────▶ Sending ──────────────▶ Processed
//!     ▲                   │  ▲                      │
//!     │                   │  └──── queue not empty ─┤
//!     │             Fail  ▼                         │
//!     └──────────────── Error ◀─────────────────────┘ (queue empty → Ready)
//! ```
use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::command::{Action, CommandDescriptor, LineEvent, Output, Status};
use crate::config::CMD_QUEUE_SIZE;
use crate::error::Error;
use crate::fmt::LossyStr;
use crate::queue::CommandQueue;
use crate::transport::{SerialTransport, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Idle, a new run may be started
    Ready,
    /// Head command on the wire, waiting for its response
    Sending,
    /// Head command satisfied, next step pending in `process()`
    Processed,
    /// Head command failed, queue flush pending in `process()`
    Error,
}

pub struct Scheduler<T, const N: usize = CMD_QUEUE_SIZE> {
    transport: T,
    queue: CommandQueue<N>,
    output: Output,
    state: State,
}

impl<T, const N: usize> Scheduler<T, N>
where
    T: Transport,
{
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            queue: CommandQueue::new(),
            output: Output::new(),
            state: State::Ready,
        }
    }

    /// Queue a command for the next run.
    pub fn add(&mut self, cmd: CommandDescriptor) -> Result<(), Error> {
        self.queue.add(cmd)
    }

    /// Start processing the queue.
    ///
    /// Progress is then driven by [`Scheduler::process`] and the line events;
    /// the result of the run is reported through [`Scheduler::output`].
    pub fn start(&mut self) -> Result<(), Error> {
        if self.state != State::Ready {
            warn!("Scheduler busy in state {:?}", self.state);
            return Err(Error::Busy);
        }

        self.output.reset();
        if self.queue.is_empty() {
            self.output.status = Status::Ok;
            return Ok(());
        }

        debug!("Starting run of {} command(s)", self.queue.len());
        self.transmit_head()
    }

    /// Drive the run forward, called from the main loop.
    pub fn process(&mut self) {
        match self.state {
            State::Ready | State::Sending => {}
            State::Processed => {
                self.queue.remove_head();
                self.transport.finish();

                if self.queue.is_empty() {
                    debug!("Run complete");
                    self.output.status = Status::Ok;
                    self.state = State::Ready;
                } else {
                    // A failed send leaves the state in Error, flushed next time
                    self.transmit_head().ok();
                }
            }
            State::Error => {
                self.transport.finish();
                warn!(
                    "Run failed with {:#x}, dropping {} command(s)",
                    self.output.error_code,
                    self.queue.len()
                );
                self.queue.clear();
                self.output.status = Status::Ok;
                self.state = State::Ready;
            }
        }
    }

    /// Deliver a received line or a timeout to the in-flight command.
    pub fn handle(&mut self, event: LineEvent<'_>) {
        dispatch(&mut self.state, &mut self.queue, &mut self.output, event);
    }

    /// The in-flight command is complete.
    pub fn advance(&mut self) {
        if self.state == State::Sending {
            self.state = State::Processed;
        }
    }

    /// The in-flight command failed with `error_code`.
    pub fn fail(&mut self, error_code: u16) {
        fail(&mut self.state, &mut self.output, error_code);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn queue(&self) -> &CommandQueue<N> {
        &self.queue
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn transmit_head(&mut self) -> Result<(), Error> {
        let Some(cmd) = self.queue.peek_mut() else {
            return Ok(());
        };

        cmd.parser_mut().reset();
        trace!(
            "Transmitting {:?} with {:?} parser",
            LossyStr(cmd.text()),
            cmd.parser()
        );

        match self.transport.send(cmd.text(), cmd.timeout()) {
            Ok(()) => {
                self.state = State::Sending;
                Ok(())
            }
            Err(e) => {
                error!("Transmission failed: {:?}", e);
                self.state = State::Sending;
                self.fail(e.code());
                Err(e)
            }
        }
    }
}

impl<W, C, const N: usize> Scheduler<SerialTransport<W, C>, N>
where
    W: embedded_io::Write,
    C: crate::clock::Clock,
{
    /// Feed one byte received from the modem.
    pub fn receive(&mut self, byte: u8) {
        let Self {
            transport,
            queue,
            output,
            state,
        } = self;

        if let Some(event) = transport.receive(byte) {
            dispatch(state, queue, output, event);
        }
    }

    /// Check the response deadline of the in-flight command.
    pub fn poll_timeout(&mut self) {
        if let Some(event) = self.transport.poll_timeout() {
            self.handle(event);
        }
    }
}

fn dispatch<const N: usize>(
    state: &mut State,
    queue: &mut CommandQueue<N>,
    output: &mut Output,
    event: LineEvent<'_>,
) {
    if *state != State::Sending {
        return;
    }

    let action = match queue.peek_mut() {
        Some(cmd) => cmd.parser_mut().on_event(event, output),
        None => return,
    };

    match action {
        Action::Continue => {}
        Action::Advance => {
            trace!("Command complete");
            *state = State::Processed;
        }
        Action::Fail(code) => fail(state, output, code),
    }
}

fn fail(state: &mut State, output: &mut Output, error_code: u16) {
    if *state == State::Sending {
        debug!("Command failed with {:#x}", error_code);
        output.error_code = error_code;
        *state = State::Error;
    }
}

/// A [`Scheduler`] shared between the receive interrupt and the main loop.
pub struct SharedScheduler<M: RawMutex, T, const N: usize = CMD_QUEUE_SIZE> {
    inner: Mutex<M, RefCell<Scheduler<T, N>>>,
}

impl<M, T, const N: usize> SharedScheduler<M, T, N>
where
    M: RawMutex,
    T: Transport,
{
    pub const fn new(transport: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Scheduler::new(transport))),
        }
    }

    /// Run `f` with exclusive access to the scheduler.
    pub fn lock<R>(&self, f: impl FnOnce(&mut Scheduler<T, N>) -> R) -> R {
        self.inner.lock(|s| f(&mut s.borrow_mut()))
    }

    pub fn start(&self) -> Result<(), Error> {
        self.lock(|s| s.start())
    }

    pub fn process(&self) {
        self.lock(|s| s.process())
    }

    pub fn handle(&self, event: LineEvent<'_>) {
        self.lock(|s| s.handle(event))
    }

    pub fn state(&self) -> State {
        self.lock(|s| s.state())
    }

    pub fn output(&self) -> Output {
        self.lock(|s| s.output().clone())
    }
}

impl<M, W, C, const N: usize> SharedScheduler<M, SerialTransport<W, C>, N>
where
    M: RawMutex,
    W: embedded_io::Write,
    C: crate::clock::Clock,
{
    pub fn receive(&self, byte: u8) {
        self.lock(|s| s.receive(byte))
    }

    pub fn poll_timeout(&self) {
        self.lock(|s| s.poll_timeout())
    }
}
