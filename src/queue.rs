use heapless::Deque;

use crate::command::CommandDescriptor;
use crate::config::CMD_QUEUE_SIZE;
use crate::error::Error;

/// Bounded FIFO of commands waiting for the scheduler.
///
/// The head is the command currently on the wire, it is only removed once
/// its dialogue has concluded.
#[derive(Debug)]
pub struct CommandQueue<const N: usize = CMD_QUEUE_SIZE> {
    commands: Deque<CommandDescriptor, N>,
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CommandQueue<N> {
    pub const fn new() -> Self {
        Self {
            commands: Deque::new(),
        }
    }

    /// Append `cmd` at the tail, rejected without side effects when full.
    pub fn add(&mut self, cmd: CommandDescriptor) -> Result<(), Error> {
        self.commands
            .push_back(cmd)
            .map_err(|_| Error::AllocationFailed)
    }

    pub fn peek(&self) -> Option<&CommandDescriptor> {
        self.commands.front()
    }

    pub(crate) fn peek_mut(&mut self) -> Option<&mut CommandDescriptor> {
        self.commands.front_mut()
    }

    pub fn remove_head(&mut self) -> Option<CommandDescriptor> {
        self.commands.pop_front()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.commands.is_full()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Room left for this many commands
    pub fn free(&self) -> usize {
        N - self.commands.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }
}
