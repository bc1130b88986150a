//! Inbound availability gate
//!
//! Tracks the single inbound message the transport holds. A message is surfaced to pollers at
//! most once ([`Gate::take_once`] is edge triggered) and stays readable until it is flushed.
use crate::config::{ReadString, MAX_READ_SIZE};
use crate::transport::Transport;

/// Lifecycle of the inbound message
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub enum Inbound {
    /// nothing pending
    Empty,
    /// arrived on the last poll, not yet reported to a poller
    Arrived,
    /// reported to a poller, still readable
    Consumed,
}

impl Inbound {
    pub fn as_str(&self) -> &'static str {
        match self {
            Inbound::Empty => "empty",
            Inbound::Arrived => "arrived",
            Inbound::Consumed => "consumed",
        }
    }
}

pub struct Gate {
    state: Inbound,
}

impl Gate {
    pub const fn new() -> Self {
        Self {
            state: Inbound::Empty,
        }
    }

    pub fn state(&self) -> Inbound {
        self.state
    }

    /// `true` while a message is pending, whether or not a poller saw it
    pub fn has_message(&self) -> bool {
        self.state != Inbound::Empty
    }

    /// Drops the previous message and asks the transport for a new one
    pub fn poll<T: Transport>(&mut self, transport: &mut T) -> bool {
        self.flush(transport);
        if transport.available() {
            self.state = Inbound::Arrived;
            true
        } else {
            false
        }
    }

    /// `true` exactly once per arrived message
    pub fn take_once(&mut self) -> bool {
        match self.state {
            Inbound::Arrived => {
                self.state = Inbound::Consumed;
                true
            }
            _ => false,
        }
    }

    /// Copies the pending message out and flushes it, empty when nothing is pending
    pub fn read_and_clear<T: Transport>(&mut self, transport: &mut T) -> ReadString {
        let mut out = ReadString::new();
        if !self.has_message() {
            return out;
        }
        for c in transport.last_read().chars() {
            if out.push(c).is_err() {
                log::warn!("inbound message truncated to {} bytes", MAX_READ_SIZE);
                break;
            }
        }
        self.flush(transport);
        out
    }

    /// The pending message for the dispatch layer, empty when nothing is pending
    ///
    /// Does not acknowledge the message, see [`Gate::flush`].
    pub fn parse_payload<'a, T: Transport>(&self, transport: &'a T) -> &'a str {
        if self.has_message() {
            transport.last_read()
        } else {
            ""
        }
    }

    pub fn flush<T: Transport>(&mut self, transport: &mut T) {
        transport.flush();
        self.state = Inbound::Empty;
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}
