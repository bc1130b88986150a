//! Collaborators the driver is generic over
//!
//! [`Transport`] is the cloud channel (MQTT-like broker session), [`Platform`] is the board: its
//! millisecond clock, heap probe and the network link underneath the transport. [`Dispatch`] is
//! the layer interpreting inbound payloads. None of them is implemented by this crate.

/// Broker session the driver owns and drives through its lifecycle
pub trait Transport {
    /// One-time setup (credentials, broker lookup). Retried every tick until it succeeds.
    fn init(&mut self) -> bool;
    fn connect(&mut self) -> bool;
    fn connected(&mut self) -> bool;
    fn disconnect(&mut self);
    /// Re-establishes the device identity with the broker
    fn re_register(&mut self) -> bool;

    /// `true` when a new inbound message can be read through [`Transport::last_read`]
    fn available(&mut self) -> bool;
    fn last_read(&self) -> &str;
    /// Drops the inbound message
    fn flush(&mut self);

    /// Sends `data`; `checked` asks the transport to validate delivery
    fn print(&mut self, data: &str, checked: bool);

    /// Voice-assistant side channel, polled but not dispatched
    fn aligenie_avail(&mut self) -> bool {
        false
    }
}

/// Board services
pub trait Platform {
    /// Monotonic milliseconds since boot. Allowed to wrap.
    fn millis(&self) -> u32;
    fn free_heap(&self) -> u32;
    /// Network link (WiFi) status
    fn link_up(&self) -> bool;
    fn reconnect_link(&mut self);
}

/// What the dispatch layer did with a payload
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub enum ParseOutcome {
    /// Payload was handled, the inbound message is acknowledged and dropped
    Consumed,
    /// Payload is left for [`crate::Protocol::available`] / [`crate::Protocol::read_string`]
    Deferred,
}

impl ParseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseOutcome::Consumed => "consumed",
            ParseOutcome::Deferred => "deferred",
        }
    }
}

/// Upstream layer interpreting inbound payloads
pub trait Dispatch {
    fn parse(&mut self, payload: &str) -> ParseOutcome;
    /// Time sync, called opportunistically on every tick
    fn ntp_init(&mut self) -> bool;
}
