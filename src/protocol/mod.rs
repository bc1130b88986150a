//! Protocol driver
//!
//! [`Protocol`] owns a [`Transport`] and drives it through its lifecycle from [`Protocol::run`],
//! which is expected to be called from the application main loop. Outgoing fields are collected
//! into an [`Envelope`] and sent either explicitly ([`Protocol::print_now`]) or once no field was
//! added for [`Config::autoformat_timeout`] ms. Inbound messages go through the [`Gate`] and are
//! handed to the [`Dispatch`] layer.
use crate::config::{Config, ReadString, CMD_NOTICE, MAX_SEND_SIZE, VASSISTANT_MARKER};
use crate::error::Error;
use crate::transport::{Dispatch, ParseOutcome, Platform, Transport};

pub mod backoff;
pub mod envelope;
pub mod field;
pub mod gate;
#[cfg(test)]
pub(crate) mod testing;

pub use backoff::Backoff;
pub use envelope::Envelope;
pub use field::{Field, FieldValue};
pub use gate::{Gate, Inbound};

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub enum State {
    Connecting,
    Connected,
    /// explicitly disconnected, the next tick goes back to [`State::Connecting`]
    Disconnected,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Connecting => "connecting",
            State::Connected => "connected",
            State::Disconnected => "disconnected",
        }
    }
}

pub struct Protocol<T, D, P, const N: usize = MAX_SEND_SIZE> {
    transport: T,
    dispatch: D,
    platform: P,
    config: Config,
    state: State,
    initialized: bool,
    backoff: Backoff,
    refresh_time: u32,
    reconnect_time: Option<u32>,
    gate: Gate,
    envelope: Envelope<N>,
    check_delivery: bool,
}

impl<T: Transport, D: Dispatch, P: Platform> Protocol<T, D, P> {
    pub fn new(transport: T, dispatch: D, platform: P) -> Self {
        Self::with_config(transport, dispatch, platform, Config::default())
    }
}

impl<T: Transport, D: Dispatch, P: Platform, const N: usize> Protocol<T, D, P, N> {
    pub fn with_config(transport: T, dispatch: D, platform: P, config: Config) -> Self {
        Self {
            transport,
            dispatch,
            platform,
            config,
            state: State::Connecting,
            initialized: false,
            backoff: Backoff::new(),
            refresh_time: 0,
            reconnect_time: None,
            gate: Gate::new(),
            envelope: Envelope::new(config.merge_policy),
            check_delivery: true,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn backoff_count(&self) -> u8 {
        self.backoff.count()
    }

    /// [`Protocol::connect_timeout`] with [`Config::connect_timeout`]
    pub fn connect(&mut self) -> bool {
        self.connect_timeout(self.config.connect_timeout)
    }

    /// Runs ticks until connected or until `timeout` ms elapsed
    ///
    /// Blocks the caller, there is nothing else to yield to.
    pub fn connect_timeout(&mut self, timeout: u32) -> bool {
        self.state = State::Connecting;
        let start = self.platform.millis();
        while self.state != State::Connected
            && self.platform.millis().wrapping_sub(start) < timeout
        {
            self.run();
        }
        self.state == State::Connected
    }

    /// `true` once the last tick saw the transport connected
    pub fn connected(&self) -> bool {
        self.state == State::Connected
    }

    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.state = State::Disconnected;
    }

    /// Whether the transport should validate delivery of what is sent
    pub fn check_state(&mut self, check: bool) {
        self.check_delivery = check;
    }

    /// One tick of the driver
    pub fn run(&mut self) {
        if !self.initialized {
            if self.transport.init() && self.dispatch.ntp_init() {
                self.initialized = true;
                self.backoff.reset(self.platform.millis());
                log::debug!("transport initialized");
            }
        } else {
            let now = self.platform.millis();
            if self.backoff.reregister_due(
                now,
                self.config.reregister_idle,
                self.config.backoff_cap,
            ) {
                log::debug!("re-registering after {} failures", self.backoff.count());
                if self.heap_low() {
                    return;
                }
                if self.transport.re_register() {
                    self.backoff.reset(self.platform.millis());
                } else {
                    log::warn!("re-registration failed");
                    self.backoff
                        .defer(self.platform.millis(), self.config.reregister_retry_shortcut);
                }
            }
            self.dispatch.ntp_init();
        }

        if self.platform.millis().wrapping_sub(self.refresh_time) >= self.config.refresh_interval {
            self.transport.disconnect();
            log::debug!("scheduled re-registration");
            if self.heap_low() {
                return;
            }
            if self.transport.re_register() {
                self.refresh_time = self.platform.millis();
            }
        }

        if !self.platform.link_up() {
            let now = self.platform.millis();
            let due = match self.reconnect_time {
                None => true,
                Some(last) => now.wrapping_sub(last) >= self.config.reconnect_interval,
            };
            if due {
                self.reconnect_time = Some(now);
                log::warn!("link down, reconnecting");
                self.platform.reconnect_link();
            }
            return;
        }

        let link = self.transport.connected();
        match self.state {
            State::Connecting => {
                if self.transport.connect() {
                    log::info!("connected");
                    self.state = State::Connected;
                    self.backoff.clear();
                } else {
                    self.record_failure();
                }
            }
            State::Connected => {
                if link {
                    self.check_inbound();
                } else {
                    log::warn!("connection lost");
                    self.transport.disconnect();
                    self.state = State::Connecting;
                    self.record_failure();
                }
            }
            State::Disconnected => {
                self.transport.disconnect();
                self.state = State::Connecting;
            }
        }

        self.check_auto_format();
    }

    /// Disconnects instead of re-registering when the heap is short
    fn heap_low(&mut self) -> bool {
        let free = self.platform.free_heap();
        log::debug!("free heap: {}", free);
        if free < self.config.low_heap_threshold {
            log::warn!(
                "free heap {} below {}, re-registration deferred",
                free,
                self.config.low_heap_threshold
            );
            self.transport.disconnect();
            true
        } else {
            false
        }
    }

    fn record_failure(&mut self) {
        if self.initialized {
            self.backoff.record_failure(
                self.platform.millis(),
                self.config.backoff_window,
                self.config.backoff_cap,
            );
        }
    }

    fn check_inbound(&mut self) {
        if self.gate.poll(&mut self.transport) {
            let payload = self.gate.parse_payload(&self.transport);
            let marked = payload.contains(VASSISTANT_MARKER);
            let outcome = self.dispatch.parse(payload);
            log::trace!("inbound message {}", outcome.as_str());
            if outcome == ParseOutcome::Consumed || marked {
                self.gate.flush(&mut self.transport);
            }
        }
        if self.transport.aligenie_avail() {
            log::trace!("voice assistant message pending");
        }
    }

    fn check_auto_format(&mut self) {
        if !self.envelope.is_open() {
            return;
        }
        let now = self.platform.millis();
        if let Some(text) = self.envelope.tick_timeout(now, self.config.autoformat_timeout) {
            // the send error is logged inside
            let _ = self.send(text.as_str());
        }
    }

    /// Hands `data` to the transport, refusing anything longer than the envelope capacity
    pub fn send(&mut self, data: &str) -> Result<(), Error> {
        log::debug!("print: {}", data);
        if data.len() > N {
            log::error!("send data is {} bytes, over the {} bytes limit", data.len(), N);
            return Err(Error::SendTooLong);
        }
        log::debug!("free heap: {}", self.platform.free_heap());
        self.transport.print(data, self.check_delivery);
        Ok(())
    }

    fn append_field(&mut self, field: Result<Field<N>, Error>) {
        self.envelope.ensure_open();
        match field.and_then(|field| self.envelope.append(&field)) {
            Ok(()) => {}
            Err(e) => log::error!("field rejected: {}", e),
        }
        self.envelope.touch(self.platform.millis());
    }

    /// Sends `"value"` right away, outside of the envelope
    pub fn print<V: FieldValue + ?Sized>(&mut self, value: &V) {
        match Field::<N>::bare(value) {
            Ok(field) => {
                let _ = self.send(field.as_str());
            }
            Err(e) => log::error!("value rejected: {}", e),
        }
    }

    pub fn println<V: FieldValue + ?Sized>(&mut self, value: &V) {
        self.print(value)
    }

    /// Adds `"key":value` to the envelope
    pub fn print_field<V: FieldValue + ?Sized>(&mut self, key: &str, value: &V) {
        self.append_field(Field::keyed(key, value))
    }

    pub fn println_field<V: FieldValue + ?Sized>(&mut self, key: &str, value: &V) {
        self.print_field(key, value)
    }

    /// Adds `"key":"first second"` to the envelope
    pub fn print_triplet<A, B>(&mut self, key: &str, first: &A, second: &B)
    where
        A: FieldValue + ?Sized,
        B: FieldValue + ?Sized,
    {
        self.append_field(Field::triplet(key, first, second))
    }

    pub fn println_triplet<A, B>(&mut self, key: &str, first: &A, second: &B)
    where
        A: FieldValue + ?Sized,
        B: FieldValue + ?Sized,
    {
        self.print_triplet(key, first, second)
    }

    /// Adds an already serialized array, `array` is not validated
    pub fn print_array(&mut self, key: &str, array: &str) {
        self.append_field(Field::raw(key, array))
    }

    /// Adds an already serialized object, `object` is not validated
    pub fn print_object(&mut self, key: &str, object: &str) {
        self.append_field(Field::raw(key, object))
    }

    pub fn notify<V: FieldValue + ?Sized>(&mut self, message: &V) {
        self.append_field(Field::keyed(CMD_NOTICE, message))
    }

    /// Sends the envelope now instead of waiting for the timeout
    pub fn print_now(&mut self) {
        if let Some(text) = self.envelope.emit() {
            let _ = self.send(text.as_str());
        }
    }

    /// `true` exactly once per inbound message left by the dispatch layer
    pub fn available(&mut self) -> bool {
        self.gate.take_once()
    }

    /// Takes the pending inbound message, empty when there is none
    pub fn read_string(&mut self) -> ReadString {
        self.gate.read_and_clear(&mut self.transport)
    }

    pub fn data_parse(&self) -> &str {
        self.gate.parse_payload(&self.transport)
    }

    pub fn last_read(&self) -> &str {
        self.transport.last_read()
    }

    /// Drops the pending inbound message
    pub fn flush(&mut self) {
        self.gate.flush(&mut self.transport)
    }

    /// Acknowledges the pending inbound message
    pub fn is_parsed(&mut self) {
        self.flush()
    }

    /// `true` while an inbound message is pending
    pub fn parse_state(&self) -> bool {
        self.gate.has_message()
    }
}
