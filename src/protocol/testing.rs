//! Scripted collaborators for the driver tests
use core::cell::Cell;
use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec::Vec;

use crate::transport::{Dispatch, ParseOutcome, Platform, Transport};

#[derive(Default)]
pub struct MockTransport {
    pub init_ok: bool,
    pub connect_ok: bool,
    pub reregister_ok: bool,
    pub is_connected: bool,
    pub aligenie: bool,
    pub inbound: VecDeque<String>,
    pub last: String,
    pub sent: Vec<(String, bool)>,
    pub init_calls: usize,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub reregister_calls: usize,
    pub flush_calls: usize,
    pub aligenie_calls: usize,
}

impl MockTransport {
    /// Transport which initializes, connects and re-registers successfully
    pub fn healthy() -> Self {
        Self {
            init_ok: true,
            connect_ok: true,
            reregister_ok: true,
            ..Default::default()
        }
    }

    pub fn push_inbound(&mut self, msg: &str) {
        self.inbound.push_back(msg.to_string());
    }

    pub fn sent_texts(&self) -> Vec<&str> {
        self.sent.iter().map(|(text, _)| text.as_str()).collect()
    }
}

impl Transport for MockTransport {
    fn init(&mut self) -> bool {
        self.init_calls += 1;
        self.init_ok
    }

    fn connect(&mut self) -> bool {
        self.connect_calls += 1;
        if self.connect_ok {
            self.is_connected = true;
        }
        self.connect_ok
    }

    fn connected(&mut self) -> bool {
        self.is_connected
    }

    fn disconnect(&mut self) {
        self.disconnect_calls += 1;
        self.is_connected = false;
    }

    fn re_register(&mut self) -> bool {
        self.reregister_calls += 1;
        self.reregister_ok
    }

    fn available(&mut self) -> bool {
        match self.inbound.pop_front() {
            Some(msg) => {
                self.last = msg;
                true
            }
            None => false,
        }
    }

    fn last_read(&self) -> &str {
        self.last.as_str()
    }

    fn flush(&mut self) {
        self.flush_calls += 1;
    }

    fn print(&mut self, data: &str, checked: bool) {
        self.sent.push((data.to_string(), checked));
    }

    fn aligenie_avail(&mut self) -> bool {
        self.aligenie_calls += 1;
        self.aligenie
    }
}

/// Board with a clock advancing by `step` ms on every read
pub struct MockPlatform {
    pub now: Cell<u32>,
    pub step: u32,
    pub free_heap: u32,
    pub link_up: bool,
    pub link_reconnects: usize,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            step: 0,
            free_heap: 40_000,
            link_up: true,
            link_reconnects: 0,
        }
    }

    pub fn stepping(step: u32) -> Self {
        Self {
            step,
            ..Self::new()
        }
    }

    pub fn set(&self, now: u32) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Platform for MockPlatform {
    fn millis(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }

    fn free_heap(&self) -> u32 {
        self.free_heap
    }

    fn link_up(&self) -> bool {
        self.link_up
    }

    fn reconnect_link(&mut self) {
        self.link_reconnects += 1;
    }
}

pub struct MockDispatch {
    pub ntp_ok: bool,
    pub outcome: ParseOutcome,
    pub parsed: Vec<String>,
    pub ntp_calls: usize,
}

impl MockDispatch {
    pub fn new(outcome: ParseOutcome) -> Self {
        Self {
            ntp_ok: true,
            outcome,
            parsed: Vec::new(),
            ntp_calls: 0,
        }
    }
}

impl Dispatch for MockDispatch {
    fn parse(&mut self, payload: &str) -> ParseOutcome {
        self.parsed.push(payload.to_string());
        self.outcome
    }

    fn ntp_init(&mut self) -> bool {
        self.ntp_calls += 1;
        self.ntp_ok
    }
}
