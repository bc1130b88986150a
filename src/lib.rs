//! Device side driver of the Blinker IoT protocol.
//!
//! [`Protocol`] keeps a broker session alive over an unreliable link: it connects, counts failures,
//! re-registers the device when the failures pile up (or every two days), and gives up on
//! re-registration while the heap is short. Outgoing fields are batched into one `{...}`
//! envelope, inbound messages are handed to a [`Dispatch`] layer and surfaced to pollers once.
//!
//! The broker session, the board and the dispatch layer are supplied by the caller through the
//! [`Transport`], [`Platform`] and [`Dispatch`] traits.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// include defmt::Format implementations
// we don't want them derive()d in the modules unless defmt-impl feature is set
#[cfg(feature = "defmt-impl")]
pub mod defmt;

// reexport heapless
pub use heapless;

pub use config::{Config, MergePolicy, ReadString};
pub use error::Error;
pub use protocol::{Inbound, Protocol, State};
pub use transport::{Dispatch, ParseOutcome, Platform, Transport};
