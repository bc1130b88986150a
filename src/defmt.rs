use defmt::Formatter;

use crate::config::MergePolicy;
use crate::error::Error;
use crate::protocol::{Inbound, State};
use crate::transport::ParseOutcome;

impl defmt::Format for State {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "State::{=str}", self.as_str())
    }
}

impl defmt::Format for Inbound {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "Inbound::{=str}", self.as_str())
    }
}

impl defmt::Format for ParseOutcome {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "ParseOutcome::{=str}", self.as_str())
    }
}

impl defmt::Format for MergePolicy {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "MergePolicy::{=str}", self.as_str())
    }
}

impl defmt::Format for Error {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            Error::EnvelopeFull => defmt::write!(fmt, "Error::EnvelopeFull"),
            Error::FieldTooLong => defmt::write!(fmt, "Error::FieldTooLong"),
            Error::FieldIndexFull => defmt::write!(fmt, "Error::FieldIndexFull"),
            Error::SendTooLong => defmt::write!(fmt, "Error::SendTooLong"),
            Error::MissingKey => defmt::write!(fmt, "Error::MissingKey"),
        }
    }
}
