use core::fmt;

#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(any(feature = "std", test), derive(Debug))]
pub enum Error {
    /// appending the field would push the envelope over its capacity
    EnvelopeFull,
    /// the formatted field alone does not fit an empty envelope
    FieldTooLong,
    /// [`crate::MergePolicy::Replace`] cannot track more fields
    FieldIndexFull,
    /// outgoing payload is longer than the send limit
    SendTooLong,
    /// bare values are sent on their own, an envelope only holds `"key":value` fields
    MissingKey,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::EnvelopeFull => write!(f, "format data size is over the envelope limit"),
            Error::FieldTooLong => write!(f, "single field is longer than the envelope limit"),
            Error::FieldIndexFull => write!(f, "too many fields in one envelope"),
            Error::SendTooLong => write!(f, "send data bytes over the limit"),
            Error::MissingKey => write!(f, "envelope field has no key"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
