//! Outgoing envelope
//!
//! Fields are collected into one `{...}` text of at most `N` bytes. The envelope is open exactly
//! while its buffer exists: the first appended field opens it, [`Envelope::emit`] closes it and
//! hands the finished text out. Space for the closing brace is reserved on every append, so an
//! accepted field can always be closed.
use heapless::{String, Vec};

use super::field::Field;
use crate::config::{MergePolicy, MAX_ENVELOPE_FIELDS};
use crate::error::Error;

pub struct Envelope<const N: usize> {
    buf: Option<String<N>>,
    /// byte offsets of field starts, kept for [`MergePolicy::Replace`] only
    starts: Vec<usize, MAX_ENVELOPE_FIELDS>,
    policy: MergePolicy,
    fresh_time: u32,
}

impl<const N: usize> Envelope<N> {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            buf: None,
            starts: Vec::new(),
            policy,
            fresh_time: 0,
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn is_open(&self) -> bool {
        self.buf.is_some()
    }

    /// Text collected so far, without the closing brace
    pub fn as_str(&self) -> &str {
        match &self.buf {
            Some(buf) => buf.as_str(),
            None => "",
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn ensure_open(&mut self) {
        if self.buf.is_none() {
            self.starts.clear();
            self.buf = Some(String::new());
        }
    }

    /// Stamps the last activity used by [`Envelope::tick_timeout`]
    pub fn touch(&mut self, now: u32) {
        self.fresh_time = now;
    }

    /// Adds `field`, opening the envelope if needed
    ///
    /// A rejected field leaves the collected text unchanged and the envelope open. Bare fields
    /// are rejected with [`Error::MissingKey`].
    pub fn append(&mut self, field: &Field<N>) -> Result<(), Error> {
        self.ensure_open();
        log::trace!("append field: {}", field.as_str());

        let prefix = field.key_prefix().ok_or(Error::MissingKey)?;
        if self.policy == MergePolicy::Replace {
            if let Some(index) = self.find(prefix) {
                return self.replace(index, field);
            }
        }

        let buf = self.buf.get_or_insert_with(String::new);
        // separator + field + reserved closing brace
        if buf.len() + field.len() + 2 > N {
            return Err(if buf.is_empty() {
                Error::FieldTooLong
            } else {
                Error::EnvelopeFull
            });
        }
        if self.policy == MergePolicy::Replace && self.starts.len() == MAX_ENVELOPE_FIELDS {
            return Err(Error::FieldIndexFull);
        }

        let separator = if buf.is_empty() { '{' } else { ',' };
        buf.push(separator).map_err(|_| Error::EnvelopeFull)?;
        let start = buf.len();
        buf.push_str(field.as_str())
            .map_err(|_| Error::EnvelopeFull)?;
        if self.policy == MergePolicy::Replace {
            self.starts.push(start).map_err(|_| Error::FieldIndexFull)?;
        }
        Ok(())
    }

    /// Closes the envelope and returns its text, `None` when closed or still empty
    pub fn emit(&mut self) -> Option<String<N>> {
        match &self.buf {
            Some(buf) if !buf.is_empty() => {}
            _ => return None,
        }
        let mut buf = self.buf.take()?;
        self.starts.clear();
        if buf.push('}').is_err() {
            log::error!("envelope lost its closing brace reservation");
            return None;
        }
        Some(buf)
    }

    /// Emits the envelope once `timeout` ms passed since the last [`Envelope::touch`]
    ///
    /// An open envelope without fields is released without output.
    pub fn tick_timeout(&mut self, now: u32, timeout: u32) -> Option<String<N>> {
        if self.buf.is_none() || now.wrapping_sub(self.fresh_time) < timeout {
            return None;
        }
        let emitted = self.emit();
        self.close();
        emitted
    }

    /// Drops the envelope without emitting it
    pub fn close(&mut self) {
        self.buf = None;
        self.starts.clear();
    }

    fn field_at(&self, index: usize) -> &str {
        let text = self.as_str();
        let start = self.starts[index];
        let end = match self.starts.get(index + 1) {
            Some(next) => next - 1,
            None => text.len(),
        };
        &text[start..end]
    }

    fn find(&self, prefix: &str) -> Option<usize> {
        (0..self.starts.len()).find(|&i| self.field_at(i).starts_with(prefix))
    }

    /// Rebuilds the envelope without field `index` and with `field` appended
    fn replace(&mut self, index: usize, field: &Field<N>) -> Result<(), Error> {
        let kept_len: usize = (0..self.starts.len())
            .filter(|&i| i != index)
            .map(|i| self.field_at(i).len() + 1)
            .sum();
        // kept fields with their separators + field + closing brace
        if 1 + kept_len + field.len() + 1 > N {
            return Err(Error::EnvelopeFull);
        }

        let mut rebuilt = String::<N>::new();
        let mut starts = Vec::<usize, MAX_ENVELOPE_FIELDS>::new();
        let kept = (0..self.starts.len())
            .filter(|&i| i != index)
            .map(|i| self.field_at(i))
            .chain(core::iter::once(field.as_str()));
        for text in kept {
            let separator = if rebuilt.is_empty() { '{' } else { ',' };
            rebuilt.push(separator).map_err(|_| Error::EnvelopeFull)?;
            starts.push(rebuilt.len()).map_err(|_| Error::FieldIndexFull)?;
            rebuilt.push_str(text).map_err(|_| Error::EnvelopeFull)?;
        }

        self.buf = Some(rebuilt);
        self.starts = starts;
        Ok(())
    }
}

impl<const N: usize> Default for Envelope<N> {
    fn default() -> Self {
        Self::new(MergePolicy::default())
    }
}
