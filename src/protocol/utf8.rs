//! Incremental UTF-8 validation for fragmented text messages.

use crate::error::{Error, Result};

/// UTF-8 validator that tolerates code points split across fragments.
///
/// A trailing incomplete sequence in a non-final fragment is carried over to
/// the next call; anything else that is not valid UTF-8 fails immediately, so
/// a bad text message is rejected before it is fully buffered.
#[derive(Debug, Clone, Default)]
pub struct Utf8Validator {
    pending: [u8; 4],
    pending_len: usize,
}

impl Utf8Validator {
    /// Create a validator with no carried-over bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the next fragment.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUtf8` on an invalid sequence, or when the final
    /// fragment ends inside a code point.
    pub fn validate(&mut self, mut data: &[u8], is_final: bool) -> Result<()> {
        // Complete a code point left over from the previous fragment first.
        while self.pending_len > 0 {
            let Some((&next, rest)) = data.split_first() else {
                return if is_final { Err(Error::InvalidUtf8) } else { Ok(()) };
            };
            self.pending[self.pending_len] = next;
            self.pending_len += 1;
            data = rest;

            match std::str::from_utf8(&self.pending[..self.pending_len]) {
                Ok(_) => self.pending_len = 0,
                Err(e) if e.error_len().is_none() && self.pending_len < 4 => {}
                Err(_) => return Err(Error::InvalidUtf8),
            }
        }

        match std::str::from_utf8(data) {
            Ok(_) => Ok(()),
            Err(e) if e.error_len().is_none() && !is_final => {
                let tail = &data[e.valid_up_to()..];
                self.pending[..tail.len()].copy_from_slice(tail);
                self.pending_len = tail.len();
                Ok(())
            }
            Err(_) => Err(Error::InvalidUtf8),
        }
    }

    /// Discard carried-over bytes.
    pub fn reset(&mut self) {
        self.pending_len = 0;
    }

    /// Returns `true` while a code point is split across fragments.
    #[must_use]
    pub fn has_incomplete(&self) -> bool {
        self.pending_len > 0
    }
}
