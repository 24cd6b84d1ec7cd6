//! Splitting outgoing messages into frames.

use bytes::Bytes;

use crate::protocol::{Frame, OpCode};

/// Iterator over the frames of one outgoing message.
///
/// The first frame carries the message opcode, the rest are continuations,
/// and only the last has FIN set. Fragments are zero-copy slices of the
/// payload. An empty payload still yields one empty FIN frame.
#[derive(Debug)]
pub struct MessageFragmenter {
    payload: Bytes,
    opcode: OpCode,
    fragment_size: usize,
    is_first: bool,
}

impl MessageFragmenter {
    /// Fragment `payload` into frames of at most `fragment_size` bytes.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>, opcode: OpCode, fragment_size: usize) -> Self {
        Self {
            payload: payload.into(),
            opcode,
            fragment_size: fragment_size.max(1),
            is_first: true,
        }
    }

    /// Fragmenter that never splits; used for control messages.
    #[must_use]
    pub fn single(payload: impl Into<Bytes>, opcode: OpCode) -> Self {
        Self::new(payload, opcode, usize::MAX)
    }

    /// Payload bytes not yet handed out.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.payload.len()
    }
}

impl Iterator for MessageFragmenter {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.payload.is_empty() && !self.is_first {
            return None;
        }

        let chunk_size = self.payload.len().min(self.fragment_size);
        let chunk = self.payload.split_to(chunk_size);
        let opcode = if std::mem::take(&mut self.is_first) {
            self.opcode
        } else {
            OpCode::Continuation
        };

        Some(Frame::new(self.payload.is_empty(), opcode, chunk))
    }
}
