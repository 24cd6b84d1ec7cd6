//! Reassembly of fragmented data frames into messages.

use bytes::BytesMut;

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::utf8::Utf8Validator;
use crate::protocol::{Frame, OpCode};

/// Reassembles data frames into complete [`Message`]s.
///
/// Control frames may arrive between fragments; they are not passed here.
#[derive(Debug)]
pub struct MessageAssembler {
    buffer: BytesMut,
    opcode: Option<OpCode>,
    fragment_count: usize,
    utf8: Utf8Validator,
    limits: Limits,
}

impl MessageAssembler {
    /// Create an idle assembler enforcing `limits`.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            opcode: None,
            fragment_count: 0,
            utf8: Utf8Validator::new(),
            limits,
        }
    }

    /// Add a data frame. Returns the message once the FIN frame arrives.
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a continuation without a started
    ///   message, a new message before the previous one finished, or a
    ///   non-data frame
    /// - `Error::TooManyFragments` / `Error::MessageTooLarge` on limit breach
    /// - `Error::InvalidUtf8` as soon as a text message stops being UTF-8
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>> {
        match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "Unexpected continuation frame".into(),
                ));
            }
            (OpCode::Continuation, Some(_)) => {}
            (OpCode::Text | OpCode::Binary, None) => self.opcode = Some(frame.opcode),
            (OpCode::Text | OpCode::Binary, Some(_)) => {
                return Err(Error::ProtocolViolation(
                    "Expected continuation frame".into(),
                ));
            }
            (other, _) => {
                return Err(Error::ProtocolViolation(format!(
                    "{other} frame is not a data frame"
                )));
            }
        }

        self.fragment_count += 1;
        self.limits.check_fragment_count(self.fragment_count)?;
        self.limits
            .check_message_size(self.buffer.len() + frame.payload().len())?;

        if self.opcode == Some(OpCode::Text) {
            self.utf8.validate(frame.payload(), frame.fin)?;
        }
        self.buffer.extend_from_slice(frame.payload());

        if !frame.fin {
            return Ok(None);
        }

        let payload = self.buffer.split().to_vec();
        let opcode = self.opcode.take();
        self.fragment_count = 0;
        self.utf8.reset();

        let message = if opcode == Some(OpCode::Text) {
            Message::Text(String::from_utf8(payload).map_err(|_| Error::InvalidUtf8)?)
        } else {
            Message::Binary(payload)
        };
        Ok(Some(message))
    }

    /// Returns `true` while a fragmented message is in progress.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    /// Drop any partially assembled message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.opcode = None;
        self.fragment_count = 0;
        self.utf8.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> MessageAssembler {
        MessageAssembler::new(Limits::default())
    }

    #[test]
    fn test_single_frame_message() {
        let mut asm = assembler();
        let msg = asm.push(Frame::text(b"Hello".to_vec())).unwrap();
        assert_eq!(msg, Some(Message::text("Hello")));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_fragmented_binary() {
        let mut asm = assembler();
        assert!(asm.push(Frame::new(false, OpCode::Binary, vec![1, 2])).unwrap().is_none());
        assert!(asm.is_assembling());
        assert!(asm.push(Frame::new(false, OpCode::Continuation, vec![3])).unwrap().is_none());
        let msg = asm.push(Frame::new(true, OpCode::Continuation, vec![4])).unwrap();
        assert_eq!(msg, Some(Message::binary(vec![1, 2, 3, 4])));
        assert!(!asm.is_assembling());
    }

    #[test]
    fn test_text_split_inside_code_point() {
        let bytes = "🎉".as_bytes();
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Text, bytes[..2].to_vec())).unwrap();
        let msg = asm
            .push(Frame::new(true, OpCode::Continuation, bytes[2..].to_vec()))
            .unwrap();
        assert_eq!(msg, Some(Message::text("🎉")));
    }

    #[test]
    fn test_invalid_utf8_rejected_early() {
        let mut asm = assembler();
        let result = asm.push(Frame::new(false, OpCode::Text, vec![0x80]));
        assert!(matches!(result, Err(Error::InvalidUtf8)));
    }

    #[test]
    fn test_binary_skips_utf8() {
        let mut asm = assembler();
        let msg = asm.push(Frame::binary(vec![0x80, 0xff])).unwrap();
        assert_eq!(msg, Some(Message::binary(vec![0x80, 0xff])));
    }

    #[test]
    fn test_sequencing_errors() {
        let mut asm = assembler();
        let result = asm.push(Frame::new(true, OpCode::Continuation, b"x".to_vec()));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));

        asm.push(Frame::new(false, OpCode::Text, b"first".to_vec())).unwrap();
        let result = asm.push(Frame::text(b"second".to_vec()));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_control_frame_rejected() {
        let mut asm = assembler();
        let result = asm.push(Frame::ping(b"p".to_vec()));
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_limits() {
        let mut asm = MessageAssembler::new(Limits::new(1024, 100, 2, 4096));
        let result = asm.push(Frame::binary(vec![0u8; 101]));
        assert!(matches!(result, Err(Error::MessageTooLarge { .. })));

        let mut asm = MessageAssembler::new(Limits::new(1024, 100, 2, 4096));
        asm.push(Frame::new(false, OpCode::Binary, vec![1])).unwrap();
        asm.push(Frame::new(false, OpCode::Continuation, vec![2])).unwrap();
        let result = asm.push(Frame::new(true, OpCode::Continuation, vec![3]));
        assert!(matches!(result, Err(Error::TooManyFragments { count: 3, max: 2 })));
    }

    #[test]
    fn test_reset() {
        let mut asm = assembler();
        asm.push(Frame::new(false, OpCode::Text, b"partial".to_vec())).unwrap();
        asm.reset();
        assert!(!asm.is_assembling());
        assert_eq!(
            asm.push(Frame::text(b"fresh".to_vec())).unwrap(),
            Some(Message::text("fresh"))
        );
    }
}
