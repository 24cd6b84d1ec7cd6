//! What [`Connection::send`](super::Connection::send) accepts.

use bytes::Bytes;

use crate::connection::fragmenter::MessageFragmenter;
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// An outbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// A message, fragmented by the configured fragment size. Control
    /// messages are never fragmented.
    Message(Message),
    /// A prebuilt frame, written as-is apart from masking.
    Frame(Frame),
    /// Raw bytes, sent as a single final text frame.
    Raw(Bytes),
}

impl Outgoing {
    /// The frames this payload is sent as, in order.
    #[must_use]
    pub fn into_frames(self, fragment_size: usize) -> Vec<Frame> {
        match self {
            Outgoing::Message(message) => {
                let (opcode, payload) = split_message(message);
                if opcode.is_control() {
                    MessageFragmenter::single(payload, opcode).collect()
                } else {
                    MessageFragmenter::new(payload, opcode, fragment_size).collect()
                }
            }
            Outgoing::Frame(frame) => vec![frame],
            Outgoing::Raw(bytes) => vec![Frame::text(bytes)],
        }
    }
}

fn split_message(message: Message) -> (OpCode, Bytes) {
    match message {
        Message::Text(text) => (OpCode::Text, Bytes::from(text)),
        Message::Binary(data) => (OpCode::Binary, Bytes::from(data)),
        Message::Ping(data) => (OpCode::Ping, Bytes::from(data)),
        Message::Pong(data) => (OpCode::Pong, Bytes::from(data)),
        Message::Close(frame) => (
            OpCode::Close,
            frame.map(|f| Bytes::from(f.to_payload())).unwrap_or_default(),
        ),
    }
}

impl From<Message> for Outgoing {
    fn from(message: Message) -> Self {
        Outgoing::Message(message)
    }
}

impl From<Frame> for Outgoing {
    fn from(frame: Frame) -> Self {
        Outgoing::Frame(frame)
    }
}

impl From<Bytes> for Outgoing {
    fn from(bytes: Bytes) -> Self {
        Outgoing::Raw(bytes)
    }
}

impl From<&str> for Outgoing {
    fn from(s: &str) -> Self {
        Outgoing::Raw(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Outgoing {
    fn from(s: String) -> Self {
        Outgoing::Raw(Bytes::from(s))
    }
}
