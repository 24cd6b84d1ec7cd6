//! Shared fixtures for connection tests: a transport that records what the
//! connection does to it, and recorders for the four connection events.

#![allow(dead_code)]

use std::io;
use std::net::Shutdown;
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use wslink::protocol::FrameHeader;
use wslink::{
    CloseFrame, Config, Connection, Error, Frame, HandshakeRequest, HandshakeResponse, Message,
    TransportStream,
};

/// One call the connection made on its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(Vec<u8>),
    End,
    Shutdown(Shutdown),
    NonBlocking(bool),
}

/// A frame the connection wrote, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub frame: Frame,
    pub masked: bool,
}

/// Transport double. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    ops: Arc<Mutex<Vec<Op>>>,
    raw_handle: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that claims to wrap an OS socket.
    pub fn with_raw_handle() -> Self {
        Self {
            raw_handle: true,
            ..Self::default()
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    pub fn ended(&self) -> usize {
        self.ops().iter().filter(|op| **op == Op::End).count()
    }

    /// Every write decoded as exactly one frame.
    pub fn written(&self) -> Vec<Written> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Write(bytes) => Some(bytes),
                _ => None,
            })
            .map(|bytes| {
                let header = FrameHeader::parse(&bytes).unwrap();
                let (frame, consumed) = Frame::parse(&bytes).unwrap();
                assert_eq!(consumed, bytes.len(), "one write should carry one frame");
                Written {
                    frame,
                    masked: header.mask.is_some(),
                }
            })
            .collect()
    }
}

impl TransportStream for RecordingTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.ops.lock().unwrap().push(Op::Write(data.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        self.ops.lock().unwrap().push(Op::End);
        Ok(())
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        self.ops.lock().unwrap().push(Op::Shutdown(how));
        Ok(())
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        self.ops.lock().unwrap().push(Op::NonBlocking(nonblocking));
        Ok(())
    }

    fn has_raw_handle(&self) -> bool {
        self.raw_handle
    }
}

/// Everything the connection emitted.
#[derive(Debug, Clone, Default)]
pub struct Events {
    pub messages: Arc<Mutex<Vec<Message>>>,
    pub pongs: Arc<Mutex<Vec<Frame>>>,
    pub closes: Arc<Mutex<Vec<CloseFrame>>>,
    pub errors: Arc<Mutex<Vec<Error>>>,
}

impl Events {
    /// Register recorders on `conn`.
    pub fn attach<T: 'static>(conn: &mut Connection<T>) -> Self {
        let events = Self::default();

        let messages = Arc::clone(&events.messages);
        conn.on_message(move |msg, _| messages.lock().unwrap().push(msg.clone()));
        let pongs = Arc::clone(&events.pongs);
        conn.on_pong(move |frame, _| pongs.lock().unwrap().push(frame.clone()));
        let closes = Arc::clone(&events.closes);
        conn.on_close_event(move |frame, _| closes.lock().unwrap().push(frame.clone()));
        let errors = Arc::clone(&events.errors);
        conn.on_error_event(move |err, _| errors.lock().unwrap().push(err.clone()));

        events
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn pongs(&self) -> Vec<Frame> {
        self.pongs.lock().unwrap().clone()
    }

    pub fn closes(&self) -> Vec<CloseFrame> {
        self.closes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<Error> {
        self.errors.lock().unwrap().clone()
    }
}

pub fn handshake() -> (HandshakeRequest, HandshakeResponse) {
    let request = HandshakeRequest::new("localhost", "/ws").unwrap();
    let response = HandshakeResponse::for_request(&request);
    (request, response)
}

/// A connection over a fresh [`RecordingTransport`].
pub fn connect(
    transport: RecordingTransport,
    config: Config,
) -> (Connection<RecordingTransport>, RecordingTransport, Events) {
    let (request, response) = handshake();
    let mut conn = Connection::new(transport.clone(), response, request, config);
    let events = Events::attach(&mut conn);
    (conn, transport, events)
}

/// A frame as a server would send it: unmasked.
pub fn server_frame(frame: &Frame) -> Vec<u8> {
    let mut buf = BytesMut::new();
    frame.write(&mut buf, None);
    buf.to_vec()
}

/// Concatenated server encodings of `frames`.
pub fn server_frames(frames: &[Frame]) -> Vec<u8> {
    frames.iter().flat_map(server_frame).collect()
}
