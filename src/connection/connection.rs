use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::codec::{Decoded, FrameCodec};
use crate::config::Config;
use crate::connection::events::{Handler, Handlers};
use crate::connection::{ConnectionState, Outgoing, TransportStream};
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::{Frame, HandshakeRequest, HandshakeResponse, MAX_CONTROL_FRAME_PAYLOAD, OpCode};

/// Client side of an upgraded WebSocket connection.
///
/// `Connection` does no I/O of its own. The owner of the stream reports what
/// happens on it through [`on_data`](Self::on_data), [`on_end`](Self::on_end),
/// [`on_close`](Self::on_close) and [`on_error`](Self::on_error), and the
/// connection answers by writing to the transport and invoking the registered
/// handlers:
///
/// - complete text/binary messages go to `message` handlers
/// - pings are answered with a masked pong automatically
/// - pongs go to `pong` handlers
/// - a close frame is echoed, the transport ended, and `close` handlers run
/// - protocol violations close the connection with the matching status code
///
/// `close` handlers run at most once, whichever of a remote close frame, a
/// transport close or a local [`close`](Self::close) happens first.
///
/// ## Example
///
/// ```no_run
/// use std::net::TcpStream;
/// use wslink::{Config, Connection, HandshakeRequest, HandshakeResponse, Message};
///
/// # fn main() -> wslink::Result<()> {
/// let stream = TcpStream::connect("example.com:80")?;
/// let request = HandshakeRequest::new("example.com", "/chat")?;
/// // ... write `request`, read the server's answer ...
/// # let response = HandshakeResponse::for_request(&request);
/// let mut conn = Connection::new(stream, response, request, Config::default());
///
/// conn.on_message(|msg, conn| {
///     if let Some(text) = msg.as_text() {
///         let _ = conn.send(Message::text(text.to_uppercase()));
///     }
/// });
/// conn.on_close_event(|close, _| println!("closed: {}", close.code));
///
/// conn.send(Message::text("hello"))?;
/// # Ok(())
/// # }
/// ```
pub struct Connection<T> {
    transport: T,
    codec: FrameCodec,
    config: Config,
    request: HandshakeRequest,
    response: HandshakeResponse,
    close_notified: AtomicBool,
    writable: bool,
    discard_inbound: bool,
    handlers: Handlers<T>,
}

impl<T> Connection<T> {
    /// Get the upgrade request this connection was opened with.
    pub fn request(&self) -> &HandshakeRequest {
        &self.request
    }

    /// Get the server's upgrade response.
    pub fn response(&self) -> &HandshakeResponse {
        &self.response
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `Closed` once the close notification has fired.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_closed(self.close_notified.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Whether the outgoing direction is still usable.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Register a handler for complete inbound messages.
    pub fn on_message<F>(&mut self, handler: F)
    where
        F: FnMut(&Message, &mut Connection<T>) + Send + 'static,
    {
        self.handlers.message.push(Box::new(handler));
    }

    /// Register a handler for inbound pong frames.
    pub fn on_pong<F>(&mut self, handler: F)
    where
        F: FnMut(&Frame, &mut Connection<T>) + Send + 'static,
    {
        self.handlers.pong.push(Box::new(handler));
    }

    /// Register a handler for the close notification.
    pub fn on_close_event<F>(&mut self, handler: F)
    where
        F: FnMut(&CloseFrame, &mut Connection<T>) + Send + 'static,
    {
        self.handlers.close.push(Box::new(handler));
    }

    /// Register a handler for errors.
    pub fn on_error_event<F>(&mut self, handler: F)
    where
        F: FnMut(&Error, &mut Connection<T>) + Send + 'static,
    {
        self.handlers.error.push(Box::new(handler));
    }

    /// Invoke the handlers in `select(handlers)` with `event`.
    ///
    /// The list is detached while it runs so handlers may borrow the
    /// connection mutably. Handlers registered meanwhile are appended after
    /// it; a nested emission of the same event skips the running list.
    fn emit<E>(&mut self, select: fn(&mut Handlers<T>) -> &mut Vec<Handler<E, T>>, event: &E) {
        let mut running = std::mem::take(select(&mut self.handlers));
        for handler in &mut running {
            handler(event, self);
        }
        let added = std::mem::replace(select(&mut self.handlers), running);
        select(&mut self.handlers).extend(added);
    }

    fn emit_error(&mut self, err: &Error) {
        self.emit(|h| &mut h.error, err);
    }

    /// Fire the close latch. Returns `false` if it had already fired.
    fn notify_close(&mut self, frame: CloseFrame) -> bool {
        if self
            .close_notified
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(code = %frame.code, "close already notified");
            return false;
        }

        tracing::debug!(code = %frame.code, reason = %frame.reason, "connection closed");
        self.emit(|h| &mut h.close, &frame);
        true
    }
}

impl<T: TransportStream> Connection<T> {
    /// Wrap an upgraded transport.
    ///
    /// `response` and `request` are the handshake that produced `transport`;
    /// they are kept for inspection only.
    pub fn new(
        transport: T,
        response: HandshakeResponse,
        request: HandshakeRequest,
        config: Config,
    ) -> Self {
        tracing::debug!(host = %request.host, path = %request.path, "connection open");
        Self {
            transport,
            codec: FrameCodec::client(&config),
            config,
            request,
            response,
            close_notified: AtomicBool::new(false),
            writable: true,
            discard_inbound: false,
            handlers: Handlers::default(),
        }
    }

    /// Feed bytes read from the transport.
    ///
    /// Everything the bytes complete is dispatched before this returns, in
    /// arrival order.
    pub fn on_data(&mut self, data: &[u8]) {
        if self.discard_inbound {
            tracing::trace!(len = data.len(), "discarding inbound bytes");
            return;
        }

        self.codec.feed(data);
        while !self.discard_inbound {
            match self.codec.next_decoded() {
                Ok(Some(Decoded::Message(message))) => {
                    tracing::trace!(len = message.len(), "message received");
                    self.emit(|h| &mut h.message, &message);
                }
                Ok(Some(Decoded::Control(frame))) => self.handle_control(frame),
                Ok(None) => break,
                Err(err) => self.fail(&err),
            }
        }
    }

    /// The peer finished sending.
    ///
    /// Shuts the socket down in both directions when there is one and stops
    /// writing. Emits nothing; a close notification only follows from
    /// [`on_close`](Self::on_close) or a close frame.
    pub fn on_end(&mut self) {
        tracing::debug!("transport ended");
        if self.transport.has_raw_handle() {
            if let Err(err) = self.transport.shutdown(Shutdown::Both) {
                tracing::debug!(error = %err, "shutdown after end failed");
            }
            if let Err(err) = self.transport.set_nonblocking(true) {
                tracing::debug!(error = %err, "set_nonblocking after end failed");
            }
        }
        self.writable = false;
    }

    /// The transport closed. Fires the close notification with 1006 unless it
    /// already fired.
    pub fn on_close(&mut self) {
        self.notify_close(CloseFrame::new(CloseCode::AbnormalClosure, ""));
    }

    /// The transport reported an error. Always forwarded to `error` handlers.
    pub fn on_error(&mut self, err: impl Into<Error>) {
        let err = err.into();
        tracing::debug!(error = %err, "transport error");
        self.emit_error(&err);
    }

    /// Send a message, frame or raw text. Every frame is masked.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` once the transport has been ended
    /// - `Error::Io` if the transport write fails
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn send(&mut self, outgoing: impl Into<Outgoing>) -> Result<()> {
        if !self.writable {
            return Err(Error::ConnectionClosed(None));
        }

        for frame in outgoing.into().into_frames(self.config.fragment_size) {
            tracing::trace!(opcode = %frame.opcode, fin = frame.fin, len = frame.payload().len(), "send frame");
            let bytes = self.codec.encode(&frame, true);
            self.transport.write(&bytes)?;
        }
        Ok(())
    }

    /// Close the connection.
    ///
    /// Writes an unmasked close frame carrying `code` and `reason`, fires the
    /// close notification, then ends the transport. Writing and ending are
    /// skipped once the transport has already been ended; the notification
    /// fires regardless, unless it already has.
    ///
    /// # Errors
    ///
    /// - `Error::ControlFrameTooLarge` if `reason` does not fit a control
    ///   frame; nothing else happens in that case
    /// - `Error::Io` if writing the frame or ending the transport fails
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn close(&mut self, code: impl Into<CloseCode>, reason: &str) -> Result<()> {
        let frame = CloseFrame::new(code, reason);
        tracing::debug!(code = %frame.code, reason = %frame.reason, writable = self.writable, "closing");
        let payload = frame.to_payload();
        if payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ControlFrameTooLarge(payload.len()));
        }

        // Stop writing before handlers run, so a nested close sends nothing.
        let sending = std::mem::replace(&mut self.writable, false);
        let written = if sending {
            let bytes = self.codec.encode(&Frame::new(true, OpCode::Close, payload), false);
            self.transport.write(&bytes).map_err(Error::from)
        } else {
            Ok(())
        };

        self.notify_close(frame);
        let ended = if sending {
            self.transport.end().map_err(Error::from)
        } else {
            Ok(())
        };
        written.and(ended)
    }

    /// [`close`](Self::close) with 1000 and an empty reason.
    ///
    /// # Errors
    ///
    /// As for [`close`](Self::close).
    pub fn close_normal(&mut self) -> Result<()> {
        self.close(CloseCode::Normal, "")
    }

    fn end_transport(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        self.writable = false;
        self.transport.end()?;
        Ok(())
    }

    fn handle_control(&mut self, frame: Frame) {
        match frame.opcode {
            OpCode::Close => {
                let close = CloseFrame::from_payload(frame.payload());
                tracing::debug!(code = %close.code, "close frame received");
                self.discard_inbound = true;
                self.notify_close(close);

                if self.writable {
                    // A payload without a status code is echoed empty.
                    let payload = if frame.payload().len() < 2 {
                        bytes::Bytes::new()
                    } else {
                        frame.into_payload()
                    };
                    let echo = Frame::new(true, OpCode::Close, payload);
                    let bytes = self.codec.encode(&echo, true);
                    if let Err(err) = self.transport.write(&bytes) {
                        self.emit_error(&err.into());
                    }
                }
                if let Err(err) = self.end_transport() {
                    self.emit_error(&err);
                }
            }
            OpCode::Ping => {
                tracing::trace!(len = frame.payload().len(), "ping received, sending pong");
                if let Err(err) = self.send(Frame::pong(frame.into_payload())) {
                    self.emit_error(&err);
                }
            }
            OpCode::Pong => {
                tracing::trace!(len = frame.payload().len(), "pong received");
                self.emit(|h| &mut h.pong, &frame);
            }
            other => {
                tracing::warn!(opcode = %other, "unexpected control opcode, closing");
                self.discard_inbound = true;
                self.codec.clear();
                if let Err(err) = self.close(CloseCode::ProtocolError, "") {
                    self.emit_error(&err);
                }
            }
        }
    }

    fn fail(&mut self, err: &Error) {
        let code = err.close_code();
        tracing::warn!(error = %err, code = %code, "protocol violation, closing");
        self.discard_inbound = true;
        self.codec.clear();
        if let Err(close_err) = self.close(code, "") {
            self.emit_error(&close_err);
        }
    }
}
