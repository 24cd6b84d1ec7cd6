//! # wslink - client-side WebSocket connection lifecycle
//!
//! `wslink` takes a byte stream that has already been upgraded to the
//! WebSocket protocol and runs the rest of the session on it (RFC 6455):
//!
//! - **Frame dispatch**: inbound bytes become `message`, `pong`, `close`
//!   and `error` events on per-connection handler lists
//! - **Automatic replies**: pings are answered with pongs, close frames are
//!   echoed and the stream is ended
//! - **Idempotent close**: the `close` event fires exactly once, whatever
//!   combination of remote close, transport close and local close happens
//! - **Strict validation**: masked server frames, reserved bits and opcodes,
//!   size limits and invalid UTF-8 close the connection with the right code
//!
//! The [`Connection`] does no I/O itself. Drive it from any event loop by
//! calling its `on_*` methods, or use [`Connection::with_io`] and a
//! [`Pump`](connection::Pump) to run it over a tokio stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wslink::{Config, Connection, HandshakeRequest, HandshakeResponse, Message};
//!
//! # async fn run(stream: tokio::net::TcpStream, response: HandshakeResponse,
//! #              request: HandshakeRequest) {
//! let (mut conn, pump) = Connection::with_io(stream, response, request, Config::default());
//! conn.on_message(|msg, _| println!("received {msg:?}"));
//! conn.send(Message::text("hello")).ok();
//! pump.run(&mut conn).await;
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod protocol;

pub use codec::{Decoded, FrameCodec};
pub use config::{Config, Limits};
pub use connection::{Connection, ConnectionState, Outgoing, Role, TransportStream};
pub use error::{Error, Result};
pub use message::{CloseCode, CloseFrame, Message};
pub use protocol::{
    Frame, HandshakeRequest, HandshakeResponse, OpCode, WS_GUID, compute_accept_key,
};
