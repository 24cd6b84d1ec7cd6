//! The connection lifecycle: event dispatch, automatic control-frame replies,
//! outbound framing and the close handshake.
//!
//! ## Lifecycle
//!
//! 1. **Open** - after [`Connection::new`]; messages flow both ways
//! 2. **Closed** - the close notification fired, from a close frame, a
//!    transport close or a local [`Connection::close`]
//!
//! Ending the transport stops outbound traffic but is not a close by itself.

#[allow(clippy::module_inception)]
mod connection;
mod events;
mod fragmenter;
mod outgoing;
mod role;
mod state;
mod transport;

#[cfg(feature = "async-tokio")]
mod pump;

pub use connection::Connection;
pub use events::{CloseHandler, ErrorHandler, Handler, MessageHandler, PongHandler};
pub use fragmenter::MessageFragmenter;
pub use outgoing::Outgoing;
pub use role::Role;
pub use state::ConnectionState;
pub use transport::TransportStream;

#[cfg(feature = "async-tokio")]
pub use pump::{ChannelTransport, Pump};
