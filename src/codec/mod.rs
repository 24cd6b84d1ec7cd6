//! Sans-IO frame codec.
//!
//! [`FrameCodec`] turns inbound bytes into decoded messages and control
//! frames, and outbound frames into (optionally masked) wire bytes. It never
//! touches a socket; the connection feeds it and writes what it produces.

mod framed;

pub use framed::{Decoded, FrameCodec};
