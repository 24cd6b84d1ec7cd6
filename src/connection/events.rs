//! Per-connection event handler lists.

use crate::connection::Connection;
use crate::error::Error;
use crate::message::{CloseFrame, Message};
use crate::protocol::Frame;

/// A registered callback for events of type `E`.
///
/// Handlers receive the connection so they can reply or close from inside
/// the callback.
pub type Handler<E, T> = Box<dyn FnMut(&E, &mut Connection<T>) + Send>;

/// Called with each complete inbound text or binary message.
pub type MessageHandler<T> = Handler<Message, T>;
/// Called with each inbound pong frame.
pub type PongHandler<T> = Handler<Frame, T>;
/// Called once, when the connection closes.
pub type CloseHandler<T> = Handler<CloseFrame, T>;
/// Called with each transport or auto-reply error.
pub type ErrorHandler<T> = Handler<Error, T>;

pub(crate) struct Handlers<T> {
    pub(crate) message: Vec<MessageHandler<T>>,
    pub(crate) pong: Vec<PongHandler<T>>,
    pub(crate) close: Vec<CloseHandler<T>>,
    pub(crate) error: Vec<ErrorHandler<T>>,
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self {
            message: Vec::new(),
            pong: Vec::new(),
            close: Vec::new(),
            error: Vec::new(),
        }
    }
}
