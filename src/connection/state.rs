//! Close state of a connection.

/// Whether the close notification has fired.
///
/// `Open -> Closed` is the only transition and `Closed` is terminal. Ending
/// the transport does not change the state; only the close notification does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No close notification yet.
    #[default]
    Open,
    /// The close notification has been emitted.
    Closed,
}

impl ConnectionState {
    #[must_use]
    #[inline]
    pub(crate) const fn from_closed(closed: bool) -> Self {
        if closed {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    /// Returns `true` for `Open`.
    #[must_use]
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
