//! The byte stream a [`Connection`](super::Connection) writes to.

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

/// Write side of an upgraded duplex stream.
///
/// `write` must not block for long: it either completes or enqueues. The read
/// side is driven by whoever owns the stream, through the connection's `on_*`
/// entry points.
pub trait TransportStream {
    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Finish the outgoing direction. Nothing is written afterwards.
    fn end(&mut self) -> io::Result<()>;

    /// Shut down one or both directions of the underlying socket.
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        let _ = how;
        Ok(())
    }

    /// Toggle non-blocking mode on the underlying socket.
    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        let _ = nonblocking;
        Ok(())
    }

    /// Whether the stream is backed by an OS socket handle that
    /// [`shutdown`](Self::shutdown) and [`set_nonblocking`](Self::set_nonblocking)
    /// act on.
    fn has_raw_handle(&self) -> bool {
        false
    }
}

impl TransportStream for TcpStream {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)
    }

    fn end(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Write)
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        TcpStream::shutdown(self, how)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }

    fn has_raw_handle(&self) -> bool {
        true
    }
}

impl<T: TransportStream + ?Sized> TransportStream for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn end(&mut self) -> io::Result<()> {
        (**self).end()
    }

    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        (**self).shutdown(how)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> io::Result<()> {
        (**self).set_nonblocking(nonblocking)
    }

    fn has_raw_handle(&self) -> bool {
        (**self).has_raw_handle()
    }
}
