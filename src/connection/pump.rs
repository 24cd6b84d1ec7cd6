//! Driving a [`Connection`] over a tokio byte stream.
//!
//! The connection itself never awaits. Its writes go into an unbounded
//! channel ([`ChannelTransport`]) and a [`Pump`] moves bytes between the
//! stream and the connection.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::connection::{Connection, TransportStream};
use crate::protocol::{HandshakeRequest, HandshakeResponse};

#[derive(Debug)]
enum WriteOp {
    Data(Bytes),
    End,
}

/// Transport that queues writes for a [`Pump`].
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<WriteOp>,
}

impl ChannelTransport {
    fn queue(&self, op: WriteOp) -> io::Result<()> {
        self.tx
            .send(op)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "transport pump stopped"))
    }
}

impl TransportStream for ChannelTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.queue(WriteOp::Data(Bytes::copy_from_slice(data)))
    }

    fn end(&mut self) -> io::Result<()> {
        self.queue(WriteOp::End)
    }
}

/// Moves bytes between an async stream and its [`Connection`].
#[derive(Debug)]
pub struct Pump<S> {
    io: S,
    rx: mpsc::UnboundedReceiver<WriteOp>,
    read_buffer_size: usize,
}

impl Connection<ChannelTransport> {
    /// Wrap an upgraded async stream.
    ///
    /// Returns the connection and the [`Pump`] that must be
    /// [`run`](Pump::run) for anything to be read or written.
    pub fn with_io<S>(
        io: S,
        response: HandshakeResponse,
        request: HandshakeRequest,
        config: Config,
    ) -> (Self, Pump<S>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let pump = Pump {
            io,
            rx,
            read_buffer_size: config.read_buffer_size.max(1),
        };
        (Self::new(ChannelTransport { tx }, response, request, config), pump)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Pump<S> {
    /// Run until the peer stops sending.
    ///
    /// Reads are fed to [`Connection::on_data`]; end of stream calls
    /// [`Connection::on_end`] and read or write failures go to
    /// [`Connection::on_error`]. Queued writes are flushed in order, and the
    /// write half is shut down when the connection ends the transport. Once
    /// reading has stopped, remaining writes are written and
    /// [`Connection::on_close`] is called.
    pub async fn run(self, conn: &mut Connection<ChannelTransport>) {
        let Pump {
            io,
            mut rx,
            read_buffer_size,
        } = self;
        let (mut reader, mut writer) = tokio::io::split(io);
        let mut buf = BytesMut::with_capacity(read_buffer_size);
        let mut writing = true;

        loop {
            buf.reserve(read_buffer_size);
            tokio::select! {
                read = reader.read_buf(&mut buf) => match read {
                    Ok(0) => {
                        conn.on_end();
                        break;
                    }
                    Ok(n) => {
                        tracing::trace!(bytes = n, "read");
                        conn.on_data(&buf);
                        buf.clear();
                    }
                    Err(err) => {
                        conn.on_error(err);
                        break;
                    }
                },
                Some(op) = rx.recv(), if writing => {
                    writing = apply(&mut writer, op, conn).await;
                }
            }
        }

        while writing {
            let Ok(op) = rx.try_recv() else { break };
            writing = apply(&mut writer, op, conn).await;
        }

        tracing::debug!("transport finished");
        conn.on_close();
    }
}

/// Perform one queued write. Returns `false` once nothing more may be written.
async fn apply<S: AsyncWrite>(
    writer: &mut WriteHalf<S>,
    op: WriteOp,
    conn: &mut Connection<ChannelTransport>,
) -> bool {
    let result = match op {
        WriteOp::Data(bytes) => write_frame(writer, &bytes).await.map(|()| true),
        WriteOp::End => writer.shutdown().await.map(|()| false),
    };
    result.unwrap_or_else(|err| {
        conn.on_error(err);
        false
    })
}

/// Write one encoded frame and flush it through any buffering layer.
async fn write_frame<S: AsyncWrite>(writer: &mut WriteHalf<S>, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}
