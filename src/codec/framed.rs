use bytes::{Buf, Bytes, BytesMut};

use crate::config::Config;
use crate::connection::Role;
use crate::error::Result;
use crate::message::{CloseFrame, Message};
use crate::protocol::{Frame, FrameHeader, FrameValidator, MessageAssembler, OpCode};

/// Seed for the mask key sequence. Falls back to the clock if the OS random
/// source is unavailable.
fn random_mask_seed() -> u32 {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_ok() {
        u32::from_le_bytes(buf)
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
            .unwrap_or(0x1234_5678)
    }
}

/// One unit of decoded inbound traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete text or binary message, reassembled from its fragments.
    Message(Message),
    /// A ping, pong or close frame, or a frame with a reserved opcode.
    Control(Frame),
}

/// Incremental WebSocket frame codec.
///
/// Inbound, bytes are buffered with [`feed`](Self::feed) and drained with
/// [`next_decoded`](Self::next_decoded). Headers are validated as soon as
/// they are buffered, so an oversized or wrongly masked frame fails before
/// its payload arrives.
#[derive(Debug)]
pub struct FrameCodec {
    role: Role,
    read_buf: BytesMut,
    write_buf: BytesMut,
    validator: FrameValidator,
    assembler: MessageAssembler,
    mask_counter: u32,
}

impl FrameCodec {
    /// Create a codec for the given role.
    #[must_use]
    pub fn new(role: Role, config: &Config) -> Self {
        Self {
            role,
            read_buf: BytesMut::with_capacity(config.read_buffer_size),
            write_buf: BytesMut::with_capacity(config.write_buffer_size),
            validator: FrameValidator::new(role, config.limits.clone()),
            assembler: MessageAssembler::new(config.limits.clone()),
            mask_counter: random_mask_seed(),
        }
    }

    /// Create a client-role codec.
    #[must_use]
    pub fn client(config: &Config) -> Self {
        Self::new(Role::Client, config)
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Number of inbound bytes buffered but not yet decoded.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    /// Buffer inbound bytes.
    pub fn feed(&mut self, data: &[u8]) {
        self.read_buf.extend_from_slice(data);
    }

    /// Decode the next message or control frame from the buffered bytes.
    ///
    /// Returns `Ok(None)` when no complete unit is buffered yet. Data frames
    /// that do not finish a message are consumed silently.
    ///
    /// # Errors
    ///
    /// Any protocol violation: masked frame for a client, RSV bits, size
    /// limits, fragmented or oversized control frames, invalid close payload,
    /// bad continuation sequencing, invalid UTF-8 in text. After an error the
    /// codec state is undefined; call [`clear`](Self::clear) before reuse.
    pub fn next_decoded(&mut self) -> Result<Option<Decoded>> {
        loop {
            let header = match FrameHeader::parse(&self.read_buf) {
                Ok(header) => header,
                Err(e) if e.is_incomplete() => return Ok(None),
                Err(e) => return Err(e),
            };
            self.validator.validate_header(&header)?;

            let frame_len = header.frame_len()?;
            if self.read_buf.len() < frame_len {
                return Ok(None);
            }
            let frame = Frame::from_header(&header, &self.read_buf)?;
            self.read_buf.advance(frame_len);

            tracing::trace!(
                opcode = %frame.opcode,
                fin = frame.fin,
                len = frame.payload().len(),
                "decoded frame"
            );

            if frame.opcode.is_reserved() {
                return Ok(Some(Decoded::Control(frame)));
            }

            if frame.opcode.is_control() {
                frame.validate()?;
                if frame.opcode == OpCode::Close {
                    CloseFrame::check_payload(frame.payload())?;
                }
                return Ok(Some(Decoded::Control(frame)));
            }

            if let Some(message) = self.assembler.push(frame)? {
                return Ok(Some(Decoded::Message(message)));
            }
        }
    }

    /// Encode `frame`, masking it with a fresh key when `masked` is set.
    pub fn encode(&mut self, frame: &Frame, masked: bool) -> Bytes {
        let mask = masked.then(|| self.generate_mask());
        frame.write(&mut self.write_buf, mask);
        self.write_buf.split().freeze()
    }

    /// Drop all buffered inbound bytes and any partial message.
    pub fn clear(&mut self) {
        self.read_buf.clear();
        self.assembler.reset();
    }

    fn generate_mask(&mut self) -> [u8; 4] {
        self.mask_counter = self.mask_counter.wrapping_add(0x9E37_79B9);
        let a = self.mask_counter;
        let b = a.wrapping_mul(0x85EB_CA6B);
        let c = b ^ (b >> 13);
        let d = c.wrapping_mul(0xC2B2_AE35);
        (d ^ (d >> 16)).to_le_bytes()
    }
}
