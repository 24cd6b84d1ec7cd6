//! Header checks applied before a frame's payload is buffered.
//!
//! - Masking direction per RFC 6455 Section 5.1
//! - RSV bits per Section 5.2 (no extensions are ever negotiated)
//! - Frame size limit

use crate::config::Limits;
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::protocol::frame::FrameHeader;

/// Validator for incoming frame headers.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    role: Role,
    limits: Limits,
}

impl FrameValidator {
    /// Create a validator for frames received by `role`.
    #[must_use]
    pub fn new(role: Role, limits: Limits) -> Self {
        Self { role, limits }
    }

    /// Check an incoming header.
    ///
    /// # Errors
    ///
    /// - `Error::MaskedServerFrame` if a client receives a masked frame
    /// - `Error::UnmaskedClientFrame` if a server receives an unmasked frame
    /// - `Error::ReservedBitsSet` if any RSV bit is set
    /// - `Error::FrameTooLarge` if the payload exceeds the frame size limit
    pub fn validate_header(&self, header: &FrameHeader) -> Result<()> {
        let masked = header.mask.is_some();
        if masked && !self.role.expects_masked() {
            return Err(Error::MaskedServerFrame);
        }
        if !masked && self.role.expects_masked() {
            return Err(Error::UnmaskedClientFrame);
        }

        if header.rsv1 || header.rsv2 || header.rsv3 {
            return Err(Error::ReservedBitsSet);
        }

        self.limits.check_frame_size(header.payload_len)
    }
}
