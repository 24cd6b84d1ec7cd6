//! Client handshake data (RFC 6455 Section 4).
//!
//! The connection only carries these values; negotiating the upgrade over the
//! wire is up to the caller.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this crate speaks.
pub const WS_VERSION: u8 = 13;

/// Computes the Sec-WebSocket-Accept value for a Sec-WebSocket-Key.
///
/// ```
/// use wslink::protocol::handshake::compute_accept_key;
///
/// assert_eq!(
///     compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a fresh Sec-WebSocket-Key: 16 random bytes, base64 encoded.
///
/// # Errors
///
/// Returns `Error::Io` if the OS random source is unavailable.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce).map_err(|e| Error::Io(e.to_string()))?;
    Ok(BASE64.encode(nonce))
}

fn validate_header_value(header: &str, value: &str) -> Result<()> {
    if value.contains('\r') || value.contains('\n') {
        return Err(Error::InvalidHeaderValue {
            header: header.to_string(),
            reason: "contains CR or LF characters".to_string(),
        });
    }
    Ok(())
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    headers
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The upgrade request a client sent to open the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Request target, e.g. `/chat`.
    pub path: String,
    /// Host header value.
    pub host: String,
    /// Sec-WebSocket-Key header value.
    pub key: String,
    /// Sec-WebSocket-Version.
    pub version: u8,
    /// Origin header value.
    pub origin: Option<String>,
    /// Requested subprotocols, in preference order.
    pub protocols: Vec<String>,
}

impl HandshakeRequest {
    /// Create a request for `path` on `host` with a random key.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if no key could be generated.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            host: host.into(),
            key: generate_key()?,
            version: WS_VERSION,
            origin: None,
            protocols: Vec::new(),
        })
    }

    /// Set the Origin header.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Request subprotocols.
    #[must_use]
    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// The Sec-WebSocket-Accept value a server must answer with.
    #[must_use]
    pub fn expected_accept(&self) -> String {
        compute_accept_key(&self.key)
    }

    /// Render the HTTP/1.1 upgrade request into `buf`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHeaderValue` if any value contains CR or LF.
    pub fn write(&self, buf: &mut Vec<u8>) -> Result<()> {
        validate_header_value("Request-Target", &self.path)?;
        validate_header_value("Host", &self.host)?;
        validate_header_value("Sec-WebSocket-Key", &self.key)?;

        buf.extend_from_slice(format!("GET {} HTTP/1.1\r\n", self.path).as_bytes());
        buf.extend_from_slice(format!("Host: {}\r\n", self.host).as_bytes());
        buf.extend_from_slice(b"Upgrade: websocket\r\n");
        buf.extend_from_slice(b"Connection: Upgrade\r\n");
        buf.extend_from_slice(format!("Sec-WebSocket-Key: {}\r\n", self.key).as_bytes());
        buf.extend_from_slice(format!("Sec-WebSocket-Version: {}\r\n", self.version).as_bytes());

        if let Some(ref origin) = self.origin {
            validate_header_value("Origin", origin)?;
            buf.extend_from_slice(format!("Origin: {origin}\r\n").as_bytes());
        }

        if !self.protocols.is_empty() {
            let joined = self.protocols.join(", ");
            validate_header_value("Sec-WebSocket-Protocol", &joined)?;
            buf.extend_from_slice(format!("Sec-WebSocket-Protocol: {joined}\r\n").as_bytes());
        }

        buf.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// The server's answer to a [`HandshakeRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// HTTP status code (101 for a successful upgrade).
    pub status: u16,
    /// Sec-WebSocket-Accept value.
    pub accept: String,
    /// Subprotocol selected by the server.
    pub protocol: Option<String>,
    /// Extensions the server reported.
    pub extensions: Vec<String>,
}

impl HandshakeResponse {
    /// Build the response a conforming server would send for `request`,
    /// selecting its first requested subprotocol.
    #[must_use]
    pub fn for_request(request: &HandshakeRequest) -> Self {
        Self {
            status: 101,
            accept: request.expected_accept(),
            protocol: request.protocols.first().cloned(),
            extensions: Vec::new(),
        }
    }

    /// Parse a response head from raw HTTP data.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHandshake` if the data is not UTF-8, the status
    /// line is malformed or not 101, or Upgrade, Connection or
    /// Sec-WebSocket-Accept are missing or wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;
        let mut lines = text.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty response".into()))?;
        let mut parts = status_line.split_whitespace();
        let (Some(version), Some(status)) = (parts.next(), parts.next()) else {
            return Err(Error::InvalidHandshake(format!(
                "Invalid status line: {status_line}"
            )));
        };
        if version != "HTTP/1.1" {
            return Err(Error::InvalidHandshake(format!(
                "Expected HTTP/1.1, got {version}"
            )));
        }
        let status: u16 = status
            .parse()
            .map_err(|_| Error::InvalidHandshake(format!("Invalid status code: {status}")))?;
        if status != 101 {
            return Err(Error::InvalidHandshake(format!(
                "Expected 101 status, got {status}"
            )));
        }

        let headers = parse_headers(lines);

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Upgrade header: {upgrade}"
            )));
        }

        let connection = headers
            .get("connection")
            .ok_or_else(|| Error::InvalidHandshake("Missing Connection header".into()))?;
        if !connection.to_ascii_lowercase().contains("upgrade") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Connection header: {connection}"
            )));
        }

        let accept = headers
            .get("sec-websocket-accept")
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Accept header".into()))?
            .clone();

        Ok(Self {
            status,
            accept,
            protocol: headers.get("sec-websocket-protocol").cloned(),
            extensions: headers
                .get("sec-websocket-extensions")
                .map(|e| split_list(e))
                .unwrap_or_default(),
        })
    }

    /// Parse with an upper bound on the response size.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` if `data` exceeds `max_size`
    /// - Other errors as per [`HandshakeResponse::parse`]
    pub fn parse_with_limit(data: &[u8], max_size: usize) -> Result<Self> {
        if data.len() > max_size {
            return Err(Error::HandshakeTooLarge {
                size: data.len(),
                max: max_size,
            });
        }
        Self::parse(data)
    }

    /// Check this response against the request it answers.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHandshake` if the accept key does not match,
    /// or the server selected a subprotocol the client never offered.
    pub fn verify(&self, request: &HandshakeRequest) -> Result<()> {
        if self.accept != request.expected_accept() {
            return Err(Error::InvalidHandshake(
                "Sec-WebSocket-Accept does not match the request key".into(),
            ));
        }

        if let Some(ref protocol) = self.protocol {
            if !request.protocols.iter().any(|p| p == protocol) {
                return Err(Error::InvalidHandshake(format!(
                    "Server selected unrequested subprotocol: {protocol}"
                )));
            }
        }

        Ok(())
    }
}
