use std::fmt;
use std::str::FromStr;

use crate::{MeterError, Result};

/// Fixed window for the bulk-data phase. Both endpoints chunk their I/O to
/// at most this many bytes per call; the final chunk is sized to whatever
/// remains of the requested length.
pub const CHUNK_SIZE: usize = 65536;

pub const REQUEST_MAGIC: &[u8; 6] = b"REQTCP";
pub const START_MARKER: &[u8; 2] = b"ST";
pub const END_MARKER: &[u8; 2] = b"EN";
pub const RESPONSE_MAGIC: &[u8; 8] = b"RESPONSE";

/// REQ: magic + direction tag + little-endian payload length.
pub const REQUEST_LEN: usize = 16;
/// EN: marker + little-endian client-measured microseconds.
pub const END_LEN: usize = 10;
/// RESP: 8 opaque bytes + little-endian server-measured microseconds.
pub const RESPONSE_LEN: usize = 16;

/// Whether the client is downloading (server sends) or uploading (client
/// sends) the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    /// The two-byte wire tag, also the CLI spelling.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Download => "DL",
            Self::Upload => "UL",
        }
    }

    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"DL" => Ok(Self::Download),
            b"UL" => Ok(Self::Upload),
            _ => Err(MeterError::Protocol(format!(
                "unknown direction tag {}",
                String::from_utf8_lossy(tag)
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Direction {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DL" => Ok(Self::Download),
            "UL" => Ok(Self::Upload),
            _ => Err(MeterError::InvalidDirection(s.to_string())),
        }
    }
}

/// REQ message: announces the transfer direction and payload size for the
/// whole session. The length is never renegotiated mid-transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub direction: Direction,
    pub length: u64,
}

impl Request {
    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let mut buf = [0u8; REQUEST_LEN];
        buf[..6].copy_from_slice(REQUEST_MAGIC);
        buf[6..8].copy_from_slice(self.direction.tag().as_bytes());
        buf[8..].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; REQUEST_LEN]) -> Result<Self> {
        if &buf[..6] != REQUEST_MAGIC {
            return Err(MeterError::Protocol(format!(
                "unknown request type {}",
                String::from_utf8_lossy(&buf[..6])
            )));
        }
        let direction = Direction::from_tag(&buf[6..8])?;
        let length = u64::from_le_bytes(buf[8..16].try_into().unwrap());

        Ok(Self { direction, length })
    }
}

/// EN message: the client's own measurement of the bulk phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct End {
    pub elapsed_micros: u64,
}

impl End {
    pub fn encode(&self) -> [u8; END_LEN] {
        let mut buf = [0u8; END_LEN];
        buf[..2].copy_from_slice(END_MARKER);
        buf[2..].copy_from_slice(&self.elapsed_micros.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; END_LEN]) -> Result<Self> {
        if &buf[..2] != END_MARKER {
            return Err(MeterError::Protocol(format!(
                "bad end marker {}",
                String::from_utf8_lossy(&buf[..2])
            )));
        }
        let elapsed_micros = u64::from_le_bytes(buf[2..10].try_into().unwrap());

        Ok(Self { elapsed_micros })
    }
}

/// RESP message: the server's measurement of the same bulk phase, echoed
/// back to the client. Only bytes [8..16] carry meaning to the client; the
/// server fills the leading bytes with RESPONSE_MAGIC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub elapsed_micros: u64,
}

impl Response {
    pub fn encode(&self) -> [u8; RESPONSE_LEN] {
        let mut buf = [0u8; RESPONSE_LEN];
        buf[..8].copy_from_slice(RESPONSE_MAGIC);
        buf[8..].copy_from_slice(&self.elapsed_micros.to_le_bytes());
        buf
    }

    /// The leading 8 bytes are deliberately not validated.
    pub fn decode(buf: &[u8; RESPONSE_LEN]) -> Self {
        let elapsed_micros = u64::from_le_bytes(buf[8..16].try_into().unwrap());

        Self { elapsed_micros }
    }
}
