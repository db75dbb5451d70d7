use std::str::FromStr;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::network::protocol::{Direction, End, Request, Response, RESPONSE_LEN, START_MARKER};
use crate::network::{recv_discard, send_zeroes};
use crate::{MeterError, Result};

/// A validated measurement request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub host: String,
    pub port: u16,
    pub direction: Direction,
    pub length: u64,
}

impl TransferRequest {
    /// Validates the raw CLI arguments. A malformed input fails here,
    /// before any connection is attempted.
    pub fn parse(address: &str, direction: &str, length: &str) -> Result<Self> {
        let parts: Vec<&str> = address.split(':').collect();
        if parts.len() != 2 {
            return Err(MeterError::InvalidAddress(address.to_string()));
        }
        let port = parts[1]
            .parse()
            .map_err(|_| MeterError::InvalidAddress(address.to_string()))?;
        let direction = Direction::from_str(direction)?;
        let length = length
            .parse()
            .map_err(|_| MeterError::InvalidLength(length.to_string()))?;

        Ok(Self {
            host: parts[0].to_string(),
            port,
            direction,
            length,
        })
    }
}

/// The outcome of one completed session.
#[derive(Debug, Clone, Copy)]
pub struct TransferReport {
    pub length: u64,
    pub client_micros: u64,
    pub server_micros: u64,
}

impl TransferReport {
    /// Throughput in MiB/sec, computed from the server-reported duration.
    /// The server sits on the driving end of the bulk phase (sender for a
    /// download, receiver for an upload), so its figure is immune to
    /// client-side scheduling jitter after the last byte is handed off.
    pub fn throughput_mib_per_sec(&self) -> f64 {
        let bytes_per_micro = self.length as f64 / self.server_micros as f64;
        bytes_per_micro * 1_000_000.0 / (1024.0 * 1024.0)
    }
}

/// Runs one measurement session over a fresh connection. The connection is
/// closed on every exit path, success or failure.
pub async fn run(request: TransferRequest) -> Result<TransferReport> {
    let stream = TcpStream::connect((request.host.as_str(), request.port))
        .await
        .map_err(MeterError::Connect)?;
    debug!("connected to {}:{}", request.host, request.port);

    TransferSession::new(stream, request).execute().await
}

/// One client-driven request/transfer/report cycle. Owns the connection for
/// its entire lifetime; request, bulk phase, and completion exchange run
/// strictly in sequence, with no timeouts anywhere.
struct TransferSession {
    stream: TcpStream,
    request: TransferRequest,
}

impl TransferSession {
    fn new(stream: TcpStream, request: TransferRequest) -> Self {
        Self { stream, request }
    }

    async fn execute(mut self) -> Result<TransferReport> {
        let request = Request {
            direction: self.request.direction,
            length: self.request.length,
        };
        self.stream.write_all(&request.encode()).await?;

        // The timer starts as soon as the request is on the wire; the ST
        // marker tells the server the bulk phase begins now.
        let started = Instant::now();
        self.stream.write_all(START_MARKER).await?;

        println!("DATA {} START", self.request.direction);
        match self.request.direction {
            Direction::Download => recv_discard(&mut self.stream, self.request.length).await?,
            Direction::Upload => send_zeroes(&mut self.stream, self.request.length).await?,
        }
        println!("DATA {} END", self.request.direction);

        let client_micros = started.elapsed().as_micros() as u64;
        let end = End {
            elapsed_micros: client_micros,
        };
        self.stream.write_all(&end.encode()).await?;

        let mut buf = [0u8; RESPONSE_LEN];
        self.stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| MeterError::Transport(format!("short response: {}", e)))?;
        let response = Response::decode(&buf);
        if response.elapsed_micros == 0 {
            // Throughput is length / duration; a zero duration has no
            // meaningful quotient.
            return Err(MeterError::Transport(
                "zero duration in response".to_string(),
            ));
        }
        debug!(
            "client measured {} usec, server measured {} usec",
            client_micros, response.elapsed_micros
        );

        Ok(TransferReport {
            length: self.request.length,
            client_micros,
            server_micros: response.elapsed_micros,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_valid_arguments() {
        let request = TransferRequest::parse("example.net:8810", "DL", "1048576").unwrap();
        assert_eq!(request.host, "example.net");
        assert_eq!(request.port, 8810);
        assert_eq!(request.direction, Direction::Download);
        assert_eq!(request.length, 1048576);
    }

    #[test]
    fn parse_rejects_address_without_port() {
        assert!(matches!(
            TransferRequest::parse("hostonly", "DL", "1"),
            Err(MeterError::InvalidAddress(_))
        ));
    }

    #[test]
    fn parse_rejects_address_with_extra_colon() {
        assert!(matches!(
            TransferRequest::parse("host:8810:extra", "DL", "1"),
            Err(MeterError::InvalidAddress(_))
        ));
    }

    #[test]
    fn parse_rejects_non_numeric_port() {
        assert!(matches!(
            TransferRequest::parse("host:http", "DL", "1"),
            Err(MeterError::InvalidAddress(_))
        ));
    }

    #[test]
    fn parse_rejects_unknown_direction() {
        assert!(matches!(
            TransferRequest::parse("host:8810", "SIDEWAYS", "1"),
            Err(MeterError::InvalidDirection(_))
        ));
    }

    #[test]
    fn parse_rejects_non_numeric_length() {
        assert!(matches!(
            TransferRequest::parse("host:8810", "UL", "lots"),
            Err(MeterError::InvalidLength(_))
        ));
        assert!(matches!(
            TransferRequest::parse("host:8810", "UL", "-1"),
            Err(MeterError::InvalidLength(_))
        ));
    }

    #[test]
    fn one_mib_in_one_second_is_one_mib_per_sec() {
        let report = TransferReport {
            length: 1_048_576,
            client_micros: 999_999,
            server_micros: 1_000_000,
        };
        assert!((report.throughput_mib_per_sec() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn throughput_uses_server_duration_not_client() {
        let report = TransferReport {
            length: 1_048_576,
            client_micros: 500_000,
            server_micros: 2_000_000,
        };
        assert!((report.throughput_mib_per_sec() - 0.5).abs() < f64::EPSILON);
    }
}
