use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::network::protocol::{Direction, End, Request, Response, END_LEN, REQUEST_LEN, START_MARKER};
use crate::network::{recv_discard, send_zeroes};
use crate::{MeterError, Result};

/// The measurement server: accepts connections and answers one transfer
/// session per connection.
pub struct MeterServer {
    listener: TcpListener,
}

impl MeterServer {
    pub async fn bind(bind_addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Each connection gets its own task; a failed accept is
    /// logged and the loop keeps going.
    pub async fn serve(self) -> Result<()> {
        info!("listening on {}", self.local_addr()?);
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream).await {
                            warn!("session with {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => error!("accept failed: {}", e),
            }
        }
    }
}

/// Binds and serves forever.
pub async fn run(bind_addr: &str) -> Result<()> {
    MeterServer::bind(bind_addr).await?.serve().await
}

/// Drives one session from the server side. The duration reported back in
/// RESP covers the bulk phase only, measured on this end. The connection
/// closes on drop, on every path.
async fn handle_connection(mut stream: TcpStream) -> Result<()> {
    let mut buf = [0u8; REQUEST_LEN];
    stream.read_exact(&mut buf).await?;
    let request = Request::decode(&buf)?;
    info!("REQTCP {} {}", request.direction, request.length);

    let mut marker = [0u8; 2];
    stream.read_exact(&mut marker).await?;
    if &marker != START_MARKER {
        return Err(MeterError::Protocol(format!(
            "bad start marker {}",
            String::from_utf8_lossy(&marker)
        )));
    }

    let started = Instant::now();
    match request.direction {
        // The client downloads, so this side sends, and vice versa.
        Direction::Download => send_zeroes(&mut stream, request.length).await?,
        Direction::Upload => recv_discard(&mut stream, request.length).await?,
    }
    // A sub-microsecond bulk phase truncates to zero, which clients reject
    // as an unusable duration; report the measurement floor instead.
    let server_micros = (started.elapsed().as_micros() as u64).max(1);

    let mut buf = [0u8; END_LEN];
    stream.read_exact(&mut buf).await?;
    let end = End::decode(&buf)?;
    info!(
        "{} {} bytes in {} usec (client reports {})",
        request.direction, request.length, server_micros, end.elapsed_micros
    );

    let response = Response {
        elapsed_micros: server_micros,
    };
    stream.write_all(&response.encode()).await?;
    Ok(())
}
