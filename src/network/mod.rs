pub mod protocol;
pub mod server;
pub mod session;

pub use protocol::Direction;
pub use server::MeterServer;
pub use session::{TransferReport, TransferRequest};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{MeterError, Result};
use protocol::CHUNK_SIZE;

/// Sends `len` zero bytes in chunks of at most CHUNK_SIZE per write call.
/// A write reporting zero bytes before the target is reached is fatal.
pub(crate) async fn send_zeroes<S>(stream: &mut S, len: u64) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let buf = vec![0u8; CHUNK_SIZE];
    let mut rest = len;
    while rest > 0 {
        let chunk = rest.min(CHUNK_SIZE as u64) as usize;
        let sent = stream.write(&buf[..chunk]).await?;
        if sent == 0 {
            return Err(MeterError::Transport("unexpected stop".to_string()));
        }
        rest -= sent as u64;
    }
    Ok(())
}

/// Reads and discards `len` bytes in chunks of at most CHUNK_SIZE per read
/// call. A zero-length read before the target is reached is fatal.
pub(crate) async fn recv_discard<S>(stream: &mut S, len: u64) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut rest = len;
    while rest > 0 {
        let chunk = rest.min(CHUNK_SIZE as u64) as usize;
        let received = stream.read(&mut buf[..chunk]).await?;
        if received == 0 {
            return Err(MeterError::Transport("unexpected close".to_string()));
        }
        rest -= received as u64;
    }
    Ok(())
}
