// (c) 2025 Ross Younger
//! The raw byte stream of a DCC SEND

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::protocol::dcc::Acknowledgement;

/// Read size for transfer streams
const CHUNK_SIZE: usize = 16384;

/// An open connection to a DCC sender
#[derive(Debug)]
pub(crate) struct DccLink {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Box<[u8]>,
}

impl DccLink {
    /// Connects to the sender
    pub(crate) async fn connect(address: SocketAddr, timeout: Duration) -> anyhow::Result<Self> {
        debug!("opening DCC connection to {address}");
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .with_context(|| format!("DCC connection to {address} timed out"))?
            .with_context(|| format!("DCC connection to {address}"))?;
        let _ = stream.set_nodelay(true);
        Ok(Self {
            stream,
            peer: address,
            buffer: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
        })
    }

    /// Reads whatever has arrived.
    ///
    /// Returns `None` once the sender has closed the stream.
    ///
    /// This is cancel-safe.
    pub(crate) async fn read_chunk(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let n = self.stream.read(&mut self.buffer).await?;
        if n == 0 {
            debug!("DCC peer {} closed the stream", self.peer);
            return Ok(None);
        }
        trace!("{n} bytes from {}", self.peer);
        Ok(Some(self.buffer[..n].to_vec()))
    }

    /// Tells the sender how much we have received so far
    pub(crate) async fn acknowledge(&mut self, ack: Acknowledgement) -> std::io::Result<()> {
        self.stream.write_all(&ack.to_bytes()).await
    }
}
