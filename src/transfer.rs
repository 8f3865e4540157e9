// (c) 2025 Ross Younger
//! Transfer engine: one in-progress DCC receive
//!
//! A [`Transfer`] reserves its destination file when it is opened, buffers the incoming byte stream,
//! hands out an [`Acknowledgement`] for every chunk, and writes the buffer out when the peer closes the stream.
//!
//! The advertised size is advisory. Completion is driven solely by stream closure; a short or long delivery
//! is logged but never rejected.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use human_repr::HumanCount as _;
use tracing::{debug, info, warn};

use crate::protocol::dcc::Acknowledgement;

/// Upper bound on how much buffer we will preallocate on the strength of an advertised size
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Why a transfer is happening
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Purpose {
    /// Search results archive
    Catalog,
    /// The item the operator chose
    Item,
}

/// Errors arising from a [`Transfer`]
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// A local file of this name already exists. It has not been touched.
    #[error("a file named {0} already exists; refusing to overwrite it")]
    FileAlreadyExists(String),
    /// The offered name does not reduce to a usable base name
    #[error("unusable file name `{0}`")]
    InvalidFileName(String),
    /// Local I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reduces an offered file name to a bare base name.
///
/// Any directory components (`/` or `\` separated) are discarded.
/// Returns `None` if nothing usable remains (empty, `.`, `..`, or containing control characters).
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." || base.chars().any(char::is_control) {
        return None;
    }
    Some(base.to_string())
}

/// One byte-stream receive operation.
///
/// The destination file is created (exclusively) on [`open`](Transfer::open), which is what
/// reserves the name. Dropping a `Transfer` without closing it removes that file.
#[derive(Debug)]
pub struct Transfer {
    file_name: String,
    path: PathBuf,
    expected_size: u64,
    /// Running count, with the 32-bit wraparound of the wire acknowledgement
    received_bytes: u32,
    purpose: Purpose,
    buffer: Vec<u8>,
    /// `None` once closed or aborted
    file: Option<File>,
}

/// What a completed [`Transfer`] hands back
#[derive(Debug)]
pub struct TransferSummary {
    /// Base name of the received file
    pub file_name: String,
    /// Where the artifact was written
    pub path: PathBuf,
    /// Why we received it
    pub purpose: Purpose,
    /// Final acknowledgement counter (modulo 2^32)
    pub received_bytes: u32,
    /// Size the peer advertised
    pub expected_size: u64,
    /// The received data
    pub data: Vec<u8>,
}

impl TransferSummary {
    /// Actual number of bytes received
    #[must_use]
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether nothing at all was received
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Transfer {
    /// Starts a transfer into `directory`.
    ///
    /// Fails without side effects if a file called `file_name` already exists there.
    pub fn open(
        directory: &Path,
        file_name: &str,
        expected_size: u64,
        purpose: Purpose,
    ) -> Result<Self, TransferError> {
        let Some(base) = sanitize_file_name(file_name) else {
            return Err(TransferError::InvalidFileName(file_name.to_string()));
        };
        let path = directory.join(&base);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(TransferError::FileAlreadyExists(base))
            }
            Err(e) => return Err(e.into()),
        };
        let capacity = usize::try_from(expected_size)
            .unwrap_or(usize::MAX)
            .min(MAX_PREALLOCATION);
        debug!("opened {purpose} transfer {path:?}, expecting {expected_size} bytes");
        Ok(Self {
            file_name: base,
            path,
            expected_size,
            received_bytes: 0,
            purpose,
            buffer: Vec::with_capacity(capacity),
            file: Some(file),
        })
    }

    /// Accepts a chunk from the stream.
    ///
    /// The returned acknowledgement must be sent to the peer straight away; the sender throttles on it.
    #[allow(clippy::cast_possible_truncation)] // wire counter is modulo 2^32
    pub fn accept(&mut self, chunk: &[u8]) -> Acknowledgement {
        self.buffer.extend_from_slice(chunk);
        self.received_bytes = self.received_bytes.wrapping_add(chunk.len() as u32);
        Acknowledgement(self.received_bytes)
    }

    /// Finalises the transfer after the peer has closed the stream, writing the buffer to disk.
    ///
    /// On failure the partial artifact is removed.
    pub fn close(mut self) -> Result<TransferSummary, TransferError> {
        let data = std::mem::take(&mut self.buffer);
        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.write_all(&data).and_then(|()| file.flush()) {
                drop(file);
                remove_artifact(&self.path);
                return Err(e.into());
            }
        }

        let len = data.len() as u64;
        info!(
            "Received file {} ({} bytes, {})",
            self.file_name,
            len,
            len.human_count_bytes()
        );
        if len != self.expected_size {
            warn!(
                "{}: peer advertised {} bytes but sent {len}",
                self.file_name, self.expected_size
            );
        }
        Ok(TransferSummary {
            file_name: std::mem::take(&mut self.file_name),
            path: std::mem::take(&mut self.path),
            purpose: self.purpose,
            received_bytes: self.received_bytes,
            expected_size: self.expected_size,
            data,
        })
    }

    /// Abandons the transfer (the stream failed), releasing the buffer and removing the reserved file.
    ///
    /// Returns the number of bytes that had been received.
    pub fn abort(mut self) -> u64 {
        let received = self.buffer.len() as u64;
        if let Some(file) = self.file.take() {
            drop(file);
            remove_artifact(&self.path);
        }
        debug!("abandoned transfer {} after {received} bytes", self.file_name);
        received
    }

    /// Accessor
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Accessor
    #[must_use]
    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    /// Accessor
    #[must_use]
    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    /// The current acknowledgement counter
    #[must_use]
    pub fn received_bytes(&self) -> u32 {
        self.received_bytes
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            remove_artifact(&self.path);
        }
    }
}

/// Removes a local artifact, tolerating its absence
pub(crate) fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed {path:?}"),
        Err(e) if e.kind() == ErrorKind::NotFound => (),
        Err(e) => warn!("could not remove {path:?}: {e}"),
    }
}
