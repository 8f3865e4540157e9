// (c) 2025 Ross Younger
//! Archive container readers for catalogs

use std::borrow::Cow;
use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use tracing::debug;

use super::CatalogError;

/// Leading bytes of a gzip stream
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One regular file inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Path within the container
    pub name: String,
    /// Uncompressed contents
    pub data: Vec<u8>,
}

impl Member {
    /// The member's contents as text. Invalid UTF-8 is replaced, not rejected.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Errors reading a container
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// zip decoding failure
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// I/O failure while decoding (tar and gzip report their errors this way)
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The data decoded but held nothing
    #[error("archive contains no files")]
    Empty,
}

/// A container format that can enumerate its members in stored order
pub trait ContainerReader: std::fmt::Debug + Send + Sync {
    /// Short format name, for diagnostics
    fn name(&self) -> &'static str;
    /// Reads every regular file in the container, in stored order
    fn read_members(&self, raw: &[u8]) -> Result<Vec<Member>, ContainerError>;
}

/// The primary catalog format
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipReader;

impl ContainerReader for ZipReader {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn read_members(&self, raw: &[u8]) -> Result<Vec<Member>, ContainerError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(raw))?;
        let mut members = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            let _ = file.read_to_end(&mut data)?;
            members.push(Member {
                name: file.name().to_string(),
                data,
            });
        }
        Ok(members)
    }
}

/// The legacy catalog format: tar, optionally gzip-compressed
#[derive(Debug, Clone, Copy, Default)]
pub struct TarReader;

impl TarReader {
    fn read_from<R: Read>(inner: R) -> Result<Vec<Member>, ContainerError> {
        let mut archive = tar::Archive::new(inner);
        let mut members = Vec::new();
        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path()?.to_string_lossy().into_owned();
            let mut data = Vec::new();
            let _ = entry.read_to_end(&mut data)?;
            members.push(Member { name, data });
        }
        if members.is_empty() {
            return Err(ContainerError::Empty);
        }
        Ok(members)
    }
}

impl ContainerReader for TarReader {
    fn name(&self) -> &'static str {
        "tar"
    }

    fn read_members(&self, raw: &[u8]) -> Result<Vec<Member>, ContainerError> {
        if raw.starts_with(&GZIP_MAGIC) {
            Self::read_from(GzDecoder::new(raw))
        } else {
            Self::read_from(raw)
        }
    }
}

/// Tries the primary container format, then the legacy one
#[derive(Debug)]
pub struct CatalogReader {
    primary: Box<dyn ContainerReader>,
    legacy: Box<dyn ContainerReader>,
}

impl Default for CatalogReader {
    fn default() -> Self {
        Self::new(Box::new(ZipReader), Box::new(TarReader))
    }
}

impl CatalogReader {
    /// Constructor
    #[must_use]
    pub fn new(primary: Box<dyn ContainerReader>, legacy: Box<dyn ContainerReader>) -> Self {
        Self { primary, legacy }
    }

    /// Reads the members of a catalog archive
    pub fn read_members(&self, raw: &[u8]) -> Result<Vec<Member>, CatalogError> {
        let primary = match self.primary.read_members(raw) {
            Ok(m) => return Ok(m),
            Err(e) => e,
        };
        debug!(
            "catalog is not {} ({primary}), trying {}",
            self.primary.name(),
            self.legacy.name()
        );
        self.legacy
            .read_members(raw)
            .map_err(|legacy| CatalogError::UnrecognizedContainerFormat { primary, legacy })
    }
}
