// (c) 2025 Ross Younger
//! Unpacking a received item

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::{debug, warn};

/// Archive formats we know how to unpack, identified by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ArchiveKind {
    /// `.zip`
    Zip,
    /// `.tar`
    Tar,
    /// `.tar.gz` or `.tgz`
    TarGz,
}

impl ArchiveKind {
    /// Selects an archive format from the file name. Returns `None` if the file is not a known archive type.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Errors unpacking an item archive
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The file extension is not a known archive type
    #[error("not a recognised archive type: {0}")]
    NotAnArchive(PathBuf),
    /// zip decoding failure
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// I/O failure, including tar and gzip decoding errors
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reduces an archive member path to a relative path that stays inside the destination.
///
/// Root, prefix and `.` components are dropped. Any `..` component disqualifies the member.
fn safe_relative(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(c) => out.push(c),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => (),
            Component::ParentDir => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Writes one member beneath `dest`. Returns the path written, or `None` if skipped.
fn write_member<R: Read>(
    dest: &Path,
    name: &Path,
    reader: &mut R,
) -> io::Result<Option<PathBuf>> {
    let Some(relative) = safe_relative(name) else {
        warn!("skipping unsafe archive member {}", name.display());
        return Ok(None);
    };
    let target = dest.join(relative);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            warn!("not overwriting existing file {}", target.display());
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let _ = io::copy(reader, &mut file)?;
    debug!("extracted {}", target.display());
    Ok(Some(target))
}

fn extract_zip(file: File, dest: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut archive = zip::ZipArchive::new(io::BufReader::new(file))?;
    let mut written = Vec::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if member.is_dir() {
            continue;
        }
        let name = PathBuf::from(member.name());
        if let Some(path) = write_member(dest, &name, &mut member)? {
            written.push(path);
        }
    }
    Ok(written)
}

fn extract_tar<R: Read>(inner: R, dest: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let mut archive = tar::Archive::new(inner);
    let mut written = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.into_owned();
        if let Some(path) = write_member(dest, &name, &mut entry)? {
            written.push(path);
        }
    }
    Ok(written)
}

/// Unpacks the archive at `path` into `dest`, dispatching on the file extension.
///
/// Existing files are never overwritten; such members are skipped with a warning.
/// Returns the files written.
pub fn extract_archive(path: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let kind = ArchiveKind::from_path(path)
        .ok_or_else(|| ExtractError::NotAnArchive(path.to_path_buf()))?;
    debug!("extracting {} as {kind}", path.display());
    let file = File::open(path)?;
    match kind {
        ArchiveKind::Zip => extract_zip(file, dest),
        ArchiveKind::Tar => extract_tar(io::BufReader::new(file), dest),
        ArchiveKind::TarGz => extract_tar(GzDecoder::new(io::BufReader::new(file)), dest),
    }
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use super::{extract_archive, safe_relative, ArchiveKind, ExtractError};
    use crate::catalog::test_support::{tar_gz_of, tar_of, zip_of};
    use crate::util::littertray::LitterTray;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_by_extension() {
        let k = |s: &str| ArchiveKind::from_path(Path::new(s));
        assert_eq!(k("a.zip"), Some(ArchiveKind::Zip));
        assert_eq!(k("A.ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(k("a.tar"), Some(ArchiveKind::Tar));
        assert_eq!(k("a.tar.gz"), Some(ArchiveKind::TarGz));
        assert_eq!(k("a.tgz"), Some(ArchiveKind::TarGz));
        assert_eq!(k("a.epub"), None);
        assert_eq!(k("zip"), None);
    }

    #[test]
    fn member_paths_are_confined() {
        assert_eq!(safe_relative(Path::new("a/b.txt")), Some(PathBuf::from("a/b.txt")));
        assert_eq!(safe_relative(Path::new("/etc/passwd")), Some(PathBuf::from("etc/passwd")));
        assert_eq!(safe_relative(Path::new("./x")), Some(PathBuf::from("x")));
        assert_eq!(safe_relative(Path::new("../x")), None);
        assert_eq!(safe_relative(Path::new("a/../../x")), None);
        assert_eq!(safe_relative(Path::new("/")), None);
    }

    #[test]
    fn zip_extraction() {
        LitterTray::try_with(|tray| {
            let _ = tray.create_binary("book.zip", &zip_of(&[("dune/dune.epub", "spice")]))?;
            let written = extract_archive(Path::new("book.zip"), Path::new("."))?;
            assert_eq!(written, vec![PathBuf::from("./dune/dune.epub")]);
            assert_eq!(std::fs::read_to_string("dune/dune.epub")?, "spice");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn tar_extraction() {
        LitterTray::try_with(|tray| {
            let _ = tray.create_binary("a.tar", &tar_of(&[("one.txt", "1")]))?;
            let _ = tray.create_binary("b.tgz", &tar_gz_of(&[("two.txt", "2")]))?;
            let _ = extract_archive(Path::new("a.tar"), Path::new("."))?;
            let _ = extract_archive(Path::new("b.tgz"), Path::new("."))?;
            assert_eq!(std::fs::read_to_string("one.txt")?, "1");
            assert_eq!(std::fs::read_to_string("two.txt")?, "2");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        LitterTray::try_with(|tray| {
            let _ = tray.create_text("dune.epub", "mine")?;
            let _ = tray.create_binary("book.zip", &zip_of(&[("dune.epub", "theirs")]))?;
            let written = extract_archive(Path::new("book.zip"), Path::new("."))?;
            assert!(written.is_empty());
            assert_eq!(std::fs::read_to_string("dune.epub")?, "mine");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn corrupt_archive() {
        LitterTray::try_with(|tray| {
            let _ = tray.create_text("book.zip", "not really a zip")?;
            let result = extract_archive(Path::new("book.zip"), Path::new("."));
            assert!(matches!(result, Err(ExtractError::Zip(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn not_an_archive() {
        let result = extract_archive(Path::new("dune.epub"), Path::new("."));
        assert!(matches!(result, Err(ExtractError::NotAnArchive(_))));
    }
}
