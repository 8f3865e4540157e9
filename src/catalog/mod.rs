// (c) 2025 Ross Younger
//! Catalog parsing
//!
//! A search returns a *catalog*: an archive whose member files list retrievable items.
//! Each item is a *marker* line beginning with `!`. The first whitespace-delimited token,
//! minus the `!`, names the peer who serves the item; the rest of the line is the request to send back.
//!
//! ```text
//! !alice get Frank Herbert - Dune.epub
//! ```
//!
//! Entries are only offered to the operator when their sender is currently present in the channel.
//! Ordering is first-seen: archive member order, then line order within a member. No sorting is applied.

mod container;
pub use container::{CatalogReader, ContainerError, ContainerReader, Member, TarReader, ZipReader};

mod extract;
pub use extract::{extract_archive, ArchiveKind, ExtractError};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// The reserved first character of a marker line
pub const MARKER_SENTINEL: char = '!';

/// One retrievable item parsed out of a catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// The full marker line, as it appeared in the catalog
    pub marker: String,
    /// The peer who serves this item
    pub sender_nick: String,
}

/// What we send to request a catalog entry
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RequestStyle {
    /// Send the rest of the marker line after the sender token (`get Dune.epub`)
    #[default]
    Command,
    /// Send the whole marker line (`!alice get Dune.epub`)
    Marker,
}

impl CatalogEntry {
    /// Recognises a marker line. Returns `None` for anything else.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if !line.starts_with(MARKER_SENTINEL) {
            return None;
        }
        // The sender is the first token, less its sentinel
        let nick = line.split_whitespace().next()?.strip_prefix(MARKER_SENTINEL)?;
        if nick.is_empty() {
            return None;
        }
        Some(Self {
            marker: line.to_string(),
            sender_nick: nick.to_string(),
        })
    }

    /// The getter command: the marker line after the sender token
    #[must_use]
    pub fn command(&self) -> &str {
        let token = MARKER_SENTINEL.len_utf8() + self.sender_nick.len();
        self.marker.get(token..).unwrap_or_default().trim()
    }

    /// The text to send to request this entry.
    ///
    /// A marker with nothing after its sender token is always sent whole.
    #[must_use]
    pub fn request(&self, style: RequestStyle) -> &str {
        match style {
            RequestStyle::Command if !self.command().is_empty() => self.command(),
            _ => &self.marker,
        }
    }
}

impl std::fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.marker)
    }
}

/// Errors arising from catalog parsing
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Neither the primary nor the legacy container format could decode the data
    #[error("unrecognised catalog format (zip: {primary}; tar: {legacy})")]
    UnrecognizedContainerFormat {
        /// Failure from the primary reader
        primary: ContainerError,
        /// Failure from the legacy reader
        legacy: ContainerError,
    },
}

/// Extracts the marker lines from a single archive member
fn markers_in(member: &Member) -> Vec<CatalogEntry> {
    trace!("scanning catalog member {}", member.name);
    member
        .text()
        .lines()
        .filter_map(CatalogEntry::from_line)
        .collect()
}

/// Parses a received catalog archive, keeping only entries whose sender is in `known_nicks`.
///
/// An empty result is not an error.
pub fn parse_catalog(
    raw: &[u8],
    reader: &CatalogReader,
    known_nicks: &HashSet<String>,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let members = reader.read_members(raw)?;
    let mut total = 0usize;
    let entries: Vec<_> = members
        .iter()
        .flat_map(markers_in)
        .inspect(|_| total += 1)
        .filter(|e| known_nicks.contains(&e.sender_nick))
        .collect();
    debug!(
        "catalog: {} members, {total} markers, {} from known senders",
        members.len(),
        entries.len()
    );
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for in-memory archives
    use std::io::{Cursor, Write as _};

    pub(crate) fn zip_of(members: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, contents) in members {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub(crate) fn tar_of(members: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, contents) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap()
    }

    pub(crate) fn tar_gz_of(members: &[(&str, &str)]) -> Vec<u8> {
        let tar = tar_of(members);
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&tar).unwrap();
        enc.finish().unwrap()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::test_support::{tar_gz_of, tar_of, zip_of};
    use super::{parse_catalog, CatalogEntry, CatalogError, CatalogReader, RequestStyle};
    use pretty_assertions::assert_eq;

    fn nicks(list: &[&str]) -> HashSet<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn marker_lines() {
        let e = CatalogEntry::from_line("!alice get dune.epub\r").unwrap();
        assert_eq!(e.marker, "!alice get dune.epub");
        assert_eq!(e.sender_nick, "alice");
        assert_eq!(e.command(), "get dune.epub");
        assert_eq!(e.request(RequestStyle::Command), "get dune.epub");
        assert_eq!(e.request(RequestStyle::Marker), "!alice get dune.epub");

        assert_eq!(CatalogEntry::from_line("alice get dune.epub"), None);
        assert_eq!(CatalogEntry::from_line(" !alice get dune.epub"), None);
        assert_eq!(CatalogEntry::from_line("!"), None);
        assert_eq!(CatalogEntry::from_line("!   "), None);
    }

    #[test]
    fn detached_sentinel_names_no_sender() {
        assert_eq!(CatalogEntry::from_line("! alice get x"), None);
        assert_eq!(CatalogEntry::from_line("!\talice get x"), None);

        let raw = zip_of(&[(
            "results.txt",
            "! alice get dune.epub\r\n!alice get dune.epub\r\n",
        )]);
        let entries =
            parse_catalog(&raw, &CatalogReader::default(), &nicks(&["alice"])).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].marker, "!alice get dune.epub");
    }

    #[test]
    fn bare_marker_is_sent_whole() {
        let e = CatalogEntry::from_line("!alice").unwrap();
        assert_eq!(e.command(), "");
        assert_eq!(e.request(RequestStyle::Command), "!alice");
    }

    #[test]
    fn filter_by_known_senders() {
        let raw = zip_of(&[(
            "SearchBot_results_for_dune.txt",
            "Search results\r\n!alice get dune.epub\r\n!mallory get dune.epub\r\n",
        )]);
        let entries =
            parse_catalog(&raw, &CatalogReader::default(), &nicks(&["alice"])).unwrap();
        assert_eq!(
            entries,
            vec![CatalogEntry {
                marker: "!alice get dune.epub".into(),
                sender_nick: "alice".into(),
            }]
        );
    }

    #[test]
    fn duplicates_kept_in_first_seen_order() {
        let raw = zip_of(&[
            ("b.txt", "!bob zeta\n!alice alpha\n"),
            ("a.txt", "!alice alpha\nnoise\n!bob beta\n"),
        ]);
        let entries =
            parse_catalog(&raw, &CatalogReader::default(), &nicks(&["alice", "bob"])).unwrap();
        let markers: Vec<_> = entries.iter().map(|e| e.marker.as_str()).collect();
        assert_eq!(
            markers,
            vec!["!bob zeta", "!alice alpha", "!alice alpha", "!bob beta"]
        );
    }

    #[test]
    fn empty_result_is_ok() {
        let raw = zip_of(&[("r.txt", "!mallory x\n")]);
        let entries = parse_catalog(&raw, &CatalogReader::default(), &nicks(&[])).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn legacy_tar_fallback() {
        let raw = tar_of(&[("r.txt", "!alice get a\n")]);
        let entries =
            parse_catalog(&raw, &CatalogReader::default(), &nicks(&["alice"])).unwrap();
        assert_eq!(entries.len(), 1);

        let raw = tar_gz_of(&[("r.txt", "!alice get a\n!alice get b\n")]);
        let entries =
            parse_catalog(&raw, &CatalogReader::default(), &nicks(&["alice"])).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn unrecognised_format() {
        let result = parse_catalog(
            b"this is neither zip nor tar",
            &CatalogReader::default(),
            &nicks(&["alice"]),
        );
        assert!(matches!(
            result,
            Err(CatalogError::UnrecognizedContainerFormat { .. })
        ));
    }
}
