// (c) 2025 Ross Younger
//! Messages from the session to the operator

use std::fmt::Display;
use std::path::PathBuf;

use tabled::{settings::Style, Table, Tabled};

use super::State;
use crate::catalog::CatalogEntry;

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Progress information
    Info,
    /// Something the operator should know about, but the session carries on
    Warning,
    /// A cycle has failed
    Error,
    /// A cycle completed
    Success,
}

/// An operator-facing report from the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A search was sent
    Searching {
        /// What was searched for
        query: String,
    },
    /// Operator input refused because a cycle is in flight
    Busy(State),
    /// A transfer offer was refused because its file name is taken locally
    FileAlreadyExists(String),
    /// The catalog parsed, but nothing in it is available from anyone present
    NoResults,
    /// The catalog parsed; pick one of these
    Choices(Vec<CatalogEntry>),
    /// Selection out of range
    InvalidChoice {
        /// What the operator entered
        index: i64,
        /// How many choices there are
        count: usize,
    },
    /// A request for an item was sent
    Requesting(CatalogEntry),
    /// The catalog could not be decoded
    CatalogUnreadable(String),
    /// The item arrived as an archive and was unpacked
    Extracted {
        /// The archive's name
        archive: String,
        /// Files written
        files: Vec<PathBuf>,
    },
    /// The item arrived and is not an archive, so it was kept as it is
    Delivered(PathBuf),
    /// The item arrived but could not be unpacked
    ExtractionFailed {
        /// The archive's name
        archive: String,
        /// What went wrong
        reason: String,
    },
    /// A transfer did not complete
    TransferFailed {
        /// The file being received
        file_name: String,
        /// What went wrong
        reason: String,
    },
}

impl Notice {
    /// How this notice should be presented
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Notice::Searching { .. } | Notice::Choices(_) | Notice::Requesting(_) => {
                Severity::Info
            }
            Notice::Busy(_) | Notice::NoResults | Notice::InvalidChoice { .. } => {
                Severity::Warning
            }
            Notice::FileAlreadyExists(_)
            | Notice::CatalogUnreadable(_)
            | Notice::ExtractionFailed { .. }
            | Notice::TransferFailed { .. } => Severity::Error,
            Notice::Extracted { .. } | Notice::Delivered(_) => Severity::Success,
        }
    }
}

#[derive(Tabled)]
struct ChoiceRow<'a> {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "From")]
    sender: &'a str,
    #[tabled(rename = "Item")]
    command: &'a str,
}

fn choices_table(entries: &[CatalogEntry]) -> Table {
    let rows = entries.iter().enumerate().map(|(index, e)| ChoiceRow {
        index,
        sender: &e.sender_nick,
        command: e.command(),
    });
    let mut table = Table::new(rows);
    let _ = table.with(Style::sharp());
    table
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::Searching { query } => write!(f, "Searching for \"{query}\"..."),
            Notice::Busy(state) => write!(
                f,
                "Busy ({state}); wait for the current transfer to finish"
            ),
            Notice::FileAlreadyExists(name) => {
                write!(f, "Refusing offer of {name}: a file of that name already exists")
            }
            Notice::NoResults => write!(f, "No results"),
            Notice::Choices(entries) => {
                writeln!(f, "{} results:", entries.len())?;
                write!(f, "{}", choices_table(entries))?;
                write!(f, "\nEnter a number to fetch that item, or some text to search again")
            }
            Notice::InvalidChoice { index, count } => match count {
                0 => write!(
                    f,
                    "Invalid choice {index}: there is nothing to choose from; search again"
                ),
                _ => write!(
                    f,
                    "Invalid choice {index}: enter a number from 0 to {}",
                    count - 1
                ),
            },
            Notice::Requesting(entry) => write!(
                f,
                "Requesting {} from {}",
                entry.command(),
                entry.sender_nick
            ),
            Notice::CatalogUnreadable(reason) => {
                write!(f, "Could not read search results: {reason}")
            }
            Notice::Extracted { archive, files } => {
                write!(f, "Extracted {} file(s) from {archive}", files.len())?;
                for file in files {
                    write!(f, "\n  {}", file.display())?;
                }
                Ok(())
            }
            Notice::Delivered(path) => write!(f, "Received {}", path.display()),
            Notice::ExtractionFailed { archive, reason } => {
                write!(f, "Could not extract {archive}: {reason}")
            }
            Notice::TransferFailed { file_name, reason } => {
                write!(f, "Transfer of {file_name} failed: {reason}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Notice, Severity};
    use crate::catalog::CatalogEntry;
    use crate::session::State;
    use pretty_assertions::assert_eq;

    #[test]
    fn choices_render_as_table() {
        let entries = vec![
            CatalogEntry::from_line("!alice get dune.epub").unwrap(),
            CatalogEntry::from_line("!bob get dune.mobi").unwrap(),
        ];
        let text = Notice::Choices(entries).to_string();
        assert!(text.starts_with("2 results:"));
        assert!(text.contains("alice"));
        assert!(text.contains("get dune.mobi"));
        let alice = text.lines().position(|l| l.contains("alice")).unwrap();
        let bob = text.lines().position(|l| l.contains("bob")).unwrap();
        assert!(alice < bob);
    }

    #[test]
    fn invalid_choice_wording() {
        assert_eq!(
            Notice::InvalidChoice { index: 5, count: 1 }.to_string(),
            "Invalid choice 5: enter a number from 0 to 0"
        );
        assert!(Notice::InvalidChoice { index: 0, count: 0 }
            .to_string()
            .contains("nothing to choose from"));
    }

    #[test]
    fn severities() {
        assert_eq!(Notice::Busy(State::ReceivingItem).severity(), Severity::Warning);
        assert_eq!(Notice::NoResults.severity(), Severity::Warning);
        assert_eq!(
            Notice::FileAlreadyExists("x".into()).severity(),
            Severity::Error
        );
        assert_eq!(
            Notice::Delivered("x".into()).severity(),
            Severity::Success
        );
        assert!(Notice::Busy(State::AwaitingCatalogOffer)
            .to_string()
            .contains("awaiting-catalog-offer"));
    }
}
