// (c) 2025 Ross Younger
//! The session state machine
//!
//! A session runs one *cycle* at a time:
//! search, receive the catalog, choose, receive the item, extract, and back to idle.
//!
//! The machine is pure with respect to the network. [`Session::handle`] consumes one [`Event`]
//! and returns the [`Action`]s the caller must perform, in order. It does touch the local
//! filesystem, because the [`Transfer`] it owns reserves its destination file.
//!
//! Neither IRC nor DCC correlates an offer with the request that provoked it, so there is only
//! ever one transfer slot. While a transfer is open, operator input that would start a second
//! cycle is refused with a [`Notice::Busy`]. Before an offer arrives, a new search replaces the
//! one still awaiting an answer.

mod notice;
pub use notice::{Notice, Severity};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use crate::catalog::{
    extract_archive, parse_catalog, ArchiveKind, CatalogEntry, CatalogReader, RequestStyle,
};
use crate::membership::Membership;
use crate::protocol::dcc::{Acknowledgement, DccOffer};
use crate::transfer::{remove_artifact, Purpose, Transfer, TransferError, TransferSummary};

/// Where we are in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum State {
    /// Waiting for the operator
    #[default]
    Idle,
    /// A search was sent; waiting for the catalog to be offered
    AwaitingCatalogOffer,
    /// Catalog transfer in progress
    ReceivingCatalog,
    /// Catalog received; waiting for the operator to pick an entry
    Choosing,
    /// An item was requested; waiting for it to be offered
    AwaitingItemOffer,
    /// Item transfer in progress
    ReceivingItem,
    /// Unpacking the received item
    Extracting,
}

impl State {
    /// The transfer purpose expected in this state, if an offer would be welcome
    fn awaited_purpose(self) -> Option<Purpose> {
        match self {
            State::AwaitingCatalogOffer => Some(Purpose::Catalog),
            State::AwaitingItemOffer => Some(Purpose::Item),
            _ => None,
        }
    }

    fn receiving(purpose: Purpose) -> Self {
        match purpose {
            Purpose::Catalog => State::ReceivingCatalog,
            Purpose::Item => State::ReceivingItem,
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A line typed by the operator
    Operator(String),
    /// A well-formed DCC SEND offer
    Offer {
        /// Who sent it
        from: String,
        /// The offer
        offer: DccOffer,
    },
    /// Bytes arrived on the transfer stream
    Chunk(Vec<u8>),
    /// The peer closed the transfer stream
    StreamClosed,
    /// The transfer stream could not be opened, or broke
    StreamFailed(String),
    /// A complete name list for a channel
    Membership {
        /// Channel the list describes
        channel: String,
        /// Space-separated names, possibly with status prefixes
        names: String,
    },
    /// The server advertised its membership status symbols
    Prefixes(String),
    /// We joined a channel
    Joined {
        /// The channel
        channel: String,
    },
    /// The server connection is gone
    Disconnected,
}

/// Outputs from the state machine, to be carried out in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a message to a channel or user
    SendMessage {
        /// Destination
        target: String,
        /// Message body
        text: String,
    },
    /// Ask the server for a channel's name list
    RequestNames {
        /// The channel
        channel: String,
    },
    /// Connect to a DCC sender and start streaming
    OpenStream {
        /// Where to connect
        address: SocketAddr,
        /// The file being received, for display
        file_name: String,
        /// Advertised size, for display
        expected_size: u64,
        /// Why we are receiving it
        purpose: Purpose,
    },
    /// Send this acknowledgement on the transfer stream
    Acknowledge(Acknowledgement),
    /// The transfer stream is finished with; drop it
    CloseStream,
    /// Tell the operator something
    Notify(Notice),
    /// End the process
    Terminate,
}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Search command prefix, e.g. `@search`
    pub search_command: String,
    /// How catalog entries are requested
    pub request_style: RequestStyle,
    /// Where transfers and extracted files land
    pub download_dir: PathBuf,
    /// A query to send as soon as the channel is joined
    pub auto_search: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            search_command: "@search".into(),
            request_style: RequestStyle::default(),
            download_dir: PathBuf::from("."),
            auto_search: None,
        }
    }
}

/// The session orchestrator
#[derive(Debug)]
pub struct Session {
    state: State,
    target: String,
    membership: Membership,
    pending_choices: Vec<CatalogEntry>,
    last_query: Option<String>,
    last_request: Option<CatalogEntry>,
    transfer: Option<Transfer>,
    settings: SessionSettings,
    reader: CatalogReader,
}

impl Session {
    /// Creates a session bound to a destination channel
    #[must_use]
    pub fn new(target: &str, settings: SessionSettings) -> Self {
        Self {
            state: State::Idle,
            target: target.to_string(),
            membership: Membership::default(),
            pending_choices: Vec::new(),
            last_query: None,
            last_request: None,
            transfer: None,
            settings,
            reader: CatalogReader::default(),
        }
    }

    /// Replaces the catalog reader
    #[must_use]
    pub fn with_reader(mut self, reader: CatalogReader) -> Self {
        self.reader = reader;
        self
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// The destination for outbound messages
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The choices on offer. Empty unless [`State::Choosing`].
    #[must_use]
    pub fn pending_choices(&self) -> &[CatalogEntry] {
        &self.pending_choices
    }

    /// The most recent search text
    #[must_use]
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// The most recently requested entry
    #[must_use]
    pub fn last_request(&self) -> Option<&CatalogEntry> {
        self.last_request.as_ref()
    }

    /// Who is in the channel
    #[must_use]
    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// The active transfer, if any
    #[must_use]
    pub fn transfer(&self) -> Option<&Transfer> {
        self.transfer.as_ref()
    }

    /// Is the session between cycles (or waiting on the operator's choice)?
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self.state, State::Idle | State::Choosing)
    }

    /// Is there a query still waiting to be sent when the channel is joined?
    #[must_use]
    pub fn auto_search_pending(&self) -> bool {
        self.settings.auto_search.is_some()
    }

    fn set_state(&mut self, next: State) {
        if next != self.state {
            debug!("session: {} -> {next}", self.state);
            self.state = next;
        }
        if next != State::Choosing {
            self.pending_choices.clear();
        }
    }

    /// Consumes one event, returning what the caller must do about it
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        trace!("session event in {}: {event:?}", self.state);
        match event {
            Event::Operator(line) => self.on_operator(&line),
            Event::Offer { from, offer } => self.on_offer(&from, offer),
            Event::Chunk(bytes) => self.on_chunk(&bytes),
            Event::StreamClosed => self.on_stream_closed(),
            Event::StreamFailed(reason) => self.on_stream_failed(reason),
            Event::Membership { channel, names } => {
                if channel != "*" && !channel.eq_ignore_ascii_case(&self.target) {
                    trace!("ignoring names for {channel}");
                } else {
                    let _ = self.membership.replace(&channel, &names);
                }
                vec![]
            }
            Event::Prefixes(symbols) => {
                self.membership.set_prefixes(&symbols);
                vec![]
            }
            Event::Joined { channel } => self.on_joined(channel),
            Event::Disconnected => {
                if let Some(t) = self.transfer.take() {
                    warn!("disconnected during transfer of {}", t.file_name());
                    let _ = t.abort();
                }
                vec![Action::Terminate]
            }
        }
    }

    fn on_operator(&mut self, line: &str) -> Vec<Action> {
        let line = line.trim();
        if line.is_empty() {
            return vec![];
        }
        match self.state {
            State::Idle => self.search(line),
            State::Choosing => match line.parse::<i64>() {
                Ok(index) => self.choose(index),
                Err(_) => self.search(line),
            },
            // Nothing is in flight until an offer opens a transfer, so a fresh search supersedes
            State::AwaitingCatalogOffer | State::AwaitingItemOffer if self.transfer.is_none() => {
                self.search(line)
            }
            busy => vec![Action::Notify(Notice::Busy(busy))],
        }
    }

    fn search(&mut self, query: &str) -> Vec<Action> {
        let text = format!("{} {query}", self.settings.search_command);
        info!("searching: {text}");
        self.last_query = Some(query.to_string());
        self.set_state(State::AwaitingCatalogOffer);
        vec![
            Action::SendMessage {
                target: self.target.clone(),
                text,
            },
            Action::Notify(Notice::Searching {
                query: query.to_string(),
            }),
        ]
    }

    fn choose(&mut self, index: i64) -> Vec<Action> {
        let count = self.pending_choices.len();
        let Some(entry) = usize::try_from(index)
            .ok()
            .and_then(|i| self.pending_choices.get(i))
            .cloned()
        else {
            return vec![Action::Notify(Notice::InvalidChoice { index, count })];
        };
        let text = entry.request(self.settings.request_style).to_string();
        info!("requesting: {text}");
        self.last_request = Some(entry.clone());
        self.set_state(State::AwaitingItemOffer);
        vec![
            Action::SendMessage {
                target: self.target.clone(),
                text,
            },
            Action::Notify(Notice::Requesting(entry)),
        ]
    }

    fn on_offer(&mut self, from: &str, offer: DccOffer) -> Vec<Action> {
        let Some(purpose) = self.state.awaited_purpose() else {
            // This also covers a second offer arriving while a transfer is active
            info!(
                "ignoring offer of {} from {from} while {}",
                offer.file_name, self.state
            );
            return vec![];
        };
        match Transfer::open(
            &self.settings.download_dir,
            &offer.file_name,
            offer.size,
            purpose,
        ) {
            Ok(transfer) => {
                info!(
                    "accepting {purpose} {} ({} bytes) from {from}",
                    offer.file_name, offer.size
                );
                self.transfer = Some(transfer);
                self.set_state(State::receiving(purpose));
                vec![Action::OpenStream {
                    address: offer.socket_addr(),
                    file_name: offer.file_name,
                    expected_size: offer.size,
                    purpose,
                }]
            }
            Err(TransferError::FileAlreadyExists(name)) => {
                warn!("refusing offer from {from}: {name} already exists");
                vec![Action::Notify(Notice::FileAlreadyExists(name))]
            }
            Err(e) => {
                warn!("refusing offer of {} from {from}: {e}", offer.file_name);
                vec![Action::Notify(Notice::TransferFailed {
                    file_name: offer.file_name,
                    reason: e.to_string(),
                })]
            }
        }
    }

    fn on_chunk(&mut self, bytes: &[u8]) -> Vec<Action> {
        match self.transfer.as_mut() {
            Some(t) => vec![Action::Acknowledge(t.accept(bytes))],
            None => {
                warn!("discarding {} stray bytes in {}", bytes.len(), self.state);
                vec![]
            }
        }
    }

    fn on_stream_failed(&mut self, reason: String) -> Vec<Action> {
        let Some(t) = self.transfer.take() else {
            debug!("stream failure with no transfer active: {reason}");
            return vec![Action::CloseStream];
        };
        let file_name = t.file_name().to_string();
        let received = t.abort();
        warn!("transfer of {file_name} failed after {received} bytes: {reason}");
        self.set_state(State::Idle);
        vec![
            Action::CloseStream,
            Action::Notify(Notice::TransferFailed { file_name, reason }),
        ]
    }

    fn on_stream_closed(&mut self) -> Vec<Action> {
        let Some(t) = self.transfer.take() else {
            debug!("stream closed with no transfer active");
            return vec![Action::CloseStream];
        };
        let file_name = t.file_name().to_string();
        let mut actions = vec![Action::CloseStream];
        match t.close() {
            Ok(summary) => match summary.purpose {
                Purpose::Catalog => actions.push(self.catalog_received(&summary)),
                Purpose::Item => actions.push(self.item_received(&summary)),
            },
            Err(e) => {
                self.set_state(State::Idle);
                actions.push(Action::Notify(Notice::TransferFailed {
                    file_name,
                    reason: e.to_string(),
                }));
            }
        }
        actions
    }

    fn catalog_received(&mut self, summary: &TransferSummary) -> Action {
        let parsed = parse_catalog(&summary.data, &self.reader, self.membership.nicks());
        remove_artifact(&summary.path);
        match parsed {
            Ok(entries) => {
                info!("{} catalog entries available", entries.len());
                self.set_state(State::Choosing);
                if entries.is_empty() {
                    Action::Notify(Notice::NoResults)
                } else {
                    self.pending_choices.clone_from(&entries);
                    Action::Notify(Notice::Choices(entries))
                }
            }
            Err(e) => {
                warn!("catalog {}: {e}", summary.file_name);
                self.set_state(State::Idle);
                Action::Notify(Notice::CatalogUnreadable(e.to_string()))
            }
        }
    }

    fn item_received(&mut self, summary: &TransferSummary) -> Action {
        self.set_state(State::Extracting);
        let notice = deliver(&summary.path, &summary.file_name, &self.settings.download_dir);
        self.set_state(State::Idle);
        Action::Notify(notice)
    }

    fn on_joined(&mut self, channel: String) -> Vec<Action> {
        info!("joined {channel}");
        let mut actions = vec![Action::RequestNames { channel }];
        if let Some(query) = self.settings.auto_search.take() {
            if self.state == State::Idle {
                actions.extend(self.search(&query));
            }
        }
        actions
    }
}

/// Unpacks a received item if it is an archive, then removes the archive.
/// Anything else is left where it landed.
fn deliver(path: &Path, file_name: &str, dest: &Path) -> Notice {
    if ArchiveKind::from_path(path).is_none() {
        info!("{file_name} is not an archive; keeping it as it is");
        return Notice::Delivered(path.to_path_buf());
    }
    let result = extract_archive(path, dest);
    remove_artifact(path);
    match result {
        Ok(files) => Notice::Extracted {
            archive: file_name.to_string(),
            files,
        },
        Err(e) => {
            warn!("extracting {file_name}: {e}");
            Notice::ExtractionFailed {
                archive: file_name.to_string(),
                reason: e.to_string(),
            }
        }
    }
}
