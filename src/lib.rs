// (c) 2025 Ross Younger

#![allow(clippy::doc_markdown)]
//! `bookz` searches an IRC book channel and fetches what you choose, over DCC.
//!
//! ## Overview
//!
//! Many IRC channels host "bookz" bots. You search by sending a command such as `@search dune`
//! to the channel; a search bot replies by offering you a file over DCC. That file is an archive
//! containing a plain-text list of results. Each result is a *marker line* like
//!
//! ```text
//! !alice Frank Herbert - Dune.epub  ::INFO:: 1.2MB
//! ```
//!
//! which names the peer who can serve the item (`alice`) and the command that requests it.
//! Echoing that command back to the channel makes `alice` offer you the item, again over DCC.
//!
//! bookz automates the cycle:
//!
//! 1. Send a search to the channel
//! 2. Receive the catalog archive, unpack it, and list the entries whose server is actually
//!    present in the channel
//! 3. Let you pick one
//! 4. Request it, receive it, and unpack it if it is an archive
//!
//! ## Getting started
//!
//! ```text
//! bookz irc.example.org reader "frank herbert dune"
//! ```
//!
//! connects to `irc.example.org` as `reader`, joins `#bookz`, and runs the search straight away.
//! Further searches and choices are typed on standard input.
//!
//! See [config] for the options that may be set in a configuration file.
//!
//! ## Structure
//!
//! * [session] is the state machine that runs a cycle. It is pure with respect to the network.
//! * [transfer] receives one file: buffering, acknowledgements, and the destination file.
//! * [catalog] decodes catalog archives, finds marker lines, and extracts received items.
//! * [membership] tracks who is in the channel.
//! * [protocol] holds the IRC and DCC wire formats.
//! * The client module connects all of these to real sockets.
//!
//! #### MSRV policy
//!
//! As this is an application crate, the MSRV is not guaranteed to remain stable.
//! The MSRV may be upgraded from time to time to take advantage of new language features.

pub(crate) mod cli;
pub use cli::cli as main;
pub use cli::styles;

pub mod catalog;
pub(crate) mod client;
pub mod config;
pub use config::Configuration;
pub mod membership;
pub mod protocol;
pub mod session;
pub mod transfer;
pub mod util;
