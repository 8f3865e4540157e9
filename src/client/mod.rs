// (c) 2025 Ross Younger
//! The network side: the IRC connection, DCC transfer streams and the event loop that drives the
//! [session](crate::session)

pub(crate) mod adapter;
pub(crate) mod dcc;
pub(crate) mod irc_session;
mod main_loop;
pub(crate) mod progress;

#[allow(clippy::module_name_repetitions)]
pub use main_loop::client_main;

pub use progress::MAX_UPDATE_FPS;
