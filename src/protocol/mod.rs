// (c) 2025 Ross Younger
//! Wire formats spoken by bookz
//!
//! bookz talks two protocols:
//!
//! * **IRC**, line based, over the chat server connection ([`irc`]).
//!   Client-to-client control messages (CTCP) ride inside `PRIVMSG` bodies,
//!   framed by `\x01` characters.
//! * **DCC SEND**, the out-of-band transfer extension ([`dcc`]).
//!   A peer offers a file with a CTCP `DCC` message whose payload is
//!   `SEND <filename> <address> <port> <size>`.
//!   We connect to the advertised address and port, then read raw bytes until the peer closes the stream.
//!   After every chunk we write back the running byte count as a 4-byte big-endian integer;
//!   the sender throttles on this acknowledgement.
//!
//! Neither protocol carries a correlation identifier between a request and the offer it provokes,
//! so the [session](crate::session) enforces strict sequencing instead.

pub mod dcc;
pub mod irc;
