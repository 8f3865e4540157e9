// (c) 2025 Ross Younger
//! A minimal IRC client connection.
//!
//! This does no more than bookz needs: register, keep the connection alive, join one channel,
//! collect its name list and pass on CTCP control messages.

use std::collections::HashMap;

use anyhow::Context as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _};
use tracing::{debug, info, trace, warn};

use super::adapter::Inbound;
use crate::membership::parse_isupport_prefix;
use crate::protocol::irc::{ctcp_wrap, Message};

/// How many times we decorate our nickname before giving up
const MAX_NICK_ATTEMPTS: u8 = 5;

/// Reported in response to CTCP VERSION
const VERSION_REPLY: &str = concat!("bookz ", env!("CARGO_PKG_VERSION"));

/// One server connection
#[derive(Debug)]
pub(crate) struct IrcSession<R, W> {
    reader: R,
    writer: W,
    /// Partial line; persists across cancelled reads
    line: Vec<u8>,
    nickname: String,
    nick_attempts: u8,
    channel: String,
    /// Name replies accumulated per channel until the end-of-names marker
    names: HashMap<String, Vec<String>>,
    registered: bool,
}

impl<R, W> IrcSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(reader: R, writer: W, nickname: &str, channel: &str) -> Self {
        Self {
            reader,
            writer,
            line: Vec::with_capacity(512),
            nickname: nickname.to_string(),
            nick_attempts: 0,
            channel: channel.to_string(),
            names: HashMap::new(),
            registered: false,
        }
    }

    /// Our current nickname
    pub(crate) fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Has the server welcomed us?
    pub(crate) fn is_registered(&self) -> bool {
        self.registered
    }

    /// Sends one message
    pub(crate) async fn send(&mut self, message: &Message) -> anyhow::Result<()> {
        let mut line = message
            .to_line()
            .with_context(|| format!("cannot send {} message", message.command))?;
        trace!("> {line}");
        line.push_str("\r\n");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Introduces ourselves to the server
    pub(crate) async fn register(&mut self) -> anyhow::Result<()> {
        let nick = self.nickname.clone();
        self.send(&Message::new("NICK", [nick.as_str()])).await?;
        self.send(&Message::new("USER", [nick.as_str(), "0", "*", "bookz"]))
            .await
    }

    /// Says goodbye
    pub(crate) async fn quit(&mut self, reason: &str) -> anyhow::Result<()> {
        self.send(&Message::new("QUIT", [reason])).await
    }

    /// Reads the next message from the server.
    ///
    /// Returns `None` when the server closes the connection.
    /// Lines which do not parse are skipped.
    ///
    /// This is cancel-safe: a partly-read line is kept for the next call.
    pub(crate) async fn read_message(&mut self) -> std::io::Result<Option<Message>> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.line).await?;
            if n == 0 && self.line.is_empty() {
                return Ok(None);
            }
            let text = String::from_utf8_lossy(&self.line).into_owned();
            self.line.clear();
            trace!("< {}", text.trim_end());
            if let Some(message) = Message::parse(&text) {
                return Ok(Some(message));
            }
        }
    }

    fn is_me(&self, nick: Option<&str>) -> bool {
        nick.is_some_and(|n| n.eq_ignore_ascii_case(&self.nickname))
    }

    /// Deals with one server message.
    ///
    /// Connection housekeeping is handled here; anything the session needs to know about
    /// is returned.
    pub(crate) async fn handle(&mut self, message: &Message) -> anyhow::Result<Option<Inbound>> {
        match message.command.as_str() {
            "PING" => {
                self.send(&Message::new("PONG", message.params.clone()))
                    .await?;
            }
            "001" => {
                self.registered = true;
                if let Some(nick) = message.param(0) {
                    nick.clone_into(&mut self.nickname);
                }
                info!("registered as {}", self.nickname);
                let channel = self.channel.clone();
                self.send(&Message::new("JOIN", [channel.as_str()])).await?;
            }
            "433" if !self.registered => {
                self.nick_attempts += 1;
                if self.nick_attempts > MAX_NICK_ATTEMPTS {
                    anyhow::bail!("nickname {} is in use; giving up", self.nickname);
                }
                warn!("nickname {} is in use; trying again", self.nickname);
                self.nickname.push('_');
                let nick = self.nickname.clone();
                self.send(&Message::new("NICK", [nick.as_str()])).await?;
            }
            "005" => {
                if let Some(symbols) = message.params.iter().find_map(|p| parse_isupport_prefix(p))
                {
                    debug!("server membership prefixes: {symbols}");
                    return Ok(Some(Inbound::Prefixes(symbols.to_string())));
                }
            }
            "JOIN" if self.is_me(message.nick()) => {
                if let Some(channel) = message.param(0) {
                    return Ok(Some(Inbound::JoinConfirmed {
                        channel: channel.to_string(),
                    }));
                }
            }
            "NICK" if self.is_me(message.nick()) => {
                if let Some(nick) = message.param(0) {
                    info!("now known as {nick}");
                    nick.clone_into(&mut self.nickname);
                }
            }
            "353" => {
                // <me> <type> <channel> :<names>
                let n = message.params.len();
                if n >= 3 {
                    let channel = message.params[n - 2].to_ascii_lowercase();
                    self.names
                        .entry(channel)
                        .or_default()
                        .push(message.params[n - 1].clone());
                }
            }
            "366" => {
                // <me> <channel> :End of /NAMES list.
                if let Some(channel) = message.param(1) {
                    let names = self
                        .names
                        .remove(&channel.to_ascii_lowercase())
                        .unwrap_or_default()
                        .join(" ");
                    return Ok(Some(Inbound::MembershipReply {
                        channel: channel.to_string(),
                        names,
                    }));
                }
            }
            "PRIVMSG" => return self.on_privmsg(message).await,
            "NOTICE" => {
                if message.ctcp().is_none() {
                    self.log_chatter(message);
                }
            }
            "ERROR" => {
                warn!(
                    "server closing connection: {}",
                    message.params.last().map_or("", String::as_str)
                );
                return Ok(Some(Inbound::Disconnected));
            }
            cmd if cmd.len() == 3 && cmd.starts_with(['4', '5']) => {
                let text = message.params.get(1..).unwrap_or_default().join(" ");
                warn!("server: {text}");
            }
            _ => trace!("unhandled {}", message.command),
        }
        Ok(None)
    }

    async fn on_privmsg(&mut self, message: &Message) -> anyhow::Result<Option<Inbound>> {
        let from = message.nick().unwrap_or_default().to_string();
        let Some((tag, payload)) = message.ctcp() else {
            self.log_chatter(message);
            return Ok(None);
        };
        match tag.to_ascii_uppercase().as_str() {
            "VERSION" => {
                debug!("CTCP VERSION from {from}");
                let reply = ctcp_wrap("VERSION", VERSION_REPLY);
                self.send(&Message::notice(&from, &reply)).await?;
                Ok(None)
            }
            "PING" => {
                let reply = ctcp_wrap("PING", payload);
                self.send(&Message::notice(&from, &reply)).await?;
                Ok(None)
            }
            "ACTION" => Ok(None),
            _ => Ok(Some(Inbound::ControlMessage {
                from,
                tag: tag.to_string(),
                payload: payload.to_string(),
            })),
        }
    }

    /// Messages to us are shown; channel chatter is only traced
    fn log_chatter(&self, message: &Message) {
        let (Some(target), Some(text)) = (message.param(0), message.params.last()) else {
            return;
        };
        let from = message.nick().unwrap_or("server");
        if self.is_me(Some(target)) {
            info!("<{from}> {text}");
        } else {
            trace!("{target} <{from}> {text}");
        }
    }
}
