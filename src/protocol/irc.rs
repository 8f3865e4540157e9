// (c) 2025 Ross Younger
//! A minimal IRC message codec (RFC 1459/2812 line format, with CTCP framing)

use std::fmt::Write as _;

/// CTCP delimiter character
pub const CTCP_DELIMITER: char = '\x01';

/// A single IRC protocol message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Message origin (`nick!user@host` or a server name), if present
    pub prefix: Option<String>,
    /// Command verb or three-digit numeric, upper-cased
    pub command: String,
    /// Parameters, including the trailing parameter (if any) as the last element
    pub params: Vec<String>,
}

/// Errors serialising an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    /// CR, LF and NUL cannot be carried in an IRC line
    #[error("message contains a forbidden control character")]
    ForbiddenCharacter,
    /// Only the final parameter may contain spaces or begin with a colon
    #[error("a middle parameter is empty, contains a space or begins with ':'")]
    BadMiddleParameter,
}

impl Message {
    /// Constructor for outbound messages
    pub fn new<I, S>(command: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            command: command.to_string(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Syntactic sugar for a `PRIVMSG`
    #[must_use]
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    /// Syntactic sugar for a `NOTICE`
    #[must_use]
    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", [target, text])
    }

    /// Parses one line received from the server.
    ///
    /// Trailing CR/LF are ignored. Message tags (`@...`) are skipped.
    /// Returns `None` for blank or structurally unusable lines.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        if let Some(tagged) = rest.strip_prefix('@') {
            let (_, after) = tagged.split_once(' ')?;
            rest = after.trim_start_matches(' ');
        }
        let prefix = if let Some(p) = rest.strip_prefix(':') {
            let (prefix, after) = p.split_once(' ')?;
            rest = after.trim_start_matches(' ');
            Some(prefix.to_string())
        } else {
            None
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split(' ').filter(|w| !w.is_empty());
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(t) = trailing {
            params.push(t.to_string());
        }
        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// The nickname portion of the prefix, if the message came from a user
    #[must_use]
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        let nick = prefix.split_once('!').map_or(prefix, |(n, _)| n);
        Some(nick)
    }

    /// Accessor for the n'th parameter
    #[must_use]
    pub fn param(&self, n: usize) -> Option<&str> {
        self.params.get(n).map(String::as_str)
    }

    /// If this is a `PRIVMSG` or `NOTICE` carrying a CTCP body, returns its tag and payload
    #[must_use]
    pub fn ctcp(&self) -> Option<(&str, &str)> {
        if self.command != "PRIVMSG" && self.command != "NOTICE" {
            return None;
        }
        ctcp_body(self.params.last()?)
    }

    /// Serialises this message as a single line, without the terminating CRLF
    pub fn to_line(&self) -> Result<String, LineError> {
        let mut out = String::with_capacity(64);
        out.push_str(&self.command);
        let Some((last, middle)) = self.params.split_last() else {
            return check_line(out);
        };
        for p in middle {
            if p.is_empty() || p.contains(' ') || p.starts_with(':') {
                return Err(LineError::BadMiddleParameter);
            }
            let _ = write!(out, " {p}");
        }
        if last.is_empty() || last.contains(' ') || last.starts_with(':') {
            let _ = write!(out, " :{last}");
        } else {
            let _ = write!(out, " {last}");
        }
        check_line(out)
    }
}

fn check_line(line: String) -> Result<String, LineError> {
    if line.contains(['\r', '\n', '\0']) {
        return Err(LineError::ForbiddenCharacter);
    }
    Ok(line)
}

/// Unpicks a CTCP body (`\x01TAG payload\x01`) into its tag and payload.
///
/// The closing delimiter is optional, as some clients omit it.
#[must_use]
pub fn ctcp_body(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix(CTCP_DELIMITER)?;
    let inner = inner.strip_suffix(CTCP_DELIMITER).unwrap_or(inner);
    let (tag, payload) = inner.split_once(' ').unwrap_or((inner, ""));
    if tag.is_empty() {
        return None;
    }
    Some((tag, payload))
}

/// Wraps a tag and payload as a CTCP body
#[must_use]
pub fn ctcp_wrap(tag: &str, payload: &str) -> String {
    if payload.is_empty() {
        format!("{CTCP_DELIMITER}{tag}{CTCP_DELIMITER}")
    } else {
        format!("{CTCP_DELIMITER}{tag} {payload}{CTCP_DELIMITER}")
    }
}
