// (c) 2025 Ross Younger
//! Channel membership tracking
//!
//! The server reports who is in a channel as a list of nicknames, each optionally
//! prefixed with a status symbol (`@alice`, `+bob`). We keep the bare names; these are
//! the peers whose catalog entries are worth offering.

use std::collections::HashSet;

use tracing::{debug, trace};

/// Status symbols assumed until the server advertises its own via `PREFIX`
pub const DEFAULT_PREFIXES: &str = "~&@%+";

/// The channel placeholder some servers use in replies that aren't about a specific channel
const NO_CHANNEL: &str = "*";

/// The set of nicknames currently present in the channel of interest
#[derive(Debug, Clone)]
pub struct Membership {
    nicks: HashSet<String>,
    prefixes: String,
}

impl Default for Membership {
    fn default() -> Self {
        Self {
            nicks: HashSet::new(),
            prefixes: DEFAULT_PREFIXES.to_string(),
        }
    }
}

/// Extracts the status symbols from an ISUPPORT `PREFIX` token, e.g. `PREFIX=(ov)@+` yields `@+`.
///
/// Returns `None` if this token is not a well-formed `PREFIX`.
#[must_use]
pub fn parse_isupport_prefix(token: &str) -> Option<&str> {
    let value = token.strip_prefix("PREFIX=")?;
    if value.is_empty() {
        return Some("");
    }
    let (modes, symbols) = value.strip_prefix('(')?.split_once(')')?;
    if modes.chars().count() != symbols.chars().count() {
        return None;
    }
    Some(symbols)
}

impl Membership {
    /// Replaces the recognised status symbols
    pub fn set_prefixes(&mut self, symbols: &str) {
        debug!("membership prefixes: {symbols:?}");
        symbols.clone_into(&mut self.prefixes);
    }

    /// Strips at most one leading status symbol
    fn bare<'a>(&self, name: &'a str) -> &'a str {
        match name.chars().next() {
            Some(c) if self.prefixes.contains(c) => &name[c.len_utf8()..],
            _ => name,
        }
    }

    /// Rebuilds the set wholesale from a space-separated name list.
    ///
    /// A reply for the placeholder channel `*` leaves the set untouched.
    /// Returns whether the set was replaced.
    pub fn replace(&mut self, channel: &str, raw_names: &str) -> bool {
        if channel == NO_CHANNEL {
            trace!("ignoring name list for placeholder channel");
            return false;
        }
        self.nicks = raw_names
            .split_whitespace()
            .map(|n| self.bare(n))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        debug!("{channel}: {} members", self.nicks.len());
        true
    }

    /// Is this nickname present?
    #[must_use]
    pub fn contains(&self, nick: &str) -> bool {
        self.nicks.contains(nick)
    }

    /// The current set
    #[must_use]
    pub fn nicks(&self) -> &HashSet<String> {
        &self.nicks
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.nicks.len()
    }

    /// Is the set empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nicks.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{parse_isupport_prefix, Membership};
    use pretty_assertions::assert_eq;

    #[test]
    fn prefixes_are_stripped() {
        let mut m = Membership::default();
        assert!(m.replace("#bookz", "@alice +bob carol"));
        assert_eq!(m.len(), 3);
        assert!(m.contains("alice"));
        assert!(m.contains("bob"));
        assert!(m.contains("carol"));
        assert!(!m.contains("@alice"));
    }

    #[test]
    fn only_one_prefix_is_stripped() {
        let mut m = Membership::default();
        let _ = m.replace("#bookz", "@+dave");
        assert!(m.contains("+dave"));
    }

    #[test]
    fn replacement_is_wholesale() {
        let mut m = Membership::default();
        let _ = m.replace("#bookz", "alice bob");
        let _ = m.replace("#bookz", "carol");
        assert!(!m.contains("alice"));
        assert!(m.contains("carol"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn placeholder_channel_is_a_no_op() {
        let mut m = Membership::default();
        let _ = m.replace("#bookz", "alice");
        assert!(!m.replace("*", "mallory"));
        assert!(m.contains("alice"));
        assert!(!m.contains("mallory"));
    }

    #[test]
    fn empty_list_clears() {
        let mut m = Membership::default();
        let _ = m.replace("#bookz", "alice");
        assert!(m.replace("#bookz", ""));
        assert!(m.is_empty());
    }

    #[test]
    fn advertised_prefixes() {
        assert_eq!(parse_isupport_prefix("PREFIX=(ov)@+"), Some("@+"));
        assert_eq!(parse_isupport_prefix("PREFIX=(qaohv)~&@%+"), Some("~&@%+"));
        assert_eq!(parse_isupport_prefix("PREFIX="), Some(""));
        assert_eq!(parse_isupport_prefix("PREFIX=(ov)@"), None);
        assert_eq!(parse_isupport_prefix("CHANTYPES=#"), None);

        let mut m = Membership::default();
        m.set_prefixes("@");
        let _ = m.replace("#bookz", "@alice +bob");
        assert!(m.contains("alice"));
        assert!(m.contains("+bob"));
    }
}
