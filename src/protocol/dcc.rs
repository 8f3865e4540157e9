// (c) 2025 Ross Younger
//! DCC SEND offers and acknowledgements

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::transfer::sanitize_file_name;

/// CTCP tag that introduces a DCC request
pub const CTCP_TAG: &str = "DCC";

/// The only DCC request shape we accept
pub const SEND_KEYWORD: &str = "SEND";

/// Number of tokens in a well-formed offer payload
const OFFER_TOKENS: usize = 5;

/// A validated `DCC SEND` offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DccOffer {
    /// File name as offered, reduced to a bare base name
    pub file_name: String,
    /// Address to connect to
    pub address: IpAddr,
    /// Port to connect to
    pub port: u16,
    /// Advertised size in bytes. This is advisory only; the peer may send more or less.
    pub size: u64,
}

/// Reasons an offer payload may be rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfferError {
    /// The payload could not be split into shell-style tokens
    #[error("unbalanced quoting in offer payload")]
    Quoting,
    /// Wrong number of tokens
    #[error("offer payload has {0} tokens, expected 5")]
    TokenCount(usize),
    /// First token was not `SEND`
    #[error("unexpected offer keyword `{0}`")]
    Keyword(String),
    /// Address was neither a decimal IPv4 number nor an address literal
    #[error("invalid peer address `{0}`")]
    Address(String),
    /// Port was not a number in 1..=65535
    #[error("invalid peer port `{0}`")]
    Port(String),
    /// Size was not a non-negative number
    #[error("invalid file size `{0}`")]
    Size(String),
    /// File name reduced to nothing usable
    #[error("unusable file name `{0}`")]
    FileName(String),
}

impl DccOffer {
    /// Parses the payload of a CTCP `DCC` message, i.e. everything after the `DCC` tag.
    ///
    /// The payload must contain exactly five shell-style tokens:
    /// `SEND <fileName> <peerAddressAsUint32Decimal> <peerPort> <sizeBytes>`.
    pub fn parse(payload: &str) -> Result<Self, OfferError> {
        let tokens = shlex::split(payload).ok_or(OfferError::Quoting)?;
        let [keyword, file_name, address, port, size] =
            <[String; OFFER_TOKENS]>::try_from(tokens).map_err(|t| OfferError::TokenCount(t.len()))?;

        if keyword != SEND_KEYWORD {
            return Err(OfferError::Keyword(keyword));
        }
        let Some(sanitized) = sanitize_file_name(&file_name) else {
            return Err(OfferError::FileName(file_name));
        };
        let address = parse_address(&address).ok_or(OfferError::Address(address))?;
        let port = match port.parse::<u16>() {
            Ok(p) if p != 0 => p,
            _ => return Err(OfferError::Port(port)),
        };
        let size = size.parse::<u64>().map_err(|_| OfferError::Size(size))?;

        Ok(Self {
            file_name: sanitized,
            address,
            port,
            size,
        })
    }

    /// The socket address to connect to for this offer
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// DCC addresses are conventionally an IPv4 address as a decimal u32.
/// Some clients send a literal address (necessarily so for IPv6), which we also accept.
fn parse_address(s: &str) -> Option<IpAddr> {
    if let Ok(n) = s.parse::<u32>() {
        return Some(IpAddr::V4(Ipv4Addr::from(n)));
    }
    s.parse::<IpAddr>().ok()
}

/// Flow-control acknowledgement sent after every received chunk.
///
/// On the wire this is the total number of bytes received so far, modulo 2^32, as a big-endian u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Acknowledgement(pub u32);

impl Acknowledgement {
    /// Wire encoding
    #[must_use]
    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Wire decoding
    #[must_use]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl std::fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::{Acknowledgement, DccOffer, OfferError};
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    #[test]
    fn well_formed_offer() {
        let offer = DccOffer::parse("SEND Search123.zip 3232235521 5000 204800").unwrap();
        assert_eq!(offer.file_name, "Search123.zip");
        assert_eq!(offer.address, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)));
        assert_eq!(offer.port, 5000);
        assert_eq!(offer.size, 204_800);
        assert_eq!(offer.socket_addr().to_string(), "192.168.0.1:5000");
    }

    #[test]
    fn quoted_file_name() {
        let offer = DccOffer::parse(r#"SEND "Frank Herbert - Dune.epub" 2130706433 5000 1"#).unwrap();
        assert_eq!(offer.file_name, "Frank Herbert - Dune.epub");
        assert_eq!(offer.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn directory_components_are_stripped() {
        let offer = DccOffer::parse("SEND ../../etc/passwd 2130706433 5000 1").unwrap();
        assert_eq!(offer.file_name, "passwd");
    }

    #[test]
    fn literal_addresses() {
        let offer = DccOffer::parse("SEND f 10.1.2.3 5000 1").unwrap();
        assert_eq!(offer.address, IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)));
        let offer = DccOffer::parse("SEND f ::1 5000 1").unwrap();
        assert_eq!(offer.address, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn malformed_offers() {
        assert_eq!(
            DccOffer::parse("SEND f 1 2"),
            Err(OfferError::TokenCount(4))
        );
        assert_eq!(
            DccOffer::parse("SEND f 1 2 3 4"),
            Err(OfferError::TokenCount(6))
        );
        assert_eq!(
            DccOffer::parse("CHAT chat 2130706433 5000 0"),
            Err(OfferError::Keyword("CHAT".into()))
        );
        assert_eq!(
            DccOffer::parse("SEND f nowhere 5000 1"),
            Err(OfferError::Address("nowhere".into()))
        );
        assert_eq!(
            DccOffer::parse("SEND f 2130706433 0 1"),
            Err(OfferError::Port("0".into()))
        );
        assert_eq!(
            DccOffer::parse("SEND f 2130706433 70000 1"),
            Err(OfferError::Port("70000".into()))
        );
        assert_eq!(
            DccOffer::parse("SEND f 2130706433 5000 -1"),
            Err(OfferError::Size("-1".into()))
        );
        assert_eq!(
            DccOffer::parse("SEND .. 2130706433 5000 1"),
            Err(OfferError::FileName("..".into()))
        );
        assert_eq!(
            DccOffer::parse(r#"SEND "unterminated 2130706433 5000 1"#),
            Err(OfferError::Quoting)
        );
    }

    #[test]
    fn keyword_is_case_sensitive() {
        assert!(matches!(
            DccOffer::parse("send f 2130706433 5000 1"),
            Err(OfferError::Keyword(_))
        ));
    }

    #[test]
    fn acknowledgement_is_big_endian() {
        assert_eq!(Acknowledgement(100).to_bytes(), [0, 0, 0, 100]);
        assert_eq!(Acknowledgement(150).to_bytes(), [0, 0, 0, 150]);
        assert_eq!(Acknowledgement(0x0102_0304).to_bytes(), [1, 2, 3, 4]);
        assert_eq!(
            Acknowledgement::from_bytes([0xff, 0, 0, 1]),
            Acknowledgement(0xff00_0001)
        );
    }
}
