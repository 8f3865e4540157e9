// (c) 2025 Ross Younger
//! Translation between the network collaborators and the session state machine

use tracing::{debug, warn};

use crate::protocol::dcc::{DccOffer, CTCP_TAG};
use crate::protocol::irc::Message;
use crate::session::{Action, Event};

/// Things the network side reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Inbound {
    /// A CTCP message addressed to us
    ControlMessage {
        from: String,
        tag: String,
        payload: String,
    },
    /// A complete name list for a channel
    MembershipReply { channel: String, names: String },
    /// The server's membership prefix symbols
    Prefixes(String),
    /// We are in the channel
    JoinConfirmed { channel: String },
    /// Data arrived on the transfer stream
    StreamChunk(Vec<u8>),
    /// The sender closed the transfer stream
    StreamClosed,
    /// The transfer stream broke
    StreamFailed(String),
    /// The server connection is gone
    Disconnected,
}

/// Converts a network report into a session event.
///
/// Control messages other than well-formed DCC SEND offers are logged and dropped.
pub(crate) fn translate(inbound: Inbound) -> Option<Event> {
    match inbound {
        Inbound::ControlMessage { from, tag, payload } => {
            if !tag.eq_ignore_ascii_case(CTCP_TAG) {
                debug!("ignoring CTCP {tag} from {from}");
                return None;
            }
            match DccOffer::parse(&payload) {
                Ok(offer) => Some(Event::Offer { from, offer }),
                Err(e) => {
                    warn!("dropping malformed offer from {from} ({payload}): {e}");
                    None
                }
            }
        }
        Inbound::MembershipReply { channel, names } => Some(Event::Membership { channel, names }),
        Inbound::Prefixes(symbols) => Some(Event::Prefixes(symbols)),
        Inbound::JoinConfirmed { channel } => Some(Event::Joined { channel }),
        Inbound::StreamChunk(bytes) => Some(Event::Chunk(bytes)),
        Inbound::StreamClosed => Some(Event::StreamClosed),
        Inbound::StreamFailed(reason) => Some(Event::StreamFailed(reason)),
        Inbound::Disconnected => Some(Event::Disconnected),
    }
}

/// The chat message that carries out an action, for those actions which are chat messages
pub(crate) fn outbound(action: &Action) -> Option<Message> {
    match action {
        Action::SendMessage { target, text } => Some(Message::privmsg(target, text)),
        Action::RequestNames { channel } => Some(Message::new("NAMES", [channel.as_str()])),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{outbound, translate, Inbound};
    use crate::protocol::dcc::DccOffer;
    use crate::session::{Action, Event};
    use pretty_assertions::assert_eq;

    fn control(tag: &str, payload: &str) -> Inbound {
        Inbound::ControlMessage {
            from: "SearchBot".into(),
            tag: tag.into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn offer() {
        let event = translate(control("DCC", "SEND Search123.zip 3232235521 5000 204800"));
        assert_eq!(
            event,
            Some(Event::Offer {
                from: "SearchBot".into(),
                offer: DccOffer {
                    file_name: "Search123.zip".into(),
                    address: IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)),
                    port: 5000,
                    size: 204_800,
                }
            })
        );
    }

    #[test]
    fn malformed_offers_are_dropped() {
        assert_eq!(translate(control("DCC", "SEND a.zip 1 2")), None);
        assert_eq!(translate(control("DCC", "CHAT chat 3232235521 5000 0")), None);
        assert_eq!(translate(control("DCC", "SEND a.zip 1 2 3 4")), None);
        assert_eq!(translate(control("FINGER", "")), None);
    }

    #[test]
    fn pass_through() {
        assert_eq!(
            translate(Inbound::JoinConfirmed {
                channel: "#bookz".into()
            }),
            Some(Event::Joined {
                channel: "#bookz".into()
            })
        );
        assert_eq!(
            translate(Inbound::StreamChunk(vec![1, 2])),
            Some(Event::Chunk(vec![1, 2]))
        );
        assert_eq!(translate(Inbound::Disconnected), Some(Event::Disconnected));
    }

    #[test]
    fn outbound_messages() {
        let m = outbound(&Action::SendMessage {
            target: "#bookz".into(),
            text: "@search dune".into(),
        })
        .unwrap();
        assert_eq!(m.to_line().unwrap(), "PRIVMSG #bookz :@search dune");
        let m = outbound(&Action::RequestNames {
            channel: "#bookz".into(),
        })
        .unwrap();
        assert_eq!(m.to_line().unwrap(), "NAMES #bookz");
        assert!(outbound(&Action::CloseStream).is_none());
    }
}
