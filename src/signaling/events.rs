use crate::error::SignalingError;
use crate::utils::random_id;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Opaque session-scoped client identifier. Picked locally at client
/// construction, echoed by the relay so each side can tell its own chat
/// messages from the stranger's.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn random() -> Self {
        Self(random_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// ICE candidate as relayed between the two peers.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: Option<u16>,
}

/// Negotiation payload inside a [`SignalEnvelope`].
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SignalPayload {
    Offer { sdp: RTCSessionDescription },
    Answer { sdp: RTCSessionDescription },
    IceCandidate(IceCandidate),
}

/// Negotiation relay envelope. Clients address `target`; the relay fills
/// in `sender` when forwarding to the other side of the pairing.
///
/// Envelopes are meaningful only while a pairing is active; received
/// outside one they are discarded.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignalEnvelope {
    pub target: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<PeerId>,
    pub signal: SignalPayload,
}

/// Chat text forwarded by the relay; `id` is the sender's [`PeerId`].
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatPayload {
    pub id: PeerId,
    pub msg: String,
}

/// Outbound events, client to relay.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Request pairing, carrying the local client id.
    Start(PeerId),
    Signal(SignalEnvelope),
    NewMessageToServer(String),
    /// Typing indicator, carrying the display text the partner renders.
    Typing(String),
    DoneTyping,
    /// Request to end the current session; the relay decides the outcome.
    Stop,
}

/// Inbound events, relay to client.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    NumberOfOnline(u64),
    Searching(String),
    /// Partner found; begin negotiation.
    ChatStart(String),
    Signal(SignalEnvelope),
    NewMessageToClient(ChatPayload),
    StrangerIsTyping(String),
    StrangerIsDoneTyping,
    /// Terminal notifications; all three end the session the same way.
    GoodBye(String),
    StrangerDisconnected(String),
    EndChat(String),
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, SignalingError> {
    serde_json::to_string(value).map_err(SignalingError::Encode)
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, SignalingError> {
    serde_json::from_str(text).map_err(SignalingError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_relay_names() {
        let start = encode(&ClientEvent::Start(PeerId::from("abc123"))).unwrap();
        assert_eq!(start, r#"{"event":"start","data":"abc123"}"#);

        let done = encode(&ClientEvent::DoneTyping).unwrap();
        assert_eq!(done, r#"{"event":"doneTyping"}"#);

        let msg = encode(&ClientEvent::NewMessageToServer("hi".into())).unwrap();
        assert_eq!(msg, r#"{"event":"newMessageToServer","data":"hi"}"#);
    }

    #[test]
    fn server_events_decode_from_relay_frames() {
        let online: ServerEvent = decode(r#"{"event":"numberOfOnline","data":42}"#).unwrap();
        assert!(matches!(online, ServerEvent::NumberOfOnline(42)));

        let chat: ServerEvent =
            decode(r#"{"event":"newMessageToClient","data":{"id":"abc","msg":"hey"}}"#).unwrap();
        match chat {
            ServerEvent::NewMessageToClient(payload) => {
                assert_eq!(payload.id, PeerId::from("abc"));
                assert_eq!(payload.msg, "hey");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let silent: ServerEvent = decode(r#"{"event":"strangerIsDoneTyping"}"#).unwrap();
        assert!(matches!(silent, ServerEvent::StrangerIsDoneTyping));
    }

    #[test]
    fn candidate_envelope_round_trips() {
        let envelope = SignalEnvelope {
            target: PeerId::from("t"),
            sender: None,
            signal: SignalPayload::IceCandidate(IceCandidate {
                candidate: "candidate:1 1 udp 2130706431 192.0.2.1 54400 typ host".into(),
                sdp_mid: Some("0".into()),
                sdp_mline_index: Some(0),
            }),
        };
        let text = encode(&ClientEvent::Signal(envelope)).unwrap();
        // `sender` is absent on the way out; the relay adds it.
        assert!(!text.contains("sender"));
        assert!(text.contains(r#""kind":"iceCandidate""#));

        let back: ClientEvent = decode(&text).unwrap();
        match back {
            ClientEvent::Signal(envelope) => match envelope.signal {
                SignalPayload::IceCandidate(c) => assert_eq!(c.sdp_mline_index, Some(0)),
                other => panic!("unexpected payload: {other:?}"),
            },
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
