//! Frame parsing
//!
//! Turns WebSocket frames into structured payloads. Text and binary frames
//! both carry JSON; control frames carry nothing for the application.

use serde::de::DeserializeOwned;
use tokio_tungstenite::tungstenite::Message;

use crate::error::SessionError;

/// Arbitrary key/value payload sent by an authenticated client.
pub type InboundMessage = serde_json::Map<String, serde_json::Value>;

/// Outcome of parsing one frame.
#[derive(Debug, PartialEq)]
pub enum Decoded<T> {
    Payload(T),
    /// Ping, pong or raw frame; nothing to hand to the application.
    Control,
    /// The peer sent a close frame.
    Close,
}

pub fn decode_frame<T: DeserializeOwned>(frame: Message) -> Result<Decoded<T>, SessionError> {
    let parsed = match frame {
        Message::Text(text) => serde_json::from_str(text.as_str()),
        Message::Binary(data) => serde_json::from_slice(&data),
        Message::Close(_) => return Ok(Decoded::Close),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return Ok(Decoded::Control),
    };

    parsed
        .map(Decoded::Payload)
        .map_err(|e| SessionError::MalformedMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_object_decodes() {
        let decoded: Decoded<InboundMessage> =
            decode_frame(Message::text(r#"{"text":"hi","n":1}"#)).unwrap();
        match decoded {
            Decoded::Payload(map) => {
                assert_eq!(map.get("text"), Some(&json!("hi")));
                assert_eq!(map.get("n"), Some(&json!(1)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn binary_json_decodes() {
        let decoded: Decoded<InboundMessage> =
            decode_frame(Message::binary(br#"{"k":"v"}"#.to_vec())).unwrap();
        assert!(matches!(decoded, Decoded::Payload(_)));
    }

    #[test]
    fn non_object_is_malformed() {
        let result: Result<Decoded<InboundMessage>, _> = decode_frame(Message::text("[1,2]"));
        assert!(matches!(result, Err(SessionError::MalformedMessage(_))));

        let result: Result<Decoded<InboundMessage>, _> = decode_frame(Message::text("not json"));
        assert!(matches!(result, Err(SessionError::MalformedMessage(_))));
    }

    #[test]
    fn control_and_close_frames() {
        let ping: Decoded<InboundMessage> = decode_frame(Message::Ping(vec![1u8].into())).unwrap();
        assert_eq!(ping, Decoded::Control);

        let close: Decoded<InboundMessage> = decode_frame(Message::Close(None)).unwrap();
        assert_eq!(close, Decoded::Close);
    }
}
