//! Wire payload codec.
//!
//! Heartbeat and discovery-probe payloads are ASCII
//! `<4 hex digits>_<decimal sequence>`, the hex digits being the sender's
//! two-octet address suffix. Payloads starting with `CMD:` carry an opaque
//! command string; dispatching commands is the application's business.
//! Anything else parses to `Unknown`.

use bytes::Bytes;

use crate::error::ProtocolError;

/// Maximum payload length accepted by the link layer.
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Prefix marking a command frame.
pub const COMMAND_PREFIX: &[u8] = b"CMD:";

/// A parsed inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    /// Periodic heartbeat or discovery probe.
    Heartbeat { suffix: [u8; 2], sequence: u64 },
    /// Opaque command for the application layer.
    Command { text: String },
    /// Unrecognized payload.
    Unknown,
}

impl FramePayload {
    /// Parse a raw payload. Never fails — unrecognized data is [`Unknown`].
    ///
    /// [`Unknown`]: FramePayload::Unknown
    pub fn parse(payload: &[u8]) -> FramePayload {
        if let Some(rest) = payload.strip_prefix(COMMAND_PREFIX) {
            return match std::str::from_utf8(rest) {
                Ok(text) => FramePayload::Command {
                    text: text.to_string(),
                },
                Err(_) => FramePayload::Unknown,
            };
        }

        let Ok(text) = std::str::from_utf8(payload) else {
            return FramePayload::Unknown;
        };
        let Some((suffix_hex, seq)) = text.split_once('_') else {
            return FramePayload::Unknown;
        };
        if suffix_hex.len() != 4 {
            return FramePayload::Unknown;
        }
        let (Ok(hi), Ok(lo)) = (
            u8::from_str_radix(&suffix_hex[..2], 16),
            u8::from_str_radix(&suffix_hex[2..], 16),
        ) else {
            return FramePayload::Unknown;
        };
        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return FramePayload::Unknown;
        }
        let Ok(sequence) = seq.parse::<u64>() else {
            return FramePayload::Unknown;
        };

        FramePayload::Heartbeat {
            suffix: [hi, lo],
            sequence,
        }
    }
}

/// Encode the heartbeat/probe payload for one tick.
pub fn encode_heartbeat(suffix: [u8; 2], sequence: u64) -> Bytes {
    Bytes::from(format!("{:02X}{:02X}_{}", suffix[0], suffix[1], sequence))
}

/// Encode a command payload, enforcing the link frame cap.
pub fn encode_command(text: &str) -> Result<Bytes, ProtocolError> {
    let size = COMMAND_PREFIX.len() + text.len();
    if size > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_LEN,
        });
    }
    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(COMMAND_PREFIX);
    buf.extend_from_slice(text.as_bytes());
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_roundtrip() {
        let payload = encode_heartbeat([0xA1, 0x0B], 42);
        assert_eq!(&payload[..], b"A10B_42");
        assert_eq!(
            FramePayload::parse(&payload),
            FramePayload::Heartbeat {
                suffix: [0xA1, 0x0B],
                sequence: 42
            }
        );
    }

    #[test]
    fn heartbeat_sequence_zero() {
        assert_eq!(
            FramePayload::parse(b"0000_0"),
            FramePayload::Heartbeat {
                suffix: [0, 0],
                sequence: 0
            }
        );
    }

    #[test]
    fn heartbeat_accepts_lowercase_hex() {
        assert_eq!(
            FramePayload::parse(b"a1ff_7"),
            FramePayload::Heartbeat {
                suffix: [0xA1, 0xFF],
                sequence: 7
            }
        );
    }

    #[test]
    fn command_frame() {
        assert_eq!(
            FramePayload::parse(b"CMD:reboot"),
            FramePayload::Command {
                text: "reboot".into()
            }
        );
    }

    #[test]
    fn empty_command_is_still_a_command() {
        assert_eq!(
            FramePayload::parse(b"CMD:"),
            FramePayload::Command { text: "".into() }
        );
    }

    #[test]
    fn unknown_payloads() {
        assert_eq!(FramePayload::parse(b""), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"A10B"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"A10B_"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"_42"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"A1_42"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"ZZZZ_42"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"A10B_+42"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(b"A10B_4x2"), FramePayload::Unknown);
        assert_eq!(FramePayload::parse(&[0xFF, 0xFE, 0x01]), FramePayload::Unknown);
    }

    #[test]
    fn non_utf8_command_is_unknown() {
        assert_eq!(
            FramePayload::parse(&[b'C', b'M', b'D', b':', 0xFF]),
            FramePayload::Unknown
        );
    }

    #[test]
    fn encode_command_respects_frame_cap() {
        let ok = encode_command("status").unwrap();
        assert_eq!(&ok[..], b"CMD:status");

        let max_text = "x".repeat(MAX_PAYLOAD_LEN - COMMAND_PREFIX.len());
        assert!(encode_command(&max_text).is_ok());

        let over = "x".repeat(MAX_PAYLOAD_LEN);
        let err = encode_command(&over).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
    }
}
