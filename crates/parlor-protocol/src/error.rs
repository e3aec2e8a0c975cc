use crate::crypto::CryptoError;
use crate::runtime::TransportError;
use crate::types::PeerId;

/// Protocol-level errors for Parlor.
///
/// Wraps crypto and transport failures and adds protocol-specific variants
/// (malformed packets, size ceilings, serialization).
#[derive(Debug, thiserror::Error)]
pub enum ParlorProtocolError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed packet: {reason}")]
    MalformedPacket { reason: String },

    #[error("payload too large: {size} bytes (ceiling {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("room closed")]
    RoomClosed,
}

impl From<rmp_serde::encode::Error> for ParlorProtocolError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        ParlorProtocolError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for ParlorProtocolError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        ParlorProtocolError::Deserialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_malformed_packet() {
        let err = ParlorProtocolError::MalformedPacket {
            reason: "truncated body".into(),
        };
        assert_eq!(err.to_string(), "malformed packet: truncated body");
    }

    #[test]
    fn test_display_payload_too_large() {
        let err = ParlorProtocolError::PayloadTooLarge {
            size: 600_000,
            max: 512_000,
        };
        assert_eq!(
            err.to_string(),
            "payload too large: 600000 bytes (ceiling 512000)"
        );
    }

    #[test]
    fn test_display_unknown_peer() {
        let err = ParlorProtocolError::UnknownPeer(PeerId::new("abc123"));
        assert_eq!(err.to_string(), "unknown peer: abc123");
    }

    #[test]
    fn test_display_room_closed() {
        let err = ParlorProtocolError::RoomClosed;
        assert_eq!(err.to_string(), "room closed");
    }

    #[test]
    fn test_crypto_error_wraps() {
        let err: ParlorProtocolError = CryptoError::Decrypt.into();
        assert_eq!(
            err.to_string(),
            "crypto error: decryption failed: authentication error"
        );
    }
}
