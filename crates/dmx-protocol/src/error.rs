use thiserror::Error;

/// Reasons a channel write cannot be turned into an ArtDmx packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("payload too large: channels up to {last_channel} requested, universe holds {max}")]
    PayloadTooLarge { last_channel: usize, max: usize },
    #[error("value {value} at index {index} is outside 0..=255")]
    ValueOutOfRange { index: usize, value: i128 },
    #[error("channel {channel} is outside 1..=512")]
    ChannelOutOfRange { channel: u16 },
    #[error("no channel values to send")]
    EmptyPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("packet too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("missing Art-Net identifier")]
    BadIdentifier,
    #[error("opcode {opcode:#06x} is not ArtDmx")]
    NotArtDmx { opcode: u16 },
    #[error("invalid ArtDmx length {length}")]
    InvalidLength { length: u16 },
}
