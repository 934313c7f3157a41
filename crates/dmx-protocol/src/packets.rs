use std::ops::Range;

use crate::error::{DecodeError, EncodingError};
use crate::{DMX_MAX_SLOTS, PROTOCOL_VERSION};

// -- ArtDmx layout --

pub const ARTNET_ID: [u8; 8] = *b"Art-Net\0";
pub const OP_DMX: u16 = 0x5000;

pub const OP_CODE_RANGE: Range<usize> = 8..10;
pub const VERSION_RANGE: Range<usize> = 10..12;
pub const SEQUENCE_OFFSET: usize = 12;
pub const PHYSICAL_OFFSET: usize = 13;
pub const UNIVERSE_RANGE: Range<usize> = 14..16;
pub const LENGTH_RANGE: Range<usize> = 16..18;

// -- Channel write --

/// A validated request to write `values` into `universe`, with `values[0]`
/// landing on the 1-based DMX `channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelWrite {
    pub universe: u16,
    pub channel: u16,
    pub values: Vec<u8>,
}

impl ChannelWrite {
    pub fn new(universe: u16, channel: u16, values: Vec<u8>) -> Result<Self, EncodingError> {
        check_span(channel, values.len())?;
        Ok(Self {
            universe,
            channel,
            values,
        })
    }

    /// Last DMX channel touched by this write.
    pub fn last_channel(&self) -> usize {
        self.channel as usize + self.values.len() - 1
    }

    /// Encode as an ArtDmx packet carrying `sequence`.
    pub fn encode(&self, sequence: u8) -> Result<Vec<u8>, EncodingError> {
        encode(self.universe, self.channel, &self.values, sequence)
    }
}

fn check_span(channel: u16, len: usize) -> Result<usize, EncodingError> {
    if channel == 0 || channel as usize > DMX_MAX_SLOTS {
        return Err(EncodingError::ChannelOutOfRange { channel });
    }
    if len == 0 {
        return Err(EncodingError::EmptyPayload);
    }
    let last_channel = channel as usize - 1 + len;
    if last_channel > DMX_MAX_SLOTS {
        return Err(EncodingError::PayloadTooLarge {
            last_channel,
            max: DMX_MAX_SLOTS,
        });
    }
    Ok(last_channel)
}

/// Lay `values` out in a slot buffer that starts at DMX channel 1.
///
/// Slots before `channel` are zero. The buffer ends at the last written
/// channel; it is never padded out to a full universe.
pub fn place_slots(channel: u16, values: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let last_channel = check_span(channel, values.len())?;
    let mut slots = Vec::with_capacity(last_channel);
    slots.resize(channel as usize - 1, 0);
    slots.extend_from_slice(values);
    Ok(slots)
}

/// Narrow raw integers to DMX slot values, rejecting anything outside a byte.
pub fn slots_from_ints(values: &[i128]) -> Result<Vec<u8>, EncodingError> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            u8::try_from(value).map_err(|_| EncodingError::ValueOutOfRange { index, value })
        })
        .collect()
}

/// Build the wire bytes of an ArtDmx packet for a write starting at `channel`.
pub fn encode(
    universe: u16,
    channel: u16,
    values: &[u8],
    sequence: u8,
) -> Result<Vec<u8>, EncodingError> {
    let packet = ArtDmxPacket {
        sequence,
        physical: 0,
        universe,
        data: place_slots(channel, values)?,
    };

    let mut buf = Vec::with_capacity(ArtDmxPacket::HEADER_SIZE + packet.data.len());
    packet.serialize(&mut buf);
    Ok(buf)
}

// -- ArtDmx packet --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmxPacket {
    pub sequence: u8,
    pub physical: u8,
    pub universe: u16,
    pub data: Vec<u8>,
}

impl ArtDmxPacket {
    /// id(8) + opcode(2) + version(2) + sequence(1) + physical(1) + universe(2) + length(2) = 18
    pub const HEADER_SIZE: usize = 18;

    /// Append the packet to `buf` after clearing it. `data` must already be
    /// within 1..=512 bytes; [`encode`] enforces that.
    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.clear();
        buf.extend_from_slice(&ARTNET_ID);
        buf.extend_from_slice(&OP_DMX.to_le_bytes());
        buf.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        buf.push(self.sequence);
        buf.push(self.physical);
        buf.extend_from_slice(&self.universe.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.data);
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::HEADER_SIZE {
            return Err(DecodeError::TooShort {
                needed: Self::HEADER_SIZE,
                actual: data.len(),
            });
        }
        if data[..ARTNET_ID.len()] != ARTNET_ID {
            return Err(DecodeError::BadIdentifier);
        }

        let opcode = u16::from_le_bytes([data[OP_CODE_RANGE.start], data[OP_CODE_RANGE.start + 1]]);
        if opcode != OP_DMX {
            return Err(DecodeError::NotArtDmx { opcode });
        }

        let universe = u16::from_le_bytes([data[UNIVERSE_RANGE.start], data[UNIVERSE_RANGE.start + 1]]);
        let length = u16::from_be_bytes([data[LENGTH_RANGE.start], data[LENGTH_RANGE.start + 1]]);
        if length == 0 || length as usize > DMX_MAX_SLOTS {
            return Err(DecodeError::InvalidLength { length });
        }

        let end = Self::HEADER_SIZE + length as usize;
        if data.len() < end {
            return Err(DecodeError::TooShort {
                needed: end,
                actual: data.len(),
            });
        }

        Ok(Self {
            sequence: data[SEQUENCE_OFFSET],
            physical: data[PHYSICAL_OFFSET],
            universe,
            data: data[Self::HEADER_SIZE..end].to_vec(),
        })
    }
}
