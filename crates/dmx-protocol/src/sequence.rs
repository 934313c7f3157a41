//! ArtDmx sequence numbering.
//!
//! Receivers use the sequence byte to drop datagrams that arrive out of
//! order. Zero means "sequencing disabled", so a sender cycles 1..=255.

#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    last: u8,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next packet should carry.
    pub fn peek(&self) -> u8 {
        successor(self.last)
    }

    /// Record that a packet carrying `sequence` went out.
    pub fn commit(&mut self, sequence: u8) {
        self.last = sequence;
    }

    /// Last committed sequence number, if any packet was sent yet.
    pub fn last(&self) -> Option<u8> {
        (self.last != 0).then_some(self.last)
    }
}

/// Cyclic successor within 1..=255.
pub fn successor(sequence: u8) -> u8 {
    if sequence == u8::MAX {
        1
    } else {
        sequence + 1
    }
}
