pub mod error;
pub mod packets;
pub mod sequence;

/// ArtNet protocol revision written into every packet
pub const PROTOCOL_VERSION: u16 = 14;

/// Maximum number of DMX slots in one universe
pub const DMX_MAX_SLOTS: usize = 512;

/// Default ports
pub const DEFAULT_ARTNET_PORT: u16 = 6454;
pub const DEFAULT_HTTP_PORT: u16 = 8000;

/// Addressing used when the route leaves universe or channel out
pub const DEFAULT_UNIVERSE: u16 = 0;
pub const DEFAULT_CHANNEL: u16 = 1;
