//! L2CAP constants and framing shared with the transport
//!
//! This module does not implement L2CAP itself (that's the embedder's
//! [`crate::transport::Transport`]) - it just defines the identifiers and
//! packet shape the AVDTP layer needs to agree on with it.

use heapless::Vec;

/// Maximum L2CAP payload this crate will buffer for a single packet
pub const MAX_L2CAP_PAYLOAD: usize = 1024;

/// L2CAP channel ID type
pub type ChannelId = u16;

/// Well-known PSM (Protocol/Service Multiplexer) values
pub mod psm {
    /// AVDTP
    pub const AVDTP: u16 = 0x0019;
}

/// Well-known channel IDs
pub mod cid {
    /// Signaling channel
    pub const SIGNALING: u16 = 0x0001;
    /// First dynamically allocated CID
    pub const DYNAMIC_START: u16 = 0x0040;
}

/// A received or to-be-sent L2CAP packet body, addressed by channel id
#[derive(Debug)]
pub struct Packet {
    /// Channel the payload is addressed to or arrived on
    pub cid: ChannelId,
    /// Payload bytes
    pub data: Vec<u8, MAX_L2CAP_PAYLOAD>,
}

impl Packet {
    /// Build an outgoing packet for `cid` from a byte slice
    pub fn new(cid: ChannelId, bytes: &[u8]) -> Result<Self, ()> {
        let mut data = Vec::new();
        data.extend_from_slice(bytes).map_err(|_| ())?;
        Ok(Self { cid, data })
    }
}
