//! Transport boundary
//!
//! The AVDTP sink core never owns an L2CAP implementation. It is handed a
//! `&mut impl Transport` on every call that might need to emit something, and
//! it learns about incoming data/connection/disconnection activity through
//! [`TransportEvent`] values passed into
//! [`crate::avdtp::device::Device::handle_transport_event`].

use crate::l2cap::ChannelId;
use crate::BdAddr;

/// Security level requested when registering the AVDTP service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityLevel {
    Level0,
}

/// Outward-facing L2CAP operations the core needs from its embedder
pub trait Transport {
    /// Register the AVDTP service on the given PSM, at the given security
    /// level, accepting connections up to `mtu`.
    fn register_service(&mut self, psm: u16, mtu: u16, security: SecurityLevel);

    /// Accept a pending incoming connection on `cid`.
    fn accept_connection(&mut self, cid: ChannelId);

    /// Initiate an outgoing L2CAP connection to `addr` on `psm`.
    fn create_channel(&mut self, addr: BdAddr, psm: u16, mtu: u16);

    /// Request disconnection of the given channel.
    fn disconnect(&mut self, cid: ChannelId);

    /// Ask to be notified (via a [`TransportEvent::CanSendNow`]) the next
    /// time `cid` is writable.
    fn request_can_send_now_event(&mut self, cid: ChannelId);

    /// Non-blocking check: can `cid` be written to right now?
    fn can_send_packet_now(&self, cid: ChannelId) -> bool;

    /// Send `data` on `cid`. Only called after `can_send_packet_now` was
    /// observed true for this channel.
    fn send(&mut self, cid: ChannelId, data: &[u8]) -> Result<(), crate::Error>;
}

/// Events the transport delivers into the core
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEvent<'a> {
    /// A remote peer is requesting an L2CAP connection on our registered PSM
    IncomingConnection { cid: ChannelId, addr: BdAddr },
    /// An L2CAP channel finished opening (either direction)
    ChannelOpened { cid: ChannelId, psm: u16, status: u8 },
    /// An L2CAP channel closed
    ChannelClosed { cid: ChannelId },
    /// A data packet arrived on `cid`
    DataReceived { cid: ChannelId, data: &'a [u8] },
    /// The transport can accept another packet on `cid`
    CanSendNow { cid: ChannelId },
}
