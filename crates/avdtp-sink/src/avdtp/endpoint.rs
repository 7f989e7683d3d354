//! Stream endpoint data model and per-endpoint state machine

use crate::avdtp::capability::{Capabilities, MediaType, SepType};
use crate::l2cap::ChannelId;

/// Stream Endpoint identifier. Always non-zero; allocated by a monotonically
/// increasing counter and never reused within the lifetime of a
/// [`crate::avdtp::registry::Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Seid(u8);

impl Seid {
    pub(crate) fn new(value: u8) -> Self {
        debug_assert!(value != 0);
        Self(value)
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

/// Per-endpoint state. Each variant carries exactly the data it needs, so
/// invariants like "the acceptor transaction label only exists once a
/// request has actually been captured" are structural rather than asserted
/// against side-band fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointState {
    Idle,
    ConfigurationSubStateMachine,
    Configured,
    W2AnswerOpenStream { tr_label: u8 },
    W4L2capForMediaConnected,
    Open,
    W2AnswerStartSingleStream { tr_label: u8 },
    W4StreamingConnectionOpen,
    Streaming,
    W4L2capForMediaDisconnected,
}

impl EndpointState {
    /// `in_use` per the AVDTP spec is true from the moment a stream is
    /// asked to start. Deriving it from the state instead of storing it as
    /// an independent flag means it cannot desync from the state: the
    /// moment the endpoint falls back to `Configured` it is automatically
    /// false again.
    pub fn in_use(&self) -> bool {
        matches!(
            self,
            EndpointState::W2AnswerStartSingleStream { .. }
                | EndpointState::W4StreamingConnectionOpen
                | EndpointState::Streaming
        )
    }
}

/// A registered stream endpoint.
#[derive(Debug, Clone)]
pub struct StreamEndpoint<Sub> {
    pub seid: Seid,
    pub sep_type: SepType,
    pub media_type: MediaType,
    pub capabilities: Capabilities,
    pub state: EndpointState,
    pub media_cid: Option<ChannelId>,
    pub reporting_cid: Option<ChannelId>,
    pub recovery_cid: Option<ChannelId>,
    pub disconnect_requested: bool,
    /// Opaque per-endpoint state owned by the initiator/acceptor
    /// configuration sub-state-machines. Never inspected by this crate.
    pub sub_state: Sub,
}

impl<Sub: Default> StreamEndpoint<Sub> {
    pub(crate) fn new(seid: Seid, sep_type: SepType, media_type: MediaType) -> Self {
        Self {
            seid,
            sep_type,
            media_type,
            capabilities: Capabilities::default(),
            state: EndpointState::Idle,
            media_cid: None,
            reporting_cid: None,
            recovery_cid: None,
            disconnect_requested: false,
            sub_state: Sub::default(),
        }
    }
}

impl<Sub> StreamEndpoint<Sub> {
    pub fn in_use(&self) -> bool {
        self.state.in_use()
    }

    /// Reset the endpoint to `Idle` with every channel slot cleared. Used
    /// when the signaling channel closes - every endpoint resets, not just
    /// whichever one the closing CID might once have belonged to, since
    /// there is nothing on the wire that would let us single one out
    /// reliably.
    pub fn reset(&mut self)
    where
        Sub: Default,
    {
        self.state = EndpointState::Idle;
        self.media_cid = None;
        self.reporting_cid = None;
        self.recovery_cid = None;
        self.disconnect_requested = false;
        self.sub_state = Sub::default();
    }

    /// Which channel slot this endpoint is waiting to fill next, for
    /// channel-multiplexing purposes. `None` once all three are bound or the
    /// endpoint isn't in a state that expects any more channels.
    pub(crate) fn next_unbound_slot(&self) -> Option<ChannelSlot> {
        if self.media_cid.is_none() {
            if self.state == EndpointState::W4L2capForMediaConnected {
                return Some(ChannelSlot::Media);
            }
            return None;
        }
        if self.reporting_cid.is_none() && self.capabilities.registered.contains(
            crate::avdtp::capability::ServiceCategory::Reporting,
        ) {
            return Some(ChannelSlot::Reporting);
        }
        if self.recovery_cid.is_none() && self.capabilities.registered.contains(
            crate::avdtp::capability::ServiceCategory::Recovery,
        ) {
            return Some(ChannelSlot::Recovery);
        }
        None
    }

    pub(crate) fn bind_slot(&mut self, slot: ChannelSlot, cid: ChannelId) {
        match slot {
            ChannelSlot::Media => {
                self.media_cid = Some(cid);
                self.state = EndpointState::Open;
            }
            ChannelSlot::Reporting => self.reporting_cid = Some(cid),
            ChannelSlot::Recovery => self.recovery_cid = Some(cid),
        }
    }

    pub(crate) fn owns_cid(&self, cid: ChannelId) -> bool {
        self.media_cid == Some(cid) || self.reporting_cid == Some(cid) || self.recovery_cid == Some(cid)
    }

    /// Clear whichever slot owns `cid`. If it was the media slot and the
    /// endpoint had progressed beyond `Open`, fall back to `Configured` -
    /// this is what makes `in_use()` automatically go false again (see
    /// [`EndpointState::in_use`]).
    pub(crate) fn clear_cid(&mut self, cid: ChannelId) {
        if self.media_cid == Some(cid) {
            self.media_cid = None;
            self.state = EndpointState::Configured;
        } else if self.reporting_cid == Some(cid) {
            self.reporting_cid = None;
        } else if self.recovery_cid == Some(cid) {
            self.recovery_cid = None;
        }
    }
}

/// Which auxiliary channel slot an endpoint is waiting to bind next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelSlot {
    Media,
    Reporting,
    Recovery,
}
