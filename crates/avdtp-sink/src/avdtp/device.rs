//! Device-level connection state machine and public API
//!
//! This is the entry point of the crate: [`Device`] owns the stream endpoint
//! registry, wires the caller-supplied initiator/acceptor configuration
//! sub-state-machines into it, and exposes the handful of calls an embedding
//! application needs (`register_stream_endpoint`, the per-category
//! capability registration functions, `connect`, `disconnect`, and
//! `handle_transport_event`).
//!
//! `Device` is constructed explicitly by the embedder and owned for as long
//! as the connection matters - there is no process-wide singleton here, and
//! no back-pointer from a [`StreamEndpoint`] to the device that owns it.
//! Methods that need both the device-level fields and the endpoint registry
//! destructure `self` into its disjoint fields up front
//! (`let Self { shared, endpoints, .. } = self;`) so the borrow checker sees
//! two independent borrows instead of one through a back-pointer.

use heapless::Vec;

use crate::avdtp::capability::{MediaType, SepType, ServiceCategory};
use crate::avdtp::endpoint::{ChannelSlot, EndpointState, Seid};
use crate::avdtp::registry::Registry;
use crate::avdtp::substate::ConfigSubStateMachine;
use crate::avdtp::{header_byte, MessageType, SignalId, SignalingHeader};
use crate::config::SinkConfig;
use crate::l2cap::{self, ChannelId};
use crate::transport::{SecurityLevel, Transport, TransportEvent};
use crate::{BdAddr, Error};

/// Device-level connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Idle,
    W4L2capForSignalingConnected,
    Connected,
    W4L2capForSignalingDisconnected,
}

/// The small, read-mostly view into device-level fields that configuration
/// sub-state-machines are allowed to see. Deliberately does not include the
/// endpoint registry.
#[derive(Debug, Clone, Copy)]
pub struct DeviceContext {
    pub remote_addr: BdAddr,
    pub signaling_cid: ChannelId,
    pub initiator_transaction_label: u8,
    pub acceptor_transaction_label: u8,
}

struct DeviceShared {
    state: DeviceState,
    remote_addr: BdAddr,
    signaling_cid: Option<ChannelId>,
    initiator_transaction_label: u8,
    acceptor_transaction_label: u8,
    disconnect_requested: bool,
}

impl Default for DeviceShared {
    fn default() -> Self {
        Self {
            state: DeviceState::Idle,
            remote_addr: BdAddr::default(),
            signaling_cid: None,
            initiator_transaction_label: 0,
            acceptor_transaction_label: 0,
            disconnect_requested: false,
        }
    }
}

impl DeviceShared {
    fn context(&self) -> DeviceContext {
        DeviceContext {
            remote_addr: self.remote_addr,
            signaling_cid: self.signaling_cid.unwrap_or(0),
            initiator_transaction_label: self.initiator_transaction_label,
            acceptor_transaction_label: self.acceptor_transaction_label,
        }
    }
}

/// Per-endpoint state owned jointly by the initiator and acceptor
/// sub-state-machines. This, not `Init`/`Acc` themselves, is what gets
/// stored inline in every [`crate::avdtp::endpoint::StreamEndpoint`].
pub struct SubState<Init: ConfigSubStateMachine, Acc: ConfigSubStateMachine> {
    pub initiator: Init::State,
    pub acceptor: Acc::State,
}

impl<Init: ConfigSubStateMachine, Acc: ConfigSubStateMachine> Default for SubState<Init, Acc> {
    fn default() -> Self {
        Self {
            initiator: Init::State::default(),
            acceptor: Acc::State::default(),
        }
    }
}

impl<Init, Acc> Clone for SubState<Init, Acc>
where
    Init: ConfigSubStateMachine,
    Acc: ConfigSubStateMachine,
    Init::State: Clone,
    Acc::State: Clone,
{
    fn clone(&self) -> Self {
        Self {
            initiator: self.initiator.clone(),
            acceptor: self.acceptor.clone(),
        }
    }
}

impl<Init, Acc> core::fmt::Debug for SubState<Init, Acc>
where
    Init: ConfigSubStateMachine,
    Acc: ConfigSubStateMachine,
    Init::State: core::fmt::Debug,
    Acc::State: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubState")
            .field("initiator", &self.initiator)
            .field("acceptor", &self.acceptor)
            .finish()
    }
}

/// Routes media-channel payloads to the embedding application. No buffering,
/// no reordering, no decoding - that's the embedder's job.
pub trait MediaHandler {
    fn on_media_packet(&mut self, seid: Seid, data: &[u8]);
}

/// Drops media packets. The default so "no handler registered" is "the
/// no-op handler is in effect" rather than a nullable callback slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMediaHandler;

impl MediaHandler for NullMediaHandler {
    fn on_media_packet(&mut self, _seid: Seid, _data: &[u8]) {}
}

/// Minimal application-level notifications this core still emits even
/// though deep event delivery and packaging are out of scope. Every method
/// has a no-op default so embedders only override what they care about.
pub trait EventHandler {
    fn on_signaling_connected(&mut self, _addr: BdAddr) {}
    fn on_signaling_disconnected(&mut self) {}
    fn on_endpoint_configured(&mut self, _seid: Seid) {}
    fn on_endpoint_opened(&mut self, _seid: Seid) {}
    fn on_endpoint_started(&mut self, _seid: Seid) {}
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {}

/// One AVDTP sink connection. `N` bounds how many stream endpoints can be
/// registered; `Init`/`Acc` are the embedder-supplied configuration
/// sub-state-machines (see [`ConfigSubStateMachine`]).
pub struct Device<Init, Acc, Media = NullMediaHandler, Evt = NullEventHandler, const N: usize = 4>
where
    Init: ConfigSubStateMachine,
    Acc: ConfigSubStateMachine,
{
    shared: DeviceShared,
    endpoints: Registry<SubState<Init, Acc>, N>,
    initiator: Init,
    acceptor: Acc,
    media_handler: Media,
    event_handler: Evt,
    config: SinkConfig,
}

impl<Init, Acc, Media, Evt, const N: usize> Device<Init, Acc, Media, Evt, N>
where
    Init: ConfigSubStateMachine,
    Acc: ConfigSubStateMachine,
    Media: MediaHandler,
    Evt: EventHandler,
{
    /// Construct a new, unconnected device. Handlers are supplied here, not
    /// through a later nullable setter - there is always a concrete media
    /// and event handler in effect, even if it's the no-op one.
    pub fn new(config: SinkConfig, initiator: Init, acceptor: Acc, media_handler: Media, event_handler: Evt) -> Self {
        Self {
            shared: DeviceShared::default(),
            endpoints: Registry::new(),
            initiator,
            acceptor,
            media_handler,
            event_handler,
            config,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.shared.state
    }

    pub fn remote_addr(&self) -> BdAddr {
        self.shared.remote_addr
    }

    /// Register the AVDTP service with the transport.
    pub fn start(&mut self, transport: &mut impl Transport) {
        transport.register_service(l2cap::psm::AVDTP, self.config.signaling_mtu, SecurityLevel::Level0);
    }

    /// Register a new stream endpoint, returning its SEID.
    pub fn register_stream_endpoint(&mut self, sep_type: SepType, media_type: MediaType) -> Result<Seid, Error> {
        self.endpoints.register(sep_type, media_type)
    }

    pub fn media_transport(&mut self, seid: Seid) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::MediaTransport);
        Ok(())
    }

    pub fn reporting(&mut self, seid: Seid) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::Reporting);
        Ok(())
    }

    pub fn delay_reporting(&mut self, seid: Seid) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::DelayReporting);
        Ok(())
    }

    pub fn recovery(&mut self, seid: Seid, max_window_size: u8, max_media_packets: u8) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::Recovery);
        endpoint.capabilities.recovery.recovery_type = 0x01; // RFC2733, the only type AVDTP defines
        endpoint.capabilities.recovery.max_window_size = max_window_size;
        endpoint.capabilities.recovery.max_media_packets = max_media_packets;
        Ok(())
    }

    pub fn content_protection(&mut self, seid: Seid, cp_type: u16, value: &[u8]) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::ContentProtection);
        endpoint.capabilities.content_protection.cp_type = cp_type;
        endpoint.capabilities.content_protection.value.clear();
        endpoint
            .capabilities
            .content_protection
            .value
            .extend_from_slice(value)
            .map_err(|_| Error::BufferTooSmall)?;
        Ok(())
    }

    pub fn header_compression(&mut self, seid: Seid, back_channel: bool, media: bool, recovery: bool) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::HeaderCompression);
        endpoint.capabilities.header_compression.back_channel = back_channel;
        endpoint.capabilities.header_compression.media = media;
        endpoint.capabilities.header_compression.recovery = recovery;
        Ok(())
    }

    pub fn media_codec(&mut self, seid: Seid, media_type: u8, codec_type: u8, codec_info: &[u8]) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::MediaCodec);
        endpoint.capabilities.media_codec.media_type = media_type;
        endpoint.capabilities.media_codec.codec_type = codec_type;
        endpoint.capabilities.media_codec.codec_info.clear();
        endpoint
            .capabilities
            .media_codec
            .codec_info
            .extend_from_slice(codec_info)
            .map_err(|_| Error::BufferTooSmall)?;
        Ok(())
    }

    pub fn multiplexing(&mut self, seid: Seid, fragmentation: bool) -> Result<(), Error> {
        let endpoint = self.endpoints.get_mut(seid).ok_or(Error::UnknownSeid)?;
        endpoint.capabilities.registered.set(ServiceCategory::Multiplexing);
        endpoint.capabilities.multiplexing.fragmentation = fragmentation;
        Ok(())
    }

    /// Initiator path: open a signaling connection to `addr`.
    pub fn connect(&mut self, addr: BdAddr, transport: &mut impl Transport) -> Result<(), Error> {
        if self.shared.state != DeviceState::Idle {
            return Err(Error::InvalidState);
        }
        self.shared.remote_addr = addr;
        self.shared.state = DeviceState::W4L2capForSignalingConnected;
        transport.create_channel(addr, l2cap::psm::AVDTP, self.config.signaling_mtu);
        Ok(())
    }

    /// Request a graceful disconnect. Mirrors the reference behavior of
    /// running a pass synchronously rather than waiting for the next
    /// transport event, so a caller that immediately drops its transport
    /// handle still sees the disconnect requested. A no-op when there is
    /// no signaling connection to tear down, or one is already underway -
    /// otherwise `run_pass` would move the device to
    /// `W4L2capForSignalingDisconnected` with no CID to disconnect, and no
    /// `ChannelClosed` would ever arrive to bring it back to `Idle`.
    pub fn disconnect(&mut self, transport: &mut impl Transport) {
        if self.shared.state == DeviceState::Idle || self.shared.state == DeviceState::W4L2capForSignalingDisconnected {
            return;
        }
        self.shared.disconnect_requested = true;
        for endpoint in self.endpoints.iter_mut() {
            if endpoint.state != EndpointState::Idle {
                endpoint.disconnect_requested = true;
            }
        }
        self.run_pass(transport);
    }

    /// The single entry point for everything the transport reports.
    pub fn handle_transport_event(&mut self, event: TransportEvent<'_>, transport: &mut impl Transport) {
        match event {
            TransportEvent::IncomingConnection { cid, addr } => self.handle_incoming_connection(cid, addr, transport),
            TransportEvent::ChannelOpened { cid, psm, status } => self.handle_channel_opened(cid, psm, status, transport),
            TransportEvent::ChannelClosed { cid } => self.handle_channel_closed(cid),
            TransportEvent::DataReceived { cid, data } => self.handle_data_received(cid, data, transport),
            TransportEvent::CanSendNow { .. } => {}
        }
        self.run_pass(transport);
    }

    fn handle_incoming_connection(&mut self, cid: ChannelId, addr: BdAddr, transport: &mut impl Transport) {
        let Self { shared, endpoints, .. } = self;
        if shared.state == DeviceState::Idle || shared.signaling_cid.is_none() {
            shared.remote_addr = addr;
            shared.state = DeviceState::W4L2capForSignalingConnected;
            transport.accept_connection(cid);
            return;
        }
        if endpoints.endpoint_awaiting_next_slot().is_some() {
            transport.accept_connection(cid);
        }
    }

    fn handle_channel_opened(&mut self, cid: ChannelId, psm: u16, status: u8, transport: &mut impl Transport) {
        if status != 0 || psm != l2cap::psm::AVDTP {
            return;
        }
        let Self {
            shared,
            endpoints,
            initiator,
            acceptor,
            event_handler,
            ..
        } = self;
        if shared.signaling_cid.is_none() {
            shared.signaling_cid = Some(cid);
            shared.state = DeviceState::Connected;
            for endpoint in endpoints.iter_mut() {
                initiator.init(&mut endpoint.sub_state.initiator);
                acceptor.init(&mut endpoint.sub_state.acceptor);
                endpoint.state = EndpointState::ConfigurationSubStateMachine;
            }
            shared.initiator_transaction_label = shared.initiator_transaction_label.wrapping_add(1);
            event_handler.on_signaling_connected(shared.remote_addr);
            transport.request_can_send_now_event(cid);
            return;
        }
        if let Some((endpoint, slot)) = endpoints.endpoint_awaiting_next_slot() {
            endpoint.bind_slot(slot, cid);
            if slot == ChannelSlot::Media {
                event_handler.on_endpoint_opened(endpoint.seid);
            }
        }
    }

    fn handle_channel_closed(&mut self, cid: ChannelId) {
        let Self { shared, endpoints, event_handler, .. } = self;
        if shared.signaling_cid == Some(cid) {
            shared.signaling_cid = None;
            shared.state = DeviceState::Idle;
            endpoints.reset_all();
            event_handler.on_signaling_disconnected();
        } else if let Some(endpoint) = endpoints.find_by_cid_mut(cid) {
            endpoint.clear_cid(cid);
        }
    }

    fn handle_data_received(&mut self, cid: ChannelId, data: &[u8], transport: &mut impl Transport) {
        let Self {
            shared,
            endpoints,
            initiator,
            acceptor,
            media_handler,
            ..
        } = self;
        if shared.signaling_cid == Some(cid) {
            if let Some(header) = SignalingHeader::parse(data) {
                Self::dispatch(shared, endpoints, initiator, acceptor, header, data, transport);
            }
            return;
        }
        if let Some(endpoint) = endpoints.find_by_cid(cid) {
            if endpoint.media_cid == Some(cid) {
                media_handler.on_media_packet(endpoint.seid, data);
            }
        }
    }

    /// Signaling transaction dispatch (C4): offer the packet to the first
    /// endpoint whose state accepts it. An `OPEN`/`START` addressed to a
    /// SEID that doesn't match the endpoint currently being evaluated aborts
    /// the whole packet rather than continuing the search - this mirrors
    /// the reference engine, which only ever checks the one endpoint it is
    /// currently positioned on.
    fn dispatch(
        shared: &mut DeviceShared,
        endpoints: &mut Registry<SubState<Init, Acc>, N>,
        initiator: &Init,
        acceptor: &Acc,
        header: SignalingHeader,
        payload: &[u8],
        transport: &mut impl Transport,
    ) {
        let ctx = shared.context();
        let mut request_send = false;
        for endpoint in endpoints.iter_mut() {
            match (endpoint.state, header.signal_id) {
                (EndpointState::ConfigurationSubStateMachine, _) => {
                    if let Some(target) = header.seid {
                        if target != endpoint.seid.value() {
                            continue;
                        }
                    }
                    let wants_send = match header.message_type {
                        MessageType::Command => acceptor.handle(&mut endpoint.sub_state.acceptor, &ctx, endpoint.seid, payload),
                        _ => initiator.handle(&mut endpoint.sub_state.initiator, &ctx, endpoint.seid, payload),
                    };
                    request_send |= wants_send;
                    if acceptor.is_done(&endpoint.sub_state.acceptor) || initiator.is_done(&endpoint.sub_state.initiator) {
                        endpoint.state = EndpointState::Configured;
                    }
                    break;
                }
                (EndpointState::Configured, SignalId::Open) => {
                    if header.seid != Some(endpoint.seid.value()) {
                        return;
                    }
                    endpoint.state = EndpointState::W2AnswerOpenStream {
                        tr_label: header.transaction_label,
                    };
                    request_send = true;
                    break;
                }
                (EndpointState::Open, SignalId::Start) => {
                    if header.seid != Some(endpoint.seid.value()) {
                        return;
                    }
                    endpoint.state = EndpointState::W2AnswerStartSingleStream {
                        tr_label: header.transaction_label,
                    };
                    request_send = true;
                    break;
                }
                _ => continue,
            }
        }
        if request_send {
            if let Some(signaling_cid) = shared.signaling_cid {
                transport.request_can_send_now_event(signaling_cid);
            }
        }
    }

    /// The scheduler (C4.7): a disconnect pass followed by a work pass,
    /// run after every transport event. Capped at one outbound action per
    /// call so the single can-send-now permit is never spent twice.
    fn run_pass(&mut self, transport: &mut impl Transport) {
        let Self {
            shared,
            endpoints,
            initiator,
            acceptor,
            event_handler,
            ..
        } = self;

        for endpoint in endpoints.iter_mut() {
            if !endpoint.disconnect_requested {
                continue;
            }
            match endpoint.state {
                EndpointState::Idle
                | EndpointState::ConfigurationSubStateMachine
                | EndpointState::Configured
                | EndpointState::W4L2capForMediaDisconnected => {
                    endpoint.disconnect_requested = false;
                }
                EndpointState::W2AnswerOpenStream { .. } => {
                    endpoint.disconnect_requested = false;
                    endpoint.state = EndpointState::Configured;
                }
                EndpointState::W4L2capForMediaConnected => {
                    // keep the request pending until the channel actually opens
                }
                _ => {
                    endpoint.disconnect_requested = false;
                    endpoint.state = EndpointState::W4L2capForMediaDisconnected;
                    if let Some(cid) = endpoint.media_cid {
                        transport.disconnect(cid);
                    }
                    return;
                }
            }
        }

        if shared.disconnect_requested {
            shared.disconnect_requested = false;
            shared.state = DeviceState::W4L2capForSignalingDisconnected;
            if let Some(cid) = shared.signaling_cid {
                transport.disconnect(cid);
            }
            return;
        }

        let Some(signaling_cid) = shared.signaling_cid else {
            return;
        };
        if !transport.can_send_packet_now(signaling_cid) {
            return;
        }

        let ctx = shared.context();
        for endpoint in endpoints.iter_mut() {
            match endpoint.state {
                EndpointState::ConfigurationSubStateMachine => {
                    if acceptor.is_done(&endpoint.sub_state.acceptor) || initiator.is_done(&endpoint.sub_state.initiator) {
                        endpoint.state = EndpointState::Configured;
                        event_handler.on_endpoint_configured(endpoint.seid);
                        return;
                    }
                    let sent = acceptor.run(&mut endpoint.sub_state.acceptor, &ctx, endpoint.seid, transport)
                        || initiator.run(&mut endpoint.sub_state.initiator, &ctx, endpoint.seid, transport);
                    if sent {
                        transport.request_can_send_now_event(signaling_cid);
                        return;
                    }
                }
                EndpointState::W2AnswerOpenStream { tr_label } => {
                    let response = [header_byte(tr_label, crate::avdtp::MessageType::ResponseAccept), SignalId::Open as u8];
                    if transport.send(signaling_cid, &response).is_ok() {
                        endpoint.state = EndpointState::W4L2capForMediaConnected;
                        transport.request_can_send_now_event(signaling_cid);
                    }
                    return;
                }
                EndpointState::W2AnswerStartSingleStream { tr_label } => {
                    let response = [header_byte(tr_label, crate::avdtp::MessageType::ResponseAccept), SignalId::Start as u8];
                    if transport.send(signaling_cid, &response).is_ok() {
                        endpoint.state = EndpointState::W4StreamingConnectionOpen;
                        event_handler.on_endpoint_started(endpoint.seid);
                        transport.request_can_send_now_event(signaling_cid);
                    }
                    return;
                }
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avdtp::substate::ImmediateAccept;

    pub(super) struct RecordingTransport {
        pub(super) sent: Vec<(ChannelId, Vec<u8, 16>), 8>,
        pub(super) can_send: bool,
        pub(super) accepted: Vec<ChannelId, 8>,
        pub(super) can_send_requests: Vec<ChannelId, 8>,
        pub(super) disconnected: Vec<ChannelId, 8>,
    }

    impl RecordingTransport {
        pub(super) fn new() -> Self {
            Self {
                sent: Vec::new(),
                can_send: true,
                accepted: Vec::new(),
                can_send_requests: Vec::new(),
                disconnected: Vec::new(),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn register_service(&mut self, _psm: u16, _mtu: u16, _security: SecurityLevel) {}

        fn accept_connection(&mut self, cid: ChannelId) {
            let _ = self.accepted.push(cid);
        }

        fn create_channel(&mut self, _addr: BdAddr, _psm: u16, _mtu: u16) {}

        fn disconnect(&mut self, cid: ChannelId) {
            let _ = self.disconnected.push(cid);
        }

        fn request_can_send_now_event(&mut self, cid: ChannelId) {
            let _ = self.can_send_requests.push(cid);
        }

        fn can_send_packet_now(&self, _cid: ChannelId) -> bool {
            self.can_send
        }

        fn send(&mut self, cid: ChannelId, data: &[u8]) -> Result<(), Error> {
            let mut bytes = Vec::new();
            let _ = bytes.extend_from_slice(data);
            let _ = self.sent.push((cid, bytes));
            Ok(())
        }
    }

    fn connected_device_with_one_endpoint() -> (Device<ImmediateAccept, ImmediateAccept>, RecordingTransport, Seid) {
        let mut device = Device::new(SinkConfig::default(), ImmediateAccept, ImmediateAccept, NullMediaHandler, NullEventHandler);
        let mut transport = RecordingTransport::new();
        let seid = device.register_stream_endpoint(SepType::Sink, MediaType::Audio).unwrap();
        device.media_transport(seid).unwrap();
        device.media_codec(seid, MediaType::Audio as u8, 0x00, &[0xFF, 0xFF, 2, 250]).unwrap();

        device.handle_transport_event(
            TransportEvent::IncomingConnection { cid: 0x40, addr: BdAddr::default() },
            &mut transport,
        );
        device.handle_transport_event(
            TransportEvent::ChannelOpened { cid: 0x40, psm: l2cap::psm::AVDTP, status: 0 },
            &mut transport,
        );
        // ImmediateAccept completes on init, so the work pass already promoted
        // the endpoint to Configured as part of handling ChannelOpened.
        (device, transport, seid)
    }

    #[test]
    fn register_then_connect_sets_bitmap() {
        let (device, _transport, seid) = connected_device_with_one_endpoint();
        let endpoint = device.endpoints.get(seid).unwrap();
        assert!(endpoint.capabilities.registered.contains(ServiceCategory::MediaTransport));
        assert!(endpoint.capabilities.registered.contains(ServiceCategory::MediaCodec));
    }

    #[test]
    fn incoming_signaling_reaches_configured() {
        let (device, _transport, seid) = connected_device_with_one_endpoint();
        assert_eq!(device.endpoints.get(seid).unwrap().state, EndpointState::Configured);
        assert_eq!(device.state(), DeviceState::Connected);
    }

    #[test]
    fn open_command_is_answered_and_binds_media_channel() {
        let (mut device, mut transport, seid) = connected_device_with_one_endpoint();

        let open_cmd = [0x10, SignalId::Open as u8, seid.value() << 2];
        device.handle_transport_event(
            TransportEvent::DataReceived { cid: 0x40, data: &open_cmd },
            &mut transport,
        );
        assert_eq!(
            device.endpoints.get(seid).unwrap().state,
            EndpointState::W4L2capForMediaConnected
        );
        assert_eq!(transport.sent.last().unwrap().1.as_slice(), [0x12, SignalId::Open as u8]);

        device.handle_transport_event(
            TransportEvent::IncomingConnection { cid: 0x41, addr: BdAddr::default() },
            &mut transport,
        );
        device.handle_transport_event(
            TransportEvent::ChannelOpened { cid: 0x41, psm: l2cap::psm::AVDTP, status: 0 },
            &mut transport,
        );
        assert_eq!(device.endpoints.get(seid).unwrap().state, EndpointState::Open);
        assert_eq!(device.endpoints.get(seid).unwrap().media_cid, Some(0x41));
    }

    #[test]
    fn wrong_seid_open_is_ignored() {
        let (mut device, mut transport, seid) = connected_device_with_one_endpoint();
        let wrong_seid = seid.value() + 1;
        let open_cmd = [0x10, SignalId::Open as u8, wrong_seid << 2];
        device.handle_transport_event(
            TransportEvent::DataReceived { cid: 0x40, data: &open_cmd },
            &mut transport,
        );
        assert_eq!(device.endpoints.get(seid).unwrap().state, EndpointState::Configured);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn disconnect_from_open_requests_media_disconnect() {
        let (mut device, mut transport, seid) = connected_device_with_one_endpoint();
        device.endpoints.get_mut(seid).unwrap().state = EndpointState::Open;
        device.endpoints.get_mut(seid).unwrap().media_cid = Some(0x41);

        device.disconnect(&mut transport);

        assert_eq!(
            device.endpoints.get(seid).unwrap().state,
            EndpointState::W4L2capForMediaDisconnected
        );
        assert_eq!(transport.disconnected.as_slice(), [0x41]);
    }

    #[test]
    fn signaling_close_resets_every_endpoint() {
        let (mut device, mut transport, seid) = connected_device_with_one_endpoint();
        device.endpoints.get_mut(seid).unwrap().state = EndpointState::Streaming;
        device.endpoints.get_mut(seid).unwrap().media_cid = Some(0x41);

        device.handle_transport_event(TransportEvent::ChannelClosed { cid: 0x40 }, &mut transport);

        assert_eq!(device.state(), DeviceState::Idle);
        assert_eq!(device.endpoints.get(seid).unwrap().state, EndpointState::Idle);
        assert!(device.endpoints.get(seid).unwrap().media_cid.is_none());
    }

    #[test]
    fn start_flow_sets_in_use_and_answers() {
        let (mut device, mut transport, seid) = connected_device_with_one_endpoint();
        device.endpoints.get_mut(seid).unwrap().state = EndpointState::Open;
        device.endpoints.get_mut(seid).unwrap().media_cid = Some(0x41);

        let start_cmd = [0x20, SignalId::Start as u8, seid.value() << 2];
        device.handle_transport_event(TransportEvent::DataReceived { cid: 0x40, data: &start_cmd }, &mut transport);

        let endpoint = device.endpoints.get(seid).unwrap();
        assert!(endpoint.in_use());
        assert_eq!(endpoint.state, EndpointState::W4StreamingConnectionOpen);
        assert_eq!(transport.sent.last().unwrap().1.as_slice(), [0x22, SignalId::Start as u8]);
    }
}
