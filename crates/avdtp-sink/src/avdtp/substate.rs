//! Pluggable configuration sub-state-machine
//!
//! AVDTP stream configuration (DISCOVER / GET_CAPABILITIES / SET_CONFIGURATION
//! / ...) is negotiated by two independent sub-state-machines, one for each
//! role a device can play during configuration: the *acceptor* answers
//! incoming commands, the *initiator* drives outgoing commands and consumes
//! their responses. This crate owns the wiring between them and the rest of
//! the stream lifecycle, not their internal negotiation logic - that's
//! supplied by the embedder through this trait.
//!
//! The trait is generic rather than a `dyn Trait` object so no_std builds
//! never need a heap: every endpoint's sub-machine state is stored inline as
//! an associated type, and dispatch is resolved at compile time.

use crate::avdtp::device::DeviceContext;
use crate::avdtp::endpoint::Seid;
use crate::transport::Transport;

/// One side (initiator or acceptor) of the configuration negotiation for a
/// single stream endpoint.
pub trait ConfigSubStateMachine {
    /// Per-endpoint state this side of the negotiation needs to keep. Reset
    /// on every signaling-channel open via `Default`.
    type State: Default;

    /// Reset `state` for a fresh signaling session.
    fn init(&self, state: &mut Self::State);

    /// Feed an incoming packet addressed to `seid` (a command, for the
    /// acceptor; a response, for the initiator). Returns whether a
    /// send-ready should be requested so `run` gets a chance to reply.
    fn handle(
        &self,
        state: &mut Self::State,
        ctx: &DeviceContext,
        seid: Seid,
        packet: &[u8],
    ) -> bool;

    /// True once this side considers configuration complete for `seid`.
    fn is_done(&self, state: &Self::State) -> bool;

    /// Called during a send-ready run pass: emit at most one outbound
    /// message for `seid` through `transport` if one is pending. Returns
    /// whether anything was sent.
    fn run(
        &self,
        state: &mut Self::State,
        ctx: &DeviceContext,
        seid: Seid,
        transport: &mut impl Transport,
    ) -> bool;
}

/// A trivial, fully specified sub-state-machine that completes immediately
/// and never sends anything. Useful for tests and for embedders with no real
/// capability negotiation to perform (e.g. a fixed single-codec sink that
/// accepts whatever configuration arrives at a layer above this crate).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateAccept;

impl ConfigSubStateMachine for ImmediateAccept {
    type State = bool;

    fn init(&self, state: &mut Self::State) {
        *state = true;
    }

    fn handle(&self, state: &mut Self::State, _ctx: &DeviceContext, _seid: Seid, _packet: &[u8]) -> bool {
        *state = true;
        false
    }

    fn is_done(&self, state: &Self::State) -> bool {
        *state
    }

    fn run(&self, _state: &mut Self::State, _ctx: &DeviceContext, _seid: Seid, _transport: &mut impl Transport) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avdtp::device::DeviceContext;
    use crate::BdAddr;

    #[test]
    fn immediate_accept_is_done_after_init() {
        let sub = ImmediateAccept;
        let mut state = false;
        assert!(!sub.is_done(&state));
        sub.init(&mut state);
        assert!(sub.is_done(&state));
    }

    #[test]
    fn immediate_accept_never_requests_send() {
        let sub = ImmediateAccept;
        let mut state = true;
        let ctx = DeviceContext {
            remote_addr: BdAddr::default(),
            signaling_cid: 0x40,
            initiator_transaction_label: 0,
            acceptor_transaction_label: 0,
        };
        assert!(!sub.handle(&mut state, &ctx, Seid::new(1), &[]));
    }
}
