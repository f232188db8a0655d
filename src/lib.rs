//! unicast-rtp: frame bunching and unicast transmission for telephony
//! media taps.
//!
//! Taps one direction of a live session's audio, accumulates successive
//! ~20ms frames into larger bunches, and forwards each bunch as a single
//! UDP datagram — either raw native-order PCM or RTP-framed with an L16
//! (network byte order) payload.
//!
//! The host engine drives the crate through three calls: `start_flow`
//! when the administrative interface activates a tap, `feed_frame` once
//! per frame from the media callback, and `stop_flow` on deactivation or
//! session teardown (which flushes any retained partial buffer).

pub mod buncher;
pub mod config;
pub mod flow;
pub mod packetizer;
pub mod rtp;

pub use buncher::{FrameBuncher, BUNCH_CAPACITY, MAX_FRAMES_PER_PACKET, READ_BUFFER_SIZE};
pub use config::{ConfigError, FlowConfig};
pub use flow::{FlowError, FlowStats, UnicastFlow};
pub use packetizer::{Framing, Packetizer};

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};

// One flow per session. The outer RwLock guards registry membership only;
// each flow has its own Mutex so the per-frame path never holds the map
// lock while packetizing.
lazy_static! {
    static ref FLOW_REGISTRY: RwLock<HashMap<String, Arc<Mutex<UnicastFlow>>>> =
        RwLock::new(HashMap::new());
}

/// Activate a flow for a session.
///
/// # Arguments
/// * `session_id` - Host session identifier the tap is attached to
/// * `config` - Validated flow parameters
///
/// # Returns
/// `FlowError::AlreadyActive` if the session already has a flow,
/// `FlowError::Config`/`FlowError::Transport` if creation fails. On any
/// error the registry is unchanged.
pub fn start_flow(session_id: &str, config: &FlowConfig) -> Result<(), FlowError> {
    if FLOW_REGISTRY.read().contains_key(session_id) {
        return Err(FlowError::AlreadyActive);
    }

    let flow = UnicastFlow::new(config)?;

    let mut registry = FLOW_REGISTRY.write();
    if registry.contains_key(session_id) {
        return Err(FlowError::AlreadyActive);
    }
    registry.insert(session_id.to_string(), Arc::new(Mutex::new(flow)));
    Ok(())
}

/// Deliver one audio frame from the media tap to the session's flow.
///
/// No-op for a session without an active flow (the tap may still fire
/// during teardown). The flow's mutex makes append+flush one atomic unit.
pub fn feed_frame(session_id: &str, frame: &[u8]) {
    let flow = FLOW_REGISTRY.read().get(session_id).cloned();
    if let Some(flow) = flow {
        flow.lock().on_frame(frame);
    }
}

/// Statistics for a session's flow, if one is active.
pub fn flow_stats(session_id: &str) -> Option<FlowStats> {
    let flow = FLOW_REGISTRY.read().get(session_id).cloned();
    flow.map(|flow| flow.lock().stats())
}

/// Deactivate a session's flow.
///
/// Removes the flow from the registry first, then waits for its lock, so
/// an in-flight `feed_frame` completes before the final flush and the
/// buffers are released. Any retained partial audio is flushed as one
/// last datagram.
///
/// # Returns
/// `true` if a flow was active and has been stopped, `false` otherwise.
pub fn stop_flow(session_id: &str) -> bool {
    let flow = FLOW_REGISTRY.write().remove(session_id);
    match flow {
        Some(flow) => {
            flow.lock().close();
            true
        }
        None => false,
    }
}
