use crate::signaling::IceCandidate;
use std::sync::Mutex;
use tracing::debug;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::RTCPeerConnection;

pub(crate) fn to_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_mline_index,
        username_fragment: None,
    }
}

/// Applies one remote candidate. Races during the discovery phase are
/// expected, so failures are logged and dropped rather than surfaced.
pub(crate) async fn apply_candidate(pc: &RTCPeerConnection, candidate: IceCandidate) {
    if let Err(e) = pc.add_ice_candidate(to_init(candidate)).await {
        debug!("dropping remote ICE candidate: {e}");
    }
}

/// Applies every candidate queued before the remote description arrived.
pub(crate) async fn drain_pending(pc: &RTCPeerConnection, pending: &Mutex<Vec<IceCandidate>>) {
    let queued: Vec<IceCandidate> = pending.lock().unwrap().drain(..).collect();
    for candidate in queued {
        apply_candidate(pc, candidate).await;
    }
}
