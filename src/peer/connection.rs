use crate::config::{self, IceServerConfig};
use crate::error::MediaError;
use crate::peer::ice;
use crate::peer::media::MediaSource;
use crate::signaling::{ClientEvent, IceCandidate, PeerId, SignalEnvelope, SignalPayload};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::RTCPeerConnection;

/// Notifications from peer-connection callbacks back into the session
/// event loop. Tagged with the owning pairing's generation so the state
/// machine can ignore anything from a pairing that already ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    RemoteTrackStarted { generation: u64 },
    ConnectionLost { generation: u64 },
}

/// One pairing's media state: the local tracks and the single
/// `RTCPeerConnection`. Created on entry to Paired, destroyed on exit;
/// at most one live handle per client.
pub struct MediaSession {
    pc: Arc<RTCPeerConnection>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    target: Arc<Mutex<PeerId>>,
    pending_remote: Mutex<Vec<IceCandidate>>,
    remote_applied: AtomicBool,
    offered: AtomicBool,
    torn_down: AtomicBool,
    text_only: bool,
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl MediaSession {
    /// Builds the peer connection, attaches local media and registers the
    /// ICE/state handlers. Capture failure degrades to text-only and is
    /// never fatal; anything else aborts the pairing.
    #[allow(clippy::too_many_arguments)]
    pub async fn connect(
        ice_servers: &[IceServerConfig],
        source: &dyn MediaSource,
        initiator: bool,
        target: PeerId,
        generation: u64,
        current_generation: Arc<AtomicU64>,
        outbound: mpsc::UnboundedSender<ClientEvent>,
        media_events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Result<Self, MediaError> {
        let mut engine = MediaEngine::default();
        engine.register_default_codecs()?;
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut engine)?;
        let api = APIBuilder::new()
            .with_media_engine(engine)
            .with_interceptor_registry(registry)
            .build();

        let pc = Arc::new(
            api.new_peer_connection(config::rtc_config(ice_servers))
                .await?,
        );

        let text_only = match source.acquire().await {
            Ok(tracks) => {
                let text_only = tracks.is_empty();
                for track in tracks {
                    pc.add_track(track).await?;
                }
                text_only
            }
            Err(e) => {
                warn!("continuing text-only, media capture failed: {e}");
                true
            }
        };

        let target = Arc::new(Mutex::new(target));

        // Local candidates go out as signal envelopes, gated on the
        // pairing still being current when they surface.
        let gate = current_generation.clone();
        let candidate_out = outbound.clone();
        let target_ref = target.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            match candidate {
                Some(candidate) => {
                    if gate.load(Ordering::SeqCst) != generation {
                        debug!("dropping local ICE candidate from a stale pairing");
                        return Box::pin(async {});
                    }
                    match candidate.to_json() {
                        Ok(init) => {
                            let envelope = SignalEnvelope {
                                target: target_ref.lock().unwrap().clone(),
                                sender: None,
                                signal: SignalPayload::IceCandidate(IceCandidate {
                                    candidate: init.candidate,
                                    sdp_mid: init.sdp_mid,
                                    sdp_mline_index: init.sdp_mline_index,
                                }),
                            };
                            let _ = candidate_out.send(ClientEvent::Signal(envelope));
                        }
                        Err(e) => debug!("failed to serialize local ICE candidate: {e}"),
                    }
                }
                None => debug!("local ICE candidate gathering complete"),
            }
            Box::pin(async {})
        }));

        let gate = current_generation.clone();
        let track_events = media_events.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            if gate.load(Ordering::SeqCst) == generation {
                info!(kind = ?track.kind(), "remote track started");
                let _ = track_events.send(MediaEvent::RemoteTrackStarted { generation });
            }
            Box::pin(async {})
        }));

        let gate = current_generation.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            debug!("peer connection state: {state:?}");
            match state {
                RTCPeerConnectionState::Connected => info!("peer connection established"),
                RTCPeerConnectionState::Failed
                | RTCPeerConnectionState::Disconnected
                | RTCPeerConnectionState::Closed => {
                    if gate.load(Ordering::SeqCst) == generation {
                        let _ = media_events.send(MediaEvent::ConnectionLost { generation });
                    }
                }
                _ => {}
            }
            Box::pin(async {})
        }));

        if initiator {
            // A data channel guarantees the offer carries at least one
            // media line even for text-only sessions.
            pc.create_data_channel("pairchat-data", Some(RTCDataChannelInit::default()))
                .await?;
        } else {
            pc.on_data_channel(Box::new(|dc: Arc<RTCDataChannel>| {
                debug!(label = dc.label(), "remote data channel announced");
                Box::pin(async {})
            }));
        }

        Ok(Self {
            pc,
            generation,
            current_generation,
            target,
            pending_remote: Mutex::new(Vec::new()),
            remote_applied: AtomicBool::new(false),
            offered: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            text_only,
            outbound,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_text_only(&self) -> bool {
        self.text_only
    }

    /// Remote candidates still waiting for the remote description.
    pub fn queued_candidates(&self) -> usize {
        self.pending_remote.lock().unwrap().len()
    }

    /// Records the partner id learned from a forwarded envelope so later
    /// outbound signals are addressed to it.
    pub fn set_target(&self, partner: PeerId) {
        *self.target.lock().unwrap() = partner;
    }

    fn publish(&self, signal: SignalPayload) {
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            debug!("suppressing outbound signal from a stale pairing");
            return;
        }
        let envelope = SignalEnvelope {
            target: self.target.lock().unwrap().clone(),
            sender: None,
            signal,
        };
        let _ = self.outbound.send(ClientEvent::Signal(envelope));
    }

    /// Opens the SDP exchange. At most one offer goes out per pairing.
    pub async fn create_offer(&self) -> Result<(), MediaError> {
        if self.offered.swap(true, Ordering::SeqCst) {
            debug!("offer already sent for this pairing");
            return Ok(());
        }
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer).await?;
        let sdp = self
            .pc
            .local_description()
            .await
            .ok_or(MediaError::MissingLocalDescription)?;
        self.publish(SignalPayload::Offer { sdp });
        Ok(())
    }

    /// Applies the remote description. A remote offer produces exactly
    /// one local answer; a remote answer completes negotiation with no
    /// further signal. Either way the queued candidates drain afterwards.
    pub async fn apply_remote_description(&self, payload: SignalPayload) -> Result<(), MediaError> {
        match payload {
            SignalPayload::Offer { sdp } => {
                self.pc.set_remote_description(sdp).await?;
                self.remote_applied.store(true, Ordering::SeqCst);
                ice::drain_pending(&self.pc, &self.pending_remote).await;

                let answer = self.pc.create_answer(None).await?;
                self.pc.set_local_description(answer).await?;
                let sdp = self
                    .pc
                    .local_description()
                    .await
                    .ok_or(MediaError::MissingLocalDescription)?;
                self.publish(SignalPayload::Answer { sdp });
            }
            SignalPayload::Answer { sdp } => {
                self.pc.set_remote_description(sdp).await?;
                self.remote_applied.store(true, Ordering::SeqCst);
                ice::drain_pending(&self.pc, &self.pending_remote).await;
            }
            SignalPayload::IceCandidate(candidate) => {
                self.add_remote_candidate(candidate).await;
            }
        }
        Ok(())
    }

    /// Candidates may race the SDP exchange: queued until the remote
    /// description lands, silently dropped once the session is torn down.
    pub async fn add_remote_candidate(&self, candidate: IceCandidate) {
        if self.torn_down.load(Ordering::SeqCst) {
            debug!("ignoring remote ICE candidate after teardown");
            return;
        }
        if self.remote_applied.load(Ordering::SeqCst) {
            ice::apply_candidate(&self.pc, candidate).await;
        } else {
            debug!("remote description not set yet, queuing candidate");
            self.pending_remote.lock().unwrap().push(candidate);
        }
    }

    /// Stops everything and releases the peer connection. Idempotent.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pending_remote.lock().unwrap().clear();
        if let Err(e) = self.pc.close().await {
            debug!("closing peer connection: {e}");
        }
    }
}
