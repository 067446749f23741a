use crate::config::SessionConfig;
use crate::peer::{MediaEvent, MediaSession, MediaSource};
use crate::signaling::{ClientEvent, PeerId, ServerEvent, SignalPayload};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Display text sent with the `typing` event; the partner renders it
/// verbatim.
pub const TYPING_NOTICE: &str = "Stranger is typing...";

const NEGOTIATION_FAILED_NOTICE: &str = "Connection failed. Chat ended.";
const TRANSPORT_LOST_NOTICE: &str = "Connection to the server was lost.";

/// Session lifecycle. Exactly one per client, mutated only by
/// [`ChatSession`]'s transition handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Searching,
    Paired,
    Ended,
}

/// User input as it reaches the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Start,
    Stop,
    ConfirmStop,
    InputChanged(String),
    InputBlurred,
    Submit(String),
}

/// Render instructions for the embedding UI. Chat lines are transient:
/// emitted once, never retained here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    OnlineCount(u64),
    StateChanged(SessionState),
    SystemMessage(String),
    ChatLine { from_self: bool, text: String },
    PartnerTyping(String),
    PartnerTypingCleared,
    /// Show the really-stop affordance in place of the stop control.
    ConfirmStop,
    InputCleared,
    RemoteMediaActive,
}

/// The orchestrator: owns the session state, the single media session
/// and the typing flag. Every inbound event is validated against the
/// current state; events that do not belong there are logged and
/// dropped, never queued.
pub struct ChatSession {
    local_id: PeerId,
    config: SessionConfig,
    state: SessionState,
    media: Option<MediaSession>,
    /// Current pairing generation; bumped on every entry to Searching or
    /// Paired and on every session end, which gates out late callbacks
    /// from pairings that no longer exist.
    generation: Arc<AtomicU64>,
    partner: Option<PeerId>,
    already_typing: bool,
    source: Arc<dyn MediaSource>,
    outbound: mpsc::UnboundedSender<ClientEvent>,
    ui: mpsc::UnboundedSender<UiEvent>,
    media_events: mpsc::UnboundedSender<MediaEvent>,
}

impl ChatSession {
    pub fn new(
        config: SessionConfig,
        source: Arc<dyn MediaSource>,
        outbound: mpsc::UnboundedSender<ClientEvent>,
        ui: mpsc::UnboundedSender<UiEvent>,
        media_events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Self {
        Self {
            local_id: PeerId::random(),
            config,
            state: SessionState::Idle,
            media: None,
            generation: Arc::new(AtomicU64::new(0)),
            partner: None,
            already_typing: false,
            source,
            outbound,
            ui,
            media_events,
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn media(&self) -> Option<&MediaSession> {
        self.media.as_ref()
    }

    /// Partner id learned from forwarded signal envelopes, if any.
    pub fn partner(&self) -> Option<&PeerId> {
        self.partner.as_ref()
    }

    pub fn media_active(&self) -> bool {
        self.media.is_some()
    }

    pub async fn handle_action(&mut self, action: UserAction) {
        match action {
            UserAction::Start => self.start_chat(),
            UserAction::Stop => self.request_stop(),
            UserAction::ConfirmStop => self.confirm_stop(),
            UserAction::InputChanged(text) => self.input_changed(&text),
            UserAction::InputBlurred => self.input_blurred(),
            UserAction::Submit(text) => self.submit_message(&text),
        }
    }

    /// Start clicked. A no-op while already Searching or Paired, so at
    /// most one `start` request is ever outstanding.
    pub fn start_chat(&mut self) {
        match self.state {
            SessionState::Idle | SessionState::Ended => {
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.state = SessionState::Searching;
                self.partner = None;
                self.already_typing = false;
                self.send(ClientEvent::Start(self.local_id.clone()));
                self.emit(UiEvent::StateChanged(SessionState::Searching));
            }
            SessionState::Searching | SessionState::Paired => {
                debug!("start ignored in {:?}", self.state);
            }
        }
        self.check_invariant();
    }

    /// Stop clicked: show the confirm affordance, no transition yet.
    pub fn request_stop(&mut self) {
        if self.state == SessionState::Paired {
            self.emit(UiEvent::ConfirmStop);
        } else {
            debug!("stop ignored in {:?}", self.state);
        }
    }

    /// Really-stop clicked: the relay decides the outcome and answers
    /// with a terminal event.
    pub fn confirm_stop(&mut self) {
        if self.state == SessionState::Paired {
            self.send(ClientEvent::Stop);
        } else {
            debug!("stop confirmation ignored in {:?}", self.state);
        }
    }

    /// Typing indicator edge detection: one `typing` per empty-to-nonempty
    /// streak, one `doneTyping` on the way back to empty.
    pub fn input_changed(&mut self, text: &str) {
        if self.state != SessionState::Paired {
            return;
        }
        if text.is_empty() {
            if self.already_typing {
                self.send(ClientEvent::DoneTyping);
                self.already_typing = false;
            }
        } else if !self.already_typing {
            self.send(ClientEvent::Typing(TYPING_NOTICE.to_string()));
            self.already_typing = true;
        }
    }

    pub fn input_blurred(&mut self) {
        if self.state == SessionState::Paired && self.already_typing {
            self.send(ClientEvent::DoneTyping);
            self.already_typing = false;
        }
    }

    /// Sends one chat message. Whitespace-only input is ignored; the
    /// input empties on submit, so `doneTyping` precedes the message.
    pub fn submit_message(&mut self, text: &str) {
        if self.state != SessionState::Paired {
            debug!("message ignored in {:?}", self.state);
            return;
        }
        if !text.chars().any(|c| !c.is_whitespace()) {
            return;
        }
        self.send(ClientEvent::DoneTyping);
        self.already_typing = false;
        self.send(ClientEvent::NewMessageToServer(text.to_string()));
        self.emit(UiEvent::InputCleared);
    }

    pub async fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            // Presence is state-independent.
            ServerEvent::NumberOfOnline(count) => self.emit(UiEvent::OnlineCount(count)),

            ServerEvent::Searching(msg) => {
                if self.state == SessionState::Searching {
                    self.emit(UiEvent::SystemMessage(msg));
                } else {
                    debug!("searching notice ignored in {:?}", self.state);
                }
            }

            ServerEvent::ChatStart(msg) => {
                if self.state == SessionState::Searching {
                    self.emit(UiEvent::SystemMessage(msg));
                    self.enter_paired().await;
                } else {
                    debug!("chatStart ignored in {:?}", self.state);
                }
            }

            ServerEvent::Signal(envelope) => {
                if self.state != SessionState::Paired {
                    debug!("discarding signal outside an active pairing");
                } else {
                    if let Some(sender) = envelope.sender {
                        if sender != self.local_id {
                            if let Some(media) = &self.media {
                                media.set_target(sender.clone());
                            }
                            self.partner = Some(sender);
                        }
                    }
                    let outcome = match &self.media {
                        Some(media) => match envelope.signal {
                            SignalPayload::IceCandidate(candidate) => {
                                media.add_remote_candidate(candidate).await;
                                Ok(())
                            }
                            payload => media.apply_remote_description(payload).await,
                        },
                        None => Ok(()),
                    };
                    if let Err(e) = outcome {
                        warn!("negotiation failed: {e}");
                        self.end_session(NEGOTIATION_FAILED_NOTICE.to_string()).await;
                    }
                }
            }

            ServerEvent::NewMessageToClient(payload) => {
                if self.state == SessionState::Paired {
                    self.emit(UiEvent::ChatLine {
                        from_self: payload.id == self.local_id,
                        text: payload.msg,
                    });
                } else {
                    debug!("chat message ignored in {:?}", self.state);
                }
            }

            ServerEvent::StrangerIsTyping(msg) => {
                if self.state == SessionState::Paired {
                    self.emit(UiEvent::PartnerTyping(msg));
                }
            }

            ServerEvent::StrangerIsDoneTyping => {
                if self.state == SessionState::Paired {
                    self.emit(UiEvent::PartnerTypingCleared);
                }
            }

            ServerEvent::GoodBye(msg)
            | ServerEvent::StrangerDisconnected(msg)
            | ServerEvent::EndChat(msg) => {
                if self.state == SessionState::Paired {
                    self.end_session(msg).await;
                } else {
                    debug!("terminal notice ignored in {:?}", self.state);
                }
            }
        }
        self.check_invariant();
    }

    pub async fn handle_media_event(&mut self, event: MediaEvent) {
        let current = self.media.as_ref().map(MediaSession::generation);
        match event {
            MediaEvent::RemoteTrackStarted { generation } => {
                if self.state == SessionState::Paired && current == Some(generation) {
                    self.emit(UiEvent::RemoteMediaActive);
                }
            }
            MediaEvent::ConnectionLost { generation } => {
                if self.state == SessionState::Paired && current == Some(generation) {
                    warn!("peer connection lost");
                    self.end_session(NEGOTIATION_FAILED_NOTICE.to_string()).await;
                }
            }
        }
        self.check_invariant();
    }

    /// Transport failure: forced end regardless of server confirmation.
    pub async fn transport_lost(&mut self) {
        warn!("signaling transport lost");
        match self.state {
            SessionState::Searching | SessionState::Paired => {
                self.end_session(TRANSPORT_LOST_NOTICE.to_string()).await;
            }
            SessionState::Idle | SessionState::Ended => {}
        }
        self.check_invariant();
    }

    async fn enter_paired(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // At most one live media session; a leftover here would mean a
        // broken transition somewhere else.
        if let Some(stale) = self.media.take() {
            error!("tearing down leftover media session");
            stale.teardown().await;
        }
        match MediaSession::connect(
            &self.config.ice_servers,
            self.source.as_ref(),
            self.config.initiator,
            self.local_id.clone(), // relay routes within the pairing; updated once a sender is learned
            generation,
            self.generation.clone(),
            self.outbound.clone(),
            self.media_events.clone(),
        )
        .await
        {
            Ok(media) => {
                self.state = SessionState::Paired;
                self.media = Some(media);
                self.emit(UiEvent::StateChanged(SessionState::Paired));
                if self.config.initiator {
                    let offered = match &self.media {
                        Some(media) => media.create_offer().await,
                        None => Ok(()),
                    };
                    if let Err(e) = offered {
                        warn!("failed to open negotiation: {e}");
                        self.end_session(NEGOTIATION_FAILED_NOTICE.to_string()).await;
                    }
                }
            }
            Err(e) => {
                error!("failed to create media session: {e}");
                self.state = SessionState::Ended;
                self.emit(UiEvent::SystemMessage(NEGOTIATION_FAILED_NOTICE.to_string()));
                self.emit(UiEvent::StateChanged(SessionState::Ended));
            }
        }
    }

    /// Terminal transition: one explanatory message, media torn down,
    /// UI reset, start control restored.
    async fn end_session(&mut self, notice: String) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(media) = self.media.take() {
            media.teardown().await;
        }
        self.state = SessionState::Ended;
        self.partner = None;
        self.already_typing = false;
        self.emit(UiEvent::PartnerTypingCleared);
        self.emit(UiEvent::InputCleared);
        self.emit(UiEvent::SystemMessage(notice));
        self.emit(UiEvent::StateChanged(SessionState::Ended));
    }

    fn send(&self, event: ClientEvent) {
        if self.outbound.send(event).is_err() {
            debug!("outbound channel closed");
        }
    }

    fn emit(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            debug!("ui channel closed");
        }
    }

    fn check_invariant(&self) {
        debug_assert_eq!(
            self.media.is_some(),
            self.state == SessionState::Paired,
            "media session must exist exactly while Paired"
        );
    }
}
