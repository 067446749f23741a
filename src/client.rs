use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::peer::{MediaEvent, MediaSource};
use crate::session::{ChatSession, UiEvent, UserAction};
use crate::signaling::{ClientEvent, SignalingTransport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Control handle for the embedding UI. Dropping it stops the client
/// loop.
#[derive(Clone)]
pub struct ChatHandle {
    actions: mpsc::UnboundedSender<UserAction>,
}

impl ChatHandle {
    pub fn start(&self) {
        self.act(UserAction::Start);
    }

    pub fn stop(&self) {
        self.act(UserAction::Stop);
    }

    pub fn confirm_stop(&self) {
        self.act(UserAction::ConfirmStop);
    }

    pub fn input_changed(&self, text: impl Into<String>) {
        self.act(UserAction::InputChanged(text.into()));
    }

    pub fn input_blurred(&self) {
        self.act(UserAction::InputBlurred);
    }

    pub fn submit(&self, text: impl Into<String>) {
        self.act(UserAction::Submit(text.into()));
    }

    fn act(&self, action: UserAction) {
        if self.actions.send(action).is_err() {
            debug!("client loop is gone, action dropped");
        }
    }
}

/// Wires a signaling transport and the state machine into a single
/// event loop: one event processed to completion at a time, in arrival
/// order.
pub struct ChatClient<T> {
    transport: T,
    session: ChatSession,
    actions: mpsc::UnboundedReceiver<UserAction>,
    outbound: mpsc::UnboundedReceiver<ClientEvent>,
    media_events: mpsc::UnboundedReceiver<MediaEvent>,
}

impl<T: SignalingTransport> ChatClient<T> {
    pub fn new(
        transport: T,
        config: SessionConfig,
        source: Arc<dyn MediaSource>,
    ) -> Result<(Self, ChatHandle, mpsc::UnboundedReceiver<UiEvent>), SessionError> {
        config.validate()?;
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let session = ChatSession::new(config, source, outbound_tx, ui_tx, media_tx);
        Ok((
            Self {
                transport,
                session,
                actions: actions_rx,
                outbound: outbound_rx,
                media_events: media_rx,
            },
            ChatHandle {
                actions: actions_tx,
            },
            ui_rx,
        ))
    }

    pub async fn run(mut self) -> Result<(), SessionError> {
        loop {
            tokio::select! {
                action = self.actions.recv() => match action {
                    Some(action) => self.session.handle_action(action).await,
                    // The embedder dropped its handle; we are done.
                    None => break,
                },
                event = self.transport.recv() => match event {
                    Ok(event) => self.session.handle_server_event(event).await,
                    Err(e) => {
                        warn!("signaling transport error: {e}");
                        self.session.transport_lost().await;
                        break;
                    }
                },
                Some(event) = self.outbound.recv() => {
                    if let Err(e) = self.transport.send(event).await {
                        warn!("failed to send to relay: {e}");
                        self.session.transport_lost().await;
                        break;
                    }
                },
                Some(event) = self.media_events.recv() => {
                    self.session.handle_media_event(event).await;
                },
            }
        }
        let _ = self.transport.close().await;
        Ok(())
    }
}
