use crate::session::{SessionState, UiEvent};

/// Enablement of the chat controls, derived strictly from the session
/// state plus the stop-confirm flag. Stop and really-stop are never
/// offered alongside start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub really_stop_enabled: bool,
    pub input_enabled: bool,
    pub send_enabled: bool,
}

/// One rendered line of the conversation view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptLine {
    Notice(String),
    Chat { from_self: bool, text: String },
}

/// Passive projection of the session for the UI: online count, control
/// enablement and the conversation surface. Holds no independent state;
/// everything follows from the [`UiEvent`] stream.
#[derive(Debug, Default)]
pub struct PresenceView {
    online: u64,
    state: SessionState,
    confirm_stop: bool,
    remote_media: bool,
    typing_line: Option<String>,
    transcript: Vec<TranscriptLine>,
}

impl PresenceView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &UiEvent) {
        match event {
            UiEvent::OnlineCount(count) => self.online = *count,
            UiEvent::StateChanged(state) => {
                self.state = *state;
                self.confirm_stop = false;
                match state {
                    // A fresh search replaces the conversation view.
                    SessionState::Searching => {
                        self.transcript.clear();
                        self.typing_line = None;
                        self.remote_media = false;
                    }
                    SessionState::Ended | SessionState::Idle => {
                        self.remote_media = false;
                    }
                    SessionState::Paired => {}
                }
            }
            UiEvent::SystemMessage(text) => {
                self.transcript.push(TranscriptLine::Notice(text.clone()));
            }
            UiEvent::ChatLine { from_self, text } => self.transcript.push(TranscriptLine::Chat {
                from_self: *from_self,
                text: text.clone(),
            }),
            UiEvent::PartnerTyping(text) => self.typing_line = Some(text.clone()),
            UiEvent::PartnerTypingCleared => self.typing_line = None,
            UiEvent::ConfirmStop => self.confirm_stop = true,
            UiEvent::InputCleared => {}
            UiEvent::RemoteMediaActive => self.remote_media = true,
        }
    }

    pub fn online(&self) -> u64 {
        self.online
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn remote_media_active(&self) -> bool {
        self.remote_media
    }

    pub fn typing_line(&self) -> Option<&str> {
        self.typing_line.as_deref()
    }

    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    pub fn controls(&self) -> Controls {
        match self.state {
            SessionState::Idle | SessionState::Ended => Controls {
                start_enabled: true,
                stop_enabled: false,
                really_stop_enabled: false,
                input_enabled: false,
                send_enabled: false,
            },
            SessionState::Searching => Controls {
                start_enabled: false,
                stop_enabled: false,
                really_stop_enabled: false,
                input_enabled: false,
                send_enabled: false,
            },
            SessionState::Paired => Controls {
                start_enabled: false,
                stop_enabled: !self.confirm_stop,
                really_stop_enabled: self.confirm_stop,
                input_enabled: true,
                send_enabled: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_and_ended_enable_start_only() {
        let view = PresenceView::new();
        let controls = view.controls();
        assert!(controls.start_enabled);
        assert!(!controls.stop_enabled);
        assert!(!controls.really_stop_enabled);
        assert!(!controls.input_enabled);
        assert!(!controls.send_enabled);

        let mut view = PresenceView::new();
        view.apply(&UiEvent::StateChanged(SessionState::Ended));
        assert_eq!(view.controls(), controls);
    }

    #[test]
    fn searching_disables_everything() {
        let mut view = PresenceView::new();
        view.apply(&UiEvent::StateChanged(SessionState::Searching));
        let controls = view.controls();
        assert!(!controls.start_enabled);
        assert!(!controls.stop_enabled);
        assert!(!controls.input_enabled);
    }

    #[test]
    fn paired_swaps_stop_for_really_stop_on_confirm() {
        let mut view = PresenceView::new();
        view.apply(&UiEvent::StateChanged(SessionState::Paired));
        let controls = view.controls();
        assert!(controls.stop_enabled);
        assert!(!controls.really_stop_enabled);
        assert!(controls.input_enabled);
        assert!(!controls.start_enabled);

        view.apply(&UiEvent::ConfirmStop);
        let controls = view.controls();
        assert!(!controls.stop_enabled);
        assert!(controls.really_stop_enabled);
        assert!(!controls.start_enabled);
    }

    #[test]
    fn stop_and_start_never_interactable_together() {
        for state in [
            SessionState::Idle,
            SessionState::Searching,
            SessionState::Paired,
            SessionState::Ended,
        ] {
            let mut view = PresenceView::new();
            view.apply(&UiEvent::StateChanged(state));
            let plain = view.controls();
            view.apply(&UiEvent::ConfirmStop);
            let confirmed = view.controls();
            for controls in [plain, confirmed] {
                assert!(
                    !(controls.start_enabled
                        && (controls.stop_enabled || controls.really_stop_enabled))
                );
            }
        }
    }

    #[test]
    fn searching_clears_the_conversation() {
        let mut view = PresenceView::new();
        view.apply(&UiEvent::SystemMessage("You are now chatting".into()));
        view.apply(&UiEvent::PartnerTyping("Stranger is typing...".into()));
        view.apply(&UiEvent::StateChanged(SessionState::Searching));
        assert!(view.transcript().is_empty());
        assert!(view.typing_line().is_none());
    }

    #[test]
    fn typing_line_follows_events() {
        let mut view = PresenceView::new();
        view.apply(&UiEvent::PartnerTyping("Stranger is typing...".into()));
        assert_eq!(view.typing_line(), Some("Stranger is typing..."));
        view.apply(&UiEvent::PartnerTypingCleared);
        assert!(view.typing_line().is_none());
    }

    #[test]
    fn online_count_tracks_latest_value() {
        let mut view = PresenceView::new();
        view.apply(&UiEvent::OnlineCount(12));
        view.apply(&UiEvent::OnlineCount(9));
        assert_eq!(view.online(), 9);
    }
}
