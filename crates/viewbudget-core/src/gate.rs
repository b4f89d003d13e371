//! Access gate: the irreversible block action and the host page surface.

use chrono::{DateTime, FixedOffset};

use crate::display::{Locale, PanelView};
use crate::engine::Session;
use crate::events::Event;

/// The host page as seen by the core.
///
/// Implemented by whatever embeds the engine (the terminal host in the CLI,
/// a recording double in tests).
pub trait Page {
    /// Whether the page is currently visible to the user.
    fn is_visible(&self) -> bool;

    /// Pause every playing media element. Returns how many were paused.
    fn pause_media(&mut self) -> usize;

    /// Destructively replace the visible content with `notice`.
    fn replace_content(&mut self, notice: &str);

    /// Show the fixed-position settings overlay.
    fn render_panel(&mut self, panel: &PanelView);

    /// Update the countdown text inside the overlay.
    fn set_countdown(&mut self, text: &str);

    /// Show a transient message to the user.
    fn notify(&mut self, message: &str);
}

/// Blocks the page once the daily budget is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate {
    locale: Locale,
}

impl AccessGate {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Pause media, replace the page with the warning and mark the session
    /// blocked. There is no way back within the session.
    pub fn block<P: Page>(
        &self,
        page: &mut P,
        session: &mut Session,
        accumulated_ms: u64,
        limit_ms: u64,
        now: DateTime<FixedOffset>,
    ) -> Event {
        let media_paused = page.pause_media();
        page.replace_content(self.locale.block_notice());
        session.mark_blocked();
        tracing::info!(
            session_id = %session.id(),
            accumulated_ms,
            limit_ms,
            media_paused,
            "daily limit reached, page blocked"
        );
        Event::Blocked {
            accumulated_ms,
            limit_ms,
            media_paused,
            at: now,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Page double that records every call.
    #[derive(Debug, Default)]
    pub struct RecordingPage {
        pub visible: bool,
        pub playing_media: usize,
        pub content: Option<String>,
        pub panel: Option<PanelView>,
        pub countdowns: Vec<String>,
        pub notices: Vec<String>,
    }

    impl RecordingPage {
        pub fn visible() -> Self {
            Self {
                visible: true,
                playing_media: 1,
                ..Self::default()
            }
        }

        pub fn hidden() -> Self {
            Self {
                visible: false,
                playing_media: 1,
                ..Self::default()
            }
        }

        pub fn is_blocked(&self) -> bool {
            self.content.is_some()
        }
    }

    impl Page for RecordingPage {
        fn is_visible(&self) -> bool {
            self.visible
        }

        fn pause_media(&mut self) -> usize {
            std::mem::take(&mut self.playing_media)
        }

        fn replace_content(&mut self, notice: &str) {
            self.panel = None;
            self.content = Some(notice.to_string());
        }

        fn render_panel(&mut self, panel: &PanelView) {
            self.panel = Some(panel.clone());
        }

        fn set_countdown(&mut self, text: &str) {
            self.countdowns.push(text.to_string());
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }
    }
}
