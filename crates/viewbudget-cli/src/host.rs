//! Terminal stand-in for the host page.

use std::io::Write;

use viewbudget_core::{Page, PanelView};

/// Renders the panel, countdown and block notice to stdout.
pub struct TerminalPage {
    visible: bool,
    playing: bool,
}

impl TerminalPage {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            playing: true,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl Page for TerminalPage {
    fn is_visible(&self) -> bool {
        self.visible
    }

    fn pause_media(&mut self) -> usize {
        usize::from(std::mem::replace(&mut self.playing, false))
    }

    fn replace_content(&mut self, notice: &str) {
        println!();
        println!("{}", "=".repeat(40));
        println!("{notice}");
        println!("{}", "=".repeat(40));
    }

    fn render_panel(&mut self, panel: &PanelView) {
        println!("{}{} [{}]", panel.label, panel.limit_minutes, panel.save_label);
        println!("{}", panel.countdown);
    }

    fn set_countdown(&mut self, text: &str) {
        print!("\r{text}    ");
        std::io::stdout().flush().ok();
    }

    fn notify(&mut self, message: &str) {
        println!();
        println!("{message}");
    }
}
