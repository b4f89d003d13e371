//! Settings panel and countdown rendering.
//!
//! The display never talks to storage. The engine hands it the numbers and a
//! mutable borrow of the [`Session`] so the last rendered countdown is kept
//! with the rest of the session state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::Session;
use crate::gate::Page;
use crate::storage::ledger::MS_PER_MINUTE;

/// Display language for every user-facing string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
}

impl Locale {
    pub fn block_notice(self) -> &'static str {
        match self {
            Locale::ZhCn => "今日浏览时间已超过限制，请明天再来！",
            Locale::En => "Today's viewing time limit has been reached. Please come back tomorrow!",
        }
    }

    pub fn limit_label(self) -> &'static str {
        match self {
            Locale::ZhCn => "每日限制时间（分钟）：",
            Locale::En => "Daily limit (minutes): ",
        }
    }

    pub fn save_label(self) -> &'static str {
        match self {
            Locale::ZhCn => "保存",
            Locale::En => "Save",
        }
    }

    pub fn saved_confirmation(self) -> &'static str {
        match self {
            Locale::ZhCn => "设置已保存！",
            Locale::En => "Settings saved!",
        }
    }

    pub fn invalid_limit(self) -> &'static str {
        match self {
            Locale::ZhCn => "请输入一个正整数分钟数。",
            Locale::En => "Please enter a positive whole number of minutes.",
        }
    }

    pub fn countdown(self, remaining: Remaining) -> String {
        match self {
            Locale::ZhCn => format!("剩余时间: {}分{}秒", remaining.minutes, remaining.seconds),
            Locale::En => format!(
                "Time remaining: {}m {}s",
                remaining.minutes, remaining.seconds
            ),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::ZhCn => write!(f, "zh-CN"),
            Locale::En => write!(f, "en"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zh-cn" | "zh" => Ok(Locale::ZhCn),
            "en" | "en-us" => Ok(Locale::En),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

/// Remaining time split into whole minutes and seconds.
///
/// Both parts are floored, so a value just past the limit renders as
/// `-1` minutes `-1` seconds rather than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    pub fn from_ms(ms: i64) -> Self {
        let per_minute = MS_PER_MINUTE as i64;
        Self {
            minutes: ms.div_euclid(per_minute),
            seconds: (ms % per_minute).div_euclid(1000),
        }
    }
}

/// What the settings overlay shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub label: String,
    pub limit_minutes: u32,
    pub save_label: String,
    pub countdown: String,
}

/// Renders the settings panel and countdown in one locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct Display {
    locale: Locale,
}

impl Display {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn render_panel<P: Page>(
        &self,
        page: &mut P,
        session: &mut Session,
        limit_minutes: u32,
        remaining_ms: i64,
    ) {
        let countdown = self.locale.countdown(Remaining::from_ms(remaining_ms));
        page.render_panel(&PanelView {
            label: self.locale.limit_label().to_string(),
            limit_minutes,
            save_label: self.locale.save_label().to_string(),
            countdown: countdown.clone(),
        });
        session.set_countdown(countdown);
    }

    pub fn refresh_countdown<P: Page>(&self, page: &mut P, session: &mut Session, remaining_ms: i64) {
        let countdown = self.locale.countdown(Remaining::from_ms(remaining_ms));
        page.set_countdown(&countdown);
        session.set_countdown(countdown);
    }

    pub fn confirm_saved<P: Page>(&self, page: &mut P) {
        page.notify(self.locale.saved_confirmation());
    }

    pub fn reject_limit<P: Page>(&self, page: &mut P) {
        page.notify(self.locale.invalid_limit());
    }
}
