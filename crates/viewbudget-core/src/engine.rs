//! Time accounting engine.
//!
//! A wall-clock-based state machine with no internal timer. The host owns the
//! 1 s tick and the visibility signal and feeds both in as [`EngineEvent`]s;
//! each event runs to completion before the next is handled.
//!
//! ## State Transitions
//!
//! ```text
//! Idle <-> Measuring -> Blocked
//!   \_________________/^
//! ```
//!
//! `Blocked` is terminal: once the page content has been replaced nothing
//! re-arms measurement for the rest of the session.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = AccountingEngine::new(Ledger::new(store), Locale::default());
//! engine.start(&mut page, now)?;
//! // Every second while `engine.is_measuring()`:
//! engine.handle(EngineEvent::Tick, &mut page, now)?;
//! ```

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::display::{Display, Locale};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::gate::{AccessGate, Page};
use crate::storage::ledger::{day_key, MS_PER_MINUTE};
use crate::storage::{Config, KvStore, Ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Page hidden, nothing is measured.
    Idle,
    /// Page visible, a measurement interval is open.
    Measuring,
    /// Budget exhausted, page replaced.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Inputs the host feeds into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Visibility(Visibility),
    /// Periodic accounting tick, only meaningful while measuring.
    Tick,
    /// The settings panel's save action with the raw input value.
    SaveLimit(String),
}

/// Mutable state of one page session, owned by the engine and lent to the
/// display and gate.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: Uuid,
    state: EngineState,
    /// Start of the open measurement interval.
    start_time: Option<DateTime<FixedOffset>>,
    /// Last rendered countdown text.
    countdown: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: EngineState::Idle,
            start_time: None,
            countdown: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        self.start_time
    }

    pub fn countdown(&self) -> Option<&str> {
        self.countdown.as_deref()
    }

    pub(crate) fn set_countdown(&mut self, text: String) {
        self.countdown = Some(text);
    }

    pub(crate) fn mark_blocked(&mut self) {
        self.state = EngineState::Blocked;
        self.start_time = None;
    }
}

/// Parse a proposed daily limit. Only positive whole minutes are accepted.
///
/// # Errors
/// Returns an error for empty, non-numeric, zero, negative or overflowing input.
pub fn parse_limit_minutes(input: &str) -> Result<u32, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidLimit {
        input: input.to_string(),
        message: message.to_string(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("value is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(invalid("must be positive"));
    }
    let minutes: u32 = trimmed
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(&e.to_string()))?;
    if minutes == 0 {
        return Err(invalid("must be positive"));
    }
    Ok(minutes)
}

/// Core accounting engine for one page session.
pub struct AccountingEngine<S: KvStore> {
    ledger: Ledger<S>,
    session: Session,
    display: Display,
    gate: AccessGate,
}

impl<S: KvStore> AccountingEngine<S> {
    /// Create an engine in the `Idle` state. Nothing is read until [`start`].
    ///
    /// [`start`]: AccountingEngine::start
    pub fn new(ledger: Ledger<S>, locale: Locale) -> Self {
        Self {
            ledger,
            session: Session::new(),
            display: Display::new(locale),
            gate: AccessGate::new(locale),
        }
    }

    /// Create an engine whose ledger defaults and locale come from `config`.
    pub fn from_config(store: S, config: &Config) -> Self {
        let ledger = Ledger::with_settings(
            store,
            config.limits.default_minutes,
            config.reset_boundary(),
        );
        Self::new(ledger, config.ui.locale)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.session.state
    }

    /// Whether the host should keep its tick timer running.
    pub fn is_measuring(&self) -> bool {
        self.session.state == EngineState::Measuring
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// Milliseconds left today; negative once the limit is passed.
    pub fn remaining_ms(&self, now: &DateTime<FixedOffset>) -> i64 {
        remaining(self.ledger.limit_ms(), self.ledger.time_spent(now))
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<FixedOffset>) -> Event {
        Event::StateSnapshot {
            state: self.session.state,
            day: day_key(&now),
            accumulated_ms: self.ledger.time_spent(&now),
            limit_minutes: self.ledger.limit_minutes(),
            remaining_ms: self.remaining_ms(&now),
            last_reset: self.ledger.last_reset(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Page initialization: apply the daily reset, then either block
    /// immediately or render the panel and start measuring if visible.
    ///
    /// # Errors
    /// Returns an error if the ledger cannot be written.
    pub fn start<P: Page>(&mut self, page: &mut P, now: DateTime<FixedOffset>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        if self.session.state == EngineState::Blocked {
            return Ok(events);
        }

        if self.ledger.reset_if_due(&now)? {
            events.push(Event::LedgerReset {
                day: day_key(&now),
                at: now,
            });
        }

        let spent = self.ledger.time_spent(&now);
        let limit_ms = self.ledger.limit_ms();
        if spent >= limit_ms {
            events.push(self.gate.block(page, &mut self.session, spent, limit_ms, now));
            return Ok(events);
        }

        self.display.render_panel(
            page,
            &mut self.session,
            self.ledger.limit_minutes(),
            remaining(limit_ms, spent),
        );

        if page.is_visible() {
            events.extend(self.begin_measuring(now));
        }
        Ok(events)
    }

    /// Handle one host event. Every event is ignored once blocked.
    ///
    /// # Errors
    /// Returns an error if the ledger cannot be written.
    pub fn handle<P: Page>(
        &mut self,
        event: EngineEvent,
        page: &mut P,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<Event>> {
        if self.session.state == EngineState::Blocked {
            tracing::debug!(?event, "session blocked, ignoring event");
            return Ok(Vec::new());
        }

        match event {
            EngineEvent::Visibility(Visibility::Visible) => Ok(self.begin_measuring(now).into_iter().collect()),
            EngineEvent::Visibility(Visibility::Hidden) => self.stop_measuring(page, now),
            EngineEvent::Tick => {
                if self.session.state != EngineState::Measuring {
                    return Ok(Vec::new());
                }
                Ok(self.flush(page, now)?.into_iter().collect())
            }
            EngineEvent::SaveLimit(input) => self.save_limit(page, &input, now).map(|e| vec![e]),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_measuring(&mut self, now: DateTime<FixedOffset>) -> Option<Event> {
        if self.session.state != EngineState::Idle {
            return None;
        }
        self.session.state = EngineState::Measuring;
        self.session.start_time = Some(now);
        tracing::debug!(session_id = %self.session.id, "measuring started");
        Some(Event::MeasuringStarted {
            session_id: self.session.id,
            at: now,
        })
    }

    fn stop_measuring<P: Page>(&mut self, page: &mut P, now: DateTime<FixedOffset>) -> Result<Vec<Event>> {
        if self.session.state != EngineState::Measuring {
            return Ok(Vec::new());
        }
        self.session.state = EngineState::Idle;

        let mut events: Vec<Event> = self.flush(page, now)?.into_iter().collect();
        if self.session.state == EngineState::Idle {
            self.session.start_time = None;
            events.push(Event::MeasuringStopped {
                accumulated_ms: self.ledger.time_spent(&now),
                at: now,
            });
            tracing::debug!(session_id = %self.session.id, "measuring stopped");
        }
        Ok(events)
    }

    /// Accumulate time since `start_time` and check it against the limit.
    fn flush<P: Page>(&mut self, page: &mut P, now: DateTime<FixedOffset>) -> Result<Option<Event>> {
        let Some(start) = self.session.start_time else {
            return Ok(None);
        };
        let elapsed_ms = u64::try_from((now - start).num_milliseconds()).unwrap_or(0);
        let total = self.ledger.time_spent(&now).saturating_add(elapsed_ms);
        let limit_ms = self.ledger.limit_ms();

        if total >= limit_ms {
            return Ok(Some(self.gate.block(page, &mut self.session, total, limit_ms, now)));
        }

        self.ledger.set_time_spent(&now, total)?;
        let remaining_ms = remaining(limit_ms, total);
        self.display
            .refresh_countdown(page, &mut self.session, remaining_ms);
        self.session.start_time = Some(now);

        Ok(Some(Event::Ticked {
            elapsed_ms,
            accumulated_ms: total,
            remaining_ms,
            at: now,
        }))
    }

    fn save_limit<P: Page>(&mut self, page: &mut P, input: &str, now: DateTime<FixedOffset>) -> Result<Event> {
        let minutes = match parse_limit_minutes(input) {
            Ok(minutes) => minutes,
            Err(e) => {
                tracing::info!(input, error = %e, "rejected limit input");
                self.display.reject_limit(page);
                let reason = match e {
                    ValidationError::InvalidLimit { message, .. } => message,
                    other => other.to_string(),
                };
                return Ok(Event::LimitRejected {
                    input: input.to_string(),
                    reason,
                    at: now,
                });
            }
        };

        let new_limit_ms = u64::from(minutes) * MS_PER_MINUTE;
        let spent = self.ledger.time_spent(&now);
        if spent >= new_limit_ms {
            return Ok(self.gate.block(page, &mut self.session, spent, new_limit_ms, now));
        }

        self.ledger.set_limit_minutes(minutes)?;
        let remaining_ms = remaining(new_limit_ms, spent);
        self.display
            .refresh_countdown(page, &mut self.session, remaining_ms);
        self.display.confirm_saved(page);
        tracing::info!(minutes, "daily limit saved");

        Ok(Event::LimitSaved {
            minutes,
            remaining_ms,
            at: now,
        })
    }
}

fn remaining(limit_ms: u64, spent_ms: u64) -> i64 {
    i64::try_from(limit_ms).unwrap_or(i64::MAX) - i64::try_from(spent_ms).unwrap_or(i64::MAX)
}
