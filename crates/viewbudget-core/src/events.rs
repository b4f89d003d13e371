use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::EngineState;

/// Every state change in the engine produces an Event.
/// The host prints or logs them; nothing in the core consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Page became visible and a measurement interval started.
    MeasuringStarted {
        session_id: Uuid,
        at: DateTime<FixedOffset>,
    },
    /// Elapsed time was flushed into the ledger.
    Ticked {
        elapsed_ms: u64,
        accumulated_ms: u64,
        remaining_ms: i64,
        at: DateTime<FixedOffset>,
    },
    /// Page became hidden; ticking stopped after a final flush.
    MeasuringStopped {
        accumulated_ms: u64,
        at: DateTime<FixedOffset>,
    },
    /// Daily budget exhausted. Terminal for the session.
    Blocked {
        accumulated_ms: u64,
        limit_ms: u64,
        media_paused: usize,
        at: DateTime<FixedOffset>,
    },
    LimitSaved {
        minutes: u32,
        remaining_ms: i64,
        at: DateTime<FixedOffset>,
    },
    /// Proposed limit failed validation; nothing was saved.
    LimitRejected {
        input: String,
        reason: String,
        at: DateTime<FixedOffset>,
    },
    /// The per-day ledger was cleared at the reset boundary.
    LedgerReset {
        day: String,
        at: DateTime<FixedOffset>,
    },
    StateSnapshot {
        state: EngineState,
        day: String,
        accumulated_ms: u64,
        limit_minutes: u32,
        remaining_ms: i64,
        last_reset: Option<String>,
        at: DateTime<FixedOffset>,
    },
}
