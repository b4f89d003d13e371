//! # viewbudget Core Library
//!
//! This library provides the daily viewing-time budget for video sites: it
//! measures how long a page is visible, keeps a per-day ledger in origin-scoped
//! storage, clears that ledger once a day at a fixed local time, and blocks the
//! page once the configured limit is used up.
//!
//! ## Architecture
//!
//! - **Ledger**: JSON entries in an origin-scoped key-value store (SQLite on
//!   disk, or in memory for tests)
//! - **Accounting Engine**: a wall-clock-based state machine driven by
//!   visibility changes and a periodic tick supplied by the host
//! - **Gate & Display**: render the countdown and settings panel, or replace
//!   the page with the block notice, through the host's [`Page`]
//!
//! ## Key Components
//!
//! - [`AccountingEngine`]: Core accounting state machine
//! - [`Ledger`]: Per-day usage, limit and reset marker persistence
//! - [`Database`]: Origin-scoped key-value storage
//! - [`Config`]: Application configuration management
//! - [`SiteMatcher`]: Which pages the engine runs on

pub mod display;
pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod site;
pub mod storage;

pub use display::{Display, Locale, PanelView, Remaining};
pub use engine::{parse_limit_minutes, AccountingEngine, EngineEvent, EngineState, Session, Visibility};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use gate::{AccessGate, Page};
pub use site::{origin_of, parse_page_url, MatchPattern, SiteMatcher};
pub use storage::{day_key, Config, Database, KvStore, Ledger, MemoryStore, OriginStore, ResetBoundary};
