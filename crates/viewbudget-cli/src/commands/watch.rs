use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use viewbudget_core::{
    AccountingEngine, Config, Database, EngineEvent, EngineState, Event, KvStore, Visibility,
};

use super::common::{now, resolve_origin};
use crate::host::TerminalPage;

const HELP: &str = "commands: show | hide | limit <minutes> | status | quit";

/// A line typed into a running session.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Show,
    Hide,
    Limit(String),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match word.to_ascii_lowercase().as_str() {
        "show" | "visible" => Some(Command::Show),
        "hide" | "hidden" => Some(Command::Hide),
        "limit" | "save" => Some(Command::Limit(rest.trim().to_string())),
        "status" => Some(Command::Status),
        "quit" | "exit" | "q" => Some(Command::Quit),
        _ => None,
    }
}

pub fn run(url: &str, hidden: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let origin = resolve_origin(&config, url)?;
    let db = Database::open()?;
    let mut engine = AccountingEngine::from_config(db.scoped(&origin), &config);
    let mut page = TerminalPage::new(!hidden);
    let period = Duration::from_millis(config.engine.tick_interval_ms);

    tracing::info!(%origin, session_id = %engine.session().id(), "session started");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let input = BufReader::new(tokio::io::stdin());
    let result = runtime.block_on(drive(&mut engine, &mut page, input, period));
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_background();
    result
}

/// Event loop: one tick timer while measuring, input commands always.
/// Handlers run to completion before the next branch is polled.
async fn drive<S, R>(
    engine: &mut AccountingEngine<S>,
    page: &mut TerminalPage,
    input: R,
    period: Duration,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: KvStore,
    R: AsyncBufRead + Unpin,
{
    report(&engine.start(page, now())?);

    let mut lines = input.lines();
    let mut ticker: Option<Interval> = None;

    while engine.state() != EngineState::Blocked {
        sync_ticker(&mut ticker, engine.is_measuring(), period);

        tokio::select! {
            () = next_tick(&mut ticker) => {
                dispatch(engine, page, EngineEvent::Tick);
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Input closed: flush like a hidden page.
                        dispatch(engine, page, EngineEvent::Visibility(Visibility::Hidden));
                        break;
                    }
                    Err(e) => {
                        dispatch(engine, page, EngineEvent::Visibility(Visibility::Hidden));
                        return Err(e.into());
                    }
                };
                match parse_command(&line) {
                    Some(Command::Show) => {
                        page.set_visible(true);
                        dispatch(engine, page, EngineEvent::Visibility(Visibility::Visible));
                    }
                    Some(Command::Hide) => {
                        page.set_visible(false);
                        dispatch(engine, page, EngineEvent::Visibility(Visibility::Hidden));
                    }
                    Some(Command::Limit(value)) => {
                        dispatch(engine, page, EngineEvent::SaveLimit(value));
                    }
                    Some(Command::Status) => {
                        println!();
                        println!("{}", serde_json::to_string_pretty(&engine.snapshot(now()))?);
                    }
                    Some(Command::Quit) => {
                        dispatch(engine, page, EngineEvent::Visibility(Visibility::Hidden));
                        break;
                    }
                    None => eprintln!("{HELP}"),
                }
            }
        }
    }

    println!();
    Ok(())
}

fn sync_ticker(ticker: &mut Option<Interval>, measuring: bool, period: Duration) {
    match (measuring, ticker.is_some()) {
        (true, false) => {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *ticker = Some(interval);
        }
        (false, true) => *ticker = None,
        _ => {}
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Feed one event to the engine. Storage failures are logged and the
/// session keeps running.
fn dispatch<S: KvStore>(
    engine: &mut AccountingEngine<S>,
    page: &mut TerminalPage,
    event: EngineEvent,
) {
    match engine.handle(event, page, now()) {
        Ok(events) => report(&events),
        Err(e) => tracing::warn!(error = %e, "failed to record viewing time"),
    }
}

fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::Ticked { accumulated_ms, .. } => {
                tracing::debug!(accumulated_ms, "tick");
            }
            Event::Blocked { accumulated_ms, limit_ms, .. } => {
                tracing::info!(accumulated_ms, limit_ms, "blocked");
            }
            Event::LimitRejected { input, reason, .. } => {
                tracing::warn!(input = %input, reason = %reason, "limit rejected");
            }
            other => tracing::debug!(event = ?other, "engine event"),
        }
    }
}
