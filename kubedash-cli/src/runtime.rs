//! Dashboard event loop
//!
//! One loop owns the [`DashboardState`]. Terminal input, fetch completions and
//! the refresh timer are merged with `tokio::select!` and handed to `reduce`
//! one at a time. Effects run as independent tasks that each post a single
//! completion back through an unbounded channel.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossterm::{
    event::{Event as CEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use kubedash_core::client::ClusterClient;
use kubedash_core::dashboard::{DashboardState, Effect, Event, Key, Outcome, init, reduce};
use kubedash_core::fetch::{FetchLimits, fetch_doctor, fetch_events, fetch_logs, list_resources};
use kubedash_core::resource::ResourceKind;

use crate::ui::{self, Theme};

pub struct RuntimeOptions {
    pub kind: ResourceKind,
    pub limits: FetchLimits,
    pub refresh: Option<Duration>,
    pub theme: Theme,
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the dashboard until the user commits a selection or quits.
pub async fn run_dashboard(
    client: Arc<dyn ClusterClient>,
    options: RuntimeOptions,
) -> io::Result<Outcome> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, client, options).await;
    restore_terminal(terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: Arc<dyn ClusterClient>,
    options: RuntimeOptions,
) -> io::Result<Outcome> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let (mut state, effects) = init(options.kind, options.refresh.is_some());
    info!(kind = %options.kind, backend = client.name(), "dashboard started");

    let dispatch = |state: &mut DashboardState, event: Event| {
        for effect in reduce(state, event) {
            spawn_effect(client.clone(), options.limits, effect, tx.clone());
        }
    };

    for effect in effects {
        spawn_effect(client.clone(), options.limits, effect, tx.clone());
    }
    let size = terminal.size()?;
    dispatch(
        &mut state,
        Event::Resize {
            width: size.width,
            height: size.height,
        },
    );

    let mut input = EventStream::new();
    let mut ticker = options.refresh.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        terminal.draw(|f| ui::draw(f, &state, &options.theme, Utc::now()))?;

        if let Some(outcome) = state.outcome.clone() {
            info!(?outcome, "dashboard finished");
            return Ok(outcome);
        }

        let event = tokio::select! {
            maybe = input.next() => match maybe {
                Some(Ok(raw)) => match translate(raw) {
                    Some(event) => event,
                    None => continue,
                },
                Some(Err(e)) => return Err(e),
                None => return Ok(Outcome::Dismissed),
            },
            Some(done) = rx.recv() => done,
            _ = next_tick(&mut ticker) => Event::Tick,
        };

        dispatch(&mut state, event);
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

fn spawn_effect(
    client: Arc<dyn ClusterClient>,
    limits: FetchLimits,
    effect: Effect,
    tx: mpsc::UnboundedSender<Event>,
) {
    debug!(ticket = effect.ticket().value(), ?effect, "spawning effect");
    tokio::spawn(async move {
        let event = execute_effect(client.as_ref(), limits, effect).await;
        // The receiver is gone once the dashboard has exited.
        let _ = tx.send(event);
    });
}

/// Perform one effect and describe its completion.
pub async fn execute_effect(client: &dyn ClusterClient, limits: FetchLimits, effect: Effect) -> Event {
    match effect {
        Effect::FetchResources { ticket, kind } => Event::ResourcesFetched {
            ticket,
            result: list_resources(client, kind).await,
        },
        Effect::FetchLogs { ticket, item } => Event::LogsFetched {
            ticket,
            resource: item.name().to_string(),
            result: fetch_logs(client, &item, limits).await,
        },
        Effect::FetchEvents { ticket, item } => Event::EventsFetched {
            ticket,
            resource: item.name().to_string(),
            result: fetch_events(client, &item).await,
        },
        Effect::FetchDoctor { ticket, item } => Event::DoctorFetched {
            ticket,
            result: fetch_doctor(client, &item).await,
        },
    }
}

/// Map terminal input to dashboard events. Unbound keys map to nothing.
pub fn translate(raw: CEvent) -> Option<Event> {
    match raw {
        CEvent::Resize(width, height) => Some(Event::Resize { width, height }),
        CEvent::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) => {
            if kind != KeyEventKind::Press {
                return None;
            }
            let key = match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Key::Interrupt,
                KeyCode::Char(c) => Key::Char(c),
                KeyCode::Tab => Key::Tab,
                KeyCode::BackTab => Key::BackTab,
                KeyCode::Left => Key::Left,
                KeyCode::Right => Key::Right,
                KeyCode::Up => Key::Up,
                KeyCode::Down => Key::Down,
                KeyCode::PageUp => Key::PageUp,
                KeyCode::PageDown => Key::PageDown,
                KeyCode::Home => Key::Home,
                KeyCode::End => Key::End,
                KeyCode::Enter => Key::Enter,
                _ => return None,
            };
            Some(Event::Key(key))
        }
        _ => None,
    }
}
