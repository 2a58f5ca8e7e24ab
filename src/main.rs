//! Interactive TUI dashboard for watching request hedging cut tail latency.
//!
//! Lookups go to a simulated name resolver whose latency has a configurable
//! long tail. Features include:
//! - Hedged and direct modes, switchable at runtime
//! - Live estimator delay and token budget
//! - Batch testing with p50/p99 tracking
//! - Per-lane win counts and latency trends

mod app;
mod env;
mod lookup;
mod sim;
mod ui;

use std::time::Duration;

use app::{App, AppEvent};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use env::build_resolver_from_env;
use lookup::spawn_lookup;
use tokio::sync::mpsc;
use ui::draw_ui;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (hedged, config, host) = build_resolver_from_env()?;
    let mut app = App::new(hedged, config, host);

    let mut terminal = ratatui::init();
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app).await;

    ratatui::restore();

    result
}

async fn run_app(terminal: &mut ratatui::DefaultTerminal, app: &mut App) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    app.refresh_stats();

    loop {
        while let Ok(ev) = rx.try_recv() {
            match ev {
                AppEvent::LookupFinished {
                    lane,
                    latency_ms,
                    ok,
                    message,
                } => {
                    app.set_last_result(lane, latency_ms, ok, message);
                }
            }
        }

        app.refresh_stats();
        terminal.draw(|frame| draw_ui(frame, app))?;

        if app.should_run_call() {
            spawn_lookup(app, tx.clone());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        if crossterm::event::poll(Duration::from_millis(50))? {
            if let Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            {
                match code {
                    KeyCode::Char('q') => break,
                    KeyCode::Tab => app.toggle_mode(),
                    KeyCode::Char('r') => spawn_lookup(app, tx.clone()),
                    KeyCode::Char('b') => app.toggle_batch_mode(),
                    KeyCode::Char('+') | KeyCode::Char('=') => app.increase_tail(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.decrease_tail(),
                    KeyCode::Char('[') | KeyCode::Char(',') => app.decrease_batch_count(),
                    KeyCode::Char(']') | KeyCode::Char('.') => app.increase_batch_count(),
                    KeyCode::Char('s') => app.reset_stats(),
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
