//! UI rendering functions for the TUI dashboard.

use std::time::Duration;

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap},
};

use super::styles::*;
use crate::app::{App, Lane, Mode};

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let size = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(5),
        ])
        .split(size);

    let body_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main_layout[2]);

    draw_header(frame, main_layout[0]);
    draw_session_stats(frame, main_layout[1], app);
    draw_lanes_table(frame, body_layout[0], app);
    draw_detail_panel(frame, body_layout[1], app);
    draw_keybinds(frame, main_layout[3]);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(title_style())
        .borders(Borders::ALL)
        .border_style(border_style())
}

fn bar(filled_ratio: f64, width: usize) -> String {
    let filled = ((filled_ratio.clamp(0.0, 1.0)) * width as f64) as usize;
    format!(
        "[{}{}]",
        "█".repeat(filled),
        "░".repeat(width.saturating_sub(filled))
    )
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Hedged Resolver :: Tail Latency Dashboard ")
        .title_style(header_style())
        .borders(Borders::ALL)
        .border_style(border_style());

    frame.render_widget(block, area);
}

fn draw_session_stats(frame: &mut Frame, area: Rect, app: &App) {
    let success_rate = app.success_rate();
    let p50 = app.latency_percentile(50.0);
    let p99 = app.latency_percentile(99.0);
    let tail_ms = app.sim.tail_ms() as f64;

    let text = vec![
        Line::from(vec![
            Span::raw("Session: ").style(muted_style()),
            Span::raw(format!("Uptime: {} ", format_uptime(app.session_uptime()))).style(text_style()),
            Span::raw("│ ").style(muted_style()),
            Span::raw(format!("Lookups: {} ", app.total_calls)).style(text_style()),
            Span::raw("│ ").style(muted_style()),
            Span::raw(format!("Success: {} ", app.total_successes)).style(success_style()),
            Span::raw("│ ").style(muted_style()),
            Span::raw(format!("Errors: {}", app.total_errors)).style(if app.total_errors > 0 {
                error_style()
            } else {
                text_style()
            }),
        ]),
        Line::from(vec![
            Span::raw("Latency: ").style(muted_style()),
            Span::raw(format!("avg {:.0}ms ", app.average_latency())).style(text_style()),
            Span::raw("│ ").style(muted_style()),
            Span::raw(format!("p50 {:.0}ms ", p50)).style(latency_style(p50, tail_ms / 4.0, tail_ms)),
            Span::raw("│ ").style(muted_style()),
            Span::raw(format!("p99 {:.0}ms ", p99)).style(latency_style(p99, tail_ms / 4.0, tail_ms)),
            Span::raw("│ ").style(muted_style()),
            Span::raw(format!("{:.1} lookups/s ", app.calls_per_second())).style(highlight_style()),
            Span::raw("│ ").style(muted_style()),
            Span::raw(bar(success_rate / 100.0, 15)).style(if success_rate > 95.0 {
                success_style()
            } else if success_rate > 80.0 {
                highlight_style()
            } else {
                error_style()
            }),
            Span::raw(format!(" {:.1}%", success_rate)).style(text_style()),
        ]),
    ];

    frame.render_widget(Paragraph::new(text).block(panel(" Session Analytics ")), area);
}

fn draw_lanes_table(frame: &mut Frame, area: Rect, app: &App) {
    let header = Row::new(
        ["Lane", "Wins", "Avg ms", "Errors", "Latency Trend", "Share"]
            .into_iter()
            .map(|h| Cell::from(h).style(table_header_style())),
    )
    .height(1)
    .bottom_margin(1);

    let total_wins: u64 = app.lane_stats.values().map(|s| s.wins).sum();
    let tail_ms = app.sim.tail_ms() as f64;

    let rows = Lane::ALL.into_iter().map(|lane| {
        let stats = app.lane_stats.get(&lane).cloned().unwrap_or_default();

        let share = if total_wins > 0 {
            stats.wins as f64 / total_wins as f64
        } else {
            0.0
        };

        let trend = app
            .latency_history
            .get(&lane)
            .map(|h| h.iter().copied().collect::<Vec<_>>())
            .unwrap_or_default();

        Row::new(vec![
            Cell::from(lane.name()).style(lane_style(lane)),
            Cell::from(stats.wins.to_string()),
            Cell::from(format!("{:.1}", stats.avg_latency_ms)),
            Cell::from(stats.errors.to_string()).style(if stats.errors > 0 {
                error_style()
            } else {
                Style::default()
            }),
            Cell::from(mini_sparkline(&trend))
                .style(latency_style(stats.avg_latency_ms, tail_ms / 4.0, tail_ms)),
            Cell::from(format!("{} {:.0}%", bar(share, 10), share * 100.0)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(14),
            Constraint::Min(18),
        ],
    )
    .header(header)
    .block(panel(" Winning Lanes "))
    .column_spacing(2);

    frame.render_widget(table, area);
}

fn mini_sparkline(data: &[u64]) -> String {
    if data.is_empty() {
        return "───────────".to_string();
    }

    let chars = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let max_val = data.iter().copied().max().unwrap_or(1);
    let min_val = data.iter().copied().min().unwrap_or(0);
    let range = (max_val - min_val).max(1);

    let skip = data.len().saturating_sub(11);
    data[skip..]
        .iter()
        .map(|&val| {
            let normalized = ((val - min_val) as f64 / range as f64 * 7.0) as usize;
            chars[normalized.min(7)]
        })
        .collect()
}

fn draw_detail_panel(frame: &mut Frame, area: Rect, app: &App) {
    let mut constraints = vec![Constraint::Length(6), Constraint::Min(0)];
    if app.batch_mode {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(8));

    let detail_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    draw_config_section(frame, detail_layout[0], app);
    draw_last_call_section(frame, detail_layout[1], app);

    if app.batch_mode {
        draw_batch_progress(frame, detail_layout[2], app);
        draw_hedge_section(frame, detail_layout[3], app);
    } else {
        draw_hedge_section(frame, detail_layout[2], app);
    }
}

fn draw_config_section(frame: &mut Frame, area: Rect, app: &App) {
    let mode_style = if app.mode == Mode::Hedged {
        highlight_style()
    } else {
        success_style()
    };

    let batch_status = if app.batch_mode {
        format!("ON ({}/{})", app.batch_current, app.batch_count)
    } else {
        format!("OFF (count: {})", app.batch_count)
    };

    let text = vec![
        Line::from(vec![
            Span::raw("Mode    : ").style(muted_style()),
            Span::raw(app.mode_string()).style(mode_style),
        ]),
        Line::from(vec![
            Span::raw("Host    : ").style(muted_style()),
            Span::raw(app.host.as_str()).style(text_style()),
        ]),
        Line::from(vec![
            Span::raw("Tail    : ").style(muted_style()),
            Span::raw(format!(
                "{}% of lookups +{}ms",
                app.sim.tail_percent(),
                app.sim.tail_ms()
            ))
            .style(text_style()),
        ]),
        Line::from(vec![
            Span::raw("Batch   : ").style(muted_style()),
            Span::raw(batch_status).style(if app.batch_mode {
                success_style()
            } else {
                muted_style()
            }),
        ]),
    ];

    let paragraph = Paragraph::new(text)
        .block(panel(" Configuration "))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_last_call_section(frame: &mut Frame, area: Rect, app: &App) {
    let lane_span = match app.last_lane {
        Some(lane) => Span::raw(lane.name()).style(lane_style(lane)),
        None => Span::raw("-").style(muted_style()),
    };

    let tail_ms = app.sim.tail_ms() as f64;
    let latency_span = match app.last_latency_ms {
        Some(ms) => Span::raw(format!("{:.1} ms", ms)).style(latency_style(ms, tail_ms / 4.0, tail_ms)),
        None => Span::raw("-").style(muted_style()),
    };

    let text = vec![
        Line::from(vec![
            Span::raw("Result  : ").style(muted_style()),
            Span::raw(app.last_message.as_str()).style(text_style()),
        ]),
        Line::from(vec![Span::raw("Winner  : ").style(muted_style()), lane_span]),
        Line::from(vec![Span::raw("Latency : ").style(muted_style()), latency_span]),
    ];

    let paragraph = Paragraph::new(text)
        .block(panel(" Last Lookup "))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_batch_progress(frame: &mut Frame, area: Rect, app: &App) {
    let progress = if app.batch_count > 0 {
        (app.batch_current as f64 / app.batch_count as f64 * 100.0).min(100.0) as u16
    } else {
        0
    };

    let gauge = Gauge::default()
        .block(panel(" Batch Progress "))
        .gauge_style(success_style())
        .percent(progress)
        .label(format!("{}/{}", app.batch_current, app.batch_count));

    frame.render_widget(gauge, area);
}

fn draw_hedge_section(frame: &mut Frame, area: Rect, app: &App) {
    let s = &app.hedge_stats;

    let delay = match s.current_delay {
        Some(d) => Span::raw(format!("{}ms", d.as_millis())).style(highlight_style()),
        None => Span::raw("unbounded (warming up)").style(muted_style()),
    };

    let tokens = match s.tokens {
        Some(t) => {
            let ratio = f64::from(t) / f64::from(app.config.max_tokens.max(1));
            Span::raw(format!("{} {}/{}", bar(ratio, 10), t, app.config.max_tokens))
                .style(if t >= app.config.withdraw_amount {
                    success_style()
                } else {
                    error_style()
                })
        }
        None => Span::raw("unmetered").style(muted_style()),
    };

    let text = vec![
        Line::from(vec![Span::raw("Delay    : ").style(muted_style()), delay]),
        Line::from(vec![Span::raw("Budget   : ").style(muted_style()), tokens]),
        Line::from(vec![
            Span::raw("Backups  : ").style(muted_style()),
            Span::raw(format!("{} issued", s.backups_issued)).style(text_style()),
            Span::raw("  │  ").style(muted_style()),
            Span::raw(format!("{} denied", s.backups_denied)).style(if s.backups_denied > 0 {
                highlight_style()
            } else {
                text_style()
            }),
            Span::raw("  │  ").style(muted_style()),
            Span::raw(format!("{:.1}% of requests", app.hedge_rate())).style(text_style()),
        ]),
        Line::from(vec![
            Span::raw("Winners  : ").style(muted_style()),
            Span::raw(format!("primary {}", s.primary_wins)).style(lane_style(Lane::Primary)),
            Span::raw("  │  ").style(muted_style()),
            Span::raw(format!("backup {}", s.backup_wins)).style(lane_style(Lane::Backup)),
        ]),
        Line::from(vec![
            Span::raw("Estimator: ").style(muted_style()),
            Span::raw(format!(
                "k={:.1}, window {}, {} samples",
                app.config.multiplier, app.config.window_capacity, s.samples
            ))
            .style(text_style()),
        ]),
    ];

    let paragraph = Paragraph::new(text)
        .block(panel(" Hedge State "))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_keybinds(frame: &mut Frame, area: Rect) {
    let keybinds = vec![
        Line::from(vec![
            Span::raw("  ").style(muted_style()),
            Span::raw("r").style(highlight_style()),
            Span::raw(" Run lookup  │  ").style(muted_style()),
            Span::raw("b").style(highlight_style()),
            Span::raw(" Toggle batch  │  ").style(muted_style()),
            Span::raw(",/.").style(highlight_style()),
            Span::raw(" Batch count  │  ").style(muted_style()),
            Span::raw("Tab").style(highlight_style()),
            Span::raw(" Hedged/Direct").style(muted_style()),
        ]),
        Line::from(vec![
            Span::raw("  ").style(muted_style()),
            Span::raw("+/-").style(highlight_style()),
            Span::raw(" Tail share  │  ").style(muted_style()),
            Span::raw("s").style(highlight_style()),
            Span::raw(" Reset stats   │  ").style(muted_style()),
            Span::raw("q").style(highlight_style()),
            Span::raw(" Quit").style(muted_style()),
        ]),
    ];

    let paragraph = Paragraph::new(keybinds)
        .block(panel(" Keybinds "))
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}
