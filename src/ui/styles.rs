//! Color scheme and styling for the dashboard.

use ratatui::prelude::*;

use crate::app::Lane;

const BACKGROUND: Color = Color::Rgb(24, 24, 37);
const ACCENT: Color = Color::Rgb(180, 190, 254);
const COLUMN: Color = Color::Rgb(116, 199, 236);

const LANE_PRIMARY: Color = Color::Rgb(137, 180, 250);
const LANE_BACKUP: Color = Color::Rgb(245, 194, 231);
const LANE_DIRECT: Color = Color::Rgb(148, 226, 213);

const GOOD: Color = Color::Rgb(166, 227, 161);
const BAD: Color = Color::Rgb(243, 139, 168);
const WARN: Color = Color::Rgb(250, 179, 135);

const FRAME: Color = Color::Rgb(88, 91, 112);
const FOREGROUND: Color = Color::Rgb(205, 214, 244);
const DIM: Color = Color::Rgb(127, 132, 156);

fn bold(color: Color) -> Style {
    Style::new().fg(color).add_modifier(Modifier::BOLD)
}

pub fn header_style() -> Style {
    bold(ACCENT).bg(BACKGROUND)
}

pub fn table_header_style() -> Style {
    bold(COLUMN).add_modifier(Modifier::UNDERLINED)
}

pub fn title_style() -> Style {
    bold(FOREGROUND)
}

pub fn text_style() -> Style {
    Style::new().fg(FOREGROUND)
}

pub fn lane_style(lane: Lane) -> Style {
    bold(match lane {
        Lane::Primary => LANE_PRIMARY,
        Lane::Backup => LANE_BACKUP,
        Lane::Direct => LANE_DIRECT,
    })
}

/// Green under `fast_ms`, amber under `slow_ms`, red above.
pub fn latency_style(ms: f64, fast_ms: f64, slow_ms: f64) -> Style {
    if ms < fast_ms {
        success_style()
    } else if ms < slow_ms {
        highlight_style()
    } else {
        error_style()
    }
}

pub fn border_style() -> Style {
    Style::new().fg(FRAME)
}

pub fn success_style() -> Style {
    bold(GOOD)
}

pub fn error_style() -> Style {
    bold(BAD)
}

pub fn highlight_style() -> Style {
    bold(WARN)
}

pub fn muted_style() -> Style {
    Style::new().fg(DIM)
}
