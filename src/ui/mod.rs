//! Terminal rendering for the dashboard.

mod draw;
mod styles;

pub use draw::draw_ui;
