//! Application state and logic for the TUI dashboard.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::{Duration, Instant},
};

use hedged_resolver::{Branch, HedgeConfig, HedgeStatsSnapshot, HedgedResolver};

use crate::sim::SimulatedResolver;

/// How lookups are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Through the hedged resolver.
    Hedged,
    /// Straight to the simulated resolver, never hedged.
    Direct,
}

/// Which path answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Primary,
    Backup,
    Direct,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Primary, Lane::Backup, Lane::Direct];

    pub fn name(self) -> &'static str {
        match self {
            Lane::Primary => "primary",
            Lane::Backup => "backup",
            Lane::Direct => "direct",
        }
    }
}

impl From<Branch> for Lane {
    fn from(branch: Branch) -> Self {
        match branch {
            Branch::Primary => Lane::Primary,
            Branch::Backup => Lane::Backup,
        }
    }
}

/// Per-lane results seen by the dashboard.
#[derive(Debug, Clone, Default)]
pub struct LaneStats {
    pub wins: u64,
    pub avg_latency_ms: f64,
    pub errors: u64,
}

/// Events emitted by lookups.
#[derive(Debug)]
pub enum AppEvent {
    /// A lookup completed.
    LookupFinished {
        lane: Option<Lane>,
        latency_ms: f64,
        ok: bool,
        message: String,
    },
}

/// Main application state for the TUI.
pub struct App {
    pub hedged: HedgedResolver<Arc<SimulatedResolver>>,
    pub sim: Arc<SimulatedResolver>,
    pub config: HedgeConfig,
    pub host: String,
    pub mode: Mode,
    pub last_message: String,
    pub last_lane: Option<Lane>,
    pub last_latency_ms: Option<f64>,
    pub lane_stats: HashMap<Lane, LaneStats>,
    pub hedge_stats: HedgeStatsSnapshot,
    pub batch_mode: bool,
    pub batch_count: usize,
    pub batch_current: usize,
    pub session_start: Instant,
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_errors: u64,
    pub latency_history: HashMap<Lane, VecDeque<u64>>,
    pub call_timestamps: VecDeque<Instant>,
    /// Most recent lookup latencies, for percentiles.
    pub recent_latencies: VecDeque<f64>,
}

impl App {
    pub fn new(
        hedged: HedgedResolver<Arc<SimulatedResolver>>,
        config: HedgeConfig,
        host: String,
    ) -> Self {
        let sim = Arc::clone(hedged.underlying());
        let hedge_stats = hedged.stats();

        let latency_history = Lane::ALL
            .iter()
            .map(|lane| (*lane, VecDeque::with_capacity(100)))
            .collect();

        Self {
            hedged,
            sim,
            config,
            host,
            mode: Mode::Hedged,
            last_message: String::from("Ready. Press 'r' to run a lookup or 'b' for batch mode"),
            last_lane: None,
            last_latency_ms: None,
            lane_stats: HashMap::new(),
            hedge_stats,
            batch_mode: false,
            batch_count: 100,
            batch_current: 0,
            session_start: Instant::now(),
            total_calls: 0,
            total_successes: 0,
            total_errors: 0,
            latency_history,
            call_timestamps: VecDeque::with_capacity(1000),
            recent_latencies: VecDeque::with_capacity(1000),
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::Hedged => Mode::Direct,
            Mode::Direct => Mode::Hedged,
        };
    }

    pub fn toggle_batch_mode(&mut self) {
        self.batch_mode = !self.batch_mode;
        if self.batch_mode {
            self.batch_current = 0;
            self.last_message = format!("Batch mode ON: {} lookups queued", self.batch_count);
        } else {
            self.last_message = "Batch mode OFF".to_string();
        }
    }

    pub fn increase_batch_count(&mut self) {
        self.batch_count = (self.batch_count + 10).min(1000);
    }

    pub fn decrease_batch_count(&mut self) {
        self.batch_count = (self.batch_count.saturating_sub(10)).max(10);
    }

    pub fn increase_tail(&mut self) {
        self.sim.set_tail_percent(self.sim.tail_percent() + 1);
    }

    pub fn decrease_tail(&mut self) {
        self.sim
            .set_tail_percent(self.sim.tail_percent().saturating_sub(1));
    }

    pub fn refresh_stats(&mut self) {
        self.hedge_stats = self.hedged.stats();
    }

    /// Forgets dashboard-side results. The resolver keeps its estimator and budget.
    pub fn reset_stats(&mut self) {
        self.lane_stats.clear();
        for history in self.latency_history.values_mut() {
            history.clear();
        }
        self.recent_latencies.clear();
        self.total_calls = 0;
        self.total_successes = 0;
        self.total_errors = 0;
        self.last_message = "Stats reset".to_string();
    }

    pub fn update_stats_for_call(&mut self, lane: Option<Lane>, latency_ms: f64, ok: bool) {
        if let Some(lane) = lane {
            let entry = self.lane_stats.entry(lane).or_default();

            if ok {
                let total_latency = entry.avg_latency_ms * (entry.wins as f64);
                entry.wins += 1;
                entry.avg_latency_ms = (total_latency + latency_ms) / (entry.wins as f64);
            } else {
                entry.errors += 1;
            }
        }
    }

    pub fn set_last_result(&mut self, lane: Option<Lane>, latency_ms: f64, ok: bool, message: String) {
        self.last_lane = lane;
        self.last_latency_ms = Some(latency_ms);

        self.update_stats_for_call(lane, latency_ms, ok);

        self.total_calls += 1;
        if ok {
            self.total_successes += 1;
        } else {
            self.total_errors += 1;
        }

        if let Some(lane) = lane {
            let history = self
                .latency_history
                .entry(lane)
                .or_insert_with(|| VecDeque::with_capacity(100));
            history.push_back(latency_ms as u64);
            if history.len() > 100 {
                history.pop_front();
            }
        }

        self.recent_latencies.push_back(latency_ms);
        if self.recent_latencies.len() > 1000 {
            self.recent_latencies.pop_front();
        }

        self.call_timestamps.push_back(Instant::now());
        if self.call_timestamps.len() > 1000 {
            self.call_timestamps.pop_front();
        }

        let status = if ok { "✓" } else { "✗" };
        self.last_message = format!("{} {} ({:.0} ms)", status, message, latency_ms);

        if self.batch_mode {
            self.batch_current += 1;
            if self.batch_current >= self.batch_count {
                self.batch_mode = false;
                self.last_message = format!("Batch complete! {} lookups finished", self.batch_count);
            }
        }

        self.refresh_stats();
    }

    pub fn mode_string(&self) -> String {
        match self.mode {
            Mode::Hedged => "Hedged".to_string(),
            Mode::Direct => "Direct (no hedging)".to_string(),
        }
    }

    pub fn should_run_call(&self) -> bool {
        self.batch_mode && self.batch_current < self.batch_count
    }

    pub fn session_uptime(&self) -> Duration {
        self.session_start.elapsed()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_calls > 0 {
            (self.total_successes as f64 / self.total_calls as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn calls_per_second(&self) -> f64 {
        let now = Instant::now();
        let one_sec_ago = now - Duration::from_secs(1);

        self.call_timestamps
            .iter()
            .filter(|&&ts| ts > one_sec_ago)
            .count() as f64
    }

    pub fn average_latency(&self) -> f64 {
        if self.recent_latencies.is_empty() {
            return 0.0;
        }
        self.recent_latencies.iter().sum::<f64>() / self.recent_latencies.len() as f64
    }

    /// Latency below which `pct` percent of recent lookups completed.
    pub fn latency_percentile(&self, pct: f64) -> f64 {
        if self.recent_latencies.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.recent_latencies.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let rank = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[rank.min(sorted.len() - 1)]
    }

    /// Share of organic requests that triggered a backup, in percent.
    pub fn hedge_rate(&self) -> f64 {
        let s = &self.hedge_stats;
        if s.requests > 0 {
            s.backups_issued as f64 / s.requests as f64 * 100.0
        } else {
            0.0
        }
    }
}
