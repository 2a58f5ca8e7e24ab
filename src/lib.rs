//! Adaptive request hedging for lookups with long-tail latency.
//!
//! A [`HedgedResolver`] sends each request to an underlying [`Resolver`] and,
//! if no answer arrives within an adaptively estimated delay, sends the same
//! request a second time. The first call to finish settles the request and the
//! other one is cancelled.
//!
//! # Quick Start
//!
//! ```no_run
//! use hedged_resolver::{resolver_fn, HedgeConfig, HedgedResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dns = resolver_fn(|host: String| async move {
//!     tokio::net::lookup_host((host.as_str(), 0))
//!         .await
//!         .map(|addrs| addrs.map(|a| a.ip()).collect::<Vec<_>>())
//! });
//!
//! let resolver = HedgedResolver::new(dns, HedgeConfig::default())?;
//!
//! let hedged = resolver.resolve_detailed("example.com".to_string()).await?;
//! println!("{:?} answered by the {} call", hedged.value, hedged.branch.as_str());
//! # Ok(())
//! # }
//! ```
//!
//! # Hedging Strategy
//!
//! 1. Every organic request funds the hedge budget and issues the primary call
//! 2. The hedge delay is read from the estimator: `mean + k * stdev` of recent
//!    latencies, or no delay at all until the first latency has been observed
//! 3. If the primary is still running when the delay elapses and the budget
//!    grants it, a backup call is issued
//! 4. The first call to finish settles the request; the other is cancelled
//!
//! Primary latencies are always sampled (unless the primary was cancelled);
//! backup latencies are sampled only when the backup wins.
//!
//! # Preset Configurations
//!
//! Use `HedgeConfig::default()`, `::conservative()`, or `::aggressive()`, or
//! build a custom [`HedgeConfig`]. Alternate estimators and budgets plug in
//! through [`HedgedResolver::with_parts`].

pub mod attempt;
pub mod budget;
pub mod client;
pub mod config;
pub mod errors;
pub mod estimator;
pub mod resolver;
pub mod window;

pub use attempt::{Branch, ResultSlot};
pub use budget::{AdmissionBudget, ClosedBudget, TokenBudget, UnlimitedBudget};
pub use client::{HedgeStatsSnapshot, Hedged, HedgedResolver, ResolveHandle};
pub use config::HedgeConfig;
pub use errors::{ConfigError, HedgeError};
pub use estimator::{ConstantEstimator, PercentileEstimator, StdevEstimator};
pub use resolver::{resolver_fn, Call, Completion, FnResolver, Resolver};
pub use window::LatencyWindow;
