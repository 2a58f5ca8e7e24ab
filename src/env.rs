//! Environment configuration for the dashboard.

use std::{env, error::Error, str::FromStr, sync::Arc, time::Duration};

use color_eyre::{eyre::WrapErr, Result};
use hedged_resolver::{HedgeConfig, HedgedResolver};

use crate::sim::{SimProfile, SimulatedResolver};

/// Parses `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .wrap_err_with(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Reads hedging overrides on top of the default configuration.
///
/// Looks for the following environment variables:
/// - `HEDGE_MULTIPLIER`
/// - `HEDGE_WINDOW`
/// - `HEDGE_DEPOSIT`
/// - `HEDGE_WITHDRAW`
/// - `HEDGE_MAX_TOKENS`
pub fn hedge_config_from_env() -> Result<HedgeConfig> {
    let defaults = HedgeConfig::default();
    let cfg = HedgeConfig {
        multiplier: env_or("HEDGE_MULTIPLIER", defaults.multiplier)?,
        window_capacity: env_or("HEDGE_WINDOW", defaults.window_capacity)?,
        deposit_amount: env_or("HEDGE_DEPOSIT", defaults.deposit_amount)?,
        withdraw_amount: env_or("HEDGE_WITHDRAW", defaults.withdraw_amount)?,
        max_tokens: env_or("HEDGE_MAX_TOKENS", defaults.max_tokens)?,
        initial_tokens: defaults.initial_tokens,
    };
    cfg.validate().wrap_err("invalid hedging configuration")?;
    Ok(cfg)
}

/// Reads the simulated latency profile.
///
/// Looks for `SIM_BASE_MS`, `SIM_JITTER_MS`, `SIM_TAIL_MS`, `SIM_TAIL_PERCENT`
/// and `SIM_FAILURE_PERCENT`.
pub fn sim_profile_from_env() -> Result<SimProfile> {
    let defaults = SimProfile::default();
    Ok(SimProfile {
        base: Duration::from_millis(env_or("SIM_BASE_MS", defaults.base.as_millis() as u64)?),
        jitter: Duration::from_millis(env_or(
            "SIM_JITTER_MS",
            defaults.jitter.as_millis() as u64,
        )?),
        tail: Duration::from_millis(env_or("SIM_TAIL_MS", defaults.tail.as_millis() as u64)?),
        tail_percent: env_or("SIM_TAIL_PERCENT", defaults.tail_percent)?,
        failure_percent: env_or("SIM_FAILURE_PERCENT", defaults.failure_percent)?,
    })
}

/// Builds the hedged resolver over a simulated resolver from environment variables.
///
/// The looked-up name comes from `HEDGE_HOST` (default `example.com`).
pub fn build_resolver_from_env() -> Result<(HedgedResolver<Arc<SimulatedResolver>>, HedgeConfig, String)>
{
    let cfg = hedge_config_from_env()?;
    let sim = Arc::new(SimulatedResolver::new(sim_profile_from_env()?));
    let host = env::var("HEDGE_HOST").unwrap_or_else(|_| "example.com".to_string());

    let resolver = HedgedResolver::new(sim, cfg.clone())?;
    Ok((resolver, cfg, host))
}
