//! Basic example demonstrating hedged name resolution.
//!
//! Resolves a handful of hosts through the system resolver, hedging each
//! lookup once the estimator has seen enough latencies to pick a delay.
//!
//! Run with `RUST_LOG=hedged_resolver=trace` to watch the hedging decisions.

use std::{env, time::Instant};

use anyhow::Context;
use hedged_resolver::{resolver_fn, HedgeConfig, HedgedResolver};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hedged_resolver=debug")),
        )
        .init();

    let hosts: Vec<String> = {
        let args: Vec<String> = env::args().skip(1).collect();
        if args.is_empty() {
            ["example.com", "rust-lang.org", "crates.io", "docs.rs"]
                .into_iter()
                .map(String::from)
                .collect()
        } else {
            args
        }
    };

    let dns = resolver_fn(|host: String| async move {
        tokio::net::lookup_host((host.as_str(), 0))
            .await
            .map(|addrs| addrs.map(|a| a.ip()).collect::<Vec<_>>())
    });

    let resolver = HedgedResolver::new(dns, HedgeConfig::default()).context("building resolver")?;

    for round in 0..3 {
        for host in &hosts {
            let t0 = Instant::now();
            match resolver.resolve_detailed(host.clone()).await {
                Ok(hedged) => println!(
                    "[round {round}] {host:<16} branch={:<7} latency={:?} addrs={:?}",
                    hedged.branch.as_str(),
                    t0.elapsed(),
                    hedged.value,
                ),
                Err(e) => println!("[round {round}] {host:<16} error={e:#}"),
            }
        }
    }

    let stats = resolver.stats();
    println!(
        "\nrequests={} backups={} denied={} primary_wins={} backup_wins={} delay={:?} tokens={:?}",
        stats.requests,
        stats.backups_issued,
        stats.backups_denied,
        stats.primary_wins,
        stats.backup_wins,
        stats.current_delay,
        stats.tokens,
    );

    Ok(())
}
