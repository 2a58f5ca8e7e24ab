//! Hedged vs. direct comparison over a resolver with a long latency tail.
//!
//! Two runners issue the same number of lookups concurrently against an
//! in-process resolver where a small share of lookups are very slow. One
//! runner hedges, the other calls the resolver directly. Percentiles of both
//! are printed side by side.

use std::{
    env,
    sync::Arc,
    time::{Duration, Instant},
};

use hedged_resolver::{resolver_fn, Branch, HedgeConfig, HedgedResolver, Resolver};
use rand::Rng;
use tokio::sync::{mpsc, Semaphore};

const BASE_MS: u64 = 10;
const JITTER_MS: u64 = 5;
const TAIL_MS: u64 = 250;

#[derive(Debug)]
struct CallResult {
    latency: Duration,
    branch: Option<Branch>,
}

#[derive(Debug)]
struct RunnerStats {
    label: &'static str,
    total_calls: usize,
    backup_wins: usize,
    p50: Duration,
    p90: Duration,
    p99: Duration,
    max: Duration,
}

fn percentile(sorted: &[Duration], pct: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn long_tail(tail_percent: u32) -> impl Resolver<Request = u32, Response = u32, Error = String> {
    resolver_fn(move |id: u32| {
        let mut rng = rand::rng();
        let mut ms = BASE_MS + rng.random_range(0..=JITTER_MS);
        if rng.random_range(0..100) < tail_percent {
            ms += TAIL_MS;
        }
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, String>(id)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let num_calls: usize = env::var("CALLS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5_000);
    let tail_percent: u32 = env::var("TAIL_PERCENT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3);
    let max_in_flight: usize = 64;

    println!(
        "{num_calls} lookups per runner, {tail_percent}% of them +{TAIL_MS}ms, {max_in_flight} in flight"
    );

    let hedged = HedgedResolver::new(long_tail(tail_percent), HedgeConfig::aggressive())?;
    let direct = Arc::new(long_tail(tail_percent));

    let hedged_runner = tokio::spawn(run_runner("hedged", num_calls, max_in_flight, {
        let hedged = hedged.clone();
        move |id| {
            let hedged = hedged.clone();
            async move {
                let res = hedged.resolve_detailed(id).await;
                res.ok().map(|h| h.branch)
            }
        }
    }));

    let direct_runner = tokio::spawn(run_runner("direct", num_calls, max_in_flight, move |id| {
        let direct = Arc::clone(&direct);
        async move {
            let _ = direct.issue(id).await;
            None
        }
    }));

    let a = hedged_runner.await??;
    let b = direct_runner.await??;

    println!("\n=== comparison ===");
    for s in [&a, &b] {
        println!(
            "{:<7} calls={} backup_wins={:<4} p50={:>7.1?} p90={:>7.1?} p99={:>7.1?} max={:>7.1?}",
            s.label, s.total_calls, s.backup_wins, s.p50, s.p90, s.p99, s.max
        );
    }

    let stats = hedged.stats();
    println!(
        "\nhedged: backups issued={} denied={} ({:.1}% of requests), delay={:?}",
        stats.backups_issued,
        stats.backups_denied,
        stats.backups_issued as f64 / stats.requests.max(1) as f64 * 100.0,
        stats.current_delay,
    );

    Ok(())
}

async fn run_runner<F, Fut>(
    label: &'static str,
    num_calls: usize,
    max_in_flight: usize,
    call: F,
) -> anyhow::Result<RunnerStats>
where
    F: Fn(u32) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Option<Branch>> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<CallResult>(max_in_flight * 2);
    let semaphore = Arc::new(Semaphore::new(max_in_flight));

    let consumer = tokio::spawn(async move {
        let mut latencies = Vec::with_capacity(num_calls);
        let mut backup_wins = 0usize;
        while let Some(res) = rx.recv().await {
            if res.branch == Some(Branch::Backup) {
                backup_wins += 1;
            }
            latencies.push(res.latency);
        }
        (latencies, backup_wins)
    });

    for i in 0..num_calls {
        let tx = tx.clone();
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let fut = call(i as u32);

        tokio::spawn(async move {
            let _permit = permit;
            let start = Instant::now();
            let branch = fut.await;
            let _ = tx
                .send(CallResult {
                    latency: start.elapsed(),
                    branch,
                })
                .await;
        });
    }
    drop(tx);

    let (mut latencies, backup_wins) = consumer.await?;
    latencies.sort();

    Ok(RunnerStats {
        label,
        total_calls: latencies.len(),
        backup_wins,
        p50: percentile(&latencies, 50.0),
        p90: percentile(&latencies, 90.0),
        p99: percentile(&latencies, 99.0),
        max: latencies.last().copied().unwrap_or_default(),
    })
}
