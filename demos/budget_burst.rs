//! Shows the token budget capping backups when every request is slow.
//!
//! The resolver always takes longer than the hedge delay, so every request
//! wants a backup. The budget earns `deposit` tokens per request and spends
//! `withdraw` per backup, which keeps backups near `deposit / withdraw` of
//! traffic no matter how bursty the load is.

use std::time::Duration;

use futures::future::join_all;
use hedged_resolver::{resolver_fn, ConstantEstimator, HedgedResolver, TokenBudget};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hedged_resolver=info")),
        )
        .init();

    let slow = resolver_fn(|n: u32| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok::<_, String>(n)
    });

    // One backup per five requests, with room for a burst of four.
    let budget = TokenBudget::with_initial_tokens(1, 5, 20, 20);
    let resolver = HedgedResolver::with_parts(
        slow,
        ConstantEstimator::new(Duration::from_millis(5)),
        budget,
    );

    let mut issued_before = 0;
    for burst in 0..6 {
        let size = 10 * (burst + 1);
        let calls = (0..size).map(|n| resolver.resolve(n));
        let results = join_all(calls).await;
        let failed = results.iter().filter(|r| r.is_err()).count();

        let stats = resolver.stats();
        println!(
            "burst {burst}: {size:>3} requests, {:>2} backups, {:>3} denied, tokens left {:?}, failed {failed}",
            stats.backups_issued - issued_before,
            stats.backups_denied,
            stats.tokens,
        );
        issued_before = stats.backups_issued;

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let stats = resolver.stats();
    println!(
        "\ntotal: {} requests, {} backups ({:.1}%)",
        stats.requests,
        stats.backups_issued,
        stats.backups_issued as f64 / stats.requests as f64 * 100.0,
    );

    Ok(())
}
