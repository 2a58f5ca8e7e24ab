mod common;

use std::sync::Arc;

use common::{fail, ms, ok, settle, RecordingEstimator, ScriptedResolver};
use futures::{executor::block_on, FutureExt};
use hedged_resolver::{
    Branch, ClosedBudget, ConstantEstimator, HedgeConfig, HedgeError, HedgedResolver, TokenBudget,
    UnlimitedBudget,
};

#[tokio::test(start_paused = true)]
async fn cold_estimator_never_hedges() {
    let estimator = RecordingEstimator::new(None);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(500, "slow")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let hedged = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(hedged.value, "slow");
    assert_eq!(hedged.branch, Branch::Primary);
    assert_eq!(hedged.latency, ms(500));

    assert_eq!(resolver.underlying().issued(), 1);
    assert_eq!(resolver.stats().backups_issued, 0);
    assert_eq!(resolver.stats().backups_denied, 0);
    // the primary still warms the estimator up
    assert_eq!(estimator.samples(), vec![ms(500)]);
}

#[tokio::test(start_paused = true)]
async fn backup_wins_against_slow_primary() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(50, "primary"), ok(5, "backup")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let hedged = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(hedged.value, "backup");
    assert_eq!(hedged.branch, Branch::Backup);
    assert_eq!(hedged.latency, ms(15));

    settle().await;
    let underlying = resolver.underlying();
    assert_eq!(underlying.issued(), 2);
    assert_eq!(underlying.cancelled(), 1, "primary must be cancelled");

    // one sample, timed from the backup's own issue
    assert_eq!(estimator.samples(), vec![ms(5)]);

    let stats = resolver.stats();
    assert_eq!(stats.backups_issued, 1);
    assert_eq!(stats.backup_wins, 1);
    assert_eq!(stats.primary_wins, 0);
    assert_eq!(stats.samples, 1);
}

#[tokio::test(start_paused = true)]
async fn denied_budget_waits_on_primary() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(50, "primary"), ok(5, "backup")]),
        estimator.clone(),
        ClosedBudget,
    );

    let hedged = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(hedged.value, "primary");
    assert_eq!(hedged.branch, Branch::Primary);
    assert_eq!(hedged.latency, ms(50));

    assert_eq!(resolver.underlying().issued(), 1);
    assert_eq!(estimator.samples(), vec![ms(50)]);

    let stats = resolver.stats();
    assert_eq!(stats.backups_issued, 0);
    assert_eq!(stats.backups_denied, 1);
}

#[tokio::test(start_paused = true)]
async fn fast_primary_disarms_timer() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(3, "primary")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let hedged = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(hedged.value, "primary");
    assert_eq!(hedged.latency, ms(3));

    tokio::time::sleep(ms(50)).await;
    assert_eq!(resolver.underlying().issued(), 1);
    assert_eq!(resolver.stats().backups_issued, 0);
    assert_eq!(estimator.samples(), vec![ms(3)]);
}

#[tokio::test(start_paused = true)]
async fn losing_backup_is_not_sampled() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(12, "primary"), ok(30, "backup")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let hedged = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(hedged.value, "primary");
    assert_eq!(hedged.branch, Branch::Primary);

    settle().await;
    assert_eq!(resolver.underlying().issued(), 2);
    assert_eq!(resolver.underlying().cancelled(), 1, "backup must be cancelled");
    assert_eq!(estimator.samples(), vec![ms(12)]);
}

#[tokio::test(start_paused = true)]
async fn primary_failure_is_sampled_and_propagated() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([fail(4, "nxdomain")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let err = resolver.resolve("example.com").await.unwrap_err();
    assert_eq!(
        err,
        HedgeError::Failed {
            branch: Branch::Primary,
            error: "nxdomain".to_string(),
        }
    );
    assert_eq!(estimator.samples(), vec![ms(4)]);

    let stats = resolver.stats();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.primary_wins, 0);
}

#[tokio::test(start_paused = true)]
async fn failing_backup_can_win() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(50, "primary"), fail(5, "servfail")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let err = resolver.resolve("example.com").await.unwrap_err();
    assert_eq!(err.branch(), Some(Branch::Backup));
    assert_eq!(err.into_failure().as_deref(), Some("servfail"));

    settle().await;
    assert_eq!(resolver.underlying().cancelled(), 1);
    assert_eq!(estimator.samples(), vec![ms(5)]);

    let stats = resolver.stats();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.backup_wins, 0);
}

#[tokio::test(start_paused = true)]
async fn budget_bounds_backups() {
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::with_fallback([], ok(50, "slow")),
        ConstantEstimator::new(ms(10)),
        TokenBudget::with_initial_tokens(1, 20, 100, 40),
    );

    for _ in 0..3 {
        let hedged = resolver.resolve_detailed("example.com").await.unwrap();
        assert_eq!(hedged.branch, Branch::Primary);
    }

    // 41 -> 21 -> 22 -> 2 -> 3 (denied)
    let stats = resolver.stats();
    assert_eq!(stats.requests, 3);
    assert_eq!(stats.backups_issued, 2);
    assert_eq!(stats.backups_denied, 1);
    assert_eq!(stats.tokens, Some(3));
    assert_eq!(resolver.underlying().issued(), 5);
}

#[tokio::test(start_paused = true)]
async fn cancelling_handle_cancels_both_calls() {
    let estimator = RecordingEstimator::after_ms(10);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(100, "primary"), ok(100, "backup")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let handle = resolver.spawn("example.com");
    tokio::time::sleep(ms(20)).await;
    assert_eq!(resolver.underlying().issued(), 2);

    handle.cancel();
    assert_eq!(handle.await, Err(HedgeError::Cancelled));

    settle().await;
    assert_eq!(resolver.underlying().cancelled(), 2);
    assert!(estimator.samples().is_empty());
}

#[tokio::test(start_paused = true)]
async fn spawned_request_resolves_like_inline() {
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(50, "primary"), ok(5, "backup")]),
        ConstantEstimator::new(ms(10)),
        UnlimitedBudget,
    );

    let hedged = resolver.spawn("example.com").await.unwrap();
    assert_eq!(hedged.value, "backup");
    assert_eq!(hedged.latency, ms(15));
}

#[tokio::test(start_paused = true)]
async fn dropping_request_cancels_calls() {
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(100, "primary"), ok(100, "backup")]),
        ConstantEstimator::new(ms(10)),
        UnlimitedBudget,
    );

    let timed_out = tokio::time::timeout(ms(20), resolver.resolve("example.com")).await;
    assert!(timed_out.is_err());

    settle().await;
    assert_eq!(resolver.underlying().issued(), 2);
    assert_eq!(resolver.underlying().cancelled(), 2);
}

#[tokio::test(start_paused = true)]
async fn delay_adapts_to_observed_latency() {
    let cfg = HedgeConfig {
        initial_tokens: 100,
        ..HedgeConfig::default()
    };
    let resolver = HedgedResolver::new(
        ScriptedResolver::new([ok(100, "warm"), ok(1_000, "stuck"), ok(20, "backup")]),
        cfg,
    )
    .unwrap();
    assert_eq!(resolver.stats().current_delay, None);

    let first = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(first.branch, Branch::Primary);
    assert_eq!(resolver.stats().current_delay, Some(ms(100)));

    let second = resolver.resolve_detailed("example.com").await.unwrap();
    assert_eq!(second.value, "backup");
    assert_eq!(second.latency, ms(120));

    // window holds 100 and 20: mean 60, stdev 40
    let stats = resolver.stats();
    assert_eq!(stats.samples, 2);
    assert_eq!(stats.current_delay, Some(ms(180)));
    assert_eq!(stats.tokens, Some(80));
}

#[tokio::test(start_paused = true)]
async fn clones_share_estimator_and_budget() {
    let resolver = HedgedResolver::new(
        Arc::new(ScriptedResolver::with_fallback([], ok(8, "ok"))),
        HedgeConfig::default(),
    )
    .unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("example.com").await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), "ok");
    }

    let stats = resolver.stats();
    assert_eq!(stats.requests, 10);
    assert_eq!(stats.tokens, Some(10));
    assert_eq!(stats.current_delay, Some(ms(8)));
}

#[test]
fn runtime_shutdown_cancels_unhedged_request() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let estimator = RecordingEstimator::new(None);
    let resolver = HedgedResolver::with_parts(
        ScriptedResolver::new([ok(60_000, "never")]),
        estimator.clone(),
        UnlimitedBudget,
    );

    let mut request = Box::pin(resolver.resolve("example.com"));
    {
        let _guard = rt.enter();
        assert!((&mut request).now_or_never().is_none());
    }
    assert_eq!(resolver.underlying().issued(), 1);

    // Dropping the runtime cancels the spawned primary under the request.
    drop(rt);

    assert_eq!(block_on(request), Err(HedgeError::Cancelled));
    assert!(estimator.samples().is_empty());

    let stats = resolver.stats();
    assert_eq!(stats.cancellations, 1);
    assert_eq!(stats.backups_issued, 0);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = HedgeConfig {
        window_capacity: 0,
        ..HedgeConfig::default()
    };
    assert!(HedgedResolver::new(ScriptedResolver::new([]), cfg).is_err());
}
