//! Simulated name resolver with a configurable latency tail.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::atomic::{AtomicU32, AtomicU64, Ordering},
    time::Duration,
};

use futures::future::BoxFuture;
use hedged_resolver::Resolver;
use rand::Rng;

/// Error returned by a simulated lookup.
#[derive(thiserror::Error, Debug, Clone)]
#[error("SERVFAIL for {host}")]
pub struct SimError {
    pub host: String,
}

/// Latency profile of the simulated resolver.
#[derive(Debug, Clone, Copy)]
pub struct SimProfile {
    /// Typical latency.
    pub base: Duration,
    /// Uniform jitter added on top of `base`.
    pub jitter: Duration,
    /// Extra latency of a tail lookup.
    pub tail: Duration,
    /// Share of lookups that hit the tail, in percent.
    pub tail_percent: u32,
    /// Share of lookups that fail, in percent.
    pub failure_percent: u32,
}

impl Default for SimProfile {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(20),
            jitter: Duration::from_millis(10),
            tail: Duration::from_millis(400),
            tail_percent: 5,
            failure_percent: 1,
        }
    }
}

/// A resolver that sleeps for a randomly drawn latency before answering.
///
/// The tail share can be changed while lookups are running.
#[derive(Debug)]
pub struct SimulatedResolver {
    base_ms: u64,
    jitter_ms: u64,
    tail_ms: u64,
    tail_percent: AtomicU32,
    failure_percent: u32,
    issued: AtomicU64,
}

impl SimulatedResolver {
    pub fn new(profile: SimProfile) -> Self {
        Self {
            base_ms: profile.base.as_millis() as u64,
            jitter_ms: profile.jitter.as_millis() as u64,
            tail_ms: profile.tail.as_millis() as u64,
            tail_percent: AtomicU32::new(profile.tail_percent.min(100)),
            failure_percent: profile.failure_percent.min(100),
            issued: AtomicU64::new(0),
        }
    }

    pub fn tail_percent(&self) -> u32 {
        self.tail_percent.load(Ordering::Relaxed)
    }

    pub fn set_tail_percent(&self, percent: u32) {
        self.tail_percent.store(percent.min(100), Ordering::Relaxed);
    }

    pub fn tail_ms(&self) -> u64 {
        self.tail_ms
    }

    /// Lookups issued so far, primaries and backups alike.
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }

    fn draw(&self) -> (Duration, bool) {
        let mut rng = rand::rng();
        let mut ms = self
            .base_ms
            .saturating_add(rng.random_range(0..=self.jitter_ms));
        if rng.random_range(0..100) < self.tail_percent() {
            ms = ms.saturating_add(self.tail_ms);
        }
        let failed = rng.random_range(0..100) < self.failure_percent;
        (Duration::from_millis(ms), failed)
    }
}

impl Resolver for SimulatedResolver {
    type Request = String;
    type Response = Vec<IpAddr>;
    type Error = SimError;

    fn issue(&self, host: String) -> BoxFuture<'static, Result<Vec<IpAddr>, SimError>> {
        self.issued.fetch_add(1, Ordering::Relaxed);
        let (latency, failed) = self.draw();

        Box::pin(async move {
            tokio::time::sleep(latency).await;
            if failed {
                Err(SimError { host })
            } else {
                Ok(vec![IpAddr::V4(Ipv4Addr::new(93, 184, 215, 14))])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn lookups_stay_within_profile() {
        let sim = SimulatedResolver::new(SimProfile {
            base: Duration::from_millis(10),
            jitter: Duration::from_millis(5),
            tail: Duration::from_millis(100),
            tail_percent: 0,
            failure_percent: 0,
        });

        for _ in 0..20 {
            let start = tokio::time::Instant::now();
            let addrs = sim.issue("example.com".into()).await.unwrap();
            let elapsed = start.elapsed();
            assert_eq!(addrs.len(), 1);
            assert!(elapsed >= Duration::from_millis(10));
            assert!(elapsed <= Duration::from_millis(15));
        }
        assert_eq!(sim.issued(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn full_tail_and_failure() {
        let sim = SimulatedResolver::new(SimProfile {
            base: Duration::from_millis(1),
            jitter: Duration::ZERO,
            tail: Duration::from_millis(50),
            tail_percent: 100,
            failure_percent: 100,
        });

        let start = tokio::time::Instant::now();
        let err = sim.issue("example.com".into()).await.unwrap_err();
        assert_eq!(start.elapsed(), Duration::from_millis(51));
        assert_eq!(err.to_string(), "SERVFAIL for example.com");
    }

    #[test]
    fn huge_profile_saturates() {
        let huge = Duration::from_millis(u64::MAX);
        let sim = SimulatedResolver::new(SimProfile {
            base: huge,
            jitter: huge,
            tail: huge,
            tail_percent: 100,
            failure_percent: 0,
        });

        let (latency, failed) = sim.draw();
        assert_eq!(latency, huge);
        assert!(!failed);
    }

    #[test]
    fn tail_percent_is_capped() {
        let sim = SimulatedResolver::new(SimProfile::default());
        sim.set_tail_percent(250);
        assert_eq!(sim.tail_percent(), 100);
    }
}
