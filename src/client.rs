use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{ready, Context, Poll},
    time::Duration,
};

use futures::future::OptionFuture;
use tokio::{task::JoinHandle, time};
use tracing::{debug, trace};

use crate::{
    attempt::{Branch, HedgeAttempt},
    budget::AdmissionBudget,
    config::HedgeConfig,
    errors::{ConfigError, HedgeError},
    estimator::PercentileEstimator,
    resolver::{Call, Completion, Resolver},
};

/// A successful hedged resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hedged<T> {
    /// The resolved value.
    pub value: T,
    /// The call that produced the value.
    pub branch: Branch,
    /// Time from the request entering the resolver to its resolution.
    pub latency: Duration,
}

impl<T> Hedged<T> {
    /// Discards the race details.
    pub fn into_value(self) -> T {
        self.value
    }
}

#[derive(Debug, Default)]
struct HedgeCounters {
    requests: AtomicU64,
    backups_issued: AtomicU64,
    backups_denied: AtomicU64,
    primary_wins: AtomicU64,
    backup_wins: AtomicU64,
    failures: AtomicU64,
    cancellations: AtomicU64,
    samples: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of hedging activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HedgeStatsSnapshot {
    /// Organic requests received.
    pub requests: u64,
    /// Backup calls issued.
    pub backups_issued: u64,
    /// Hedge timers that fired but were refused by the budget.
    pub backups_denied: u64,
    /// Requests answered successfully by the primary call.
    pub primary_wins: u64,
    /// Requests answered successfully by the backup call.
    pub backup_wins: u64,
    /// Requests that resolved with a failure.
    pub failures: u64,
    /// Requests that resolved as cancelled.
    pub cancellations: u64,
    /// Latency samples fed to the estimator.
    pub samples: u64,
    /// Delay the next request would hedge after; `None` means it would not hedge.
    pub current_delay: Option<Duration>,
    /// Budget tokens, if the budget counts them.
    pub tokens: Option<u32>,
}

struct Inner<R> {
    resolver: R,
    estimator: Mutex<Box<dyn PercentileEstimator>>,
    budget: Mutex<Box<dyn AdmissionBudget>>,
    counters: HedgeCounters,
}

// Ignores poisoning: estimator and budget updates never leave torn state.
fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R> Inner<R> {
    fn sample(&self, latency: Duration) {
        trace!(latency_ms = latency.as_millis() as u64, "recording latency sample");
        lock(&self.estimator).add_sample(latency);
        bump(&self.counters.samples);
    }

    fn current_delay(&self) -> Option<Duration> {
        lock(&self.estimator).current_delay()
    }
}

/// A resolver that hedges slow lookups with a backup request.
///
/// Every request is sent to the underlying [`Resolver`] once. If it has not
/// completed after the delay reported by the estimator, and the budget allows
/// it, the same request is sent a second time; whichever call finishes first
/// settles the request and the other is cancelled.
///
/// The delay follows recent latencies (`mean + k * stdev`), and the budget bounds
/// backups to a fraction of organic traffic. Until the first latency has been
/// observed no request is hedged.
pub struct HedgedResolver<R: Resolver> {
    inner: Arc<Inner<R>>,
}

impl<R: Resolver> Clone for HedgedResolver<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Resolver> HedgedResolver<R> {
    /// Creates a hedged resolver with the default estimator and token budget.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `cfg` fails [`HedgeConfig::validate`].
    pub fn new(resolver: R, cfg: HedgeConfig) -> Result<Self, ConfigError> {
        let (estimator, budget) = cfg.build()?;
        Ok(Self::with_parts(resolver, estimator, budget))
    }

    /// Creates a hedged resolver from an explicit estimator and budget.
    ///
    /// ```
    /// use std::time::Duration;
    /// use hedged_resolver::{resolver_fn, ConstantEstimator, HedgedResolver, UnlimitedBudget};
    ///
    /// let resolver = HedgedResolver::with_parts(
    ///     resolver_fn(|n: u32| async move { Ok::<_, ()>(n) }),
    ///     ConstantEstimator::new(Duration::from_millis(10)),
    ///     UnlimitedBudget,
    /// );
    /// assert_eq!(resolver.stats().current_delay, Some(Duration::from_millis(10)));
    /// ```
    pub fn with_parts<P, B>(resolver: R, estimator: P, budget: B) -> Self
    where
        P: PercentileEstimator,
        B: AdmissionBudget,
    {
        Self {
            inner: Arc::new(Inner {
                resolver,
                estimator: Mutex::new(Box::new(estimator)),
                budget: Mutex::new(Box::new(budget)),
                counters: HedgeCounters::default(),
            }),
        }
    }

    /// The wrapped resolver.
    pub fn underlying(&self) -> &R {
        &self.inner.resolver
    }

    /// Returns a snapshot of hedging activity and the current estimator and budget state.
    pub fn stats(&self) -> HedgeStatsSnapshot {
        let c = &self.inner.counters;
        HedgeStatsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            backups_issued: c.backups_issued.load(Ordering::Relaxed),
            backups_denied: c.backups_denied.load(Ordering::Relaxed),
            primary_wins: c.primary_wins.load(Ordering::Relaxed),
            backup_wins: c.backup_wins.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            cancellations: c.cancellations.load(Ordering::Relaxed),
            samples: c.samples.load(Ordering::Relaxed),
            current_delay: self.inner.current_delay(),
            tokens: lock(&self.inner.budget).tokens(),
        }
    }

    /// Resolves `request`, returning only the value.
    pub async fn resolve(&self, request: R::Request) -> Result<R::Response, HedgeError<R::Error>> {
        self.resolve_detailed(request).await.map(Hedged::into_value)
    }

    /// Resolves `request`, also reporting which call won and how long it took.
    ///
    /// Dropping the returned future cancels every call still in flight.
    pub async fn resolve_detailed(
        &self,
        request: R::Request,
    ) -> Result<Hedged<R::Response>, HedgeError<R::Error>> {
        let inner = &*self.inner;
        bump(&inner.counters.requests);

        // Only organic requests fund the budget, never backups.
        lock(&inner.budget).fund();

        let mut attempt = HedgeAttempt::new(Call::issue(&inner.resolver, request.clone()));
        let mut backup_request = Some(request);

        // No delay means no timer: the primary alone settles the request.
        let delay = inner.current_delay();
        let mut timer_armed = delay.is_some();
        let timer = OptionFuture::from(delay.map(time::sleep));
        tokio::pin!(timer);

        while !attempt.slot.is_resolved() {
            let HedgeAttempt {
                primary,
                backup,
                slot,
                ..
            } = &mut attempt;

            tokio::select! {
                Some(completion) = OptionFuture::from(primary.as_mut()), if primary.is_some() => {
                    let latency = primary.take().map(|call| call.elapsed()).unwrap_or_default();
                    if completion.is_cancelled() {
                        // Only a runtime shutdown cancels a call behind our back. A
                        // backup in flight still gets to settle the request.
                        if backup.is_none() {
                            timer_armed = false;
                            slot.try_complete((Branch::Primary, completion));
                        }
                    } else {
                        inner.sample(latency);
                        if slot.try_complete((Branch::Primary, completion)) {
                            timer_armed = false;
                        }
                    }
                }
                Some(()) = &mut timer, if timer_armed => {
                    timer_armed = false;
                    if slot.is_resolved() || primary.is_none() {
                        trace!("stale hedge timer");
                    } else if lock(&inner.budget).try_consume() {
                        debug!(
                            delay_ms = delay.map(|d| d.as_millis() as u64),
                            "primary is slow, sending backup request"
                        );
                        bump(&inner.counters.backups_issued);
                        if let Some(request) = backup_request.take() {
                            *backup = Some(Call::issue(&inner.resolver, request));
                        }
                    } else {
                        trace!("hedge budget exhausted, waiting on primary");
                        bump(&inner.counters.backups_denied);
                    }
                }
                Some(completion) = OptionFuture::from(backup.as_mut()), if backup.is_some() => {
                    let latency = backup.take().map(|call| call.elapsed()).unwrap_or_default();
                    if completion.is_cancelled() {
                        if primary.is_none() {
                            slot.try_complete((Branch::Backup, completion));
                        }
                    } else if slot.try_complete((Branch::Backup, completion)) {
                        // Only a winning backup says how long the lookup needed.
                        debug!(latency_ms = latency.as_millis() as u64, "backup won the race");
                        if let Some(primary) = primary.take() {
                            primary.cancel();
                        }
                        inner.sample(latency);
                    }
                }
                else => {
                    slot.try_complete((Branch::Primary, Completion::Cancelled));
                }
            }
        }

        let latency = attempt.elapsed();
        let settled = attempt.finish();
        self.settle(settled, latency)
    }

    fn settle(
        &self,
        settled: Option<(Branch, Completion<R::Response, R::Error>)>,
        latency: Duration,
    ) -> Result<Hedged<R::Response>, HedgeError<R::Error>> {
        let c = &self.inner.counters;
        match settled {
            Some((branch, Completion::Succeeded(value))) => {
                bump(match branch {
                    Branch::Primary => &c.primary_wins,
                    Branch::Backup => &c.backup_wins,
                });
                Ok(Hedged {
                    value,
                    branch,
                    latency,
                })
            }
            Some((branch, Completion::Failed(error))) => {
                bump(&c.failures);
                Err(HedgeError::Failed { branch, error })
            }
            Some((_, Completion::Cancelled)) | None => {
                bump(&c.cancellations);
                Err(HedgeError::Cancelled)
            }
        }
    }

    /// Resolves `request` on a spawned task.
    ///
    /// The returned handle resolves like [`resolve_detailed`](Self::resolve_detailed)
    /// and can cancel the whole request, yielding [`HedgeError::Cancelled`].
    /// Dropping the handle also cancels the request.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn(&self, request: R::Request) -> ResolveHandle<R::Response, R::Error> {
        let this = self.clone();
        ResolveHandle {
            handle: tokio::spawn(async move { this.resolve_detailed(request).await }),
        }
    }
}

/// Handle to a request started with [`HedgedResolver::spawn`].
#[derive(Debug)]
pub struct ResolveHandle<T, E> {
    handle: JoinHandle<Result<Hedged<T>, HedgeError<E>>>,
}

impl<T, E> ResolveHandle<T, E> {
    /// Cancels the request and every call it has in flight.
    ///
    /// Has no effect if the request already settled.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl<T, E> Future for ResolveHandle<T, E> {
    type Output = Result<Hedged<T>, HedgeError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Poll::Ready(match ready!(Pin::new(&mut this.handle).poll(cx)) {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => Err(HedgeError::Cancelled),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        })
    }
}

impl<T, E> Drop for ResolveHandle<T, E> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
