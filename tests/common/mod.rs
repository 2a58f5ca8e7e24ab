#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::future::BoxFuture;
use hedged_resolver::{PercentileEstimator, Resolver};

/// How one issued call behaves.
#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub outcome: Result<String, String>,
}

pub fn ok(ms: u64, value: &str) -> Step {
    Step {
        delay: Duration::from_millis(ms),
        outcome: Ok(value.to_string()),
    }
}

pub fn fail(ms: u64, error: &str) -> Step {
    Step {
        delay: Duration::from_millis(ms),
        outcome: Err(error.to_string()),
    }
}

/// Answers calls in issue order from a script, counting issued and cancelled calls.
pub struct ScriptedResolver {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    issued: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self::with_fallback(steps, ok(1, "fallback"))
    }

    pub fn with_fallback(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            fallback,
            issued: AtomicUsize::new(0),
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct CancelGuard {
    counter: Arc<AtomicUsize>,
    done: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.done {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Resolver for ScriptedResolver {
    type Request = &'static str;
    type Response = String;
    type Error = String;

    fn issue(&self, _host: &'static str) -> BoxFuture<'static, Result<String, String>> {
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        self.issued.fetch_add(1, Ordering::SeqCst);

        let mut guard = CancelGuard {
            counter: Arc::clone(&self.cancelled),
            done: false,
        };
        Box::pin(async move {
            // Capture the whole guard, not just `guard.done` (edition 2021 disjoint capture).
            let _ = &guard;
            tokio::time::sleep(step.delay).await;
            guard.done = true;
            step.outcome
        })
    }
}

/// Reports a fixed delay and records every sample it is fed.
#[derive(Clone)]
pub struct RecordingEstimator {
    delay: Option<Duration>,
    samples: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingEstimator {
    pub fn new(delay: Option<Duration>) -> Self {
        Self {
            delay,
            samples: Arc::default(),
        }
    }

    pub fn after_ms(ms: u64) -> Self {
        Self::new(Some(Duration::from_millis(ms)))
    }

    pub fn samples(&self) -> Vec<Duration> {
        self.samples.lock().unwrap().clone()
    }
}

impl PercentileEstimator for RecordingEstimator {
    fn add_sample(&mut self, latency: Duration) {
        self.samples.lock().unwrap().push(latency);
    }

    fn current_delay(&self) -> Option<Duration> {
        self.delay
    }
}

pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Lets aborted tasks get dropped.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
