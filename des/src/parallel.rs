//! Parallel execution of independent EventLoop replications
//!
//! Each replication builds its own [`EventLoop`], runs it to the same horizon
//! and returns the stats of all of its agents. Nothing is shared between
//! replications, so the only thing the thread pool changes is wall-clock time.
//!
//! # Example
//!
//! ```rust
//! use des::parallel::{ParallelRunner, simple_progress_reporter};
//! # use des::{Agent, EventLoop};
//! # struct TestAgent { id: usize }
//! # impl Agent<u8, usize> for TestAgent {
//! #     fn stats(&self) -> usize { self.id }
//! # }
//!
//! let results = ParallelRunner::new(20, |replication| {
//!     // derive the replication seed from `replication` here
//!     let agents: Vec<Box<dyn Agent<u8, usize>>> = vec![Box::new(TestAgent { id: replication })];
//!     EventLoop::new(vec![(0.0, 1)], agents)
//! })
//! .progress(simple_progress_reporter(10))
//! .num_threads(2)
//! .run(100.0);
//!
//! assert_eq!(results.len(), 20);
//! assert_eq!(results[7], Ok(vec![7]));
//! ```
//!
//! # Determinism
//!
//! Results are deterministic when the builder derives every seed from the
//! replication index and agents only draw from seeded generators. Results are
//! returned in replication order regardless of thread count.
//!
//! # Error Handling
//!
//! A replication that panics or whose run fails with a [`SimError`] is
//! returned as `Err(String)`; the others are unaffected.
//!
//! [`SimError`]: crate::SimError

use crate::EventLoop;
use rayon::prelude::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Runs independent replications of a model in parallel.
///
/// The builder `F` receives the replication index and returns a fresh
/// EventLoop. It is called from worker threads, hence `Send + Sync`.
pub struct ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    replications: usize,
    builder: F,
    num_threads: Option<usize>,
    progress_callback: Option<Arc<dyn Fn(usize, usize) + Send + Sync>>,
    _marker: PhantomData<fn() -> (T, S)>,
}

impl<T, S, F> ParallelRunner<T, S, F>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    pub fn new(replications: usize, builder: F) -> Self {
        ParallelRunner {
            replications,
            builder,
            num_threads: None,
            progress_callback: None,
            _marker: PhantomData,
        }
    }

    /// Use a dedicated pool of `n` threads instead of rayon's global pool.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Called with `(completed, total)` after each replication finishes.
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Run every replication until `until` and collect the agent stats.
    ///
    /// `results[i]` belongs to replication `i`.
    pub fn run(self, until: f64) -> Vec<Result<Vec<S>, String>> {
        let progress_counter = AtomicUsize::new(0);

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| {
                    warn!(threads = n, error = %e, "falling back to the global rayon pool")
                })
                .ok()
        });

        let execute = || {
            (0..self.replications)
                .into_par_iter()
                .map(|replication| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        let mut event_loop = (self.builder)(replication);
                        event_loop.run(until).map(|_| event_loop.stats())
                    }));

                    let completed = progress_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(completed, self.replications);
                    }

                    match result {
                        Ok(Ok(stats)) => Ok(stats),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(panic) => Err(panic_message(panic)),
                    }
                })
                .collect()
        };

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Shorthand for `ParallelRunner::new(replications, builder).run(until)`.
pub fn run_parallel<T, S, F>(
    replications: usize,
    builder: F,
    until: f64,
) -> Vec<Result<Vec<S>, String>>
where
    F: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    ParallelRunner::new(replications, builder).run(until)
}

/// Progress callback that logs every `interval` completed replications.
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            info!(completed, total, "replications finished");
        }
    }
}
