//! Isolated execution of a set of analyzers against one buffer
//!
//! Analyzers are pure and the buffer is read-only, so they run as a rayon
//! parallel map with a join before aggregation. Each invocation is fenced:
//!
//! - images below the analyzer's minimum size get the neutral guarded result
//! - panics are caught and recorded as [`ComputationFault::Panicked`]
//! - analyzers not yet started when the deadline passes are skipped
//!
//! With a private pool (see [`worker_pool`]) the map runs inside that pool.
//! The pool is built once by its owner and shared by every run.
//!
//! A fault never aborts the batch. Faulted analyzers are dropped from the
//! signal list and reported in [`Execution::faults`].

use super::signal::{Category, SignalAnalyzer, SignalResult};
use crate::error::ComputationFault;
use crate::pixels::PixelBuffer;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A fault recorded against one analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalFault {
    pub id: String,
    pub category: Category,
    pub weight: f64,
    pub fault: ComputationFault,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Wall-clock bound for the whole batch.
    pub deadline: Option<Duration>,
    /// Private worker pool; `None` uses the global rayon pool.
    pub pool: Option<Arc<ThreadPool>>,
}

impl ExecutionOptions {
    /// Run on a private pool of at most `jobs` workers.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.pool = worker_pool(jobs);
        self
    }

    /// Size of the private pool, if there is one.
    pub fn workers(&self) -> Option<usize> {
        self.pool.as_ref().map(|pool| pool.current_num_threads())
    }
}

/// Requested workers capped to `[1, available cores]`.
pub fn worker_count(jobs: usize) -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    jobs.clamp(1, cores)
}

/// Build a private signal pool. Falls back to the global pool (`None`) when
/// the threads cannot be spawned.
pub fn worker_pool(jobs: usize) -> Option<Arc<ThreadPool>> {
    let threads = worker_count(jobs);
    match ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("pixelot-signal-{}", i))
        .build()
    {
        Ok(pool) => {
            debug!(threads, "built signal worker pool");
            Some(Arc::new(pool))
        }
        Err(e) => {
            warn!(error = %e, "could not build worker pool, using the global one");
            None
        }
    }
}

/// Everything one batch produced, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub signals: Vec<SignalResult>,
    pub faults: Vec<SignalFault>,
    /// Weight of every analyzer that was scheduled, faulted ones included.
    pub scheduled_weight: f64,
}

impl Execution {
    pub fn measured(&self) -> impl Iterator<Item = &SignalResult> {
        self.signals.iter().filter(|s| s.is_measured())
    }

    pub fn measured_count(&self) -> usize {
        self.measured().count()
    }

    pub fn measured_weight(&self) -> f64 {
        self.measured().map(|s| s.weight).sum()
    }
}

pub fn execute(analyzers: &[Box<dyn SignalAnalyzer>], pixels: &PixelBuffer, options: &ExecutionOptions) -> Execution {
    let started = Instant::now();
    let deadline = options.deadline.map(|d| (started + d, d));

    let run = || -> Vec<Result<SignalResult, ComputationFault>> {
        analyzers
            .par_iter()
            .map(|analyzer| run_one(analyzer.as_ref(), pixels, deadline))
            .collect()
    };

    let outcomes = match &options.pool {
        Some(pool) => pool.install(run),
        None => run(),
    };

    let mut execution = Execution {
        scheduled_weight: analyzers.iter().map(|a| a.weight()).sum(),
        ..Execution::default()
    };
    for (analyzer, outcome) in analyzers.iter().zip(outcomes) {
        match outcome {
            Ok(result) => execution.signals.push(result),
            Err(fault) => {
                warn!(signal = analyzer.id(), %fault, "analyzer faulted");
                execution.faults.push(SignalFault {
                    id: analyzer.id().to_string(),
                    category: analyzer.category(),
                    weight: analyzer.weight(),
                    fault,
                });
            }
        }
    }

    debug!(
        signals = execution.signals.len(),
        faults = execution.faults.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "execution finished"
    );
    execution
}

fn run_one(
    analyzer: &dyn SignalAnalyzer,
    pixels: &PixelBuffer,
    deadline: Option<(Instant, Duration)>,
) -> Result<SignalResult, ComputationFault> {
    if let Some((at, budget)) = deadline {
        if Instant::now() >= at {
            return Err(ComputationFault::DeadlineExceeded {
                deadline_ms: budget.as_millis() as u64,
            });
        }
    }

    if !pixels.fits(analyzer.min_size()) {
        return Ok(SignalResult::insufficient(
            analyzer.id(),
            analyzer.name(),
            analyzer.category(),
            analyzer.weight(),
            analyzer.icon(),
        ));
    }

    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(pixels)))
        .map_err(|payload| ComputationFault::Panicked {
            message: panic_message(payload.as_ref()),
        })
        .and_then(|result| result)
        .and_then(|result| normalize(analyzer, result));

    if let Ok(ref result) = outcome {
        debug!(
            signal = analyzer.id(),
            score = result.score,
            elapsed_us = started.elapsed().as_micros() as u64,
            "signal scored"
        );
    }
    outcome
}

/// Enforce the result contract: registry weight, finite score inside `[0, 100]`.
fn normalize(analyzer: &dyn SignalAnalyzer, mut result: SignalResult) -> Result<SignalResult, ComputationFault> {
    if !result.score.is_finite() {
        return Err(ComputationFault::Invariant {
            detail: format!("score {} is not finite", result.score),
        });
    }
    if result.id != analyzer.id() {
        return Err(ComputationFault::Invariant {
            detail: format!("result id `{}` does not match `{}`", result.id, analyzer.id()),
        });
    }
    result.score = result.score.clamp(0.0, 100.0);
    result.weight = analyzer.weight();
    Ok(result)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::signal::{SignalStatus, ThresholdedSignal, NEUTRAL_SCORE};
    use crate::analyzer::signals::{catalog, test_images::{flat, noise}};
    use std::thread;

    struct Scripted {
        id: &'static str,
        weight: f64,
        behaviour: Behaviour,
    }

    #[derive(Clone, Copy)]
    enum Behaviour {
        Score(f64),
        Panic,
        Fault,
        Sleep(u64),
        WrongId,
    }

    impl Scripted {
        fn boxed(id: &'static str, behaviour: Behaviour) -> Box<dyn SignalAnalyzer> {
            Box::new(Self { id, weight: 1.0, behaviour })
        }
    }

    impl SignalAnalyzer for Scripted {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn category(&self) -> Category {
            Category::Statistical
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn analyze(&self, _: &PixelBuffer) -> Result<SignalResult, ComputationFault> {
            let mut result = SignalResult::insufficient(self.id, self.id, Category::Statistical, 0.25, "x");
            result.status = SignalStatus::Measured;
            match self.behaviour {
                Behaviour::Score(score) => result.score = score,
                Behaviour::Panic => panic!("boom in {}", self.id),
                Behaviour::Fault => {
                    return Err(ComputationFault::Invariant {
                        detail: "empty block list".to_string(),
                    })
                }
                Behaviour::Sleep(ms) => thread::sleep(Duration::from_millis(ms)),
                Behaviour::WrongId => result.id = "someone_else".to_string(),
            }
            Ok(result)
        }
    }

    // ==========================================================================
    // FAULT ISOLATION
    // ==========================================================================
    //
    // One misbehaving analyzer must never take the batch down with it.
    // ==========================================================================

    #[test]
    fn test_panic_is_recorded() {
        let analyzers = vec![
            Scripted::boxed("a", Behaviour::Score(70.0)),
            Scripted::boxed("b", Behaviour::Panic),
            Scripted::boxed("c", Behaviour::Score(30.0)),
        ];
        let execution = execute(&analyzers, &flat(32, 32, 9), &ExecutionOptions::default());

        let ids: Vec<&str> = execution.signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(execution.faults.len(), 1);
        assert_eq!(execution.faults[0].id, "b");
        assert_eq!(
            execution.faults[0].fault,
            ComputationFault::Panicked {
                message: "boom in b".to_string()
            }
        );
        assert_eq!(execution.scheduled_weight, 3.0);
    }

    #[test]
    fn test_returned_fault_is_recorded() {
        let analyzers = vec![Scripted::boxed("a", Behaviour::Fault)];
        let execution = execute(&analyzers, &flat(32, 32, 9), &ExecutionOptions::default());
        assert!(execution.signals.is_empty());
        assert!(matches!(execution.faults[0].fault, ComputationFault::Invariant { .. }));
    }

    #[test]
    fn test_result_contract_enforced() {
        let analyzers = vec![
            Scripted::boxed("high", Behaviour::Score(140.0)),
            Scripted::boxed("nan", Behaviour::Score(f64::NAN)),
            Scripted::boxed("liar", Behaviour::WrongId),
        ];
        let execution = execute(&analyzers, &flat(32, 32, 9), &ExecutionOptions::default());

        assert_eq!(execution.signals.len(), 1);
        assert_eq!(execution.signals[0].score, 100.0);
        // Weight comes from the registry, not from what the analyzer reported
        assert_eq!(execution.signals[0].weight, 1.0);
        let faulted: Vec<&str> = execution.faults.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(faulted, vec!["nan", "liar"]);
    }

    // ==========================================================================
    // GUARD, DEADLINE, POOL
    // ==========================================================================

    #[test]
    fn test_small_image_never_reaches_analyzer() {
        let analyzers = vec![Scripted::boxed("p", Behaviour::Panic)];
        let execution = execute(&analyzers, &flat(8, 8, 0), &ExecutionOptions::default());
        assert!(execution.faults.is_empty());
        assert_eq!(execution.signals[0].score, NEUTRAL_SCORE);
        assert_eq!(execution.signals[0].status, SignalStatus::InsufficientData);
    }

    #[test]
    fn test_deadline_skips_late_analyzers() {
        let analyzers = vec![
            Scripted::boxed("slow", Behaviour::Sleep(60)),
            Scripted::boxed("late", Behaviour::Score(10.0)),
        ];
        let options = ExecutionOptions {
            deadline: Some(Duration::from_millis(20)),
            ..ExecutionOptions::default()
        }
        .with_jobs(1);
        let execution = execute(&analyzers, &flat(32, 32, 9), &options);

        assert_eq!(execution.signals.len(), 1);
        assert_eq!(execution.signals[0].id, "slow");
        assert_eq!(execution.faults.len(), 1);
        assert_eq!(execution.faults[0].fault, ComputationFault::DeadlineExceeded { deadline_ms: 20 });
    }

    #[test]
    fn test_zero_deadline_skips_everything() {
        let analyzers = vec![Scripted::boxed("a", Behaviour::Score(10.0))];
        let options = ExecutionOptions {
            deadline: Some(Duration::ZERO),
            pool: None,
        };
        let execution = execute(&analyzers, &flat(32, 32, 9), &options);
        assert!(execution.signals.is_empty());
        assert_eq!(execution.faults.len(), 1);
    }

    #[test]
    fn test_private_pool_matches_global() {
        let analyzers: Vec<Box<dyn SignalAnalyzer>> = catalog()
            .map(|def| Box::new(ThresholdedSignal::new(def)) as Box<dyn SignalAnalyzer>)
            .collect();
        let img = noise(40, 40, 8);
        let global = execute(&analyzers, &img, &ExecutionOptions::default());
        let private = execute(
            &analyzers,
            &img,
            &ExecutionOptions::default().with_jobs(2),
        );
        assert_eq!(global.signals, private.signals);
    }

    // ==========================================================================
    // WORKER POOL
    // ==========================================================================
    //
    // The private pool is built once, sized to the cores available, and reused
    // by every run that holds the options.
    // ==========================================================================

    struct ThreadNameSignal;

    impl SignalAnalyzer for ThreadNameSignal {
        fn id(&self) -> &str {
            "thread_name"
        }
        fn name(&self) -> &str {
            "Thread name"
        }
        fn category(&self) -> Category {
            Category::Statistical
        }
        fn weight(&self) -> f64 {
            1.0
        }
        fn analyze(&self, _: &PixelBuffer) -> Result<SignalResult, ComputationFault> {
            let mut result = SignalResult::insufficient("thread_name", "Thread name", Category::Statistical, 1.0, "x");
            result.status = SignalStatus::Measured;
            let on_private = thread::current()
                .name()
                .is_some_and(|name| name.starts_with("pixelot-signal-"));
            result.score = if on_private { 100.0 } else { 0.0 };
            Ok(result)
        }
    }

    #[test]
    fn test_worker_count_is_capped() {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(usize::MAX), cores);
    }

    #[test]
    fn test_pool_built_once_and_reused() {
        let options = ExecutionOptions::default().with_jobs(4);
        let pool = options.pool.clone().unwrap();
        assert_eq!(options.workers(), Some(worker_count(4)));

        let analyzers: Vec<Box<dyn SignalAnalyzer>> = vec![Box::new(ThreadNameSignal)];
        let img = flat(32, 32, 10);
        for _ in 0..50 {
            let execution = execute(&analyzers, &img, &options);
            assert_eq!(execution.signals[0].score, 100.0);
        }
        assert!(Arc::ptr_eq(&pool, options.pool.as_ref().unwrap()));

        // Clones share the pool instead of spawning another
        let cloned = options.clone();
        assert!(Arc::ptr_eq(&pool, cloned.pool.as_ref().unwrap()));
    }

    #[test]
    fn test_default_options_use_global_pool() {
        let analyzers: Vec<Box<dyn SignalAnalyzer>> = vec![Box::new(ThreadNameSignal)];
        let execution = execute(&analyzers, &flat(32, 32, 10), &ExecutionOptions::default());
        assert_eq!(execution.signals[0].score, 0.0);
    }

    #[test]
    fn test_empty_batch() {
        let execution = execute(&[], &flat(32, 32, 0), &ExecutionOptions::default().with_jobs(4));
        assert!(execution.signals.is_empty());
        assert_eq!(execution.scheduled_weight, 0.0);
    }
}
