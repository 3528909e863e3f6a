/// Bounded parallel runner for independent toolkit batch jobs.
///
/// Tasks share nothing: each one writes its own result file, so the only
/// coordination is the size of the worker pool.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use dashmap::DashMap;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use strum_macros::Display;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Could not start task {task}: {source}")]
    Spawn {
        task: String,
        source: std::io::Error,
    },

    #[error("Task {task} failed with exit code {code:?}")]
    Failed { task: String, code: Option<i32> },

    #[error("Task {task} failed after {attempts} attempts")]
    Exhausted { task: String, attempts: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Task {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }
}

/// What to do when a task exits with a non-zero status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FailurePolicy {
    /// Stop handing out tasks and fail the run.
    Abort,
    /// Re-run the task, up to `attempts` runs in total.
    Retry { attempts: usize },
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub completed: usize,
    /// Runs needed per task, in task order.
    pub attempts: Vec<(String, usize)>,
}

impl RunSummary {
    pub fn retried(&self) -> usize {
        self.attempts.iter().filter(|(_, n)| *n > 1).count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    workers: usize,
    policy: FailurePolicy,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self {
            workers: 4,
            policy: FailurePolicy::Retry { attempts: 3 },
        }
    }
}

impl BatchRunner {
    pub fn new(workers: usize, policy: FailurePolicy) -> Self {
        Self {
            workers: workers.max(1),
            policy,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run(&self, tasks: &[Task]) -> Result<RunSummary, RunnerError> {
        info!(
            "Running {} tasks on {} workers ({})",
            tasks.len(),
            self.workers,
            self.policy
        );

        let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
        // Keyed by position, task names need not be unique.
        let attempts: DashMap<usize, usize> = DashMap::new();

        pool.install(|| {
            tasks
                .par_iter()
                .enumerate()
                .try_for_each(|(index, task)| self.run_task(index, task, &attempts))
        })?;

        let mut attempts: Vec<(usize, usize)> = attempts.into_iter().collect();
        attempts.sort_unstable();
        let attempts = attempts
            .into_iter()
            .map(|(index, runs)| (tasks[index].name.clone(), runs))
            .collect();

        let summary = RunSummary {
            completed: tasks.len(),
            attempts,
        };
        info!(
            "Finished {} tasks, {} needed a retry",
            summary.completed,
            summary.retried()
        );
        Ok(summary)
    }

    fn run_task(
        &self,
        index: usize,
        task: &Task,
        attempts: &DashMap<usize, usize>,
    ) -> Result<(), RunnerError> {
        let budget = match self.policy {
            FailurePolicy::Abort => 1,
            FailurePolicy::Retry { attempts } => attempts.max(1),
        };

        for attempt in 1..=budget {
            attempts.insert(index, attempt);

            let status = Command::new(&task.program)
                .args(&task.args)
                .stdin(Stdio::null())
                .status()
                .map_err(|source| RunnerError::Spawn {
                    task: task.name.clone(),
                    source,
                })?;

            if status.success() {
                return Ok(());
            }

            match self.policy {
                FailurePolicy::Abort => {
                    error!("Task {} failed with {}, aborting", task.name, status);
                    return Err(RunnerError::Failed {
                        task: task.name.clone(),
                        code: status.code(),
                    });
                }
                FailurePolicy::Retry { .. } => {
                    warn!(
                        "Task {} failed with {} (attempt {}/{})",
                        task.name, status, attempt, budget
                    );
                }
            }
        }

        error!("Task {} exhausted its {} attempts", task.name, budget);
        Err(RunnerError::Exhausted {
            task: task.name.clone(),
            attempts: budget,
        })
    }
}
