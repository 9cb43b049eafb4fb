//! Task orchestration: drives the phase sequence, the rerun loop, and
//! the abort short-circuit over one isolated entry set.
//!
//! A `Task` is created fresh per execution from a name, the shared
//! plugin registry, and an already-validated configuration. The
//! orchestrator is the only component that advances the phase pointer;
//! plugins observe it and may request rerun or abort through the
//! constrained `TaskRun` API.

mod rerun;
mod run;

pub use rerun::RerunController;
pub use run::{TaskRun, TaskWarning};

use crate::config::{AcceptAllValidator, ConfigValidator, TaskConfig};
use crate::dispatch;
use crate::errors::TaskError;
use crate::phase::Phase;
use crate::registry::PluginRegistry;
use crate::resolver::{ResolvedPlan, resolve};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Options supplied by the invoking layer (CLI or API).
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskOptions {
    /// Suppress side-effecting phases (`download`, `output`) while state
    /// transitions and learn handlers still execute.
    pub learn: bool,
    /// Force the rerun cap to zero for this execution.
    pub no_rerun: bool,
}

/// Summary of one finished execution, for reporting layers.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub duration: Duration,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    pub undecided: usize,
    pub reruns: u32,
    pub aborted: Option<String>,
    pub warnings: Vec<TaskWarning>,
}

/// One configured pipeline, executable over the fixed phase sequence.
pub struct Task {
    name: String,
    registry: Arc<PluginRegistry>,
    config: TaskConfig,
    options: TaskOptions,
}

impl Task {
    pub fn new(name: impl Into<String>, registry: Arc<PluginRegistry>, config: TaskConfig) -> Self {
        Self {
            name: name.into(),
            registry,
            config,
            options: TaskOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the task with the default pass-through validator.
    ///
    /// Returns the finished run; callers read its live entry views
    /// (`accepted`, `rejected`, `failed`), warnings, and abort state, or
    /// summarize them with [`Task::report`].
    pub async fn execute(&self) -> Result<TaskRun, TaskError> {
        self.execute_with_validator(&AcceptAllValidator).await
    }

    /// Execute the task, validating plugin configs with `validator`.
    pub async fn execute_with_validator(
        &self,
        validator: &dyn ConfigValidator,
    ) -> Result<TaskRun, TaskError> {
        let plan = resolve(&self.registry, &self.name, &self.config, validator)?;
        let max_reruns = if self.options.no_rerun {
            0
        } else {
            self.config.max_reruns
        };
        let mut run = TaskRun::new(&self.name, max_reruns, self.options.learn);
        tracing::info!(
            task = %self.name,
            run_id = %run.run_id(),
            plugins = ?plan.active_plugins(),
            learn = self.options.learn,
            "executing task"
        );

        self.run_single_phase(&mut run, Phase::Start, &plan).await;

        loop {
            for &phase in Phase::sequence() {
                if run.aborted() {
                    break;
                }
                if self.options.learn && matches!(phase, Phase::Download | Phase::Output) {
                    tracing::debug!(task = %self.name, phase = %phase, "skipped in learn mode");
                    continue;
                }
                self.run_single_phase(&mut run, phase, &plan).await;
            }
            if run.aborted() || !RerunController::should_rerun(&mut run) {
                break;
            }
        }

        if run.aborted() {
            self.run_single_phase(&mut run, Phase::Abort, &plan).await;
        }
        // Exit always runs, even after an abort, so cleanup handlers get
        // their chance; they distinguish the two cases via `aborted()`.
        self.run_single_phase(&mut run, Phase::Exit, &plan).await;

        tracing::info!(
            task = %self.name,
            accepted = run.accepted().count(),
            rejected = run.rejected().count(),
            failed = run.failed().count(),
            reruns = run.rerun_count(),
            aborted = run.aborted(),
            "task finished"
        );
        Ok(run)
    }

    async fn run_single_phase(&self, run: &mut TaskRun, phase: Phase, plan: &ResolvedPlan) {
        run.set_phase(phase);
        dispatch::run_phase(run, phase, plan.bindings(phase)).await;
    }

    /// Summarize a finished run.
    pub fn report(run: &TaskRun, duration: Duration) -> TaskReport {
        TaskReport {
            task: run.name().to_string(),
            run_id: run.run_id(),
            started_at: run.started_at(),
            duration,
            accepted: run.accepted().count(),
            rejected: run.rejected().count(),
            failed: run.failed().count(),
            undecided: run.undecided().count(),
            reruns: run.rerun_count(),
            aborted: run.abort_reason().map(str::to_string),
            warnings: run.warnings().to_vec(),
        }
    }
}

/// Execute independent tasks concurrently, one tokio task each.
///
/// Tasks share only the read-only plugin registry; each gets its own
/// isolated `TaskRun`. Results are returned in input order.
pub async fn run_tasks(tasks: Vec<Task>) -> Vec<Result<(TaskReport, TaskRun), TaskError>> {
    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            tokio::spawn(async move {
                let started = Instant::now();
                let name = task.name().to_string();
                let run = task.execute().await?;
                let report = Task::report(&run, started.elapsed());
                tracing::debug!(task = %name, "task join complete");
                Ok((report, run))
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            Err(_) => Err(TaskError::Panicked {
                task: String::from("unknown"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::registry::{
        DEFAULT_PRIORITY, HandlerContext, HandlerResult, PluginDescriptor, TaskFn,
    };

    fn registry_with_input(urls: &'static [&'static str]) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                PluginDescriptor::builder("fixture_input")
                    .builtin()
                    .on_task(
                        Phase::Input,
                        DEFAULT_PRIORITY,
                        TaskFn(move |run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            for (i, url) in urls.iter().enumerate() {
                                run.add_entry(Entry::new(format!("e{i}"), *url));
                            }
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_execute_runs_input_and_collects_entries() {
        let registry = registry_with_input(&["u1", "u2"]);
        let task = Task::new("t", Arc::new(registry), TaskConfig::default());
        let run = task.execute().await.unwrap();
        assert_eq!(run.entry_count(), 2);
        assert_eq!(run.undecided().count(), 2);
        assert!(!run.aborted());
    }

    #[tokio::test]
    async fn test_abort_skips_later_phases_but_not_exit() {
        let mut registry = registry_with_input(&["u1"]);
        registry
            .register(
                PluginDescriptor::builder("aborter")
                    .builtin()
                    .on_task(
                        Phase::Filter,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            run.abort("reason X");
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();
        registry
            .register(
                PluginDescriptor::builder("outputter")
                    .builtin()
                    .on_task(
                        Phase::Output,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            run.add_warning("outputter", Phase::Output, "output ran");
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();
        registry
            .register(
                PluginDescriptor::builder("cleaner")
                    .builtin()
                    .on_task(
                        Phase::Exit,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            let during_abort = run.aborted();
                            run.add_warning(
                                "cleaner",
                                Phase::Exit,
                                format!("exit ran, aborted={during_abort}"),
                            );
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();

        let task = Task::new("t", Arc::new(registry), TaskConfig::default());
        let run = task.execute().await.unwrap();

        assert_eq!(run.abort_reason(), Some("reason X"));
        let messages: Vec<_> = run.warnings().iter().map(|w| w.message.as_str()).collect();
        assert!(!messages.contains(&"output ran"));
        assert!(messages.contains(&"exit ran, aborted=true"));
    }

    #[tokio::test]
    async fn test_rerun_loops_back_to_input_preserving_entries() {
        let mut registry = registry_with_input(&["u1"]);
        registry
            .register(
                PluginDescriptor::builder("rerunner")
                    .builtin()
                    .on_task(
                        Phase::Learn,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            if run.rerun_count() == 0 {
                                // Multiple requests in one pass stack like one.
                                run.request_rerun();
                                run.request_rerun();
                            }
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();

        let task = Task::new("t", Arc::new(registry), TaskConfig::default());
        let run = task.execute().await.unwrap();
        assert_eq!(run.rerun_count(), 1);
        // Entries persist across the rerun; the second input pass dedups.
        assert_eq!(run.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_no_rerun_option_forces_cap_zero() {
        let mut registry = registry_with_input(&["u1"]);
        registry
            .register(
                PluginDescriptor::builder("rerunner")
                    .builtin()
                    .on_task(
                        Phase::Learn,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            run.request_rerun();
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();

        let task = Task::new("t", Arc::new(registry), TaskConfig::default()).with_options(
            TaskOptions {
                no_rerun: true,
                ..Default::default()
            },
        );
        let run = task.execute().await.unwrap();
        assert_eq!(run.rerun_count(), 0);
    }

    #[tokio::test]
    async fn test_learn_mode_skips_output_phase() {
        let mut registry = registry_with_input(&["u1"]);
        registry
            .register(
                PluginDescriptor::builder("outputter")
                    .builtin()
                    .on_task(
                        Phase::Output,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            run.add_warning("outputter", Phase::Output, "output ran");
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();
        registry
            .register(
                PluginDescriptor::builder("learner")
                    .builtin()
                    .on_task(
                        Phase::Learn,
                        DEFAULT_PRIORITY,
                        TaskFn(|run: &mut TaskRun, _: &HandlerContext| -> HandlerResult {
                            run.add_warning("learner", Phase::Learn, "learn ran");
                            Ok(())
                        }),
                    )
                    .build(),
            )
            .unwrap();

        let task = Task::new("t", Arc::new(registry), TaskConfig::default()).with_options(
            TaskOptions {
                learn: true,
                ..Default::default()
            },
        );
        let run = task.execute().await.unwrap();
        let messages: Vec<_> = run.warnings().iter().map(|w| w.message.as_str()).collect();
        assert!(!messages.contains(&"output ran"));
        assert!(messages.contains(&"learn ran"));
    }

    #[tokio::test]
    async fn test_report_counts() {
        let registry = registry_with_input(&["u1", "u2", "u3"]);
        let task = Task::new("t", Arc::new(registry), TaskConfig::default());
        let run = task.execute().await.unwrap();
        let report = Task::report(&run, Duration::from_millis(1));
        assert_eq!(report.task, "t");
        assert_eq!(report.undecided, 3);
        assert_eq!(report.accepted, 0);
        assert!(report.aborted.is_none());
    }

    #[tokio::test]
    async fn test_run_tasks_concurrent_isolation() {
        let registry = Arc::new(registry_with_input(&["u1"]));
        let tasks = vec![
            Task::new("a", Arc::clone(&registry), TaskConfig::default()),
            Task::new("b", Arc::clone(&registry), TaskConfig::default()),
        ];
        let results = run_tasks(tasks).await;
        assert_eq!(results.len(), 2);
        let (report_a, run_a) = results[0].as_ref().unwrap();
        let (report_b, run_b) = results[1].as_ref().unwrap();
        assert_eq!(report_a.task, "a");
        assert_eq!(report_b.task, "b");
        assert_ne!(run_a.run_id(), run_b.run_id());
        assert_eq!(run_a.entry_count(), 1);
        assert_eq!(run_b.entry_count(), 1);
    }
}
