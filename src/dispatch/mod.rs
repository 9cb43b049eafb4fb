//! Phase dispatcher: invokes the resolved handlers of one phase in
//! priority order against the shared entry set, isolating failures.
//!
//! A plain handler error becomes a task-level warning and the phase
//! continues; a fatal error sets the task abort flag and stops the
//! remaining handlers of the phase. Rejecting, failing, or accepting
//! entries during a phase is the normal path, not an error. Handlers
//! within a phase never run concurrently; they share one mutable entry
//! set and are awaited strictly in order.

use crate::errors::HandlerError;
use crate::phase::Phase;
use crate::registry::{HandlerContext, PhaseHandler};
use crate::resolver::PhaseBinding;
use crate::task::TaskRun;

/// Run every binding of `phase` against the task's working set.
///
/// After `input`, newly added entries are deduplicated by identity key
/// so no duplicate identity survives the phase.
pub async fn run_phase(run: &mut TaskRun, phase: Phase, bindings: &[PhaseBinding]) {
    // The exit and abort phases must still run for an already-aborted
    // task; only an abort raised during this phase stops it.
    let entered_aborted = run.aborted();

    for binding in bindings {
        if run.aborted() && !entered_aborted {
            break;
        }
        let ctx = HandlerContext {
            plugin: binding.plugin_name().to_string(),
            phase,
            config: binding.config.clone(),
        };
        tracing::debug!(
            task = run.name(),
            phase = %phase,
            plugin = %ctx.plugin,
            priority = binding.priority,
            "running handler"
        );
        match &binding.handler {
            PhaseHandler::Task(handler) => {
                if let Err(err) = handler.on_task(run, &ctx).await {
                    record_failure(run, &ctx, err);
                }
            }
            PhaseHandler::Entry(handler) => {
                // Per-entry loop over the live set; failed entries are
                // excluded from further processing. Entries added while
                // looping are picked up by the next handler, not this one.
                let count = run.entry_count();
                for index in 0..count {
                    if run.aborted() && !entered_aborted {
                        break;
                    }
                    if run.entry_mut(index).is_failed() {
                        continue;
                    }
                    if let Err(err) = handler.on_entry(run.entry_mut(index), &ctx).await {
                        record_failure(run, &ctx, err);
                    }
                }
            }
        }
    }

    if phase == Phase::Input {
        let removed = run.dedup_by_identity();
        if removed > 0 {
            tracing::debug!(task = run.name(), removed, "deduplicated input entries");
        }
    }
}

fn record_failure(run: &mut TaskRun, ctx: &HandlerContext, err: HandlerError) {
    match err {
        HandlerError::Warning(err) => {
            tracing::warn!(
                task = run.name(),
                phase = %ctx.phase,
                plugin = %ctx.plugin,
                error = %err,
                "handler failed; continuing"
            );
            run.add_warning(&ctx.plugin, ctx.phase, err.to_string());
        }
        HandlerError::Fatal { reason } => {
            tracing::error!(
                task = run.name(),
                phase = %ctx.phase,
                plugin = %ctx.plugin,
                %reason,
                "handler raised fatal error; aborting task"
            );
            run.abort(reason);
        }
    }
}
