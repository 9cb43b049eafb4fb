//! Decides whether a completed phase sequence should run again.

use super::run::TaskRun;

/// Checks the pending rerun request against the task's rerun cap after
/// `learn`, before `exit`.
pub struct RerunController;

impl RerunController {
    /// Whether the task should loop back to `input`.
    ///
    /// Consumes the pending request either way. Hitting the cap with a
    /// request still pending is not an error; the run proceeds to `exit`
    /// with its last state.
    pub fn should_rerun(run: &mut TaskRun) -> bool {
        if !run.rerun_requested() {
            return false;
        }
        run.clear_rerun_request();
        if run.rerun_count() >= run.max_reruns() {
            tracing::info!(
                task = run.name(),
                reruns = run.rerun_count(),
                max_reruns = run.max_reruns(),
                "rerun requested but cap reached; continuing to exit"
            );
            return false;
        }
        run.increment_rerun();
        tracing::info!(
            task = run.name(),
            rerun = run.rerun_count(),
            max_reruns = run.max_reruns(),
            "rerunning task from input"
        );
        true
    }
}
