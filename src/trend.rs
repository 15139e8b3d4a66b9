//! Trend classification over build history.
//!
//! The newest build fixes which task names matter. Older builds are only
//! consulted to learn the fate of newest-build tasks that have not finished
//! yet. A task is resolved the first time it is seen flaky or with a final
//! status; if that first resolution is a non-flaky failure or skip, the
//! current build is anticipated to fail.

use std::collections::HashMap;
use crate::models::{BuildResult, BuildStatus};

/// Anticipate the outcome of the current build.
///
/// `history` must be ordered newest build first. Never returns
/// [`BuildResult::New`]: a newest build with no tasks classifies as
/// [`BuildResult::WillFail`].
pub fn compute_trend(history: &[BuildStatus]) -> BuildResult {
    // task name -> resolved
    let mut checked_tasks: HashMap<&str, bool> = HashMap::new();

    for (index, build) in history.iter().enumerate() {
        let is_latest_build = index == 0;

        for entry in build.task_entries() {
            let task = &entry.task;
            let name = task.name.as_str();

            if is_latest_build {
                // Tasks removed from CI since older builds are out of scope
                checked_tasks.insert(name, false);
            }

            let Some(resolved) = checked_tasks.get_mut(name) else {
                continue;
            };
            if *resolved || !(task.flaky || task.status.is_final()) {
                continue;
            }

            *resolved = true;
            if !task.flaky && task.status.is_failure() {
                log::debug!(
                    "Task '{}' {} in build {} ({} builds back); anticipating failure",
                    name, task.status.as_str(), build.commit, index
                );
                return BuildResult::WillFail;
            }
        }
    }

    if checked_tasks.is_empty() {
        log::debug!("Newest build has no tasks; anticipating failure");
        return BuildResult::WillFail;
    }

    let unresolved = checked_tasks.values().filter(|resolved| !**resolved).count();
    log::debug!(
        "No failing tasks among {} tracked ({} unresolved); anticipating success",
        checked_tasks.len(), unresolved
    );
    BuildResult::Succeeded
}
