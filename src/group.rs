use crate::config::ServiceConfig;
use crate::error::{ProcletError, Result};
use crate::process::types::ProcessStatus;
use crate::process::ProcessHandle;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Usage mode of a [`ProcessGroup`].
///
/// Fixed by the first mode-specific operation; the two modes are
/// structurally incompatible (one command intentionally retried vs. a
/// fixed set run once), so once one is exercised the other's entry points
/// are permanently disabled for this group instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// No mode-specific operation used yet
    Unset,
    /// `repeat` has run: sequential retry of one command template
    Repeating,
    /// `start_all` has run: fixed parallel set, one handle per spec
    Parallel,
}

impl std::fmt::Display for GroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupMode::Unset => write!(f, "unset"),
            GroupMode::Repeating => write!(f, "repeating"),
            GroupMode::Parallel => write!(f, "parallel"),
        }
    }
}

/// Aggregate controller over a set of [`ProcessHandle`] attempts.
///
/// Two mutually exclusive usage modes:
/// - **repeat**: drive one command template through successive attempts
///   (each replacing the previous) until a caller-supplied condition holds
///   or a timeout elapses;
/// - **parallel**: launch one process per configured spec at once and wait
///   on a matching set of conditions.
///
/// The group owns its attempts; callers observe them only through the read
/// accessors (mirrored from the newest attempt) or [`ProcessGroup::attempts`].
pub struct ProcessGroup {
    template: Option<ServiceConfig>,
    specs: Vec<ServiceConfig>,
    attempts: Vec<ProcessHandle>,
    mode: GroupMode,
}

impl ProcessGroup {
    /// Create a group around a single command template, for `repeat` use.
    pub fn new(template: ServiceConfig) -> Self {
        Self {
            template: Some(template),
            specs: Vec::new(),
            attempts: Vec::new(),
            mode: GroupMode::Unset,
        }
    }

    /// Create a group around a fixed list of command specs, for
    /// `start_all` / `wait_all_conditions` use.
    pub fn with_specs(specs: Vec<ServiceConfig>) -> Self {
        Self {
            template: None,
            specs,
            attempts: Vec::new(),
            mode: GroupMode::Unset,
        }
    }

    /// Run the command template through successive attempts until
    /// `condition` holds or `timeout` accumulates.
    ///
    /// Each cycle stops a still-running previous attempt (at most one live
    /// process at a time), starts a fresh handle from the template, sleeps
    /// one `poll_interval` and re-checks. However the loop exits —
    /// condition met, timeout, or a panic unwinding out of the condition —
    /// a final cleanup pass stops every non-finished attempt. Returns the
    /// condition's final value, evaluated after cleanup.
    ///
    /// Fails fast with [`ProcletError::WrongMode`] if this group has
    /// already been used in parallel mode, before anything is spawned.
    pub async fn repeat<F>(
        &mut self,
        mut condition: F,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<bool>
    where
        F: FnMut() -> bool,
    {
        if self.mode == GroupMode::Parallel {
            return Err(ProcletError::WrongMode(
                "repeat".to_string(),
                self.mode.to_string(),
            ));
        }

        let template = self.template.clone().ok_or_else(|| {
            ProcletError::ConfigError(
                "repeat requires a command template (use ProcessGroup::new)".to_string(),
            )
        })?;
        template.validate()?;

        self.mode = GroupMode::Repeating;
        tracing::info!(
            "Repeating '{}' (timeout: {:?}, poll: {:?})",
            template.command,
            timeout,
            poll_interval
        );

        let mut waited = Duration::ZERO;

        loop {
            // At most one live attempt: replace the previous one.
            if let Some(last) = self.attempts.last() {
                if last.get_status().is_started() {
                    last.stop();
                }
            }

            let attempt = ProcessHandle::new(template.clone());
            self.attempts.push(attempt.clone());
            if let Err(err) = attempt.start().await {
                self.stop_all();
                return Err(err);
            }

            tokio::time::sleep(poll_interval).await;
            waited += poll_interval;

            // The condition may panic; cleanup must still run before the
            // panic continues to the caller (the equivalent of a finally
            // block around the retry loop).
            let met = match catch_unwind(AssertUnwindSafe(|| condition())) {
                Ok(met) => met,
                Err(payload) => {
                    self.stop_all();
                    resume_unwind(payload);
                }
            };

            if met || waited >= timeout {
                break;
            }
        }

        self.stop_all();

        match catch_unwind(AssertUnwindSafe(|| condition())) {
            Ok(met) => Ok(met),
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Launch the whole configured spec list at once: one fresh handle per
    /// spec, started immediately, no waiting and no retries.
    ///
    /// Valid only for a group built with [`ProcessGroup::with_specs`]; the
    /// first successful call fixes the mode to parallel and permanently
    /// disables `repeat` on this instance.
    pub async fn start_all(&mut self) -> Result<()> {
        if self.mode == GroupMode::Repeating {
            return Err(ProcletError::WrongMode(
                "start_all".to_string(),
                self.mode.to_string(),
            ));
        }

        if self.specs.is_empty() {
            return Err(ProcletError::ConfigError(
                "start_all requires a fixed list of command specs (use ProcessGroup::with_specs)"
                    .to_string(),
            ));
        }

        if !self.attempts.is_empty() {
            // The parallel set is fixed at launch; it never grows.
            return Err(ProcletError::InvalidProcessState(
                "process group".to_string(),
                "start_all has already launched this group".to_string(),
            ));
        }

        for spec in &self.specs {
            spec.validate()?;
        }

        self.mode = GroupMode::Parallel;
        tracing::info!("Starting {} processes in parallel", self.specs.len());

        for spec in &self.specs {
            let handle = ProcessHandle::new(spec.clone());
            self.attempts.push(handle.clone());
            handle.start().await?;
        }

        Ok(())
    }

    /// Wait until every slot's condition is satisfied or that slot's own
    /// timeout elapses: one independent polling loop per attempt (that
    /// handle's `wait_condition` with its configured timing), joined when
    /// all are done. Returns per-slot results, index-aligned with the
    /// attempts. No ordering between slots is enforced.
    ///
    /// `predicates` must contain exactly one entry per attempt; requires
    /// parallel mode.
    pub async fn wait_all_conditions<F>(&self, predicates: Vec<F>) -> Result<Vec<bool>>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        if self.mode != GroupMode::Parallel {
            return Err(ProcletError::WrongMode(
                "wait_all_conditions".to_string(),
                self.mode.to_string(),
            ));
        }

        if predicates.len() != self.attempts.len() {
            return Err(ProcletError::ConfigError(format!(
                "expected {} predicates (one per slot), got {}",
                self.attempts.len(),
                predicates.len()
            )));
        }

        let mut join_set = JoinSet::new();
        for (index, (handle, mut predicate)) in self
            .attempts
            .iter()
            .cloned()
            .zip(predicates.into_iter())
            .enumerate()
        {
            join_set.spawn(async move {
                let timeout = handle.config().timeout();
                let poll_interval = handle.config().poll_interval();
                let met = handle
                    .wait_condition(move || predicate(), timeout, poll_interval)
                    .await;
                (index, met)
            });
        }

        let mut results = vec![false; self.attempts.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, met)) => results[index] = met,
                Err(err) if err.is_panic() => {
                    // A panicking condition propagates to the caller unmodified.
                    resume_unwind(err.into_panic());
                }
                Err(err) => {
                    return Err(ProcletError::Internal(format!(
                        "condition task failed: {}",
                        err
                    )));
                }
            }
        }

        Ok(results)
    }

    /// Poll `condition` against this group the way a handle polls itself:
    /// loop while the condition is false, `timeout` has not accumulated,
    /// and the newest attempt is still `Started`. Returns the condition
    /// evaluated one final time after the loop exits.
    pub async fn wait_condition<F>(
        &self,
        mut condition: F,
        timeout: Duration,
        poll_interval: Duration,
    ) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut waited = Duration::ZERO;

        while !condition() && waited < timeout && self.get_status().is_started() {
            tokio::time::sleep(poll_interval).await;
            waited += poll_interval;
        }

        condition()
    }

    /// Stop every attempt that has not already finished on its own.
    ///
    /// Safe against already-gone processes; stop failures are recorded on
    /// the individual handles, never raised here.
    pub fn stop_all(&self) {
        let mut stopped = 0usize;
        for attempt in &self.attempts {
            if attempt.get_status() != ProcessStatus::Finished {
                attempt.stop();
                stopped += 1;
            }
        }
        if stopped > 0 {
            tracing::debug!("Stopped {} of {} attempts", stopped, self.attempts.len());
        }
    }

    /// Total wall-clock span covering every historical attempt:
    /// `max(end) - min(start)` across the whole list. In repeat mode this
    /// deliberately includes time spent in earlier failed attempts. An
    /// attempt still running contributes the current instant as its end,
    /// so the reading grows monotonically until the group settles.
    pub fn get_duration(&self) -> Duration {
        let now = Instant::now();
        let mut min_start: Option<Instant> = None;
        let mut max_end: Option<Instant> = None;

        for attempt in &self.attempts {
            if let Some(start) = attempt.start_instant() {
                min_start = Some(min_start.map_or(start, |m| m.min(start)));
                let end = attempt.end_instant().unwrap_or(now);
                max_end = Some(max_end.map_or(end, |m| m.max(end)));
            }
        }

        match (min_start, max_end) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => Duration::ZERO,
        }
    }

    // Mirrored accessors: the newest attempt's view, with empty defaults
    // before anything has been started.

    /// Status of the newest attempt
    pub fn get_status(&self) -> ProcessStatus {
        self.attempts
            .last()
            .map(|a| a.get_status())
            .unwrap_or(ProcessStatus::NotStarted)
    }

    /// Standard output of the newest attempt
    pub fn get_stdout(&self) -> String {
        self.attempts
            .last()
            .map(|a| a.get_stdout())
            .unwrap_or_default()
    }

    /// Standard error of the newest attempt
    pub fn get_stderr(&self) -> String {
        self.attempts
            .last()
            .map(|a| a.get_stderr())
            .unwrap_or_default()
    }

    /// Most recent error of the newest attempt
    pub fn get_error(&self) -> Option<ProcletError> {
        self.attempts.last().and_then(|a| a.get_error())
    }

    /// PID of the newest attempt
    pub fn get_pid(&self) -> Option<u32> {
        self.attempts.last().and_then(|a| a.get_pid())
    }

    /// Exit code of the newest attempt (-1 until it terminates)
    pub fn get_exit_code(&self) -> i32 {
        self.attempts.last().map(|a| a.get_exit_code()).unwrap_or(-1)
    }

    /// All attempts, oldest first: the retry history in repeat mode, the
    /// fixed slot list in parallel mode
    pub fn attempts(&self) -> &[ProcessHandle] {
        &self.attempts
    }

    /// The group's current usage mode
    pub fn mode(&self) -> GroupMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sleep_spec(secs: &str) -> ServiceConfig {
        ServiceConfig::new("/bin/sleep").args([secs])
    }

    #[tokio::test]
    async fn test_repeat_requires_template() {
        let mut group = ProcessGroup::with_specs(vec![sleep_spec("1")]);
        let result = group
            .repeat(|| true, Duration::from_millis(500), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(ProcletError::ConfigError(_))));
        assert!(group.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_start_all_requires_specs() {
        let mut group = ProcessGroup::new(sleep_spec("1"));
        let result = group.start_all().await;
        assert!(matches!(result, Err(ProcletError::ConfigError(_))));
        assert_eq!(group.mode(), GroupMode::Unset);
    }

    #[tokio::test]
    async fn test_repeat_locked_out_after_start_all() {
        let mut group = ProcessGroup::with_specs(vec![sleep_spec("30")]);
        group.start_all().await.unwrap();
        assert_eq!(group.mode(), GroupMode::Parallel);

        let before = group.attempts().len();
        let result = group
            .repeat(|| true, Duration::from_millis(500), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(ProcletError::WrongMode(_, _))));
        // Nothing spawned by the rejected call.
        assert_eq!(group.attempts().len(), before);

        group.stop_all();
    }

    #[tokio::test]
    async fn test_start_all_locked_out_after_repeat() {
        let mut group = ProcessGroup::new(sleep_spec("30"));
        let met = group
            .repeat(|| true, Duration::from_millis(500), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(met);
        assert_eq!(group.mode(), GroupMode::Repeating);

        let result = group.start_all().await;
        assert!(matches!(result, Err(ProcletError::WrongMode(_, _))));
    }

    #[tokio::test]
    async fn test_start_all_is_single_shot() {
        let mut group = ProcessGroup::with_specs(vec![sleep_spec("30")]);
        group.start_all().await.unwrap();

        let again = group.start_all().await;
        assert!(matches!(
            again,
            Err(ProcletError::InvalidProcessState(_, _))
        ));
        assert_eq!(group.attempts().len(), 1);

        group.stop_all();
    }

    #[tokio::test]
    async fn test_wait_all_conditions_requires_parallel_mode() {
        let group = ProcessGroup::with_specs(vec![sleep_spec("1")]);
        let result = group
            .wait_all_conditions(vec![|| true])
            .await;
        assert!(matches!(result, Err(ProcletError::WrongMode(_, _))));
    }

    #[tokio::test]
    async fn test_wait_all_conditions_predicate_count_mismatch() {
        let mut group = ProcessGroup::with_specs(vec![sleep_spec("30"), sleep_spec("30")]);
        group.start_all().await.unwrap();

        let result = group.wait_all_conditions(vec![|| true]).await;
        assert!(matches!(result, Err(ProcletError::ConfigError(_))));

        group.stop_all();
    }

    #[tokio::test]
    async fn test_mirrors_before_first_attempt() {
        let group = ProcessGroup::new(sleep_spec("1"));
        assert_eq!(group.get_status(), ProcessStatus::NotStarted);
        assert!(group.get_stdout().is_empty());
        assert!(group.get_stderr().is_empty());
        assert!(group.get_error().is_none());
        assert!(group.get_pid().is_none());
        assert_eq!(group.get_exit_code(), -1);
        assert_eq!(group.get_duration(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_repeat_single_live_attempt() {
        let mut group = ProcessGroup::new(sleep_spec("30"));

        let met = group
            .repeat(
                || false,
                Duration::from_millis(600),
                Duration::from_millis(200),
            )
            .await
            .unwrap();
        assert!(!met);
        assert!(group.attempts().len() >= 2);

        // After cleanup no attempt is still running, and at no point were
        // two attempts live at once: all non-final attempts were stopped
        // before their successor started.
        for attempt in group.attempts() {
            assert_eq!(attempt.get_status(), ProcessStatus::Stopped);
        }
    }
}
