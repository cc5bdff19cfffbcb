//! Analysis job state machine.
//!
//! `idle → starting → running → {succeeded | failed | timed_out}`. A terminal phase stays put
//! until the next explicit start. No I/O happens here; the controller feeds replies in and acts
//! on the returned [`PollDecision`].

use crate::error::JobError;
use crate::model::{JobPhase, JobStatus, PollPolicy};
use serde::Serialize;
use time::OffsetDateTime;

/// What the controller should do after a status reply has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Still running; poll again after the interval.
    Continue,
    /// Finished cleanly; reload results exactly once.
    Reload,
    /// Terminal without success; nothing further to do.
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisJob {
    pub phase: JobPhase,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// Backend's own completion timestamp, kept verbatim.
    pub last_completed_at: Option<String>,
    pub error_message: Option<String>,
    /// Status requests issued for the current job.
    pub polls: u32,
    pub posts_count: Option<u64>,
    pub sentiment_count: Option<u64>,
}

impl AnalysisJob {
    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Enter `starting`. Refused while a job is already starting or running; in that case
    /// nothing about the current job changes.
    pub fn begin(&mut self) -> Result<(), JobError> {
        if self.is_busy() {
            return Err(JobError::AlreadyRunning);
        }
        self.phase = JobPhase::Starting;
        self.error_message = None;
        self.polls = 0;
        Ok(())
    }

    pub fn start_accepted(&mut self, now: OffsetDateTime) {
        if self.phase != JobPhase::Starting {
            return;
        }
        self.phase = JobPhase::Running;
        self.started_at = Some(now);
        self.polls = 0;
    }

    pub fn start_rejected(&mut self, err: &JobError) {
        if self.phase != JobPhase::Starting {
            return;
        }
        self.fail(err);
    }

    /// Count a status request about to be issued.
    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    /// Apply one status reply.
    pub fn apply_status(&mut self, status: &JobStatus, policy: &PollPolicy) -> PollDecision {
        if self.phase != JobPhase::Running {
            return PollDecision::Stop;
        }
        if status.posts_count.is_some() {
            self.posts_count = status.posts_count;
        }
        if status.sentiment_count.is_some() {
            self.sentiment_count = status.sentiment_count;
        }

        if !status.is_running {
            // A blank error string carries no failure; treat it as a clean finish.
            let error = status
                .error
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty());
            return match error {
                Some(msg) => {
                    self.fail(&JobError::Runtime(msg.to_string()));
                    PollDecision::Stop
                }
                None => {
                    self.phase = JobPhase::Succeeded;
                    self.last_completed_at = status.last_run.clone();
                    self.error_message = None;
                    PollDecision::Reload
                }
            };
        }

        if self.polls >= policy.max_polls {
            self.phase = JobPhase::TimedOut;
            self.error_message = Some(JobError::Timeout.to_string());
            return PollDecision::Stop;
        }
        PollDecision::Continue
    }

    /// The status request itself failed. The job ends; there is no automatic retry.
    pub fn status_failed(&mut self, err: &JobError) {
        if self.phase == JobPhase::Running {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: &JobError) {
        self.phase = JobPhase::Failed;
        self.error_message = Some(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn running_job() -> AnalysisJob {
        let mut job = AnalysisJob::default();
        job.begin().unwrap();
        job.start_accepted(datetime!(2024-01-01 00:00:00 UTC));
        job
    }

    fn running(still: bool) -> JobStatus {
        JobStatus {
            is_running: still,
            ..Default::default()
        }
    }

    #[test]
    fn begin_is_rejected_while_busy_without_touching_state() {
        let mut job = running_job();
        job.record_poll();
        job.record_poll();
        let before = job.clone();

        assert!(matches!(job.begin(), Err(JobError::AlreadyRunning)));
        assert_eq!(job, before);
        assert_eq!(job.started_at, Some(datetime!(2024-01-01 00:00:00 UTC)));
        assert_eq!(job.polls, 2);

        let mut starting = AnalysisJob::default();
        starting.begin().unwrap();
        assert!(matches!(starting.begin(), Err(JobError::AlreadyRunning)));
        assert_eq!(starting.phase, JobPhase::Starting);
    }

    #[test]
    fn terminal_job_can_be_restarted() {
        let mut job = running_job();
        job.record_poll();
        job.apply_status(
            &JobStatus {
                is_running: false,
                error: Some("boom".into()),
                ..Default::default()
            },
            &PollPolicy::default(),
        );
        assert_eq!(job.phase, JobPhase::Failed);

        job.begin().unwrap();
        assert_eq!(job.phase, JobPhase::Starting);
        assert_eq!(job.error_message, None);
        assert_eq!(job.polls, 0);
    }

    #[test]
    fn rejected_start_fails_without_running() {
        let mut job = AnalysisJob::default();
        job.begin().unwrap();
        job.start_rejected(&JobError::Start("Analysis is already running".into()));
        assert_eq!(job.phase, JobPhase::Failed);
        assert_eq!(job.started_at, None);
        assert_eq!(
            job.error_message.as_deref(),
            Some("Analysis is already running")
        );
    }

    #[test]
    fn error_reply_fails_the_job() {
        let mut job = running_job();
        job.record_poll();
        let d = job.apply_status(
            &JobStatus {
                is_running: false,
                error: Some("boom".into()),
                ..Default::default()
            },
            &PollPolicy::default(),
        );
        assert_eq!(d, PollDecision::Stop);
        assert_eq!(job.phase, JobPhase::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn clean_finish_records_last_run_and_requests_reload() {
        let mut job = running_job();
        job.record_poll();
        let d = job.apply_status(
            &JobStatus {
                is_running: false,
                last_run: Some("2024-01-01T00:00:00Z".into()),
                posts_count: Some(42),
                ..Default::default()
            },
            &PollPolicy::default(),
        );
        assert_eq!(d, PollDecision::Reload);
        assert_eq!(job.phase, JobPhase::Succeeded);
        assert_eq!(job.last_completed_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(job.posts_count, Some(42));
    }

    #[test]
    fn blank_error_counts_as_clean_finish() {
        let mut job = running_job();
        let d = job.apply_status(
            &JobStatus {
                is_running: false,
                error: Some("  ".into()),
                last_run: Some("2024-01-01T00:00:00Z".into()),
                ..Default::default()
            },
            &PollPolicy::default(),
        );
        assert_eq!(d, PollDecision::Reload);
        assert_eq!(job.phase, JobPhase::Succeeded);
        assert_eq!(job.error_message, None);
    }

    #[test]
    fn times_out_on_the_last_allowed_poll() {
        let policy = PollPolicy::default();
        let mut job = running_job();
        for _ in 1..policy.max_polls {
            job.record_poll();
            assert_eq!(job.apply_status(&running(true), &policy), PollDecision::Continue);
        }
        job.record_poll();
        assert_eq!(job.polls, 150);
        assert_eq!(job.apply_status(&running(true), &policy), PollDecision::Stop);
        assert_eq!(job.phase, JobPhase::TimedOut);
        assert_eq!(
            job.error_message.as_deref(),
            Some("Analysis timed out after 5 minutes")
        );
    }

    #[test]
    fn replies_after_a_terminal_phase_are_ignored() {
        let mut job = running_job();
        job.record_poll();
        job.apply_status(&running(false), &PollPolicy::default());
        assert_eq!(job.phase, JobPhase::Succeeded);

        let d = job.apply_status(
            &JobStatus {
                is_running: false,
                error: Some("late".into()),
                ..Default::default()
            },
            &PollPolicy::default(),
        );
        assert_eq!(d, PollDecision::Stop);
        assert_eq!(job.phase, JobPhase::Succeeded);
        assert_eq!(job.error_message, None);
    }
}
