//! Dashboard lifecycle controller.
//!
//! Owns the view pipeline and the analysis job, issues backend requests, and emits snapshots
//! for presentation layers. All state lives on one task; requests are boxed futures polled from
//! [`DashboardController::next_reply`], so at most one job request (start or status) is ever in
//! flight and the next poll is only scheduled once the previous reply has been applied.

use crate::api::{fallback_advisory, fallback_posts, Backend};
use crate::error::{FetchError, JobError};
use crate::job::{AnalysisJob, PollDecision};
use crate::model::{
    DashboardEvent, DashboardSnapshot, FilterState, InfoEvent, JobPhase, JobStatus, LabelFilter,
    PollPolicy, Post, SortOrder,
};
use crate::view::ViewPipeline;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UiCommand {
    SetQuery(String),
    SetLabel(LabelFilter),
    SetTicker(String),
    SetSort(SortOrder),
    Analyze,
    Reload,
    Quit,
}

/// Completed backend request, tagged with the generation it was issued for.
pub(crate) enum Reply {
    Loaded {
        generation: u64,
        result: Result<Vec<Post>, FetchError>,
    },
    Started {
        job: u64,
        result: Result<(), JobError>,
    },
    Status {
        job: u64,
        result: Result<JobStatus, FetchError>,
    },
}

pub(crate) struct DashboardController {
    backend: Arc<dyn Backend>,
    policy: PollPolicy,
    pipeline: ViewPipeline,
    job: AnalysisJob,
    advisory: Option<String>,
    loading: bool,
    load_generation: u64,
    job_generation: u64,
    load_inflight: Option<BoxFuture<'static, Reply>>,
    job_inflight: Option<BoxFuture<'static, Reply>>,
    next_poll_at: Option<Instant>,
    torn_down: bool,
    event_tx: Option<UnboundedSender<DashboardEvent>>,
}

impl DashboardController {
    pub(crate) fn new(
        backend: Arc<dyn Backend>,
        policy: PollPolicy,
        filter: FilterState,
        sort: SortOrder,
    ) -> Self {
        Self {
            backend,
            policy,
            pipeline: ViewPipeline::new(filter, sort),
            job: AnalysisJob::default(),
            advisory: None,
            loading: false,
            load_generation: 0,
            job_generation: 0,
            load_inflight: None,
            job_inflight: None,
            next_poll_at: None,
            torn_down: false,
            event_tx: None,
        }
    }

    pub(crate) fn with_events(mut self, event_tx: UnboundedSender<DashboardEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub(crate) fn job(&self) -> &AnalysisJob {
        &self.job
    }

    pub(crate) fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            view: self.pipeline.view().to_vec(),
            available_tickers: self.pipeline.available_tickers().to_vec(),
            total: self.pipeline.posts().len(),
            filter: self.pipeline.filter().clone(),
            sort: self.pipeline.sort(),
            loading: self.loading,
            advisory: self.advisory.clone(),
            job: self.job.clone(),
        }
    }

    /// Issue a results load. A newer load supersedes any load still in flight.
    pub(crate) fn request_load(&mut self) {
        if self.torn_down {
            return;
        }
        self.load_generation += 1;
        self.loading = true;
        let generation = self.load_generation;
        let backend = self.backend.clone();
        self.load_inflight = Some(
            async move {
                let result = backend.load_results().await;
                Reply::Loaded { generation, result }
            }
            .boxed(),
        );
        tracing::debug!(generation, "results load issued");
    }

    /// Start a new analysis job. Rejected, not queued, while one is starting or running.
    pub(crate) fn request_analysis(&mut self) -> Result<(), JobError> {
        if self.torn_down {
            return Err(JobError::Closed);
        }
        if let Err(e) = self.job.begin() {
            tracing::warn!(phase = ?self.job.phase, polls = self.job.polls, "analysis request rejected");
            self.emit(DashboardEvent::Info(InfoEvent::AnalysisRejected));
            return Err(e);
        }
        self.job_generation += 1;
        self.next_poll_at = None;
        let job = self.job_generation;
        let backend = self.backend.clone();
        self.job_inflight = Some(
            async move {
                let result = backend.start_analysis().await;
                Reply::Started { job, result }
            }
            .boxed(),
        );
        tracing::info!(job, "analysis start requested");
        self.emit_snapshot();
        Ok(())
    }

    /// Stop all pending work. Replies that would have arrived later are dropped unapplied.
    pub(crate) fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.load_inflight = None;
        self.job_inflight = None;
        self.next_poll_at = None;
        tracing::info!(phase = ?self.job.phase, "controller torn down");
    }

    fn has_pending(&self) -> bool {
        self.load_inflight.is_some() || self.job_inflight.is_some() || self.next_poll_at.is_some()
    }

    /// Wait for the next backend reply, issuing a due status poll on the way.
    ///
    /// Cancel safe: in-flight requests and the poll deadline live on `self`, so dropping this
    /// future (e.g. when another `select!` branch wins) loses nothing. Returns `None` when no
    /// work is pending.
    pub(crate) async fn next_reply(&mut self) -> Option<Reply> {
        loop {
            if self.torn_down || !self.has_pending() {
                return None;
            }
            let poll_due = self.next_poll_at;
            tokio::select! {
                reply = poll_slot(&mut self.load_inflight) => {
                    self.load_inflight = None;
                    return Some(reply);
                }
                reply = poll_slot(&mut self.job_inflight) => {
                    self.job_inflight = None;
                    return Some(reply);
                }
                _ = sleep_until_opt(poll_due) => {
                    self.issue_poll();
                }
            }
        }
    }

    /// Drive pending work until nothing is left (headless modes).
    pub(crate) async fn drive_until_idle(&mut self) {
        while let Some(reply) = self.next_reply().await {
            self.apply(reply);
        }
    }

    fn issue_poll(&mut self) {
        self.next_poll_at = None;
        if self.job.phase != JobPhase::Running {
            return;
        }
        self.job.record_poll();
        let job = self.job_generation;
        let backend = self.backend.clone();
        self.job_inflight = Some(
            async move {
                let result = backend.job_status().await;
                Reply::Status { job, result }
            }
            .boxed(),
        );
        tracing::debug!(job, poll = self.job.polls, "status poll issued");
    }

    fn schedule_poll(&mut self) {
        self.next_poll_at = Some(Instant::now() + self.policy.interval);
    }

    /// Apply one reply to controller state.
    pub(crate) fn apply(&mut self, reply: Reply) {
        if self.torn_down {
            tracing::debug!("reply after teardown discarded");
            return;
        }
        match reply {
            Reply::Loaded { generation, result } => {
                if generation != self.load_generation {
                    tracing::debug!(generation, current = self.load_generation, "stale load discarded");
                    return;
                }
                self.apply_load(result);
            }
            Reply::Started { job, result } => {
                if job != self.job_generation {
                    tracing::debug!(job, "stale start reply discarded");
                    return;
                }
                self.apply_started(result);
            }
            Reply::Status { job, result } => {
                if job != self.job_generation || self.job.phase != JobPhase::Running {
                    tracing::debug!(job, phase = ?self.job.phase, "stale status reply discarded");
                    return;
                }
                self.apply_status(result);
            }
        }
        self.emit_snapshot();
    }

    fn apply_load(&mut self, result: Result<Vec<Post>, FetchError>) {
        self.loading = false;
        match result {
            Ok(posts) => {
                let count = posts.len();
                self.pipeline.replace_results(posts);
                self.advisory = None;
                tracing::info!(count, "results loaded");
                self.emit(DashboardEvent::Info(InfoEvent::Reloaded { count }));
            }
            Err(e) => {
                tracing::warn!(error = %e, "results load failed, using fallback data");
                self.pipeline.replace_results(fallback_posts());
                self.advisory = Some(fallback_advisory(&e));
                self.emit(DashboardEvent::Info(InfoEvent::FallbackData));
            }
        }
    }

    fn apply_started(&mut self, result: Result<(), JobError>) {
        match result {
            Ok(()) => {
                self.job.start_accepted(OffsetDateTime::now_utc());
                self.schedule_poll();
                tracing::info!(job = self.job_generation, "analysis running");
                self.emit(DashboardEvent::Info(InfoEvent::AnalysisStarted));
            }
            Err(e) => {
                tracing::warn!(error = %e, "analysis start rejected by backend");
                self.job.start_rejected(&e);
                self.emit(DashboardEvent::Info(InfoEvent::AnalysisFinished(
                    self.job.phase,
                )));
            }
        }
    }

    fn apply_status(&mut self, result: Result<JobStatus, FetchError>) {
        let decision = match result {
            Ok(status) => self.job.apply_status(&status, &self.policy),
            Err(e) => {
                tracing::warn!(error = %e, "status poll failed");
                self.job.status_failed(&JobError::from(e));
                PollDecision::Stop
            }
        };
        match decision {
            PollDecision::Continue => self.schedule_poll(),
            PollDecision::Reload => {
                tracing::info!(
                    last_run = ?self.job.last_completed_at,
                    polls = self.job.polls,
                    "analysis succeeded"
                );
                self.emit(DashboardEvent::Info(InfoEvent::AnalysisFinished(
                    self.job.phase,
                )));
                self.request_load();
            }
            PollDecision::Stop => {
                tracing::warn!(
                    phase = ?self.job.phase,
                    error = ?self.job.error_message,
                    polls = self.job.polls,
                    "analysis ended"
                );
                self.emit(DashboardEvent::Info(InfoEvent::AnalysisFinished(
                    self.job.phase,
                )));
            }
        }
    }

    /// Apply a UI command. Returns false when the UI asked to quit.
    pub(crate) fn handle_command(&mut self, cmd: UiCommand) -> bool {
        match cmd {
            UiCommand::SetQuery(q) => self.pipeline.set_query(q),
            UiCommand::SetLabel(l) => self.pipeline.set_label_filter(l),
            UiCommand::SetTicker(t) => self.pipeline.set_ticker_filter(t),
            UiCommand::SetSort(s) => self.pipeline.set_sort(s),
            UiCommand::Analyze => {
                // Rejection is already reported to the UI as an info event.
                let _ = self.request_analysis();
                return true;
            }
            UiCommand::Reload => self.request_load(),
            UiCommand::Quit => return false,
        }
        self.emit_snapshot();
        true
    }

    fn emit_snapshot(&self) {
        if self.event_tx.is_some() {
            self.emit(DashboardEvent::Snapshot(Box::new(self.snapshot())));
        }
    }

    fn emit(&self, ev: DashboardEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

impl Drop for DashboardController {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn poll_slot(slot: &mut Option<BoxFuture<'static, Reply>>) -> Reply {
    match slot.as_mut() {
        Some(fut) => fut.await,
        None => futures::future::pending().await,
    }
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => futures::future::pending().await,
    }
}

/// Run the controller against UI commands until the UI quits or goes away, then tear down.
pub(crate) async fn run_controller(
    mut controller: DashboardController,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    controller.request_load();
    controller.emit_snapshot();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        if !controller.handle_command(cmd) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            Some(reply) = controller.next_reply() => {
                controller.apply(reply);
            }
        }
    }

    controller.teardown();
    Ok(())
}
