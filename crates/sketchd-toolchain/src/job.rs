//! Job state machine for run/export progress streams
//!
//! One job at a time moves `Idle → Requested → Running → {Completed | Cancelled}`.
//! The tracker absorbs duplicate and out-of-order progress events so callers
//! only see real transitions.

use sketchd_core::prelude::*;
use sketchd_core::RunProgress;

/// Stage names in toolchain order. The `completion` stage terminates a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSequence {
    stages: Vec<String>,
    completion: String,
}

impl StageSequence {
    pub fn new(stages: Vec<String>, completion: impl Into<String>) -> Self {
        Self {
            stages,
            completion: completion.into(),
        }
    }

    pub fn completion(&self) -> &str {
        &self.completion
    }

    pub fn is_completion(&self, stage: &str) -> bool {
        stage == self.completion
    }

    fn index_of(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s == stage)
    }
}

impl Default for StageSequence {
    fn default() -> Self {
        Self::new(
            vec!["COMPILE".to_string(), "UPLOAD".to_string(), "DONE".to_string()],
            "DONE",
        )
    }
}

/// What the job is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    /// Request sent, toolchain has not acknowledged yet
    Requested,
    Running,
    Completed,
    Cancelled,
}

impl JobPhase {
    /// Requested or Running
    pub fn is_active(&self) -> bool {
        matches!(self, JobPhase::Requested | JobPhase::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Cancelled)
    }
}

/// Which request started the job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Run,
    Export,
}

/// Observable effect of feeding one progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTransition {
    /// Toolchain acknowledged the job
    Started,
    /// Moved to a new stage
    Stage(String),
    Completed,
    Cancelled,
    /// Duplicate, stale, out-of-order or foreign event
    Ignored,
}

/// State for the single active toolchain job
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    phase: JobPhase,
    job_id: Option<u64>,
    kind: Option<JobKind>,
    stage: Option<String>,
    stop_requested: bool,
    sequence: StageSequence,
}

impl JobTracker {
    pub fn new(sequence: StageSequence) -> Self {
        Self {
            sequence,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn job_id(&self) -> Option<u64> {
        self.job_id
    }

    pub fn kind(&self) -> Option<JobKind> {
        self.kind
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn is_running(&self) -> bool {
        self.phase == JobPhase::Running
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn sequence(&self) -> &StageSequence {
        &self.sequence
    }

    /// A run request went out under `job_id`
    pub fn request(&mut self, job_id: u64) {
        self.start(job_id, JobKind::Run, JobPhase::Requested);
    }

    /// An export request went out. Export has no acknowledgment stage, so the
    /// job is Running immediately.
    pub fn start_export(&mut self, job_id: u64) {
        self.start(job_id, JobKind::Export, JobPhase::Running);
    }

    fn start(&mut self, job_id: u64, kind: JobKind, phase: JobPhase) {
        debug!("Job #{} {:?} -> {:?}", job_id, kind, phase);
        self.phase = phase;
        self.job_id = Some(job_id);
        self.kind = Some(kind);
        self.stage = None;
        self.stop_requested = false;
    }

    /// A stop request went out for the running job
    pub fn mark_stop_requested(&mut self) {
        if self.is_running() {
            self.stop_requested = true;
        }
    }

    /// Drop the job without a terminal event (e.g. the toolchain died)
    pub fn reset(&mut self) {
        self.phase = JobPhase::Idle;
        self.job_id = None;
        self.kind = None;
        self.stage = None;
        self.stop_requested = false;
    }

    /// Feed one progress event
    pub fn apply(&mut self, event: &RunProgress) -> JobTransition {
        if let (Some(event_job), Some(current)) = (event.job, self.job_id) {
            if event_job != current {
                trace!("Discarding progress for job #{} (current #{})", event_job, current);
                return JobTransition::Ignored;
            }
        }

        match self.phase {
            JobPhase::Idle | JobPhase::Completed | JobPhase::Cancelled => {
                trace!("Discarding progress '{}' with no active job", event.stage);
                JobTransition::Ignored
            }
            JobPhase::Requested => {
                if !event.running {
                    return JobTransition::Ignored;
                }
                // The first running event is the acknowledgment, whatever its stage
                self.phase = JobPhase::Running;
                if !self.sequence.is_completion(&event.stage) {
                    self.stage = Some(event.stage.clone());
                }
                JobTransition::Started
            }
            JobPhase::Running => self.advance(event),
        }
    }

    fn advance(&mut self, event: &RunProgress) -> JobTransition {
        if self.sequence.is_completion(&event.stage) {
            self.stage = Some(event.stage.clone());
            // Cancellation is only ever an answer to our own stop
            if event.cancelled && self.stop_requested {
                self.phase = JobPhase::Cancelled;
                return JobTransition::Cancelled;
            }
            self.phase = JobPhase::Completed;
            return JobTransition::Completed;
        }

        let current = self.stage.as_deref();
        if current == Some(event.stage.as_str()) {
            return JobTransition::Ignored;
        }

        if let (Some(next), Some(now)) = (
            self.sequence.index_of(&event.stage),
            current.and_then(|s| self.sequence.index_of(s)),
        ) {
            if next <= now {
                trace!(
                    "Ignoring out-of-order stage {} after {}",
                    event.stage,
                    self.sequence.stages[now]
                );
                return JobTransition::Ignored;
            }
        }

        self.stage = Some(event.stage.clone());
        JobTransition::Stage(event.stage.clone())
    }
}
