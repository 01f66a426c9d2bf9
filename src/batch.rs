// src/batch.rs

//! Batch coordination over one exclusive unit of work
//!
//! Sequences every selected unit through the rewriter inside a single
//! all-or-nothing unit of work. Per-unit failures are independent and
//! never abort the loop; losing the commit discards everyone, including
//! units that individually succeeded.
//!
//! State machine: `Idle -> WorkOpen -> Deciding -> {Committed | Discarded}`.

use crate::host::{ExclusiveAccess, HostProject, UnitOfWork};
use crate::policy::ConversionPolicy;
use crate::rewrite::UnitRewriter;
use crate::trace::InvocationTrace;
use crate::unit::{Outcome, SelectedObject, Unit};
use crate::Result;
use std::fmt;
use uuid::Uuid;

/// Phases of one batch invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    /// Exclusive work acquired, units being rewritten
    WorkOpen,
    /// All units attempted, commit decision pending
    Deciding,
    Committed,
    Discarded,
}

/// A batch-level failure, distinct from any per-unit failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchFailure {
    /// The host invalidated the unit of work after per-unit rewrites
    /// completed; every edit was discarded
    CommitLost,
    /// The host refused the commit itself; every edit was discarded
    CommitRejected(String),
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommitLost => {
                write!(f, "the host invalidated the unit of work; all edits were discarded")
            }
            Self::CommitRejected(message) => {
                write!(f, "the host refused the commit ({message}); all edits were discarded")
            }
        }
    }
}

/// Per-unit line item of the aggregated report
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub name: String,
    pub outcome: Outcome,
}

/// Aggregated result of one invocation
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Whether the unit of work was committed durably
    pub committed: bool,
    /// Set when the whole batch was discarded at commit time
    pub batch_failure: Option<BatchFailure>,
    /// One entry per selected unit, in selection order
    pub units: Vec<UnitReport>,
    /// Terminal coordinator state
    pub final_state: BatchState,
}

impl BatchReport {
    /// Units that failed their own rewrite (skips excluded)
    pub fn failures(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.outcome.is_failed())
    }

    /// Informational list of units that were never attempted
    pub fn skipped(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.outcome.is_skipped())
    }

    pub fn succeeded_count(&self) -> usize {
        self.units.iter().filter(|u| u.outcome.is_succeeded()).count()
    }

    /// Whether anything must be surfaced to the user. Silent when every
    /// attempted unit succeeded.
    pub fn needs_report(&self) -> bool {
        self.batch_failure.is_some() || self.failures().next().is_some()
    }

    /// Render the aggregated failure text for the single modal, one block
    /// per failed unit
    pub fn failure_message(&self) -> String {
        let mut message = String::new();
        if let Some(failure) = &self.batch_failure {
            message.push_str(&format!("Batch: {failure}\n\n"));
        }
        for unit in self.failures() {
            if let Outcome::Failed { reason } = &unit.outcome {
                message.push_str(&format!(
                    "Unit: {}\nReason: {}\nAction: {}\n\n",
                    unit.name,
                    reason.reason_text(),
                    reason.action_text()
                ));
            }
        }
        message
    }
}

/// Sequences a whole selection through one exclusive unit of work
pub struct BatchCoordinator<'a> {
    policy: &'a ConversionPolicy,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(policy: &'a ConversionPolicy) -> Self {
        Self { policy }
    }

    /// Convert every selected unit inside one all-or-nothing unit of work.
    ///
    /// `Err` is reserved for invocation-level faults: failing to acquire
    /// exclusive access aborts before any per-unit attempt and is not
    /// retried within this invocation.
    pub fn convert_all<H: HostProject>(
        &self,
        host: &H,
        selection: &[SelectedObject],
        trace: &mut InvocationTrace,
    ) -> Result<BatchReport> {
        let invocation = Uuid::new_v4();
        trace.record(&format!(
            "invocation {invocation}: converting {} units",
            selection.len()
        ));

        // Acquisition must fail fast; held for the whole batch, released
        // on every exit path when the guard drops.
        let mut access = match host.acquire_exclusive(&format!(
            "Converting {} units...",
            selection.len()
        )) {
            Ok(access) => access,
            Err(e) => {
                trace.record(&format!("invocation {invocation}: aborted, {e}"));
                return Err(e);
            }
        };
        let mut work = access.open_work("Convert units")?;
        let mut state = BatchState::WorkOpen;
        tracing::debug!("batch {invocation}: work open, state {state:?}");

        let rewriter = UnitRewriter::new(self.policy, host.version());
        let mut units: Vec<Unit> = selection.iter().map(Unit::from_selected).collect();

        for unit in &mut units {
            if unit.kind.as_unit_kind().is_none() {
                unit.resolve(Outcome::Skipped {
                    info: "not a convertible unit kind".to_string(),
                });
            } else if work.is_protected(unit.handle) {
                unit.resolve(Outcome::Skipped {
                    info: "protected against structural edits".to_string(),
                });
            } else {
                // Failures are per-unit data; only infrastructure faults
                // abort the loop.
                rewriter.apply(&mut work, unit)?;
            }
            trace.record(&format!("unit '{}': {:?}", unit.name, unit.outcome()));
        }

        state = BatchState::Deciding;
        let succeeded = units.iter().filter(|u| u.outcome().is_succeeded()).count();
        tracing::debug!("batch {invocation}: state {state:?}, {succeeded} rewrites succeeded");

        let (committed, batch_failure) = if succeeded == 0 {
            trace.record("nothing to commit, discarding work");
            drop(work);
            (false, None)
        } else if !work.can_commit() {
            trace.record("host invalidated the work, discarding all edits");
            drop(work);
            (false, Some(BatchFailure::CommitLost))
        } else {
            match work.commit() {
                Ok(()) => {
                    trace.record(&format!("committed {succeeded} converted units"));
                    (true, None)
                }
                Err(e) => {
                    trace.record(&format!("commit refused: {e}, all edits discarded"));
                    (false, Some(BatchFailure::CommitRejected(e.to_string())))
                }
            }
        };

        state = if committed {
            BatchState::Committed
        } else {
            BatchState::Discarded
        };
        tracing::info!(
            "batch {invocation}: {state:?}, {succeeded}/{} succeeded",
            units.len()
        );

        Ok(BatchReport {
            committed,
            batch_failure,
            units: units
                .into_iter()
                .map(|u| UnitReport {
                    name: u.name.clone(),
                    outcome: u.outcome().clone(),
                })
                .collect(),
            final_state: state,
        })
    }
}
