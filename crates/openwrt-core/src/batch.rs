// ── Batch state machine ──
//
// Every reconciliation runs as one batch against one UCI config:
//
//   Idle → Fetching → Mutating → Committing → Done
//
// `Fetching` is skipped by create-only batches, and a batch with nothing to
// do may go from `Fetching` straight to `Done`. Any failure moves the batch
// to `Failed`, so a batch that failed before `Committing` never commits.
// There is no rollback: mutations applied before a failure stay staged on
// the device.

use std::future::Future;

use openwrt_api::UciClient;
use tracing::{debug, trace};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Fetching,
    Mutating,
    Committing,
    Done,
    Failed,
}

impl BatchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Fetching | Self::Mutating)
                | (Self::Fetching, Self::Mutating | Self::Done)
                | (Self::Mutating, Self::Committing)
                | (Self::Committing, Self::Done)
        ) || (next == Self::Failed && !self.is_terminal())
    }
}

/// One imperative UCI step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `add` a section of `section_type`, then `set` each option on the
    /// returned handle, in order.
    Add {
        section_type: &'static str,
        options: Vec<(&'static str, String)>,
    },
    /// `set` one option on an existing section.
    Set {
        handle: String,
        option: &'static str,
        value: String,
    },
    /// `delete` an existing section.
    Delete { handle: String },
}

/// Handles touched by a completed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Handles allocated by `add`, in creation order.
    pub added: Vec<String>,
    /// Handles changed by `set` on an existing section.
    pub changed: Vec<String>,
    /// Handles removed by `delete`.
    pub deleted: Vec<String>,
}

/// Tracks one batch operation against a UCI config.
#[derive(Debug)]
pub struct Batch {
    config: &'static str,
    phase: BatchPhase,
}

impl Batch {
    pub fn new(config: &'static str) -> Self {
        Self {
            config,
            phase: BatchPhase::Idle,
        }
    }

    pub fn config(&self) -> &'static str {
        self.config
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// Move to `next`, rejecting transitions the state machine does not allow.
    pub fn advance(&mut self, next: BatchPhase) -> Result<(), CoreError> {
        if !self.phase.can_advance_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        trace!(config = self.config, from = ?self.phase, to = ?next, "batch phase");
        self.phase = next;
        Ok(())
    }

    /// Mark the batch failed. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            debug!(config = self.config, phase = ?self.phase, "batch failed");
            self.phase = BatchPhase::Failed;
        }
    }

    /// Record `result`, failing the batch on error.
    pub fn check<T, E>(&mut self, result: Result<T, E>) -> Result<T, CoreError>
    where
        CoreError: From<E>,
    {
        result.map_err(|e| {
            self.fail();
            CoreError::from(e)
        })
    }

    /// Run the snapshot read of this batch.
    pub async fn fetch<T: Send>(
        &mut self,
        read: impl Future<Output = Result<T, CoreError>> + Send,
    ) -> Result<T, CoreError> {
        self.advance(BatchPhase::Fetching)?;
        let snapshot = read.await;
        self.check(snapshot)
    }

    /// Finish a batch that found nothing to change, without committing.
    pub fn finish_unchanged(&mut self) -> Result<(), CoreError> {
        self.advance(BatchPhase::Done)
    }

    /// Apply `plan` in order, then commit the config once.
    ///
    /// The first failing step aborts the batch; nothing after it runs and
    /// `commit` is never sent. An empty plan still commits.
    pub async fn apply<C: UciClient>(
        &mut self,
        client: &C,
        plan: Vec<Mutation>,
    ) -> Result<BatchReport, CoreError> {
        self.advance(BatchPhase::Mutating)?;

        let mut report = BatchReport::default();
        for step in plan {
            let outcome = self.run_step(client, step, &mut report).await;
            self.check(outcome)?;
        }

        self.advance(BatchPhase::Committing)?;
        let committed = client.commit(self.config).await;
        self.check(committed)?;

        self.advance(BatchPhase::Done)?;
        debug!(
            config = self.config,
            added = report.added.len(),
            changed = report.changed.len(),
            deleted = report.deleted.len(),
            "batch committed"
        );
        Ok(report)
    }

    async fn run_step<C: UciClient>(
        &self,
        client: &C,
        step: Mutation,
        report: &mut BatchReport,
    ) -> Result<(), openwrt_api::Error> {
        let config = self.config;
        match step {
            Mutation::Add {
                section_type,
                options,
            } => {
                let handle = client.add(config, section_type).await?;
                for (option, value) in &options {
                    client.set(config, &handle, option, value).await?;
                }
                report.added.push(handle);
            }
            Mutation::Set {
                handle,
                option,
                value,
            } => {
                client.set(config, &handle, option, &value).await?;
                report.changed.push(handle);
            }
            Mutation::Delete { handle } => {
                client.delete(config, &handle).await?;
                report.deleted.push(handle);
            }
        }
        Ok(())
    }
}
