//! Archive lifecycle: `Active → Archived → Active | Purged`. Purged is terminal.
//!
//! Archiving and purging are two-step: a confirmation is requested from the
//! view holding the selection and then carried out. The two confirmations are
//! distinct types, and a purge confirmation can only come from the archive view.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::model::entry::{Entry, SpaceId};
use crate::model::errors::{DsErrKind, DsResult};
use crate::model::path_ops;
use crate::model::privilege::RawPrivilege;
use crate::service::events::Notice;
use crate::service::listing::{ListingContext, ViewKind};
use crate::DocSpace;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveState {
    Active,
    Archived,
    Purged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOp {
    Archive,
    Restore,
    Purge,
}

impl ArchiveOp {
    fn target(self) -> ArchiveState {
        match self {
            ArchiveOp::Archive => ArchiveState::Archived,
            ArchiveOp::Restore => ArchiveState::Active,
            ArchiveOp::Purge => ArchiveState::Purged,
        }
    }
}

impl ArchiveState {
    /// State of the entries listed by a view of `kind`.
    pub fn listed_in(kind: ViewKind) -> Self {
        match kind {
            ViewKind::Archive => ArchiveState::Archived,
            _ => ArchiveState::Active,
        }
    }

    pub fn transition(self, op: ArchiveOp) -> DsResult<ArchiveState> {
        match (self, op) {
            (ArchiveState::Active, ArchiveOp::Archive)
            | (ArchiveState::Archived, ArchiveOp::Restore)
            | (ArchiveState::Archived, ArchiveOp::Purge) => Ok(op.target()),
            (from, op) => Err(DsErrKind::InvalidTransition { from, to: op.target() }.into()),
        }
    }
}

/// Keys sharing one `(space, folder)`, the unit of a batch archive or purge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub space_id: SpaceId,
    pub path: String,
    pub keys: Vec<String>,
}

impl Bucket {
    fn describe(&self) -> String {
        format!("{}:/{}", self.space_id, self.path)
    }
}

/// Groups `entries` by `(space, folder)`, keeping first-seen order.
pub fn buckets(entries: &[Entry]) -> Vec<Bucket> {
    let mut grouped: IndexMap<(SpaceId, String), Vec<String>> = IndexMap::new();
    for entry in entries {
        grouped
            .entry((entry.space_id, path_ops::normalize(&entry.path)))
            .or_default()
            .push(entry.key.clone());
    }
    grouped
        .into_iter()
        .map(|((space_id, path), keys)| Bucket { space_id, path, keys })
        .collect()
}

fn distinct_spaces(entries: &[Entry]) -> BTreeSet<SpaceId> {
    entries.iter().map(|e| e.space_id).collect()
}

/// Path-qualified identifiers per space; the backend needs them to tell
/// same-named archived entries apart.
pub fn restore_groups(entries: &[Entry]) -> IndexMap<SpaceId, Vec<String>> {
    let mut grouped: IndexMap<SpaceId, Vec<String>> = IndexMap::new();
    for entry in entries {
        grouped
            .entry(entry.space_id)
            .or_default()
            .push(path_ops::qualified_path(&entry.path, &entry.key));
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub target: String,
    pub error: DsErrKind,
}

/// Result of a multi-call operation. Calls that succeeded are not rolled
/// back when a later one fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record(&mut self, target: String, result: DsResult<()>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(err) => self.failed.push(BatchFailure { target, error: err.kind }),
        }
    }
}

#[must_use = "an archive only happens once its confirmation is carried out"]
pub struct ArchiveConfirmation {
    context: ListingContext,
    entries: Vec<Entry>,
}

#[must_use = "a purge only happens once its confirmation is carried out"]
pub struct PurgeConfirmation {
    context: ListingContext,
    entries: Vec<Entry>,
}

impl ArchiveConfirmation {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl PurgeConfirmation {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl DocSpace {
    fn require_write_on(&self, entries: &[Entry]) -> DsResult<()> {
        for space_id in distinct_spaces(entries) {
            self.require(space_id, RawPrivilege::Write)?;
        }
        Ok(())
    }

    /// The archive view lists every space, while only the selected one has
    /// its privileges cached. Resolves the rest before checking them.
    async fn resolve_write_on(&self, entries: &[Entry]) -> DsResult<()> {
        for space_id in distinct_spaces(entries) {
            if let Err(err) = self.populate_privileges(space_id).await {
                debug!(%space_id, "privileges unresolved: {:?}", err.kind);
            }
            self.require(space_id, RawPrivilege::Write)?;
        }
        Ok(())
    }

    pub fn request_archive(
        &self, context: &ListingContext, entries: Vec<Entry>,
    ) -> DsResult<ArchiveConfirmation> {
        ArchiveState::listed_in(context.kind()).transition(ArchiveOp::Archive)?;
        self.require_write_on(&entries)?;
        Ok(ArchiveConfirmation { context: context.clone(), entries })
    }

    pub async fn request_purge(
        &self, context: &ListingContext, entries: Vec<Entry>,
    ) -> DsResult<PurgeConfirmation> {
        if context.kind() != ViewKind::Archive {
            return Err(DsErrKind::PurgeRequiresArchiveView.into());
        }
        self.resolve_write_on(&entries).await?;
        Ok(PurgeConfirmation { context: context.clone(), entries })
    }

    /// One batch archive call per `(space, folder)` bucket.
    #[instrument(level = "debug", skip_all)]
    pub async fn archive_selected(&self, confirmation: ArchiveConfirmation) -> BatchOutcome {
        let ArchiveConfirmation { context, entries } = confirmation;
        let buckets = buckets(&entries);

        let mut outcome = BatchOutcome::default();
        for bucket in &buckets {
            let result: DsResult<()> = self
                .remote
                .batch_archive(bucket.space_id, &bucket.path, &bucket.keys)
                .await
                .map_err(Into::into);
            outcome.record(bucket.describe(), result);
        }

        self.settle_batch("archived", &outcome);
        context.invalidate();
        self.invalidate_buckets(&buckets);
        self.listings
            .invalidate_where(|source| source.kind() == ViewKind::Archive);
        outcome
    }

    /// Restores archived `entries` listed by the archive view `context`.
    #[instrument(level = "debug", skip_all, err(Debug))]
    pub async fn restore_selected(
        &self, context: &ListingContext, entries: &[Entry],
    ) -> DsResult<BatchOutcome> {
        ArchiveState::listed_in(context.kind()).transition(ArchiveOp::Restore)?;
        self.resolve_write_on(entries).await?;

        let mut outcome = BatchOutcome::default();
        for (space_id, qualified_paths) in restore_groups(entries) {
            let result: DsResult<()> = self
                .remote
                .batch_unarchive(space_id, &qualified_paths)
                .await
                .map_err(Into::into);
            outcome.record(space_id.to_string(), result);
        }

        self.settle_batch("restored", &outcome);
        context.invalidate();
        self.invalidate_buckets(&buckets(entries));
        Ok(outcome)
    }

    /// Permanently deletes archived entries. There is no way back.
    #[instrument(level = "debug", skip_all)]
    pub async fn purge_selected(&self, confirmation: PurgeConfirmation) -> BatchOutcome {
        let PurgeConfirmation { context, entries } = confirmation;

        let mut outcome = BatchOutcome::default();
        for bucket in buckets(&entries) {
            let result: DsResult<()> = self
                .remote
                .purge(bucket.space_id, &bucket.path, &bucket.keys)
                .await
                .map_err(Into::into);
            outcome.record(bucket.describe(), result);
        }

        self.settle_batch("deleted", &outcome);
        context.invalidate();
        outcome
    }

    fn settle_batch(&self, verb: &str, outcome: &BatchOutcome) {
        for failure in &outcome.failed {
            warn!(failed = %failure.target, "batch call failed: {:?}", failure.error);
            self.events.error(&failure.error);
        }
        if outcome.succeeded > 0 && outcome.is_complete() {
            self.events
                .notice(Notice::Success(format!("Selection {verb}")));
        }
    }

    fn invalidate_buckets(&self, buckets: &[Bucket]) {
        self.listings.invalidate_where(|source| {
            buckets
                .iter()
                .any(|b| source.is_browsing(b.space_id, &b.path))
        });
    }
}
