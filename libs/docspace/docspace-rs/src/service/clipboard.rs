use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::model::entry::{Entry, SpaceId};
use crate::model::errors::{DsErr, DsResult};
use crate::model::path_ops;
use crate::model::privilege::RawPrivilege;
use crate::service::events::Notice;
use crate::service::listing::ListingSource;
use crate::DocSpace;

/// The single pending cut or copy of a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardSelection {
    pub source_space_id: SpaceId,
    pub is_copy_operation: bool,
    /// Normalized full paths, in selection order.
    pub items: Vec<String>,
}

impl ClipboardSelection {
    fn new(entries: &[Entry], source_space_id: SpaceId, is_copy_operation: bool) -> Self {
        Self {
            source_space_id,
            is_copy_operation,
            items: entries.iter().map(Entry::full_path).collect(),
        }
    }

    /// Source path → destination path, each item keeping its name.
    pub fn destinations(&self, destination_path: &str) -> IndexMap<String, String> {
        self.items
            .iter()
            .map(|item| (item.clone(), path_ops::join(destination_path, &path_ops::basename(item))))
            .collect()
    }

    /// Folders the items were taken from.
    pub fn source_folders(&self) -> BTreeSet<String> {
        self.items.iter().map(|item| path_ops::parent(item)).collect()
    }
}

#[derive(Clone, Default)]
pub struct Clipboard {
    selection: Arc<Mutex<Option<ClipboardSelection>>>,
}

impl Clipboard {
    fn lock(&self) -> MutexGuard<'_, Option<ClipboardSelection>> {
        self.selection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn selection(&self) -> Option<ClipboardSelection> {
        self.lock().clone()
    }

    /// Replaces any previous selection.
    pub fn install(&self, selection: ClipboardSelection) {
        *self.lock() = Some(selection);
    }

    pub fn take(&self) -> Option<ClipboardSelection> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteOutcome {
    NothingToPaste,
    Copied(usize),
    Moved(usize),
}

impl DocSpace {
    pub fn clipboard(&self) -> Option<ClipboardSelection> {
        self.clipboard.selection()
    }

    /// Selects `entries` (taken from `source_space_id`) to be moved by the next paste.
    pub fn cut_selection(&self, entries: &[Entry], source_space_id: SpaceId) {
        self.install_selection(ClipboardSelection::new(entries, source_space_id, false));
    }

    /// Selects `entries` (taken from `source_space_id`) to be copied by the next paste.
    pub fn copy_selection(&self, entries: &[Entry], source_space_id: SpaceId) {
        self.install_selection(ClipboardSelection::new(entries, source_space_id, true));
    }

    fn install_selection(&self, selection: ClipboardSelection) {
        if selection.items.is_empty() {
            debug!("empty selection, clearing clipboard");
            if self.clipboard.take().is_some() {
                self.events.clipboard_changed();
            }
            return;
        }
        debug!(
            space = %selection.source_space_id,
            copy = selection.is_copy_operation,
            items = selection.items.len(),
            "clipboard set"
        );
        self.clipboard.install(selection);
        self.events.clipboard_changed();
    }

    /// Copies or moves the clipboard into `destination_path` of
    /// `destination_space_id` with one batch call. The clipboard is empty
    /// afterwards whatever the outcome.
    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn paste(
        &self, destination_space_id: SpaceId, destination_path: &str,
    ) -> DsResult<PasteOutcome> {
        let Some(selection) = self.clipboard.take() else {
            self.events.notice(Notice::NothingToPaste);
            return Ok(PasteOutcome::NothingToPaste);
        };
        self.events.clipboard_changed();

        if let Err(err) = self.require(destination_space_id, RawPrivilege::Write) {
            self.events.error(&err.kind);
            return Err(err);
        }

        let destination_path = path_ops::normalize(destination_path);
        let items = selection.destinations(&destination_path);
        let count = items.len();

        let result = if selection.is_copy_operation {
            self.remote
                .batch_copy(destination_space_id, selection.source_space_id, &items)
                .await
        } else {
            self.remote
                .batch_move(destination_space_id, selection.source_space_id, &items)
                .await
        };

        self.listings.invalidate_where(|source| {
            source.is_browsing(destination_space_id, &destination_path)
        });

        match result {
            Ok(()) => {
                if !selection.is_copy_operation {
                    let folders = selection.source_folders();
                    self.listings.invalidate_where(|source| {
                        folders
                            .iter()
                            .any(|folder| source.is_browsing(selection.source_space_id, folder))
                    });
                }
                let outcome = if selection.is_copy_operation {
                    PasteOutcome::Copied(count)
                } else {
                    PasteOutcome::Moved(count)
                };
                info!(?outcome, "pasted into {destination_path}");
                Ok(outcome)
            }
            Err(err) => {
                let err = DsErr::from(err);
                self.events.error(&err.kind);
                Err(err)
            }
        }
    }

    /// Whether the browse view at `source` would accept a paste.
    pub fn can_paste_into(&self, source: &ListingSource) -> bool {
        match source {
            ListingSource::Browse { space_id, .. } => {
                !self.clipboard.is_empty()
                    && self.is_authorized_for(*space_id, RawPrivilege::Write)
            }
            _ => false,
        }
    }
}
