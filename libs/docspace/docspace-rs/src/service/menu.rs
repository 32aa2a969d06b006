//! Context-menu actions as a table of tagged records. Every record is
//! evaluated the same way: its predicate decides whether the action makes
//! sense for the entry in this view, and its grant (if any) must be held in
//! the entry's space.

use serde::{Deserialize, Serialize};
use tracing::*;

use crate::model::entry::Entry;
use crate::model::errors::{DsErrKind, DsResult};
use crate::model::privilege::RawPrivilege;
use crate::service::archive::{ArchiveConfirmation, BatchOutcome, PurgeConfirmation};
use crate::service::clipboard::PasteOutcome;
use crate::service::listing::{ListingContext, ListingSource, ViewKind};
use crate::DocSpace;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryAction {
    Open,
    Rename,
    Cut,
    Copy,
    Paste,
    Archive,
    Restore,
    Purge,
    AddFavorite,
    RemoveFavorite,
}

pub struct MenuItem {
    pub action: EntryAction,
    pub predicate: fn(&DocSpace, ViewKind, &Entry) -> bool,
    pub authorize: Option<RawPrivilege>,
}

pub const ENTRY_MENU: &[MenuItem] = &[
    MenuItem {
        action: EntryAction::Open,
        predicate: |_, kind, entry| entry.is_folder && kind != ViewKind::Archive,
        authorize: Some(RawPrivilege::Read),
    },
    MenuItem {
        action: EntryAction::Rename,
        predicate: |_, kind, _| kind == ViewKind::Browse,
        authorize: Some(RawPrivilege::Write),
    },
    MenuItem {
        action: EntryAction::Cut,
        predicate: |_, kind, _| kind == ViewKind::Browse,
        authorize: Some(RawPrivilege::Write),
    },
    MenuItem {
        action: EntryAction::Copy,
        predicate: |_, kind, _| kind != ViewKind::Archive,
        authorize: Some(RawPrivilege::Read),
    },
    MenuItem {
        action: EntryAction::Paste,
        predicate: |ds, kind, entry| {
            kind == ViewKind::Browse && entry.is_folder && ds.clipboard().is_some()
        },
        authorize: Some(RawPrivilege::Write),
    },
    MenuItem {
        action: EntryAction::Archive,
        predicate: |_, kind, _| kind != ViewKind::Archive,
        authorize: Some(RawPrivilege::Write),
    },
    MenuItem {
        action: EntryAction::Restore,
        predicate: |_, kind, _| kind == ViewKind::Archive,
        authorize: Some(RawPrivilege::Write),
    },
    MenuItem {
        action: EntryAction::Purge,
        predicate: |_, kind, _| kind == ViewKind::Archive,
        authorize: Some(RawPrivilege::Write),
    },
    MenuItem {
        action: EntryAction::AddFavorite,
        predicate: |ds, kind, entry| kind != ViewKind::Archive && ds.should_offer_add(entry),
        authorize: None,
    },
    MenuItem {
        action: EntryAction::RemoveFavorite,
        predicate: |ds, kind, entry| kind != ViewKind::Archive && ds.should_offer_remove(entry),
        authorize: None,
    },
];

/// What running an action produced. Rename and the destructive actions stop
/// short of the remote call and hand back the step the user must complete.
#[must_use]
pub enum ActionOutcome {
    Done,
    Navigated(ListingSource),
    NeedsName(Entry),
    ConfirmArchive(ArchiveConfirmation),
    ConfirmPurge(PurgeConfirmation),
    Pasted(PasteOutcome),
    Restored(BatchOutcome),
}

impl DocSpace {
    pub fn menu_for(&self, kind: ViewKind, entry: &Entry) -> Vec<EntryAction> {
        ENTRY_MENU
            .iter()
            .filter(|item| (item.predicate)(self, kind, entry))
            .filter(|item| {
                item.authorize
                    .map_or(true, |grant| self.is_authorized_for(entry.space_id, grant))
            })
            .map(|item| item.action)
            .collect()
    }

    /// Runs `action` chosen on `target` in the view `context`, with
    /// `selection` the entries currently selected there (which may not
    /// include `target`).
    pub async fn run_action(
        &self, context: &ListingContext, action: EntryAction, target: &Entry, selection: &[Entry],
    ) -> DsResult<ActionOutcome> {
        if context.kind() == ViewKind::Archive {
            // archived entries may sit in spaces other than the selected one
            if let Err(err) = self.populate_privileges(target.space_id).await {
                debug!(space_id = %target.space_id, "privileges unresolved: {:?}", err.kind);
            }
        }
        if !self.menu_for(context.kind(), target).contains(&action) {
            return Err(DsErrKind::InsufficientPermission.into());
        }

        let selected: Vec<Entry> =
            if selection.is_empty() { vec![target.clone()] } else { selection.to_vec() };

        match action {
            EntryAction::Open => {
                let source = ListingSource::browse(target.space_id, &target.full_path());
                context.set_source(source.clone());
                Ok(ActionOutcome::Navigated(source))
            }
            EntryAction::Rename => Ok(ActionOutcome::NeedsName(target.clone())),
            EntryAction::Cut => {
                self.cut_selection(&selected, target.space_id);
                Ok(ActionOutcome::Done)
            }
            EntryAction::Copy => {
                self.copy_selection(&selected, target.space_id);
                Ok(ActionOutcome::Done)
            }
            EntryAction::Paste => {
                let outcome = self.paste(target.space_id, &target.full_path()).await?;
                Ok(ActionOutcome::Pasted(outcome))
            }
            EntryAction::Archive => {
                Ok(ActionOutcome::ConfirmArchive(self.request_archive(context, selected)?))
            }
            EntryAction::Restore => {
                Ok(ActionOutcome::Restored(self.restore_selected(context, &selected).await?))
            }
            EntryAction::Purge => {
                Ok(ActionOutcome::ConfirmPurge(self.request_purge(context, selected).await?))
            }
            EntryAction::AddFavorite => {
                self.add_favorite(target).await?;
                Ok(ActionOutcome::Done)
            }
            EntryAction::RemoveFavorite => {
                self.remove_favorite(target).await?;
                Ok(ActionOutcome::Done)
            }
        }
    }
}
