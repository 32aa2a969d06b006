use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::*;

use crate::model::entry::{Entry, FavoriteEntry, PathItem, SpaceId};
use crate::model::errors::{DsErr, DsResult};
use crate::service::listing::ListingSource;
use crate::DocSpace;

/// The user's bookmarks in the selected space.
///
/// Local changes are placeholders. The next fetch of the ledger is the
/// source of truth; mutations only mark dependent views dirty.
#[derive(Clone, Default)]
pub struct FavoritesLedger {
    entries: Arc<RwLock<Vec<FavoriteEntry>>>,
}

impl FavoritesLedger {
    fn read(&self) -> RwLockReadGuard<'_, Vec<FavoriteEntry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<FavoriteEntry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn entries(&self) -> Vec<FavoriteEntry> {
        self.read().clone()
    }

    pub fn replace(&self, entries: Vec<FavoriteEntry>) {
        *self.write() = entries;
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.read().iter().any(|f| f.points_at(entry))
    }

    fn push_placeholder(&self, entry: &Entry) {
        let mut entries = self.write();
        if !entries.iter().any(|f| f.points_at(entry)) {
            entries.push(FavoriteEntry::placeholder(entry));
        }
    }

    fn remove_matching(&self, entry: &Entry) {
        self.write().retain(|f| !f.points_at(entry));
    }
}

impl DocSpace {
    pub fn favorites(&self) -> Vec<FavoriteEntry> {
        self.favorites.entries()
    }

    pub fn should_offer_add(&self, entry: &Entry) -> bool {
        !self.favorites.contains(entry)
    }

    pub fn should_offer_remove(&self, entry: &Entry) -> bool {
        self.favorites.contains(entry)
    }

    /// Replaces the ledger with the server's bookmarks for `space_id`.
    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn load_favorites(&self, space_id: SpaceId) -> DsResult<()> {
        let favorites = self
            .remote
            .get_favorites(space_id)
            .await
            .map_err(DsErr::from)?;
        if self.selected_space() != Some(space_id) {
            debug!(%space_id, "space changed while favorites loaded, dropping them");
            return Ok(());
        }
        self.favorites.replace(favorites);
        self.events.favorites_changed(space_id);
        Ok(())
    }

    /// Bookmarks `entry`. Returns `false` without touching the remote when no
    /// space is selected.
    #[instrument(level = "debug", skip(self, entry), fields(key = %entry.key), err(Debug))]
    pub async fn add_favorite(&self, entry: &Entry) -> DsResult<bool> {
        let Some(space_id) = self.selected_space() else {
            debug!("no space selected, not adding favorite");
            return Ok(false);
        };

        let result = self
            .remote
            .add_favorite(space_id, &[PathItem::from(entry)])
            .await
            .map_err(DsErr::from);

        if let Err(err) = result {
            self.events.error(&err.kind);
            self.invalidate_favorite_views(space_id);
            return Err(err);
        }

        self.favorites.push_placeholder(entry);
        self.favorites_mutated(space_id);
        Ok(true)
    }

    /// Removes the bookmark pointing at `entry`, matched by `(key, path)`.
    #[instrument(level = "debug", skip(self, entry), fields(key = %entry.key), err(Debug))]
    pub async fn remove_favorite(&self, entry: &Entry) -> DsResult<bool> {
        let Some(space_id) = self.selected_space() else {
            debug!("no space selected, not removing favorite");
            return Ok(false);
        };

        let result = self
            .remote
            .remove_favorite(space_id, &[PathItem::from(entry)])
            .await
            .map_err(DsErr::from);

        if let Err(err) = result {
            self.events.error(&err.kind);
            self.invalidate_favorite_views(space_id);
            return Err(err);
        }

        self.favorites.remove_matching(entry);
        self.favorites_mutated(space_id);
        Ok(true)
    }

    /// Adds or removes the bookmark for `entry`, whichever the ledger offers.
    pub async fn toggle_favorite(&self, entry: &Entry) -> DsResult<bool> {
        if self.should_offer_remove(entry) {
            self.remove_favorite(entry).await
        } else {
            self.add_favorite(entry).await
        }
    }

    fn favorites_mutated(&self, space_id: SpaceId) {
        self.events.favorites_changed(space_id);
        self.invalidate_favorite_views(space_id);
    }

    fn invalidate_favorite_views(&self, space_id: SpaceId) {
        self.listings.invalidate_where(|source| match source {
            ListingSource::Favorites { space_id: s } | ListingSource::Browse { space_id: s, .. } => {
                *s == space_id
            }
            _ => false,
        });
    }
}
