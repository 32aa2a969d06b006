use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::path_ops;

pub type SpaceId = Uuid;

/// One file or folder, as returned by a listing call. Entries are snapshots:
/// they are replaced wholesale on refetch and never patched in place.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Name of the entry within its folder.
    pub key: String,
    /// Normalized path of the containing folder, empty at the space root.
    pub path: String,
    pub space_id: SpaceId,
    pub size: u64,
    /// Milliseconds since the unix epoch.
    pub last_modified_at: i64,
    pub modified_by: String,
    pub is_folder: bool,
    pub has_contents: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryIdentity {
    pub space_id: SpaceId,
    pub path: String,
    pub key: String,
}

impl Entry {
    pub fn identity(&self) -> EntryIdentity {
        EntryIdentity {
            space_id: self.space_id,
            path: path_ops::normalize(&self.path),
            key: self.key.clone(),
        }
    }

    pub fn full_path(&self) -> String {
        path_ops::qualified_path(&self.path, &self.key)
    }

    pub fn is_same_node(&self, other: &Entry) -> bool {
        self.identity() == other.identity()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
}

/// A bookmark pointing at an entry. Not an owning copy of the entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    /// `None` for a placeholder synthesized locally before the ledger is refetched.
    pub id: Option<Uuid>,
    pub space_id: SpaceId,
    pub key: String,
    pub path: String,
    pub is_folder: bool,
}

impl FavoriteEntry {
    pub fn placeholder(entry: &Entry) -> Self {
        Self {
            id: None,
            space_id: entry.space_id,
            key: entry.key.clone(),
            path: path_ops::normalize(&entry.path),
            is_folder: entry.is_folder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id.is_none()
    }

    /// Ledger records are matched by `(key, path)`, the only identity the UI
    /// has for an entry at the moment it acts on it.
    pub fn points_at(&self, entry: &Entry) -> bool {
        self.key == entry.key && path_ops::normalize(&self.path) == path_ops::normalize(&entry.path)
    }
}

/// The `(key, path)` pair the favorites endpoints take.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PathItem {
    pub key: String,
    pub path: String,
    pub is_folder: bool,
}

impl From<&Entry> for PathItem {
    fn from(entry: &Entry) -> Self {
        Self {
            key: entry.key.clone(),
            path: path_ops::normalize(&entry.path),
            is_folder: entry.is_folder,
        }
    }
}
