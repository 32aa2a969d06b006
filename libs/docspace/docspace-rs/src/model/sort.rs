//! Client-side ordering of a listing page. The remote store returns entries in
//! storage order, so each page is ordered here before it reaches a view.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::entry::Entry;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SortColumn {
    Name,
    LastModified,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    pub fn reversed(self) -> Self {
        let direction = match self.direction {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        };
        Self { direction, ..self }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self { column: SortColumn::Name, direction: SortDirection::Descending }
    }
}

/// Folders and files are ordered separately and never interleaved. The base
/// order is descending with files ahead of folders; an ascending request is
/// the exact reverse, which puts folders first.
pub fn sort_entries(entries: Vec<Entry>, spec: SortSpec) -> Vec<Entry> {
    let (mut folders, mut files): (Vec<Entry>, Vec<Entry>) =
        entries.into_iter().partition(|e| e.is_folder);

    folders.sort_by(|a, b| ascending(spec.column, a, b).reverse());
    files.sort_by(|a, b| ascending(spec.column, a, b).reverse());

    let mut sorted = files;
    sorted.append(&mut folders);

    if spec.direction == SortDirection::Ascending {
        sorted.reverse();
    }

    sorted
}

fn ascending(column: SortColumn, a: &Entry, b: &Entry) -> Ordering {
    let primary = match column {
        SortColumn::Name => Ordering::Equal,
        SortColumn::LastModified => a.last_modified_at.cmp(&b.last_modified_at),
    };

    // every field takes part so that only identical entries tie
    primary
        .then_with(|| a.key.to_lowercase().cmp(&b.key.to_lowercase()))
        .then_with(|| a.key.cmp(&b.key))
        .then_with(|| a.path.cmp(&b.path))
        .then_with(|| a.space_id.cmp(&b.space_id))
        .then_with(|| a.last_modified_at.cmp(&b.last_modified_at))
        .then_with(|| a.size.cmp(&b.size))
        .then_with(|| a.modified_by.cmp(&b.modified_by))
        .then_with(|| a.has_contents.cmp(&b.has_contents))
}
