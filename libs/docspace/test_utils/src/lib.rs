pub mod assert;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use docspace_rs::io::remote::{ApiError, ListPage, PageRequest, Remote, RemoteResult};
use docspace_rs::model::core_config::{Config, ListingOptions};
use docspace_rs::model::entry::{Entry, FavoriteEntry, PathItem, Space, SpaceId};
use docspace_rs::model::member::{Member, MemberKind, PrivilegeRecord, User, UserRole};
use docspace_rs::model::path_ops;
use docspace_rs::model::privilege::RawPrivilege;
use docspace_rs::DocSpace;
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use uuid::Uuid;

pub fn test_config() -> Config {
    Config {
        writeable_path: format!("/tmp/{}", Uuid::new_v4()),
        logs: false,
        stdout_logs: false,
        colored_logs: false,
        api_url: "http://localhost:8000".to_string(),
        listing: ListingOptions::default(),
    }
}

pub async fn test_session(remote: &InMemoryRemote) -> DocSpace {
    test_session_with(remote, ListingOptions::default()).await
}

pub async fn test_session_with(remote: &InMemoryRemote, listing: ListingOptions) -> DocSpace {
    let config = Config { listing, ..test_config() };
    DocSpace::init(config, Arc::new(remote.clone())).await.unwrap()
}

/// A session with one selected space in which the user holds `grants`,
/// already resolved.
pub async fn session_in_space(grants: &[RawPrivilege]) -> (DocSpace, InMemoryRemote, SpaceId) {
    let remote = InMemoryRemote::default();
    let space_id = remote.add_space("engineering", grants);
    let ds = test_session(&remote).await;
    ds.select_space(Some(space_id)).await.unwrap();
    ds.populate_privileges(space_id).await.unwrap();
    (ds, remote, space_id)
}

pub fn global_admin() -> User {
    User { name: "root".to_string(), role: UserRole::GlobalAdmin }
}

pub fn file(space_id: SpaceId, path: &str, key: &str) -> Entry {
    entry(space_id, path, key, false)
}

pub fn folder(space_id: SpaceId, path: &str, key: &str) -> Entry {
    entry(space_id, path, key, true)
}

pub fn entry(space_id: SpaceId, path: &str, key: &str, is_folder: bool) -> Entry {
    Entry {
        key: key.to_string(),
        path: path_ops::normalize(path),
        space_id,
        size: if is_folder { 0 } else { 1024 },
        last_modified_at: 1_700_000_000_000,
        modified_by: "tester".to_string(),
        is_folder,
        has_contents: false,
    }
}

pub fn member(name: &str, grants: &[RawPrivilege]) -> Member {
    Member {
        id: Uuid::new_v4(),
        name: name.to_string(),
        kind: MemberKind::User,
        records: grants
            .iter()
            .map(|privilege| PrivilegeRecord { id: Uuid::new_v4(), privilege: *privilege })
            .collect(),
    }
}

pub fn keys(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.key.as_str()).collect()
}

/// Every remote call the library made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListSpaces,
    ListAtPath { space_id: SpaceId, path: String, page: PageRequest },
    ListArchived { page: PageRequest },
    ListRecents { space_id: SpaceId, page: PageRequest },
    ListFavorites { space_id: SpaceId, page: PageRequest },
    Search { space_id: SpaceId, query: String, page: PageRequest },
    BatchCopy { dest: SpaceId, source: SpaceId, items: IndexMap<String, String> },
    BatchMove { dest: SpaceId, source: SpaceId, items: IndexMap<String, String> },
    BatchArchive { space_id: SpaceId, path: String, keys: Vec<String> },
    BatchUnarchive { space_id: SpaceId, qualified_paths: Vec<String> },
    Purge { space_id: SpaceId, path: String, keys: Vec<String> },
    Rename { space_id: SpaceId, path: String, key: String, new_name: String },
    AddFavorite { space_id: SpaceId, items: Vec<PathItem> },
    RemoveFavorite { space_id: SpaceId, items: Vec<PathItem> },
    GetFavorites(SpaceId),
    GetPrivileges(SpaceId),
    GetMembers(SpaceId),
    SetMemberPrivileges { space_id: SpaceId, member_id: Uuid, grants: BTreeSet<RawPrivilege> },
}

impl Call {
    pub fn op(&self) -> &'static str {
        match self {
            Call::ListSpaces => "list_spaces",
            Call::ListAtPath { .. } => "list_at_path",
            Call::ListArchived { .. } => "list_archived",
            Call::ListRecents { .. } => "list_recents",
            Call::ListFavorites { .. } => "list_favorites",
            Call::Search { .. } => "search",
            Call::BatchCopy { .. } => "batch_copy",
            Call::BatchMove { .. } => "batch_move",
            Call::BatchArchive { .. } => "batch_archive",
            Call::BatchUnarchive { .. } => "batch_unarchive",
            Call::Purge { .. } => "purge",
            Call::Rename { .. } => "rename",
            Call::AddFavorite { .. } => "add_favorite",
            Call::RemoveFavorite { .. } => "remove_favorite",
            Call::GetFavorites(_) => "get_favorites",
            Call::GetPrivileges(_) => "get_privileges",
            Call::GetMembers(_) => "get_members",
            Call::SetMemberPrivileges { .. } => "set_member_privileges",
        }
    }
}

#[derive(Default)]
pub struct RemoteState {
    pub spaces: Vec<Space>,
    pub entries: HashMap<SpaceId, Vec<Entry>>,
    pub archived: Vec<Entry>,
    pub favorites: HashMap<SpaceId, Vec<FavoriteEntry>>,
    pub privileges: HashMap<SpaceId, BTreeSet<RawPrivilege>>,
    pub members: HashMap<SpaceId, Vec<Member>>,
    pub calls: Vec<Call>,
    failures: HashMap<&'static str, ApiError>,
    gates: HashMap<&'static str, Arc<Semaphore>>,
}

/// An in-process document store. Cursors are stringified row offsets.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl InMemoryRemote {
    pub fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }

    pub fn add_space(&self, name: &str, grants: &[RawPrivilege]) -> SpaceId {
        let id = Uuid::new_v4();
        let mut state = self.state();
        state.spaces.push(Space { id, name: name.to_string() });
        state
            .privileges
            .insert(id, grants.iter().copied().collect());
        id
    }

    pub fn add_entries(&self, entries: impl IntoIterator<Item = Entry>) {
        let mut state = self.state();
        for entry in entries {
            state.entries.entry(entry.space_id).or_default().push(entry);
        }
    }

    pub fn add_archived(&self, entries: impl IntoIterator<Item = Entry>) {
        self.state().archived.extend(entries);
    }

    pub fn add_member(&self, space_id: SpaceId, member: Member) {
        self.state()
            .members
            .entry(space_id)
            .or_default()
            .push(member);
    }

    pub fn entries_in(&self, space_id: SpaceId, path: &str) -> Vec<Entry> {
        let path = path_ops::normalize(path);
        self.state()
            .entries
            .get(&space_id)
            .map(|entries| entries.iter().filter(|e| e.path == path).cloned().collect())
            .unwrap_or_default()
    }

    /// Makes `op` fail with `err` until [Self::heal] is called.
    pub fn fail(&self, op: &'static str, err: ApiError) {
        self.state().failures.insert(op, err);
    }

    pub fn heal(&self, op: &'static str) {
        self.state().failures.remove(op);
    }

    /// Calls to `op` are recorded but do not answer until [Self::release].
    pub fn hold(&self, op: &'static str) {
        self.state()
            .gates
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, op: &'static str) {
        if let Some(gate) = self.state().gates.remove(op) {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn calls_to(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op() == op).collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    async fn enter(&self, call: Call) -> RemoteResult<()> {
        let op = call.op();
        let gate = {
            let mut state = self.state();
            state.calls.push(call);
            state.gates.get(op).cloned()
        };
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        match self.state().failures.get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn paged(entries: Vec<Entry>, page: &PageRequest) -> ListPage {
    let start = match (&page.cursor, page.offset) {
        (Some(cursor), _) => cursor.parse().unwrap_or(0),
        (None, Some(offset)) => offset,
        (None, None) => 0,
    };
    let end = (start + page.limit).min(entries.len());
    let items = entries.get(start..end).map(<[Entry]>::to_vec).unwrap_or_default();
    let next_cursor = if end < entries.len() { Some(end.to_string()) } else { None };
    ListPage { items, next_cursor }
}

fn split(qualified: &str) -> (String, String) {
    (path_ops::parent(qualified), path_ops::basename(qualified))
}

#[async_trait]
impl Remote for InMemoryRemote {
    async fn list_spaces(&self) -> RemoteResult<Vec<Space>> {
        self.enter(Call::ListSpaces).await?;
        Ok(self.state().spaces.clone())
    }

    async fn list_at_path(
        &self, space_id: SpaceId, path: &str, page: PageRequest,
    ) -> RemoteResult<ListPage> {
        self.enter(Call::ListAtPath { space_id, path: path.to_string(), page: page.clone() })
            .await?;
        Ok(paged(self.entries_in(space_id, path), &page))
    }

    async fn list_archived(&self, page: PageRequest) -> RemoteResult<ListPage> {
        self.enter(Call::ListArchived { page: page.clone() }).await?;
        Ok(paged(self.state().archived.clone(), &page))
    }

    async fn list_recents(&self, space_id: SpaceId, page: PageRequest) -> RemoteResult<ListPage> {
        self.enter(Call::ListRecents { space_id, page: page.clone() })
            .await?;
        let mut entries = self
            .state()
            .entries
            .get(&space_id)
            .cloned()
            .unwrap_or_default();
        entries.retain(|e| !e.is_folder);
        entries.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
        Ok(paged(entries, &page))
    }

    async fn list_favorites(
        &self, space_id: SpaceId, page: PageRequest,
    ) -> RemoteResult<ListPage> {
        self.enter(Call::ListFavorites { space_id, page: page.clone() })
            .await?;
        let state = self.state();
        let favorites = state.favorites.get(&space_id).cloned().unwrap_or_default();
        let entries = state
            .entries
            .get(&space_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| favorites.iter().any(|f| f.points_at(e)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(paged(entries, &page))
    }

    async fn search(
        &self, space_id: SpaceId, query: &str, page: PageRequest,
    ) -> RemoteResult<ListPage> {
        self.enter(Call::Search { space_id, query: query.to_string(), page: page.clone() })
            .await?;
        let query = query.to_lowercase();
        let entries = self
            .state()
            .entries
            .get(&space_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.key.to_lowercase().contains(&query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(paged(entries, &page))
    }

    async fn batch_copy(
        &self, dest_space_id: SpaceId, source_space_id: SpaceId, items: &IndexMap<String, String>,
    ) -> RemoteResult<()> {
        self.enter(Call::BatchCopy {
            dest: dest_space_id,
            source: source_space_id,
            items: items.clone(),
        })
        .await?;
        let mut state = self.state();
        let source = state.entries.get(&source_space_id).cloned().unwrap_or_default();
        let copies: Vec<Entry> = items
            .iter()
            .filter_map(|(from, to)| {
                let original = source.iter().find(|e| e.full_path() == *from)?;
                let (path, key) = split(to);
                Some(Entry { space_id: dest_space_id, path, key, ..original.clone() })
            })
            .collect();
        state.entries.entry(dest_space_id).or_default().extend(copies);
        Ok(())
    }

    async fn batch_move(
        &self, dest_space_id: SpaceId, source_space_id: SpaceId, items: &IndexMap<String, String>,
    ) -> RemoteResult<()> {
        self.enter(Call::BatchMove {
            dest: dest_space_id,
            source: source_space_id,
            items: items.clone(),
        })
        .await?;
        let mut state = self.state();
        let source = state.entries.entry(source_space_id).or_default();
        let mut moved = Vec::new();
        source.retain(|e| match items.get(&e.full_path()) {
            Some(to) => {
                let (path, key) = split(to);
                moved.push(Entry { space_id: dest_space_id, path, key, ..e.clone() });
                false
            }
            None => true,
        });
        state.entries.entry(dest_space_id).or_default().extend(moved);
        Ok(())
    }

    async fn batch_archive(
        &self, space_id: SpaceId, path: &str, keys: &[String],
    ) -> RemoteResult<()> {
        self.enter(Call::BatchArchive { space_id, path: path.to_string(), keys: keys.to_vec() })
            .await?;
        let mut state = self.state();
        let path = path_ops::normalize(path);
        let mut archived = Vec::new();
        state.entries.entry(space_id).or_default().retain(|e| {
            if e.path == path && keys.contains(&e.key) {
                archived.push(e.clone());
                false
            } else {
                true
            }
        });
        state.archived.extend(archived);
        Ok(())
    }

    async fn batch_unarchive(
        &self, space_id: SpaceId, qualified_paths: &[String],
    ) -> RemoteResult<()> {
        self.enter(Call::BatchUnarchive { space_id, qualified_paths: qualified_paths.to_vec() })
            .await?;
        let mut state = self.state();
        let mut restored = Vec::new();
        state.archived.retain(|e| {
            if e.space_id == space_id && qualified_paths.contains(&e.full_path()) {
                restored.push(e.clone());
                false
            } else {
                true
            }
        });
        state.entries.entry(space_id).or_default().extend(restored);
        Ok(())
    }

    async fn purge(&self, space_id: SpaceId, path: &str, keys: &[String]) -> RemoteResult<()> {
        self.enter(Call::Purge { space_id, path: path.to_string(), keys: keys.to_vec() })
            .await?;
        let path = path_ops::normalize(path);
        self.state()
            .archived
            .retain(|e| !(e.space_id == space_id && e.path == path && keys.contains(&e.key)));
        Ok(())
    }

    async fn rename(
        &self, space_id: SpaceId, path: &str, key: &str, new_name: &str,
    ) -> RemoteResult<()> {
        self.enter(Call::Rename {
            space_id,
            path: path.to_string(),
            key: key.to_string(),
            new_name: new_name.to_string(),
        })
        .await?;
        let mut state = self.state();
        let entries = state.entries.entry(space_id).or_default();
        let path = path_ops::normalize(path);
        if entries.iter().any(|e| e.path == path && e.key == new_name) {
            return Err(ApiError::Conflict(format!("{new_name} already exists")));
        }
        for e in entries.iter_mut().filter(|e| e.path == path && e.key == key) {
            e.key = new_name.to_string();
        }
        Ok(())
    }

    async fn add_favorite(&self, space_id: SpaceId, items: &[PathItem]) -> RemoteResult<()> {
        self.enter(Call::AddFavorite { space_id, items: items.to_vec() })
            .await?;
        let mut state = self.state();
        let favorites = state.favorites.entry(space_id).or_default();
        for item in items {
            favorites.push(FavoriteEntry {
                id: Some(Uuid::new_v4()),
                space_id,
                key: item.key.clone(),
                path: item.path.clone(),
                is_folder: item.is_folder,
            });
        }
        Ok(())
    }

    async fn remove_favorite(&self, space_id: SpaceId, items: &[PathItem]) -> RemoteResult<()> {
        self.enter(Call::RemoveFavorite { space_id, items: items.to_vec() })
            .await?;
        self.state()
            .favorites
            .entry(space_id)
            .or_default()
            .retain(|f| !items.iter().any(|i| i.key == f.key && i.path == f.path));
        Ok(())
    }

    async fn get_favorites(&self, space_id: SpaceId) -> RemoteResult<Vec<FavoriteEntry>> {
        self.enter(Call::GetFavorites(space_id)).await?;
        Ok(self
            .state()
            .favorites
            .get(&space_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_privileges(&self, space_id: SpaceId) -> RemoteResult<BTreeSet<RawPrivilege>> {
        self.enter(Call::GetPrivileges(space_id)).await?;
        Ok(self
            .state()
            .privileges
            .get(&space_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_members(&self, space_id: SpaceId) -> RemoteResult<Vec<Member>> {
        self.enter(Call::GetMembers(space_id)).await?;
        Ok(self
            .state()
            .members
            .get(&space_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_member_privileges(
        &self, space_id: SpaceId, member_id: Uuid, grants: &BTreeSet<RawPrivilege>,
    ) -> RemoteResult<()> {
        self.enter(Call::SetMemberPrivileges { space_id, member_id, grants: grants.clone() })
            .await?;
        let mut state = self.state();
        let member = state
            .members
            .entry(space_id)
            .or_default()
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or(ApiError::Endpoint { status: 404, reason: Some("no such member".into()) })?;
        member.records = grants
            .iter()
            .map(|privilege| PrivilegeRecord { id: Uuid::new_v4(), privilege: *privilege })
            .collect();
        Ok(())
    }
}
