use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entry::{Entry, FavoriteEntry, PathItem, Space, SpaceId};
use crate::model::member::Member;
use crate::model::privilege::RawPrivilege;

pub type RemoteResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    Endpoint { status: u16, reason: Option<String> },
    Forbidden,
    /// The server refused a change that conflicts with existing state.
    Conflict(String),
    Cancelled,
    Serialize(String),
    SendFailed(String),
    ReceiveFailed(String),
    Deserialize(String),
}

impl ApiError {
    /// The request never completed, as opposed to the server refusing it.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::SendFailed(_) | ApiError::ReceiveFailed(_) | ApiError::Cancelled)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Endpoint { status, reason: Some(reason) } => write!(f, "{status}: {reason}"),
            ApiError::Endpoint { status, reason: None } => write!(f, "status {status}"),
            ApiError::Forbidden => write!(f, "forbidden"),
            ApiError::Conflict(reason) => write!(f, "conflict: {reason}"),
            ApiError::Cancelled => write!(f, "cancelled"),
            ApiError::Serialize(e)
            | ApiError::SendFailed(e)
            | ApiError::ReceiveFailed(e)
            | ApiError::Deserialize(e) => write!(f, "{e}"),
        }
    }
}

/// Where a page starts. Token-paged listings fill `cursor`, offset-paged
/// listings fill `offset`; `limit` is always the page size.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub offset: Option<usize>,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { cursor: None, offset: None, limit }
    }

    pub fn at_cursor(cursor: String, limit: usize) -> Self {
        Self { cursor: Some(cursor), offset: None, limit }
    }

    pub fn at_offset(offset: usize, limit: usize) -> Self {
        Self { cursor: None, offset: Some(offset), limit }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListPage {
    pub items: Vec<Entry>,
    /// Continuation for the following page, `None` when the listing is exhausted.
    pub next_cursor: Option<String>,
}

/// Operations of the remote document store this library relies on. Every
/// listing has the same page shape.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn list_spaces(&self) -> RemoteResult<Vec<Space>>;

    async fn list_at_path(
        &self, space_id: SpaceId, path: &str, page: PageRequest,
    ) -> RemoteResult<ListPage>;
    async fn list_archived(&self, page: PageRequest) -> RemoteResult<ListPage>;
    async fn list_recents(&self, space_id: SpaceId, page: PageRequest) -> RemoteResult<ListPage>;
    async fn list_favorites(&self, space_id: SpaceId, page: PageRequest)
        -> RemoteResult<ListPage>;
    async fn search(
        &self, space_id: SpaceId, query: &str, page: PageRequest,
    ) -> RemoteResult<ListPage>;

    async fn batch_copy(
        &self, dest_space_id: SpaceId, source_space_id: SpaceId, items: &IndexMap<String, String>,
    ) -> RemoteResult<()>;
    async fn batch_move(
        &self, dest_space_id: SpaceId, source_space_id: SpaceId, items: &IndexMap<String, String>,
    ) -> RemoteResult<()>;
    async fn batch_archive(
        &self, space_id: SpaceId, path: &str, keys: &[String],
    ) -> RemoteResult<()>;
    async fn batch_unarchive(
        &self, space_id: SpaceId, qualified_paths: &[String],
    ) -> RemoteResult<()>;
    async fn purge(&self, space_id: SpaceId, path: &str, keys: &[String]) -> RemoteResult<()>;
    async fn rename(
        &self, space_id: SpaceId, path: &str, key: &str, new_name: &str,
    ) -> RemoteResult<()>;

    async fn add_favorite(&self, space_id: SpaceId, items: &[PathItem]) -> RemoteResult<()>;
    async fn remove_favorite(&self, space_id: SpaceId, items: &[PathItem]) -> RemoteResult<()>;
    async fn get_favorites(&self, space_id: SpaceId) -> RemoteResult<Vec<FavoriteEntry>>;

    async fn get_privileges(&self, space_id: SpaceId) -> RemoteResult<BTreeSet<RawPrivilege>>;
    async fn get_members(&self, space_id: SpaceId) -> RemoteResult<Vec<Member>>;
    async fn set_member_privileges(
        &self, space_id: SpaceId, member_id: Uuid, grants: &BTreeSet<RawPrivilege>,
    ) -> RemoteResult<()>;
}
