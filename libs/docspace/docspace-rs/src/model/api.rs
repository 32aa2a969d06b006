//! Request and response bodies used by [crate::io::network::Network]. Each
//! request knows its route and method; the response type is what a 2xx body
//! deserializes to.

use std::collections::BTreeSet;
use std::fmt::Debug;

use indexmap::IndexMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::{Entry, FavoriteEntry, PathItem, Space, SpaceId};
use super::member::Member;
use super::privilege::RawPrivilege;
use crate::io::remote::{ListPage, PageRequest};

pub trait Request: Serialize + 'static {
    type Response: Debug + DeserializeOwned + Clone;
    const METHOD: Method;
    const ROUTE: &'static str;
}

/// Body of a non-2xx response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub reason: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListPageResponse {
    pub items: Vec<Entry>,
    pub next_cursor: Option<String>,
}

impl From<ListPageResponse> for ListPage {
    fn from(response: ListPageResponse) -> Self {
        ListPage { items: response.items, next_cursor: response.next_cursor }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Empty {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListSpacesRequest {}

impl Request for ListSpacesRequest {
    type Response = Vec<Space>;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/spaces";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListAtPathRequest {
    pub space_id: SpaceId,
    pub path: String,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl Request for ListAtPathRequest {
    type Response = ListPageResponse;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/entries/list";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListArchivedRequest {
    #[serde(flatten)]
    pub page: PageRequest,
}

impl Request for ListArchivedRequest {
    type Response = ListPageResponse;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/archive/list";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListRecentsRequest {
    pub space_id: SpaceId,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl Request for ListRecentsRequest {
    type Response = ListPageResponse;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/entries/recents";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListFavoritesRequest {
    pub space_id: SpaceId,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl Request for ListFavoritesRequest {
    type Response = ListPageResponse;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/favorites/entries";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub space_id: SpaceId,
    pub query: String,
    #[serde(flatten)]
    pub page: PageRequest,
}

impl Request for SearchRequest {
    type Response = ListPageResponse;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/entries/search";
}

/// Shared by copy and move: sources are paths in `source_space_id`,
/// destinations paths in `dest_space_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchTransferRequest {
    pub dest_space_id: SpaceId,
    pub source_space_id: SpaceId,
    pub items: IndexMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BatchCopyRequest(pub BatchTransferRequest);

impl Request for BatchCopyRequest {
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/entries/copy";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BatchMoveRequest(pub BatchTransferRequest);

impl Request for BatchMoveRequest {
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/entries/move";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchArchiveRequest {
    pub space_id: SpaceId,
    pub path: String,
    pub keys: Vec<String>,
}

impl Request for BatchArchiveRequest {
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/archive";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchUnarchiveRequest {
    pub space_id: SpaceId,
    pub qualified_paths: Vec<String>,
}

impl Request for BatchUnarchiveRequest {
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/archive/restore";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PurgeRequest {
    pub space_id: SpaceId,
    pub path: String,
    pub keys: Vec<String>,
}

impl Request for PurgeRequest {
    type Response = Empty;
    const METHOD: Method = Method::DELETE;
    const ROUTE: &'static str = "/archive";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub space_id: SpaceId,
    pub path: String,
    pub key: String,
    pub new_name: String,
}

impl Request for RenameRequest {
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/entries/rename";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItemsRequest {
    pub space_id: SpaceId,
    pub items: Vec<PathItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AddFavoriteRequest(pub FavoriteItemsRequest);

impl Request for AddFavoriteRequest {
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const ROUTE: &'static str = "/favorites";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RemoveFavoriteRequest(pub FavoriteItemsRequest);

impl Request for RemoveFavoriteRequest {
    type Response = Empty;
    const METHOD: Method = Method::DELETE;
    const ROUTE: &'static str = "/favorites";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetFavoritesRequest {
    pub space_id: SpaceId,
}

impl Request for GetFavoritesRequest {
    type Response = Vec<FavoriteEntry>;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/favorites";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetPrivilegesRequest {
    pub space_id: SpaceId,
}

impl Request for GetPrivilegesRequest {
    type Response = BTreeSet<RawPrivilege>;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/privileges";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetMembersRequest {
    pub space_id: SpaceId,
}

impl Request for GetMembersRequest {
    type Response = Vec<Member>;
    const METHOD: Method = Method::GET;
    const ROUTE: &'static str = "/members";
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetMemberPrivilegesRequest {
    pub space_id: SpaceId,
    pub member_id: Uuid,
    pub grants: BTreeSet<RawPrivilege>,
}

impl Request for SetMemberPrivilegesRequest {
    type Response = Empty;
    const METHOD: Method = Method::PUT;
    const ROUTE: &'static str = "/members/privileges";
}
