use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, StatusCode};
use tracing::*;
use uuid::Uuid;

use crate::get_code_version;
use crate::io::remote::{ApiError, ListPage, PageRequest, Remote, RemoteResult};
use crate::model::api::*;
use crate::model::entry::{FavoriteEntry, PathItem, Space, SpaceId};
use crate::model::member::Member;
use crate::model::privilege::RawPrivilege;

/// [Remote] over the console's json api.
#[derive(Debug, Clone)]
pub struct Network {
    pub client: Client,
    pub api_url: String,
    pub token: Option<String>,
    pub get_code_version: fn() -> &'static str,
}

impl Network {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self { client: Default::default(), api_url: api_url.into(), token, get_code_version }
    }

    #[instrument(level = "debug", skip(self, request), fields(route=T::ROUTE), err(Debug))]
    pub async fn request<T: Request>(&self, request: T) -> Result<T::Response, ApiError> {
        let client_version = String::from((self.get_code_version)());

        let serialized_request =
            serde_json::to_vec(&request).map_err(|err| ApiError::Serialize(err.to_string()))?;

        let mut builder = self
            .client
            .request(T::METHOD, format!("{}{}", self.api_url, T::ROUTE).as_str())
            .body(serialized_request)
            .header("Content-Type", "application/json")
            .header("Accept-Version", client_version);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        // failures surface to the caller, nothing is resent
        let start = Instant::now();
        let sent = builder
            .send()
            .await
            .map_err(|err| ApiError::SendFailed(err.to_string()))?;
        if start.elapsed() > Duration::from_millis(1000) {
            warn!("network request took {:?}", start.elapsed());
        }

        let status = sent.status();
        let serialized_response = sent
            .bytes()
            .await
            .map_err(|err| ApiError::ReceiveFailed(err.to_string()))?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<ErrorBody>(&serialized_response)
                .ok()
                .and_then(|body| body.reason);
            return Err(match status {
                StatusCode::FORBIDDEN => ApiError::Forbidden,
                StatusCode::CONFLICT => ApiError::Conflict(reason.unwrap_or_default()),
                _ => ApiError::Endpoint { status: status.as_u16(), reason },
            });
        }

        // mutations may answer with no body at all
        let body: &[u8] =
            if serialized_response.is_empty() { b"{}" } else { &serialized_response };
        serde_json::from_slice(body).map_err(|err| ApiError::Deserialize(err.to_string()))
    }
}

#[async_trait]
impl Remote for Network {
    async fn list_spaces(&self) -> RemoteResult<Vec<Space>> {
        self.request(ListSpacesRequest {}).await
    }

    async fn list_at_path(
        &self, space_id: SpaceId, path: &str, page: PageRequest,
    ) -> RemoteResult<ListPage> {
        let req = ListAtPathRequest { space_id, path: path.to_string(), page };
        Ok(self.request(req).await?.into())
    }

    async fn list_archived(&self, page: PageRequest) -> RemoteResult<ListPage> {
        Ok(self.request(ListArchivedRequest { page }).await?.into())
    }

    async fn list_recents(&self, space_id: SpaceId, page: PageRequest) -> RemoteResult<ListPage> {
        Ok(self.request(ListRecentsRequest { space_id, page }).await?.into())
    }

    async fn list_favorites(
        &self, space_id: SpaceId, page: PageRequest,
    ) -> RemoteResult<ListPage> {
        Ok(self.request(ListFavoritesRequest { space_id, page }).await?.into())
    }

    async fn search(
        &self, space_id: SpaceId, query: &str, page: PageRequest,
    ) -> RemoteResult<ListPage> {
        let req = SearchRequest { space_id, query: query.to_string(), page };
        Ok(self.request(req).await?.into())
    }

    async fn batch_copy(
        &self, dest_space_id: SpaceId, source_space_id: SpaceId, items: &IndexMap<String, String>,
    ) -> RemoteResult<()> {
        let req = BatchTransferRequest { dest_space_id, source_space_id, items: items.clone() };
        self.request(BatchCopyRequest(req)).await.map(|_| ())
    }

    async fn batch_move(
        &self, dest_space_id: SpaceId, source_space_id: SpaceId, items: &IndexMap<String, String>,
    ) -> RemoteResult<()> {
        let req = BatchTransferRequest { dest_space_id, source_space_id, items: items.clone() };
        self.request(BatchMoveRequest(req)).await.map(|_| ())
    }

    async fn batch_archive(
        &self, space_id: SpaceId, path: &str, keys: &[String],
    ) -> RemoteResult<()> {
        let req = BatchArchiveRequest { space_id, path: path.to_string(), keys: keys.to_vec() };
        self.request(req).await.map(|_| ())
    }

    async fn batch_unarchive(
        &self, space_id: SpaceId, qualified_paths: &[String],
    ) -> RemoteResult<()> {
        let req = BatchUnarchiveRequest { space_id, qualified_paths: qualified_paths.to_vec() };
        self.request(req).await.map(|_| ())
    }

    async fn purge(&self, space_id: SpaceId, path: &str, keys: &[String]) -> RemoteResult<()> {
        let req = PurgeRequest { space_id, path: path.to_string(), keys: keys.to_vec() };
        self.request(req).await.map(|_| ())
    }

    async fn rename(
        &self, space_id: SpaceId, path: &str, key: &str, new_name: &str,
    ) -> RemoteResult<()> {
        let req = RenameRequest {
            space_id,
            path: path.to_string(),
            key: key.to_string(),
            new_name: new_name.to_string(),
        };
        self.request(req).await.map(|_| ())
    }

    async fn add_favorite(&self, space_id: SpaceId, items: &[PathItem]) -> RemoteResult<()> {
        let req = FavoriteItemsRequest { space_id, items: items.to_vec() };
        self.request(AddFavoriteRequest(req)).await.map(|_| ())
    }

    async fn remove_favorite(&self, space_id: SpaceId, items: &[PathItem]) -> RemoteResult<()> {
        let req = FavoriteItemsRequest { space_id, items: items.to_vec() };
        self.request(RemoveFavoriteRequest(req)).await.map(|_| ())
    }

    async fn get_favorites(&self, space_id: SpaceId) -> RemoteResult<Vec<FavoriteEntry>> {
        self.request(GetFavoritesRequest { space_id }).await
    }

    async fn get_privileges(&self, space_id: SpaceId) -> RemoteResult<BTreeSet<RawPrivilege>> {
        self.request(GetPrivilegesRequest { space_id }).await
    }

    async fn get_members(&self, space_id: SpaceId) -> RemoteResult<Vec<Member>> {
        self.request(GetMembersRequest { space_id }).await
    }

    async fn set_member_privileges(
        &self, space_id: SpaceId, member_id: Uuid, grants: &BTreeSet<RawPrivilege>,
    ) -> RemoteResult<()> {
        let req = SetMemberPrivilegesRequest { space_id, member_id, grants: grants.clone() };
        self.request(req).await.map(|_| ())
    }
}
