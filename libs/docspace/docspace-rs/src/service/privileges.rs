use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::io::remote::Remote;
use crate::model::entry::SpaceId;
use crate::model::errors::{DsErr, DsErrKind, DsResult};
use crate::model::member::User;
use crate::model::privilege::RawPrivilege;
use crate::service::events::EventSubs;
use crate::DocSpace;

/// What the acting user may do in one space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachedPrivileges {
    pub read: bool,
    pub write: bool,
    pub membership: bool,
    pub loading: bool,
    pub errored: bool,
}

impl CachedPrivileges {
    fn loading() -> Self {
        Self { loading: true, ..Default::default() }
    }

    fn errored() -> Self {
        Self { errored: true, ..Default::default() }
    }

    pub fn from_grants(grants: &BTreeSet<RawPrivilege>) -> Self {
        Self {
            read: grants.contains(&RawPrivilege::Read),
            write: grants.contains(&RawPrivilege::Write),
            membership: grants.contains(&RawPrivilege::Membership),
            loading: false,
            errored: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.loading && !self.errored
    }

    /// Fail-closed: nothing is allowed until the entry has resolved.
    pub fn allows(&self, action: RawPrivilege) -> bool {
        if !self.is_resolved() {
            return false;
        }
        match action {
            RawPrivilege::Read => self.read,
            RawPrivilege::Write => self.write,
            RawPrivilege::Membership => self.membership,
        }
    }
}

type Population = Shared<BoxFuture<'static, Result<CachedPrivileges, DsErrKind>>>;

/// Per-space authorization cache shared by every view of a session.
#[derive(Clone, Default)]
pub struct PrivilegeCache {
    state: Arc<RwLock<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<SpaceId, CachedPrivileges>,
    in_flight: HashMap<SpaceId, Population>,
    cancel: CancellationToken,
    /// Bumped by [PrivilegeCache::reset]; results of older populations are discarded.
    generation: u64,
}

impl PrivilegeCache {
    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, space_id: SpaceId) -> Option<CachedPrivileges> {
        self.read().entries.get(&space_id).copied()
    }

    pub fn is_authorized_for(&self, user: &User, space_id: SpaceId, action: RawPrivilege) -> bool {
        if user.is_global_admin() {
            return true;
        }
        self.get(space_id)
            .is_some_and(|privileges| privileges.allows(action))
    }

    /// Resolves the privileges of `space_id`, issuing at most one remote call
    /// no matter how many callers ask while it is outstanding. The population
    /// runs to completion even if no caller awaits it.
    pub(crate) fn populate(
        &self, remote: Arc<dyn Remote>, events: EventSubs, space_id: SpaceId,
    ) -> Population {
        let mut state = self.write();

        if let Some(cached) = state.entries.get(&space_id) {
            if cached.is_resolved() {
                let cached = *cached;
                return async move { Ok(cached) }.boxed().shared();
            }
        }

        if let Some(population) = state.in_flight.get(&space_id) {
            return population.clone();
        }

        let cancel = state.cancel.clone();
        let generation = state.generation;
        let cache = self.clone();
        let population = async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(DsErrKind::Cancelled),
                grants = remote.get_privileges(space_id) => grants.map_err(DsErrKind::from),
            };
            cache.settle(space_id, generation, result, &events)
        }
        .boxed()
        .shared();

        state.entries.insert(space_id, CachedPrivileges::loading());
        state.in_flight.insert(space_id, population.clone());
        drop(state);

        tokio::spawn(population.clone());
        population
    }

    fn settle(
        &self, space_id: SpaceId, generation: u64, result: Result<BTreeSet<RawPrivilege>, DsErrKind>,
        events: &EventSubs,
    ) -> Result<CachedPrivileges, DsErrKind> {
        let mut state = self.write();
        if state.generation != generation {
            debug!(%space_id, "discarding privileges fetched before a reset");
            return Err(DsErrKind::Cancelled);
        }
        state.in_flight.remove(&space_id);

        match result {
            Ok(grants) => {
                let privileges = CachedPrivileges::from_grants(&grants);
                state.entries.insert(space_id, privileges);
                drop(state);
                debug!(%space_id, ?grants, "privileges resolved");
                events.privileges_changed(space_id);
                Ok(privileges)
            }
            Err(err) => {
                state.entries.insert(space_id, CachedPrivileges::errored());
                drop(state);
                if err != DsErrKind::Cancelled {
                    warn!(%space_id, "could not resolve privileges: {err:?}");
                    events.error(&err);
                }
                Err(err)
            }
        }
    }

    /// Forgets every entry and cancels populations still in flight.
    pub fn reset(&self) {
        let mut state = self.write();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.generation += 1;
        state.entries.clear();
        state.in_flight.clear();
    }
}

impl DocSpace {
    /// Synchronous and fail-closed: `false` while the space's privileges are
    /// loading, unknown or failed to load. Global administrators are always
    /// authorized.
    pub fn is_authorized_for(&self, space_id: SpaceId, action: RawPrivilege) -> bool {
        self.privileges
            .is_authorized_for(&self.user(), space_id, action)
    }

    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn populate_privileges(&self, space_id: SpaceId) -> DsResult<CachedPrivileges> {
        self.privileges
            .populate(self.remote.clone(), self.events.clone(), space_id)
            .await
            .map_err(DsErr::from)
    }

    pub fn reset_privileges(&self) {
        self.privileges.reset();
    }

    /// Checks authorization before a mutation is dispatched. The server stays
    /// the final authority.
    pub(crate) fn require(&self, space_id: SpaceId, action: RawPrivilege) -> DsResult<()> {
        if self.is_authorized_for(space_id, action) {
            Ok(())
        } else {
            Err(DsErrKind::InsufficientPermission.into())
        }
    }
}
