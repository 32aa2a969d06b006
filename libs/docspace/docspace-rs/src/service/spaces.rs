use std::sync::{Arc, Mutex, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::model::entry::{Space, SpaceId};
use crate::model::errors::{DsErr, DsResult};
use crate::DocSpace;

/// Spaces visible to the user, fetched once per session, and the current selection.
#[derive(Clone, Default)]
pub struct SpaceList {
    spaces: Arc<RwLock<Vec<Space>>>,
    selected: Arc<RwLock<Option<SpaceId>>>,
    /// The outstanding list request; a newer one cancels it.
    in_flight: Arc<Mutex<InFlight>>,
}

#[derive(Default)]
struct InFlight {
    next_id: u64,
    current: Option<(u64, CancellationToken)>,
}

impl SpaceList {
    fn start_request(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = in_flight.next_id;
        in_flight.next_id += 1;
        if let Some((_, previous)) = in_flight.current.replace((id, token.clone())) {
            debug!("superseding space list request");
            previous.cancel();
        }
        (id, token)
    }

    fn finish_request(&self, id: u64) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // a newer request may have taken the slot already
        if in_flight.current.as_ref().is_some_and(|(current, _)| *current == id) {
            in_flight.current = None;
        }
    }

    pub fn all(&self) -> Vec<Space> {
        self.spaces
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store(&self, spaces: Vec<Space>) {
        *self
            .spaces
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = spaces;
    }

    pub fn selected(&self) -> Option<SpaceId> {
        *self
            .selected
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns whether the selection changed.
    fn select(&self, space_id: Option<SpaceId>) -> bool {
        let mut selected = self
            .selected
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *selected == space_id {
            false
        } else {
            *selected = space_id;
            true
        }
    }
}

impl DocSpace {
    pub fn spaces(&self) -> Vec<Space> {
        self.spaces.all()
    }

    pub fn selected_space(&self) -> Option<SpaceId> {
        self.spaces.selected()
    }

    /// Fetches the space list. At most one request is outstanding: starting
    /// a new one cancels the previous, which then resolves to `None`.
    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn refresh_spaces(&self) -> DsResult<Option<Vec<Space>>> {
        let (id, token) = self.spaces.start_request();

        let result = tokio::select! {
            _ = token.cancelled() => None,
            result = self.remote.list_spaces() => Some(result),
        };
        self.spaces.finish_request(id);

        let Some(result) = result else {
            return Ok(None);
        };
        if token.is_cancelled() {
            return Ok(None);
        }

        match result {
            Ok(spaces) => {
                debug!(count = spaces.len(), "spaces fetched");
                self.spaces.store(spaces.clone());
                self.events.spaces_changed();
                Ok(Some(spaces))
            }
            Err(err) => {
                let err = DsErr::from(err);
                self.events.error(&err.kind);
                Err(err)
            }
        }
    }

    /// Changes the selected space. A change forgets cached privileges, starts
    /// resolving those of the new space, and reloads the favorites ledger.
    #[instrument(level = "debug", skip(self), err(Debug))]
    pub async fn select_space(&self, space_id: Option<SpaceId>) -> DsResult<()> {
        if !self.spaces.select(space_id) {
            return Ok(());
        }

        self.privileges.reset();
        self.favorites.replace(vec![]);

        let Some(space_id) = space_id else {
            return Ok(());
        };

        // resolves in the background; readers fail closed until it lands
        let _ = self
            .privileges
            .populate(self.remote.clone(), self.events.clone(), space_id);

        if let Err(err) = self.load_favorites(space_id).await {
            self.events.error(&err.kind);
            return Err(err);
        }
        Ok(())
    }
}
