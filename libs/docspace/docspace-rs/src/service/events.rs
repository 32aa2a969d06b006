pub use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::*;

use crate::model::entry::SpaceId;
use crate::model::errors::DsErrKind;
use crate::service::listing::ListingSource;
use crate::DocSpace;

#[derive(Clone)]
pub struct EventSubs {
    tx: Sender<Event>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The view with this identity should refetch.
    ListingInvalidated(ListingSource),

    /// Something the user should see as a transient notification.
    Notice(Notice),

    SpacesChanged,

    PrivilegesChanged(SpaceId),

    FavoritesChanged(SpaceId),

    ClipboardChanged,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The server answered a listing request with an error.
    FetchFailed,
    Error(String),
    NothingToPaste,
    Success(String),
}

impl Notice {
    /// Listing failures read differently depending on whether the server
    /// answered at all.
    pub fn for_fetch(err: &DsErrKind) -> Self {
        if err.is_transport() {
            Notice::Error(err.to_string())
        } else {
            Notice::FetchFailed
        }
    }
}

impl Default for EventSubs {
    fn default() -> Self {
        let (tx, _) = broadcast::channel::<Event>(10000);
        Self { tx }
    }
}

impl EventSubs {
    pub(crate) fn listing_invalidated(&self, source: ListingSource) {
        self.queue(Event::ListingInvalidated(source));
    }

    pub(crate) fn notice(&self, notice: Notice) {
        self.queue(Event::Notice(notice));
    }

    pub(crate) fn error(&self, err: &DsErrKind) {
        self.queue(Event::Notice(Notice::Error(err.to_string())));
    }

    pub(crate) fn spaces_changed(&self) {
        self.queue(Event::SpacesChanged);
    }

    pub(crate) fn privileges_changed(&self, space_id: SpaceId) {
        self.queue(Event::PrivilegesChanged(space_id));
    }

    pub(crate) fn favorites_changed(&self, space_id: SpaceId) {
        self.queue(Event::FavoritesChanged(space_id));
    }

    pub(crate) fn clipboard_changed(&self) {
        self.queue(Event::ClipboardChanged);
    }

    fn queue(&self, evt: Event) {
        // nobody listening is normal for a headless session
        if self.tx.receiver_count() == 0 {
            trace!(?evt, "no subscribers");
            return;
        }
        if let Err(e) = self.tx.send(evt.clone()) {
            error!(?evt, ?e, "could not queue");
        }
    }

    pub fn subscribe(&self) -> Receiver<Event> {
        self.tx.subscribe()
    }
}

impl DocSpace {
    pub fn subscribe(&self) -> Receiver<Event> {
        self.events.subscribe()
    }
}
