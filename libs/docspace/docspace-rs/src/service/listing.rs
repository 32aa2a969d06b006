//! Paginated listings. Every view of the console (browse, recents, search,
//! favorites, archive) owns one [ListingContext] bound to one remote listing
//! operation. Contexts are independent: invalidating one never touches
//! another, and each one's lifetime is tied to its view through a
//! cancellation token.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::io::remote::{ListPage, PageRequest, Remote, RemoteResult};
use crate::model::core_config::ListingOptions;
use crate::model::entry::{Entry, SpaceId};
use crate::model::errors::DsErrKind;
use crate::model::path_ops;
use crate::model::sort::{sort_entries, SortSpec};
use crate::service::events::{EventSubs, Notice};
use crate::DocSpace;

/// Identity of a view. A change of identity resets the view's cursors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase", tag = "view")]
pub enum ListingSource {
    Browse { space_id: SpaceId, path: String },
    Recents { space_id: SpaceId },
    Search { space_id: SpaceId, query: String },
    Favorites { space_id: SpaceId },
    Archive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Browse,
    Recents,
    Search,
    Favorites,
    Archive,
}

enum Paging {
    /// Each page carries the continuation token for the next.
    Token,
    /// Pages are addressed by row offset.
    Offset,
}

impl ListingSource {
    pub fn browse(space_id: SpaceId, path: &str) -> Self {
        Self::Browse { space_id, path: path_ops::normalize(path) }
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            ListingSource::Browse { .. } => ViewKind::Browse,
            ListingSource::Recents { .. } => ViewKind::Recents,
            ListingSource::Search { .. } => ViewKind::Search,
            ListingSource::Favorites { .. } => ViewKind::Favorites,
            ListingSource::Archive => ViewKind::Archive,
        }
    }

    pub fn space_id(&self) -> Option<SpaceId> {
        match self {
            ListingSource::Browse { space_id, .. }
            | ListingSource::Recents { space_id }
            | ListingSource::Search { space_id, .. }
            | ListingSource::Favorites { space_id } => Some(*space_id),
            ListingSource::Archive => None,
        }
    }

    /// Whether this is the browse view of folder `path` in `space`.
    pub fn is_browsing(&self, space: SpaceId, path: &str) -> bool {
        match self {
            ListingSource::Browse { space_id, path: browsed } => {
                *space_id == space && *browsed == path_ops::normalize(path)
            }
            _ => false,
        }
    }

    fn paging(&self) -> Paging {
        match self {
            ListingSource::Browse { .. }
            | ListingSource::Favorites { .. }
            | ListingSource::Archive => Paging::Token,
            ListingSource::Recents { .. } | ListingSource::Search { .. } => Paging::Offset,
        }
    }

    async fn fetch(&self, remote: &dyn Remote, page: PageRequest) -> RemoteResult<ListPage> {
        match self {
            ListingSource::Browse { space_id, path } => {
                remote.list_at_path(*space_id, path, page).await
            }
            ListingSource::Recents { space_id } => remote.list_recents(*space_id, page).await,
            ListingSource::Search { space_id, query } => {
                remote.search(*space_id, query, page).await
            }
            ListingSource::Favorites { space_id } => remote.list_favorites(*space_id, page).await,
            ListingSource::Archive => remote.list_archived(page).await,
        }
    }
}

/// Rows `start_row..end_row` of a listing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowWindow {
    pub start_row: usize,
    pub end_row: usize,
}

impl RowWindow {
    pub fn new(start_row: usize, end_row: usize) -> Self {
        Self { start_row, end_row }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub entries: Vec<Entry>,
    /// Total row count once the final page has been seen, `None` while more
    /// pages may exist.
    pub last_row: Option<usize>,
}

impl Page {
    fn empty_terminal(total: usize) -> Self {
        Self { entries: vec![], last_row: Some(total) }
    }
}

/// Total rows implied by a page of `returned` entries at index `page`.
pub fn last_row_for(page: usize, limit: usize, returned: usize) -> Option<usize> {
    if returned == 0 || returned < limit {
        Some(page * limit + returned)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct ListingContext {
    inner: Arc<ListingInner>,
}

struct ListingInner {
    remote: Arc<dyn Remote>,
    events: EventSubs,
    options: ListingOptions,
    state: Mutex<ListingState>,
    should_refetch: AtomicBool,
    permits: Semaphore,
    lifetime: CancellationToken,
}

struct ListingState {
    source: ListingSource,
    /// Bumped on every identity change so results fetched for an old identity are dropped.
    generation: u64,
    /// Continuation token to use for each page index.
    cursors: HashMap<usize, String>,
    /// Token listings: the page after which the remote reported no further cursor.
    exhausted_after: Option<usize>,
    last_known_total: Option<usize>,
    blocks: IndexMap<usize, Vec<Entry>>,
}

impl ListingState {
    fn new(source: ListingSource) -> Self {
        Self {
            source,
            generation: 0,
            cursors: HashMap::new(),
            exhausted_after: None,
            last_known_total: None,
            blocks: IndexMap::new(),
        }
    }

    fn reset(&mut self, source: ListingSource) {
        let generation = self.generation + 1;
        *self = Self::new(source);
        self.generation = generation;
    }

    fn cache(&mut self, page: usize, entries: Vec<Entry>, max_cached_blocks: usize) {
        if max_cached_blocks == 0 {
            return;
        }
        self.blocks.shift_remove(&page);
        self.blocks.insert(page, entries);
        while self.blocks.len() > max_cached_blocks {
            self.blocks.shift_remove_index(0);
        }
    }
}

enum Plan {
    Cached(Vec<Entry>),
    Fetch(PageRequest),
    Exhausted,
    Unavailable,
}

impl ListingContext {
    fn new(
        remote: Arc<dyn Remote>, events: EventSubs, source: ListingSource, options: ListingOptions,
    ) -> Self {
        let options = options.sanitized();
        Self {
            inner: Arc::new(ListingInner {
                remote,
                events,
                options,
                state: Mutex::new(ListingState::new(source)),
                should_refetch: AtomicBool::new(false),
                permits: Semaphore::new(options.max_concurrent_requests),
                lifetime: CancellationToken::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ListingState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn source(&self) -> ListingSource {
        self.state().source.clone()
    }

    pub fn kind(&self) -> ViewKind {
        self.state().source.kind()
    }

    pub fn options(&self) -> ListingOptions {
        self.inner.options
    }

    pub fn last_known_total(&self) -> Option<usize> {
        self.state().last_known_total
    }

    /// The continuation token recorded for `page`, if any.
    pub fn cursor(&self, page: usize) -> Option<String> {
        self.state().cursors.get(&page).cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lifetime.is_cancelled()
    }

    /// Produces the entries of `window`. `None` means the view was closed
    /// while the page was in flight and the result was dropped.
    ///
    /// A failed fetch still produces a page: empty and terminal, with the
    /// failure reported as a notice, so the view never stays loading.
    #[instrument(level = "debug", skip(self, sort))]
    pub async fn rows(&self, window: RowWindow, sort: Option<SortSpec>) -> Option<Page> {
        if self.is_closed() {
            return None;
        }
        let options = self.inner.options;
        if !options.enabled {
            return Some(Page::empty_terminal(0));
        }

        let limit = options.limit;
        let page = window.start_row / limit;

        let (source, generation, plan) = {
            let state = self.state();
            let plan = if let Some(block) = state.blocks.get(&page) {
                Plan::Cached(block.clone())
            } else if page == 0 {
                Plan::Fetch(PageRequest::first(limit))
            } else {
                match state.source.paging() {
                    Paging::Offset => Plan::Fetch(PageRequest::at_offset(page * limit, limit)),
                    Paging::Token => match state.cursors.get(&page) {
                        Some(cursor) => Plan::Fetch(PageRequest::at_cursor(cursor.clone(), limit)),
                        None if state.exhausted_after.is_some_and(|last| page > last) => {
                            Plan::Exhausted
                        }
                        None => Plan::Unavailable,
                    },
                }
            };
            (state.source.clone(), state.generation, plan)
        };

        let request = match plan {
            Plan::Cached(entries) => {
                let last_row = last_row_for(page, limit, entries.len());
                return Some(self.window(entries, page, window, sort, last_row));
            }
            Plan::Exhausted => {
                let total = self.last_known_total().unwrap_or(page * limit);
                return Some(Page::empty_terminal(total));
            }
            Plan::Unavailable => {
                let err = DsErrKind::CursorUnavailable(page);
                warn!(?source, "{err}");
                self.inner.events.notice(Notice::for_fetch(&err));
                return Some(Page::empty_terminal(0));
            }
            Plan::Fetch(request) => request,
        };

        let result = tokio::select! {
            _ = self.inner.lifetime.cancelled() => return None,
            result = self.fetch(&source, request) => result,
        };

        if self.is_closed() {
            return None;
        }

        let mut state = self.state();
        if state.generation != generation {
            debug!(?source, "dropping page fetched for a previous identity");
            return None;
        }

        match result {
            Ok(list) => {
                let returned = list.items.len();
                match list.next_cursor {
                    Some(cursor) => {
                        state.cursors.insert(page + 1, cursor);
                    }
                    None => state.exhausted_after = Some(page),
                }
                let last_row = last_row_for(page, limit, returned);
                if last_row.is_some() {
                    state.last_known_total = last_row;
                }
                state.cache(page, list.items.clone(), options.max_cached_blocks);
                drop(state);

                debug!(?source, page, returned, ?last_row, "page fetched");
                Some(self.window(list.items, page, window, sort, last_row))
            }
            Err(err) => {
                drop(state);
                let kind = DsErrKind::from(err);
                warn!(?source, page, "listing failed: {kind:?}");
                self.inner.events.notice(Notice::for_fetch(&kind));
                Some(Page::empty_terminal(0))
            }
        }
    }

    async fn fetch(&self, source: &ListingSource, request: PageRequest) -> RemoteResult<ListPage> {
        // the semaphore is never closed
        let _permit = self.inner.permits.acquire().await;
        source.fetch(self.inner.remote.as_ref(), request).await
    }

    fn window(
        &self, entries: Vec<Entry>, page: usize, window: RowWindow, sort: Option<SortSpec>,
        last_row: Option<usize>,
    ) -> Page {
        let entries = match sort {
            Some(spec) => sort_entries(entries, spec),
            None => entries,
        };

        let page_start = page * self.inner.options.limit;
        let from = window.start_row.saturating_sub(page_start).min(entries.len());
        let to = window
            .end_row
            .saturating_sub(page_start)
            .clamp(from, entries.len());

        Page { entries: entries[from..to].to_vec(), last_row }
    }

    /// Flags the view for refetch. Cached pages are dropped but the cursor
    /// map is kept, since the identity of the view did not change.
    pub fn invalidate(&self) {
        let source = {
            let mut state = self.state();
            state.blocks.clear();
            state.source.clone()
        };
        self.inner.should_refetch.store(true, Ordering::SeqCst);
        self.inner.events.listing_invalidated(source);
    }

    pub fn should_refetch(&self) -> bool {
        self.inner.should_refetch.load(Ordering::SeqCst)
    }

    /// Reads and clears the refetch flag.
    pub fn take_refetch(&self) -> bool {
        self.inner.should_refetch.swap(false, Ordering::SeqCst)
    }

    /// Points the view at `source`. Returns whether the identity changed, in
    /// which case cursors, cached pages and the known total are reset.
    pub fn set_source(&self, source: ListingSource) -> bool {
        let changed = {
            let mut state = self.state();
            if state.source == source {
                false
            } else {
                debug!(from = ?state.source, to = ?source, "listing identity changed");
                state.reset(source);
                true
            }
        };
        if changed {
            self.inner.should_refetch.store(true, Ordering::SeqCst);
        }
        changed
    }

    /// Ends the view's lifetime. Pages still in flight are dropped.
    pub fn close(&self) {
        self.inner.lifetime.cancel();
    }
}

/// Weak handles on every open context, so shared operations can flag the
/// views they affect.
#[derive(Clone, Default)]
pub struct ListingRegistry {
    contexts: Arc<Mutex<Vec<Weak<ListingInner>>>>,
}

impl ListingRegistry {
    fn register(&self, context: &ListingContext) {
        let mut contexts = self
            .contexts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        contexts.retain(|c| c.upgrade().is_some_and(|c| !c.lifetime.is_cancelled()));
        contexts.push(Arc::downgrade(&context.inner));
    }

    pub fn open(&self) -> Vec<ListingContext> {
        let contexts = self
            .contexts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        contexts
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| ListingContext { inner })
            .filter(|c| !c.is_closed())
            .collect()
    }

    /// Invalidates every open context whose identity matches. Returns how many were flagged.
    pub fn invalidate_where(&self, matches: impl Fn(&ListingSource) -> bool) -> usize {
        let mut flagged = 0;
        for context in self.open() {
            if matches(&context.source()) {
                context.invalidate();
                flagged += 1;
            }
        }
        flagged
    }
}

/// The five views of a document page, opened and closed together.
pub struct PageViews {
    pub browse: ListingContext,
    pub recents: ListingContext,
    pub search: ListingContext,
    pub favorites: ListingContext,
    pub archive: ListingContext,
}

impl PageViews {
    pub fn get(&self, kind: ViewKind) -> &ListingContext {
        match kind {
            ViewKind::Browse => &self.browse,
            ViewKind::Recents => &self.recents,
            ViewKind::Search => &self.search,
            ViewKind::Favorites => &self.favorites,
            ViewKind::Archive => &self.archive,
        }
    }

    /// Moves the space-scoped views to `space_id`, browse at its root.
    pub fn select_space(&self, space_id: SpaceId) {
        self.browse.set_source(ListingSource::browse(space_id, ""));
        self.recents.set_source(ListingSource::Recents { space_id });
        self.search
            .set_source(ListingSource::Search { space_id, query: String::new() });
        self.favorites
            .set_source(ListingSource::Favorites { space_id });
    }

    pub fn close(&self) {
        for context in [&self.browse, &self.recents, &self.search, &self.favorites, &self.archive]
        {
            context.close();
        }
    }
}

impl DocSpace {
    pub fn open_listing(&self, source: ListingSource) -> ListingContext {
        self.open_listing_with(source, self.config.listing)
    }

    pub fn open_listing_with(
        &self, source: ListingSource, options: ListingOptions,
    ) -> ListingContext {
        let context = ListingContext::new(self.remote.clone(), self.events.clone(), source, options);
        self.listings.register(&context);
        context
    }

    pub fn open_page_views(&self, space_id: SpaceId) -> PageViews {
        PageViews {
            browse: self.open_listing(ListingSource::browse(space_id, "")),
            recents: self.open_listing(ListingSource::Recents { space_id }),
            search: self.open_listing(ListingSource::Search { space_id, query: String::new() }),
            favorites: self.open_listing(ListingSource::Favorites { space_id }),
            archive: self.open_listing(ListingSource::Archive),
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::last_row_for;

    #[test]
    fn short_pages_know_the_total() {
        assert_eq!(last_row_for(0, 10, 3), Some(3));
        assert_eq!(last_row_for(2, 10, 9), Some(29));
        assert_eq!(last_row_for(4, 10, 0), Some(40));
    }

    #[test]
    fn full_pages_leave_the_total_unknown() {
        assert_eq!(last_row_for(0, 10, 10), None);
        assert_eq!(last_row_for(7, 25, 25), None);
    }
}
