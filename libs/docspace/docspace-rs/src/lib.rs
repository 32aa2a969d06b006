//! The library underneath the document-space console.
//!
//! It lets a user browse a hierarchy of folders and files organised into
//! spaces, with per-space privileges deciding what the user may do.
//!
//! - Most integrators will be interested in the functions attached to the [DocSpace] struct.
//!   See the [service] module for evolving this functionality.
//! - The [model] module contains our data structures and the contract with the server.
//! - The [io] module contains the [io::remote::Remote] seam and its http implementation.

pub mod io;
pub mod model;
pub mod service;

use std::sync::{Arc, RwLock};

use io::network::Network;
use io::remote::Remote;
use model::core_config::Config;
use model::member::User;
use service::clipboard::Clipboard;
use service::events::EventSubs;
use service::favorites::FavoritesLedger;
use service::listing::ListingRegistry;
use service::logging;
use service::privileges::PrivilegeCache;
use service::spaces::SpaceList;

pub use model::errors::{DsErr, DsErrKind, DsResult};
pub use uuid::Uuid;

/// A user's session with the document-space console. Cheap to clone; every
/// clone shares the same caches and subscriptions.
#[derive(Clone)]
pub struct DocSpace {
    pub config: Config,
    pub remote: Arc<dyn Remote>,
    pub events: EventSubs,
    pub listings: ListingRegistry,
    pub privileges: PrivilegeCache,
    pub clipboard: Clipboard,
    pub favorites: FavoritesLedger,
    pub spaces: SpaceList,
    user: Arc<RwLock<User>>,
}

impl DocSpace {
    #[tracing::instrument(level = "info", skip_all, err(Debug))]
    pub async fn init(config: Config, remote: Arc<dyn Remote>) -> DsResult<Self> {
        logging::init(&config)?;

        let config = Config { listing: config.listing.sanitized(), ..config };

        Ok(Self {
            config,
            remote,
            events: EventSubs::default(),
            listings: ListingRegistry::default(),
            privileges: PrivilegeCache::default(),
            clipboard: Clipboard::default(),
            favorites: FavoritesLedger::default(),
            spaces: SpaceList::default(),
            user: Arc::default(),
        })
    }

    /// A session talking to `config.api_url`, authenticated with `token`.
    pub async fn connect(config: Config, token: Option<String>) -> DsResult<Self> {
        let network = Network::new(config.api_url.clone(), token);
        Self::init(config, Arc::new(network)).await
    }

    pub fn user(&self) -> User {
        self.user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_user(&self, user: User) {
        *self
            .user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = user;
    }
}

pub fn get_code_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub static DOCSPACE_CODE_VERSION: &str = env!("CARGO_PKG_VERSION");
