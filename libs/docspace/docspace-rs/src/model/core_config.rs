use std::env;

use serde::{Deserialize, Serialize};

pub static DEFAULT_API_LOCATION: &str = "http://localhost:8000";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where should docspace store data, including logs?
    pub writeable_path: String,

    /// Should we log at all?
    pub logs: bool,
    /// Should logs be printed to stdout?
    pub stdout_logs: bool,
    /// Should logs be colored?
    pub colored_logs: bool,

    /// Base url of the document-space api, used by [crate::io::network::Network].
    pub api_url: String,

    /// Defaults applied to every listing context created by the session.
    pub listing: ListingOptions,
}

/// Per-context pagination settings.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListingOptions {
    /// A disabled context answers with empty pages and never reaches the remote.
    pub enabled: bool,
    /// Rows per page, also the size of a cached block.
    pub limit: usize,
    pub max_concurrent_requests: usize,
    pub max_cached_blocks: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self { enabled: true, limit: 100, max_concurrent_requests: 2, max_cached_blocks: 10 }
    }
}

impl ListingOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit, ..Default::default() }
    }

    /// Zero is never a usable page size or concurrency bound.
    pub(crate) fn sanitized(self) -> Self {
        Self {
            enabled: self.enabled,
            limit: self.limit.max(1),
            max_concurrent_requests: self.max_concurrent_requests.max(1),
            max_cached_blocks: self.max_cached_blocks,
        }
    }
}

impl Config {
    /// Configures docspace for CLI use with no stdout logs. `writeable_path_subfolder` is generally
    /// a hardcoded client name like `"cli"`.
    pub fn cli_config(writeable_path_subfolder: &str) -> Config {
        Config {
            writeable_path: Self::writeable_path(writeable_path_subfolder),
            logs: true,
            stdout_logs: false,
            colored_logs: true,
            api_url: Self::api_url(),
            listing: ListingOptions::default(),
        }
    }

    /// Configures docspace for UI use with stdout logs.
    pub fn ui_config(writeable_path_subfolder: &str) -> Config {
        Config {
            writeable_path: Self::writeable_path(writeable_path_subfolder),
            logs: true,
            stdout_logs: true,
            colored_logs: true,
            api_url: Self::api_url(),
            listing: ListingOptions::default(),
        }
    }

    /// Produces a full writable path based on environment variables and platform. Falls back to a
    /// folder relative to the working directory when no home is known.
    pub fn writeable_path(writeable_path_subfolder: &str) -> String {
        let specified_path = env::var("DOCSPACE_PATH");

        let default_path = env::var("HOME") // unix
            .or(env::var("HOMEPATH")) // windows
            .map(|home| format!("{home}/.docspace/{writeable_path_subfolder}"));

        specified_path
            .or(default_path)
            .unwrap_or_else(|_| format!(".docspace/{writeable_path_subfolder}"))
    }

    pub fn api_url() -> String {
        env::var("DOCSPACE_API_URL").unwrap_or_else(|_| DEFAULT_API_LOCATION.to_string())
    }
}
