use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Tunables shared by the HTTP clients, the resolver and the queue.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub app_lang: String,

    pub user_agent: String,

    /// Base URL of the source catalog Web API.
    pub source_url: Url,

    /// Base URL of the playback catalog API.
    pub catalog_url: Option<Url>,

    /// Number of descriptors requested per source page.
    pub page_size: usize,

    /// Number of descriptors resolved per `advance`, and how many of them
    /// run concurrently.
    pub batch_size: usize,

    /// Number of candidates requested per catalog search.
    pub search_limit: usize,

    /// Number of tracks fetched for a recommendation-seeded queue.
    pub recommendation_limit: usize,

    /// Composite score a best candidate must exceed to be accepted.
    pub match_threshold: f64,

    pub cache_capacity: u64,
    pub cache_ttl: Duration,

    pub request_timeout: Duration,
}

impl Config {
    pub const DEFAULT_SOURCE_URL: &'static str = "https://api.spotify.com/v1/";

    /// The source Web API serves at most this many items per page.
    pub const MAX_PAGE_SIZE: usize = 100;

    pub const DEFAULT_PAGE_SIZE: usize = 100;
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_SEARCH_LIMIT: usize = 10;
    pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 50;
    pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration with default tunables.
    ///
    /// # Errors
    ///
    /// Will return `Err` if no valid `User-Agent` can be created out of the
    /// application name, version, language or the detected OS.
    pub fn new() -> Result<Self> {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();
        let app_lang = "en".to_owned();

        // Additional `User-Agent` string checks on top of `reqwest::HeaderValue`.
        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
            || app_lang.chars().count() != 2
            || app_lang.contains(illegal_chars)
        {
            return Err(Error::invalid_argument(format!(
                "application name, version and/or language invalid (\"{app_name}\"; \"{app_version}\"; \"{app_lang}\")"
            )));
        }

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));
        if os_name.is_empty()
            || os_name.contains(illegal_chars)
            || os_version.is_empty()
            || os_version.contains(illegal_chars)
        {
            return Err(Error::invalid_argument(format!(
                "os name and/or version invalid (\"{os_name}\"; \"{os_version}\")"
            )));
        }

        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name}/{os_version}; {app_lang})");
        trace!("user agent: {user_agent}");

        Ok(Self {
            app_name,
            app_version,
            app_lang,

            user_agent,

            source_url: Url::parse(Self::DEFAULT_SOURCE_URL)?,
            catalog_url: None,

            page_size: Self::DEFAULT_PAGE_SIZE,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            search_limit: Self::DEFAULT_SEARCH_LIMIT,
            recommendation_limit: Self::DEFAULT_RECOMMENDATION_LIMIT,
            match_threshold: Self::DEFAULT_MATCH_THRESHOLD,

            cache_capacity: crate::cache::MemoryCache::DEFAULT_CAPACITY,
            cache_ttl: crate::cache::MemoryCache::DEFAULT_TIME_TO_LIVE,

            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Checks that all tunables are within range.
    ///
    /// # Errors
    ///
    /// Will return `InvalidArgument` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.match_threshold > 0.0 && self.match_threshold < 1.0) {
            return Err(Error::invalid_argument(format!(
                "match threshold must be between 0 and 1 (exclusive), got {}",
                self.match_threshold
            )));
        }

        if self.batch_size == 0 {
            return Err(Error::invalid_argument("batch size must be at least 1"));
        }

        if self.page_size == 0 || self.page_size > Self::MAX_PAGE_SIZE {
            return Err(Error::invalid_argument(format!(
                "page size must be between 1 and {}, got {}",
                Self::MAX_PAGE_SIZE,
                self.page_size
            )));
        }

        if self.search_limit == 0 {
            return Err(Error::invalid_argument("search limit must be at least 1"));
        }

        Ok(())
    }

    /// The playback catalog URL, which has no default.
    ///
    /// # Errors
    ///
    /// Will return `FailedPrecondition` if no catalog URL was configured.
    pub fn catalog_url(&self) -> Result<&Url> {
        self.catalog_url
            .as_ref()
            .ok_or_else(|| Error::failed_precondition("no catalog url configured"))
    }
}
