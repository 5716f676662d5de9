//! HTTP client with rate limiting for the upstream APIs.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting to stay within upstream quotas
//! * Bearer authorization from an [`AuthProvider`]
//! * Consistent timeouts and headers
//!
//! # Rate Limiting
//!
//! * 50 calls per 5-second interval
//! * Allows bursts up to the maximum calls per interval
//! * Requests that would exceed the limit are delayed
//!
//! # Example
//!
//! ```rust,ignore
//! use tunebridge::{config::Config, http::Client, protocol::source::{Paging, PlaylistItem}};
//!
//! let client = Client::new(&Config::new()?)?;
//! let page: Paging<PlaylistItem> = client.get_json(url, Some(&auth), "playlist tracks").await?;
//! ```

use std::{fmt::Debug, future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    self,
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION},
    Method, Url,
};
use serde::Deserialize;

use crate::{
    config::Config,
    error::{Error, Result},
    protocol,
    token::AuthProvider,
};

/// HTTP client with built-in rate limiting.
pub struct Client {
    /// Direct access to underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    rate_limiter: DefaultDirectRateLimiter,

    /// Upper bound on one request, including waiting for the rate limiter
    /// and reading the body.
    timeout: Duration,
}

impl Client {
    /// Rolling window during which a maximum number of calls can be made.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum allowed API calls per interval.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 50;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for individual network reads.
    const READ_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        // Not having `Accept-Language` set is non-fatal.
        let mut headers = HeaderMap::new();
        if let Ok(lang) = HeaderValue::from_str(&config.app_lang) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .read_timeout(Self::READ_TIMEOUT)
            .default_headers(headers)
            .user_agent(&config.user_agent);

        // Rate limit own requests as to not hammer the upstream services.
        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(quota),
            timeout: config.request_timeout,
        })
    }

    /// Builds a GET request.
    #[must_use]
    pub fn get(&self, url: Url) -> reqwest::Request {
        reqwest::Request::new(Method::GET, url)
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails on the network.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        // No need to await with jitter because the level of concurrency is low.
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }

    /// Performs a GET and parses the response body as JSON.
    ///
    /// Sends a bearer token when `auth` is given. `origin` names the endpoint
    /// in logs.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * no bearer token could be obtained
    /// * the request fails or exceeds the configured timeout
    /// * the upstream answers with an unsuccessful status
    /// * the response body does not parse as `T`
    pub async fn get_json<T>(
        &self,
        url: Url,
        auth: Option<&dyn AuthProvider>,
        origin: &str,
    ) -> Result<T>
    where
        T: for<'de> Deserialize<'de> + Debug,
    {
        let mut request = self.get(url);
        if let Some(auth) = auth {
            let bearer = auth.bearer().await?;
            request.headers_mut().insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {bearer}"))?,
            );
        }
        trace!("{origin}: GET {}", request.url());

        let body = tokio::time::timeout(self.timeout, async {
            let response = self.execute(request).await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(Error::from_status(status, format!("{origin}: {status}")));
            }
            Ok::<_, Error>(body)
        })
        .await??;

        protocol::json(&body, origin)
    }
}
