//! HTTP client with rate limiting for polled APIs and push sinks.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting, so an aggressive poll interval or a burst of
//!   song changes never hammers a remote now-playing API or streaming
//!   server
//! * Consistent timeouts and a stable `User-Agent`
//!
//! One client is shared by every input and output that speaks HTTP.

use std::{future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{self, Body, Method, Url};

use crate::error::Result;

/// HTTP client with built-in rate limiting.
pub struct Client {
    /// Unlimited request client for special cases.
    ///
    /// Direct access to the underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    /// Rate limiter shared by all HTTP-speaking inputs and outputs.
    rate_limiter: DefaultDirectRateLimiter,
}

impl Client {
    /// Rolling window over which calls are counted.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum calls per window.
    ///
    /// Generous for one station's worth of endpoints; requests beyond this
    /// are delayed, not dropped.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 25;

    /// Duration to keep idle connections alive.
    ///
    /// Prevents per-poll reconnection overhead against the same API host.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Overall per-request timeout.
    ///
    /// A delivery that takes longer than this is reported as failed; the
    /// router does not retry (dedup state has already advanced).
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates the shared client.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero, which cannot happen with
    /// the compile-time constants above.
    pub fn new() -> Result<Self> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(user_agent);

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
        })
    }

    /// Builds a request with specified method, URL and body.
    ///
    /// Creates a raw request that can be executed with `execute()`.
    pub fn request<U, T>(&self, method: Method, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        let body_mut = request.body_mut();
        *body_mut = Some(body.into());

        request
    }

    /// Builds a POST request.
    ///
    /// Convenience method for `request()` with POST method.
    pub fn post<U, T>(&self, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        self.request(Method::POST, url, body)
    }

    /// Builds a GET request.
    ///
    /// Convenience method for `request()` with GET method.
    pub fn get<U, T>(&self, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        self.request(Method::GET, url, body)
    }

    /// Executes a request with rate limiting.
    ///
    /// Applies rate limiting before executing the request.
    ///
    /// # Errors
    ///
    /// Returns error if request execution fails or a network error occurs.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        // No need to await with jitter because the level of concurrency is low.
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }
}
