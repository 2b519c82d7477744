use std::sync::Arc;

use bon::Builder;
use chrono::Utc;
use reqwest::{
    Client as ReqwestClient, Method,
    header::{HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret as _, SecretString};
use url::Url;

use super::types::{StreamSet, StreamsRequest};
use crate::error::Error;
use crate::rate_limit::RateLimitTracker;
use crate::{Result, ToQueryParams as _};

/// The public API root.
pub const DEFAULT_HOST: &str = "https://www.strava.com/api/v3/";

/// Configuration for [`Client`]
#[derive(Clone, Debug, Default, Builder)]
pub struct Config {
    /// OAuth access token sent as a bearer token with every request.
    #[builder(into)]
    access_token: Option<SecretString>,
    /// Refuse to send requests while the last known rate limit is exhausted,
    /// returning a [`crate::error::Kind::RateLimited`] error instead.
    #[builder(default)]
    fail_fast_on_rate_limit: bool,
}

#[derive(Debug)]
struct ClientInner {
    config: Config,
    /// The [`Url`] against which `client` is making requests. Always ends with `/`.
    host: Url,
    client: ReqwestClient,
    /// Limits reported by the most recent response.
    rate_limit: RateLimitTracker,
}

/// Client for the activity, segment and segment effort streams endpoints.
///
/// Clones share the HTTP connection pool and the rate limit tracker.
///
/// # Example
///
/// ```no_run
/// use strava_client_sdk::streams::{Client, Config};
/// use strava_client_sdk::streams::types::{StreamParent, StreamType, StreamsRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::builder().access_token("token".to_owned()).build();
/// let client = Client::new("https://www.strava.com/api/v3/", config)?;
///
/// let request = StreamsRequest::builder()
///     .parent(StreamParent::Activity)
///     .id(103_221_154)
///     .types(vec![StreamType::Time, StreamType::Location])
///     .build();
/// let streams = client.streams(&request).await?;
///
/// if let Some(time) = &streams.time {
///     println!("{} samples, last at {:?}s", time.len(), time.data.last());
/// }
/// println!("fraction of limit used: {}", client.rate_limit().fraction_reached());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Default for Client {
    fn default() -> Self {
        Client::new(DEFAULT_HOST, Config::default())
            .expect("Client with default endpoint should succeed")
    }
}

impl Client {
    /// Creates a new client against `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host URL is invalid or the HTTP client fails to build.
    pub fn new(host: &str, config: Config) -> Result<Client> {
        let mut headers = HeaderMap::new();

        headers.insert("User-Agent", HeaderValue::from_static("strava_client_sdk"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Connection", HeaderValue::from_static("keep-alive"));
        let client = ReqwestClient::builder().default_headers(headers).build()?;

        let mut host = Url::parse(host)?;
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                host,
                client,
                rate_limit: RateLimitTracker::new(),
            }),
        })
    }

    /// Returns the host URL for the client.
    #[must_use]
    pub fn host(&self) -> &Url {
        &self.inner.host
    }

    /// Rate limit state reported by the most recent response.
    #[must_use]
    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.inner.rate_limit
    }

    /// Fetches and decodes the requested streams.
    ///
    /// Stream kinds the API returns but the request did not ask for are kept;
    /// kinds this crate does not know are dropped.
    ///
    /// # Errors
    ///
    /// - [`Kind::Validation`](crate::error::Kind::Validation) when no stream types are requested
    /// - [`Kind::RateLimited`](crate::error::Kind::RateLimited) when failing fast on an exhausted limit
    /// - [`Kind::Status`](crate::error::Kind::Status) for non-success responses
    /// - [`Kind::Decode`](crate::error::Kind::Decode) when the body is not a list of streams
    pub async fn streams(&self, request: &StreamsRequest) -> Result<StreamSet> {
        request.validate()?;

        if self.inner.config.fail_fast_on_rate_limit {
            let rate_limit = self.rate_limit();
            if rate_limit.is_blocked_at(Utc::now()) {
                if let Some(retry_at) = rate_limit.next_allowed_at() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(%retry_at, "rate limit exhausted, not sending request");
                    return Err(Error::rate_limited(retry_at));
                }
            }
        }

        let url = self
            .host()
            .join(&format!("{}{}", request.path(), request.query_params()))?;
        let mut builder = self.inner.client.request(Method::GET, url);
        if let Some(token) = &self.inner.config.access_token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let value = crate::request(&self.inner.client, builder.build()?, self.rate_limit()).await?;
        StreamSet::from_value(value)
    }
}
