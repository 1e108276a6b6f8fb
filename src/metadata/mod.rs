//! Movie metadata lookup against a TMDB-style search API.
//!
//! Marking a movie as a favorite enriches it with the overview and vote
//! statistics of the best search hit for its title. The lookup sits behind
//! [`MetadataLookup`] so the catalog can run against a stub in tests or with
//! no service configured at all.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

/// Errors raised while fetching movie metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata service is not configured")]
    NotConfigured,

    #[error("metadata request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metadata service answered {0}")]
    Status(reqwest::StatusCode),
}

/// The fields copied from a search hit onto a favorited movie.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MovieDetails {
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

pub type LookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<MovieDetails>, MetadataError>> + Send + 'a>>;

/// Source of movie metadata keyed by title.
pub trait MetadataLookup: Send + Sync {
    /// Details of the first search hit for `title`, or `None` when nothing matched.
    fn search<'a>(&'a self, title: &'a str) -> LookupFuture<'a>;
}

/// Lookup used when no metadata service is configured. Always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconfigured;

impl MetadataLookup for Unconfigured {
    fn search<'a>(&'a self, _title: &'a str) -> LookupFuture<'a> {
        Box::pin(async { Err(MetadataError::NotConfigured) })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<MovieDetails>,
}

/// Client for `GET {base}/search/movie`.
///
/// The API key goes in the `api_key` query parameter and the read-access
/// token, when present, as a bearer token.
pub struct TmdbClient {
    base_url: String,
    api_key: Option<String>,
    read_access_token: Option<String>,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        read_access_token: Option<String>,
    ) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
            read_access_token,
            client,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search/movie", self.base_url)
    }

    async fn fetch(&self, title: &str) -> Result<Option<MovieDetails>, MetadataError> {
        let mut query = vec![("query", title)];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.as_str()));
        }

        let mut req = self
            .client
            .get(self.search_url())
            .header("Accept", "application/json")
            .query(&query);
        if let Some(token) = &self.read_access_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), title, "metadata search rejected");
            return Err(MetadataError::Status(resp.status()));
        }

        let body: SearchResults = resp.json().await?;
        debug!(title, hits = body.results.len(), "metadata search");
        Ok(body.results.into_iter().next())
    }
}

impl MetadataLookup for TmdbClient {
    fn search<'a>(&'a self, title: &'a str) -> LookupFuture<'a> {
        Box::pin(self.fetch(title))
    }
}
