//! Movie document and the query shapes the catalog endpoints accept.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::Request;

/// A movie document as stored and as sent over the wire.
///
/// Every field but the id is optional, mirroring a schemaless document. `year`
/// is kept as a string; a number in an incoming body is converted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(rename = "isFav", default, skip_serializing_if = "Option::is_none")]
    pub is_fav: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
}

impl Movie {
    /// Overwrite every field that is set in `patch`. The id never changes.
    pub fn merge(&mut self, patch: Movie) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() { self.$field = patch.$field; })*
            };
        }
        take!(
            title,
            director,
            year,
            country,
            length,
            genre,
            colour,
            is_fav,
            overview,
            vote_count,
            vote_average
        );
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number for year, found {other}"
        ))),
    }
}

/// Field filter for the genre and search endpoints.
///
/// Text fields match case-insensitively anywhere in the stored value; `year`
/// must match exactly. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub director: Option<String>,
    pub year: Option<String>,
    pub country: Option<String>,
    pub genre: Option<String>,
}

impl MovieFilter {
    /// Filter on `genre` only.
    pub fn genre_from(request: &Request) -> Self {
        Self {
            genre: non_empty(request.query_param("genre")),
            ..Self::default()
        }
    }

    /// Filter on every searchable field present in the query string.
    pub fn search_from(request: &Request) -> Self {
        Self {
            title: non_empty(request.query_param("title")),
            director: non_empty(request.query_param("director")),
            year: non_empty(request.query_param("year")),
            country: non_empty(request.query_param("country")),
            genre: non_empty(request.query_param("genre")),
        }
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        contains(&self.title, &movie.title)
            && contains(&self.director, &movie.director)
            && contains(&self.country, &movie.country)
            && contains(&self.genre, &movie.genre)
            && self.year.as_ref().is_none_or(|y| movie.year.as_ref() == Some(y))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

fn contains(needle: &Option<String>, haystack: &Option<String>) -> bool {
    match (needle, haystack) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(n), Some(h)) => h.to_lowercase().contains(&n.to_lowercase()),
    }
}

/// Errors turning `page` / `limit` query parameters into a [`Page`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    #[error("invalid {param}: {value:?} is not a positive integer")]
    Invalid { param: &'static str, value: String },
}

/// One-based page window over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u64,
    pub limit: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 10;

    /// Read `page` (default 1) and `limit` (default 10) from the query string.
    pub fn from_request(request: &Request) -> Result<Self, PageError> {
        Ok(Self {
            number: positive(request.query_param("page"), "page", 1)?,
            limit: positive(request.query_param("limit"), "limit", Self::DEFAULT_LIMIT)?,
        })
    }

    /// Number of documents before this page.
    pub fn skip(&self) -> usize {
        usize::try_from((self.number - 1).saturating_mul(self.limit)).unwrap_or(usize::MAX)
    }

    pub fn limit(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(usize::MAX)
    }

    /// Pages needed to show `total` documents.
    pub fn total_pages(&self, total: usize) -> u64 {
        (total as u64).div_ceil(self.limit)
    }
}

fn positive(raw: Option<&str>, param: &'static str, default: u64) -> Result<u64, PageError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PageError::Invalid {
            param,
            value: raw.to_owned(),
        }),
    }
}

/// Body of every paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoviePage {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_movies: usize,
    pub movies: Vec<Movie>,
}

/// `{ "message": ... }` body used for JSON error replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}
