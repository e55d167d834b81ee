use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reelmatch_model::MovieMetadata;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::traits::{MetadataProvider, ProviderError, SearchCandidate};

const OMDB_BASE: &str = "https://www.omdbapi.com/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for [`OmdbApiProvider`].
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: Url,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub fn default_base_url() -> Url {
    Url::parse(OMDB_BASE).expect("OMDb base url should parse")
}

/// HTTP client for the OMDb API (IMDb-keyed movie metadata).
pub struct OmdbApiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: Url,
}

impl fmt::Debug for OmdbApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmdbApiProvider")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl OmdbApiProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = settings.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: settings.base_url,
        })
    }

    async fn get_omdb_json<T>(
        &self,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            401 => return Err(ProviderError::InvalidApiKey),
            404 => return Err(ProviderError::NotFound),
            429 => return Err(ProviderError::RateLimited),
            _ => {}
        }

        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<OmdbEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_else(|| {
                    format!("OMDb request failed with status {status}")
                });
            return Err(ProviderError::ApiError(message));
        }

        serde_json::from_str(&body).map_err(|err| {
            error!(error = %err, "malformed OMDb response");
            ProviderError::ParseError(err.to_string())
        })
    }
}

#[async_trait]
impl MetadataProvider for OmdbApiProvider {
    async fn search(
        &self,
        query: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchCandidate>, ProviderError> {
        let mut params = vec![
            ("s", query.to_string()),
            ("type", "movie".to_string()),
        ];
        if let Some(year) = year {
            params.push(("y", year.to_string()));
        }

        let response: OmdbSearchResponse = self.get_omdb_json(&params).await?;
        let candidates = map_search_response(response)?;
        debug!(query, ?year, results = candidates.len(), "OMDb search");
        Ok(candidates)
    }

    async fn fetch(
        &self,
        external_id: &str,
    ) -> Result<MovieMetadata, ProviderError> {
        let params = [
            ("i", external_id.to_string()),
            ("plot", "full".to_string()),
        ];
        let response: OmdbMovieResponse = self.get_omdb_json(&params).await?;
        map_movie_response(response)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbEnvelope {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbSearchResponse {
    response: String,
    #[serde(default)]
    search: Vec<OmdbSearchItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbSearchItem {
    title: String,
    #[serde(default)]
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(default)]
    poster: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct OmdbMovieResponse {
    response: String,
    error: Option<String>,
    title: Option<String>,
    year: Option<String>,
    rated: Option<String>,
    released: Option<String>,
    runtime: Option<String>,
    genre: Option<String>,
    director: Option<String>,
    writer: Option<String>,
    actors: Option<String>,
    plot: Option<String>,
    language: Option<String>,
    country: Option<String>,
    awards: Option<String>,
    poster: Option<String>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes")]
    imdb_votes: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
}

/// OMDb reports failures in-band with `"Response": "False"`.
fn classify_error(message: Option<String>) -> ProviderError {
    let message = message.unwrap_or_else(|| "unknown OMDb error".into());
    let lower = message.to_lowercase();
    if lower.contains("not found") {
        ProviderError::NotFound
    } else if lower.contains("invalid api key") || lower.contains("no api key")
    {
        ProviderError::InvalidApiKey
    } else if lower.contains("limit") {
        ProviderError::RateLimited
    } else {
        ProviderError::ApiError(message)
    }
}

fn map_search_response(
    response: OmdbSearchResponse,
) -> Result<Vec<SearchCandidate>, ProviderError> {
    if !response.response.eq_ignore_ascii_case("true") {
        let too_many = response
            .error
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains("too many results"));
        return match classify_error(response.error) {
            // A miss is a valid empty result, not a provider failure.
            ProviderError::NotFound => Ok(Vec::new()),
            _ if too_many => Ok(Vec::new()),
            err => Err(err),
        };
    }

    Ok(response
        .search
        .into_iter()
        .map(|item| SearchCandidate {
            external_id: item.imdb_id,
            title: item.title,
            year: item.year.as_deref().and_then(parse_year),
            poster_url: present(item.poster),
        })
        .collect())
}

fn map_movie_response(
    response: OmdbMovieResponse,
) -> Result<MovieMetadata, ProviderError> {
    if !response.response.eq_ignore_ascii_case("true") {
        return Err(classify_error(response.error));
    }

    let external_id = present(response.imdb_id).ok_or_else(|| {
        ProviderError::ParseError("OMDb response missing imdbID".into())
    })?;

    Ok(MovieMetadata {
        external_id,
        title: present(response.title),
        year: response.year.as_deref().and_then(parse_year),
        rated: present(response.rated),
        released: present(response.released),
        runtime: present(response.runtime),
        genre: present(response.genre),
        director: present(response.director),
        writer: present(response.writer),
        actors: present(response.actors),
        plot: present(response.plot),
        language: present(response.language),
        country: present(response.country),
        awards: present(response.awards),
        poster_url: present(response.poster),
        rating: present(response.imdb_rating)
            .and_then(|value| value.parse::<f32>().ok()),
        votes: present(response.imdb_votes)
            .and_then(|value| value.replace(',', "").parse::<u64>().ok()),
    })
}

/// OMDb uses `"N/A"` for absent fields.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "N/A")
}

/// First four-digit run of a year field (`"1999"`, `"2010–2012"`).
fn parse_year(raw: &str) -> Option<u16> {
    let digits: String =
        raw.chars().take_while(|c| c.is_ascii_digit()).take(4).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}
