//! Metadata lookup for media files.
//!
//! The lookup itself is a capability passed into the stage that needs it.
//! [`MetatubeClient`] implements it against a metatube server:
//! <https://github.com/metatube-community/metatube-sdk-go>

use std::collections::btree_map::Entry;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::record::{Candidate, RecordAssembler, RecordMap};
use crate::{print_warning, walk};

const PROGRESS_BAR_CHARS: &str = "=>-";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:60.magenta/blue} {pos}/{len} {msg}";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Searches metadata for a file name.
pub trait MetadataLookup {
    /// Return ranked candidates for the query, best match first.
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<Candidate>>> + Send;
}

/// Metatube server API client.
#[derive(Debug)]
pub struct MetatubeClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Response body of the search endpoint.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Candidate>,
}

impl MetatubeClient {
    /// Create a new client for the server at `base_url`, for example `http://localhost:8080`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.is_empty()).map(ToString::to_string),
        })
    }

    /// Build the full search URL for a query.
    fn search_url(&self, query: &str) -> Result<Url> {
        let endpoint = format!("{}/v1/movies/search", self.base_url);
        Url::parse_with_params(&endpoint, &[("q", query), ("fallback", "true")])
            .with_context(|| format!("Invalid lookup URL: {endpoint}"))
    }
}

impl MetadataLookup for MetatubeClient {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let url = self.search_url(query)?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("Failed to send search request")?;
        let status = response.status();
        let body = response.text().await.context("Failed to read search response body")?;

        match status {
            StatusCode::OK => parse_search_response(&body),
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::UNAUTHORIZED => bail!("Lookup server rejected the token"),
            _ => bail!("Search failed: HTTP {status} - {body}"),
        }
    }
}

/// Parse the JSON body of a search response.
pub fn parse_search_response(body: &str) -> Result<Vec<Candidate>> {
    let response: SearchResponse = serde_json::from_str(body).context("Failed to parse search response JSON")?;
    Ok(response.data)
}

/// Look up every media file directly in `dir` and build records for them.
///
/// A failed or empty lookup skips that file. `delay` is waited between lookups.
/// When two files resolve to the same identifier, the first one keeps it
/// and the later one is skipped with a warning.
pub async fn lookup_records<L: MetadataLookup>(
    dir: &Path,
    lookup: &L,
    assembler: &RecordAssembler,
    extensions: &[String],
    delay: Duration,
) -> Result<RecordMap> {
    let mut stems = Vec::new();
    for entry in walk::files(dir, false) {
        let path = entry.with_context(|| format!("Failed to list directory {}", dir.display()))?;
        if crate::has_media_extension(&path, extensions) {
            let (stem, _) = crate::get_normalized_file_name_and_extension(&path)?;
            stems.push(stem);
        }
    }

    let mut records = RecordMap::new();
    let progress_bar = create_progress_bar(stems.len() as u64);
    for (index, stem) in stems.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        progress_bar.set_message(stem.clone());

        match lookup.search(stem).await {
            Ok(candidates) => match assembler.assemble(stem, &candidates) {
                Some((identifier, record)) => match records.entry(identifier) {
                    Entry::Vacant(slot) => {
                        slot.insert(record);
                    }
                    Entry::Occupied(existing) => progress_bar.suspend(|| {
                        print_warning!(
                            "Skipping {stem}: {} is already taken by {}",
                            existing.key(),
                            existing.get().filename
                        );
                    }),
                },
                None => progress_bar.suspend(|| print_warning!("No results for: {stem}")),
            },
            Err(error) => progress_bar.suspend(|| print_warning!("Lookup failed for {stem}: {error:#}")),
        }
        progress_bar.inc(1);
    }
    progress_bar.finish_and_clear();

    Ok(records)
}

/// Create a progress bar that is hidden during tests.
fn create_progress_bar(len: u64) -> ProgressBar {
    #[cfg(test)]
    {
        let _ = len;
        ProgressBar::hidden()
    }
    #[cfg(not(test))]
    {
        let progress_bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
            progress_bar.set_style(style.progress_chars(PROGRESS_BAR_CHARS));
        }
        progress_bar
    }
}
