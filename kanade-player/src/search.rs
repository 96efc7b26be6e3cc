//! Free-text search and related-track lookup
//!
//! Both run the resolver binary in metadata mode (`--dump-json
//! --flat-playlist`) and parse one JSON object per output line into track
//! descriptors. Hashtag terms (`#word`) in a query are folded into the
//! search text and then used to filter the result set; filtering only,
//! the upstream result order is preserved.
//!
//! In demo mode (forced by environment or entered when the upstream is
//! unreachable) search is served from the built-in catalog instead.

use crate::config::PlayerConfig;
use crate::demo;
use crate::error::{Error, Result};
use kanade_common::{format_duration, TrackDescriptor};
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// One line of `--dump-json --flat-playlist` output
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: String,
    title: String,
    duration: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
}

impl SearchEntry {
    fn into_track(self) -> TrackDescriptor {
        let mut track = TrackDescriptor::new(
            self.id.clone(),
            self.title,
            watch_url(&self.id),
            format_duration(self.duration),
        );
        track.tags = self.tags;
        track
    }
}

/// Canonical watch-page URL for an upstream video id
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Search upstream for `query`, returning at most `max_results` tracks.
///
/// Twice as many results as requested are fetched so tag filtering has
/// something to discard before truncation.
pub async fn search(
    config: &PlayerConfig,
    query: &str,
    max_results: usize,
) -> Result<Vec<TrackDescriptor>> {
    if demo::enabled().await {
        debug!(query, "demo mode, searching built-in catalog");
        return Ok(demo::search(query, max_results));
    }

    let tags = extract_tags(query);
    let search_query = fold_tags(query, &tags);
    let target = format!("ytsearch{}:{}", max_results * 2, search_query);

    let output = run_metadata_query(config, &target).await?;
    let mut results = parse_results(&output);
    if !tags.is_empty() {
        results = filter_by_tags(results, &tags);
    }
    results.truncate(max_results);
    Ok(results)
}

/// Tracks related to `url`, via the upstream's autogenerated mix playlist.
/// The seed video itself is excluded.
pub async fn related(
    config: &PlayerConfig,
    url: &str,
    max_results: usize,
) -> Result<Vec<TrackDescriptor>> {
    let Some(video_id) = extract_video_id(url) else {
        return Ok(Vec::new());
    };

    let mix_url = format!("https://www.youtube.com/watch?v={}&list=RD{}", video_id, video_id);
    let output = run_metadata_query(config, &mix_url).await?;

    let mut results: Vec<TrackDescriptor> = parse_results(&output)
        .into_iter()
        .filter(|track| track.id != video_id)
        .collect();
    results.truncate(max_results);
    Ok(results)
}

async fn run_metadata_query(config: &PlayerConfig, target: &str) -> Result<String> {
    let mut cmd = Command::new(&config.resolver_bin);
    cmd.args([
        "--dump-json",
        "--skip-download",
        "--flat-playlist",
        "--no-warnings",
        "--quiet",
    ])
    .arg(target)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

    let output = tokio::time::timeout(config.search_timeout(), cmd.output())
        .await
        .map_err(|_| {
            Error::Search(format!(
                "metadata query timed out after {}s",
                config.search_timeout_secs
            ))
        })?
        .map_err(|e| {
            Error::Search(format!("cannot run {}: {}", config.resolver_bin.display(), e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Search(format!(
            "metadata query exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse dump-json output, one JSON object per line. Malformed lines are
/// skipped, not fatal.
fn parse_results(output: &str) -> Vec<TrackDescriptor> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<SearchEntry>(line) {
            Ok(entry) => Some(entry.into_track()),
            Err(e) => {
                warn!(error = %e, "skipping malformed search result line");
                None
            }
        })
        .collect()
}

/// Hashtag terms of `query`, lowercased, without the `#` marker
pub(crate) fn extract_tags(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('#'))
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_lowercase())
        .collect()
}

/// Rewrite a hashtag query as plain search text: `lofi #study beats`
/// becomes `lofi beats study`.
fn fold_tags(query: &str, tags: &[String]) -> String {
    if tags.is_empty() {
        return query.to_string();
    }
    let base: Vec<&str> = query
        .split_whitespace()
        .filter(|word| !word.starts_with('#'))
        .collect();
    let mut terms = base.join(" ");
    for tag in tags {
        if !terms.is_empty() {
            terms.push(' ');
        }
        terms.push_str(tag);
    }
    terms
}

/// Keep tracks whose title or tag list matches at least one hashtag. When
/// nothing matches, the unfiltered results are returned rather than an
/// empty list.
pub(crate) fn filter_by_tags(
    results: Vec<TrackDescriptor>,
    tags: &[String],
) -> Vec<TrackDescriptor> {
    let filtered: Vec<TrackDescriptor> = results
        .iter()
        .filter(|track| {
            let title = track.title.to_lowercase();
            tags.iter().any(|tag| title.contains(tag))
                || track
                    .tags
                    .iter()
                    .any(|t| tags.contains(&t.to_lowercase()))
        })
        .cloned()
        .collect();

    if filtered.is_empty() {
        results
    } else {
        filtered
    }
}

/// Upstream video id of a watch-page URL (`v=` parameter or youtu.be path)
pub fn extract_video_id(url: &str) -> Option<String> {
    if let Some(rest) = url.split_once("v=").map(|(_, rest)| rest) {
        let id: String = rest.chars().take_while(|c| *c != '&' && *c != '#').collect();
        if !id.is_empty() {
            return Some(id);
        }
    }
    if let Some(rest) = url.split_once("youtu.be/").map(|(_, rest)| rest) {
        let id: String = rest
            .chars()
            .take_while(|c| *c != '?' && *c != '&' && *c != '#')
            .collect();
        if !id.is_empty() {
            return Some(id);
        }
    }
    None
}
