//! Built-in demo catalog
//!
//! A fixed set of sample tracks served when the upstream is unreachable or
//! demo mode is forced via `KANADE_DEMO=1`. The catalog includes live
//! entries so the direct-play path can be exercised offline.

use crate::search::extract_tags;
use kanade_common::TrackDescriptor;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Environment flag forcing demo mode on
pub const DEMO_ENV: &str = "KANADE_DEMO";

/// Probe target and bound for upstream reachability
const PROBE_URL: &str = "https://www.youtube.com";
const PROBE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

static UPSTREAM_REACHABLE: OnceCell<bool> = OnceCell::const_new();

/// True when searches should be served from the demo catalog.
///
/// The environment flag wins; otherwise a connectivity probe decides, once
/// per process.
pub async fn enabled() -> bool {
    if std::env::var(DEMO_ENV).map(|v| v == "1").unwrap_or(false) {
        return true;
    }
    let reachable = *UPSTREAM_REACHABLE
        .get_or_init(|| async {
            let reachable = probe_upstream().await;
            if !reachable {
                info!("upstream unreachable, entering demo mode");
            }
            reachable
        })
        .await;
    !reachable
}

async fn probe_upstream() -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.head(PROBE_URL).send().await {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "connectivity probe failed");
            false
        }
    }
}

/// Search the demo catalog with the same hashtag semantics as live search
pub fn search(query: &str, max_results: usize) -> Vec<TrackDescriptor> {
    let tags = extract_tags(query);
    let catalog = catalog();

    let mut results: Vec<TrackDescriptor> = if tags.is_empty() {
        let query_lower = query.to_lowercase();
        catalog
            .iter()
            .filter(|track| track.title.to_lowercase().contains(&query_lower))
            .cloned()
            .collect()
    } else {
        catalog
            .iter()
            .filter(|track| {
                let title = track.title.to_lowercase();
                tags.iter()
                    .any(|tag| track.tags.contains(tag) || title.contains(tag))
            })
            .cloned()
            .collect()
    };

    // an empty result set falls back to the whole catalog
    if results.is_empty() {
        results = catalog;
    }
    results.truncate(max_results);
    results
}

fn demo_track(
    id: &str,
    title: &str,
    url: &str,
    duration: &str,
    tags: &[&str],
) -> TrackDescriptor {
    let mut track = TrackDescriptor::new(id, title, url, duration);
    track.tags = tags.iter().map(|t| t.to_string()).collect();
    track
}

/// The sample tracks. Two live entries keep the direct-play path reachable
/// without network access.
pub fn catalog() -> Vec<TrackDescriptor> {
    vec![
        demo_track(
            "demo1",
            "Lofi Hip Hop Radio - Beats to Relax/Study",
            "https://www.youtube.com/watch?v=jfKfPfyJRdk",
            "LIVE",
            &["lofi", "hiphop", "chill", "study", "relax"],
        ),
        demo_track(
            "demo2",
            "Chill Lofi Study Beats",
            "https://www.youtube.com/watch?v=5qap5aO4i9A",
            "1:23:45",
            &["lofi", "chill", "study", "beats"],
        ),
        demo_track(
            "demo3",
            "Jazz Hop Cafe - Smooth Jazz & Lofi Hip Hop",
            "https://www.youtube.com/watch?v=Dx5qFachd3A",
            "2:15:30",
            &["jazz", "lofi", "hiphop", "smooth"],
        ),
        demo_track(
            "demo4",
            "Ambient Study Music - Deep Focus",
            "https://www.youtube.com/watch?v=lTRiuFIWV54",
            "3:00:00",
            &["ambient", "study", "focus", "concentration"],
        ),
        demo_track(
            "demo5",
            "Lo-fi Beats for Coding",
            "https://www.youtube.com/watch?v=bmVKaAV_7-A",
            "1:45:12",
            &["lofi", "coding", "programming", "beats"],
        ),
        demo_track(
            "demo6",
            "Chillhop Radio - jazzy & lofi hip hop beats",
            "https://www.youtube.com/watch?v=5yx6BWlEVcY",
            "LIVE",
            &["chillhop", "jazz", "lofi", "hiphop", "chill"],
        ),
        demo_track(
            "demo7",
            "Synthwave Radio - Beats to Chill/Game To",
            "https://www.youtube.com/watch?v=4xDzrJKXOOY",
            "1:30:22",
            &["synthwave", "chill", "gaming", "electronic"],
        ),
        demo_track(
            "demo8",
            "Japanese Lofi Hip Hop Mix",
            "https://www.youtube.com/watch?v=FjHGZj2IjBk",
            "2:05:18",
            &["lofi", "japanese", "hiphop", "mix", "anime"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searches_by_title_substring() {
        let results = search("jazz", 10);
        assert!(!results.is_empty());
        assert!(results
            .iter()
            .all(|t| t.title.to_lowercase().contains("jazz")));
    }

    #[test]
    fn searches_by_hashtag() {
        let results = search("#study", 10);
        assert!(!results.is_empty());
        for track in &results {
            let in_tags = track.tags.contains(&"study".to_string());
            let in_title = track.title.to_lowercase().contains("study");
            assert!(in_tags || in_title, "unexpected match: {}", track.title);
        }
    }

    #[test]
    fn no_match_falls_back_to_full_catalog() {
        let results = search("zzzz-no-such-track", 100);
        assert_eq!(results.len(), catalog().len());
    }

    #[test]
    fn truncates_to_max_results() {
        let results = search("", 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn catalog_exercises_the_live_path() {
        assert!(catalog().iter().any(|t| t.is_live()));
        assert!(catalog().iter().any(|t| !t.is_live()));
    }
}
