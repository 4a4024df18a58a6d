//! Track resolution: source track → equivalent track on the target platform.
//!
//! The adapter's `search_track` proposes a candidate; a [`MatchStrategy`]
//! decides whether the candidate really is the same recording. "Nothing
//! found" and "search failed" stay distinct all the way to [`MatchResult`].

use std::collections::HashSet;
use std::sync::Arc;

use super::domain::{MatchResult, TransferError};
use super::link::PlatformLink;
use crate::model::Track;

/// Decides whether a candidate is equivalent to a source track.
///
/// Implementations must be deterministic and must not modify either track.
pub trait MatchStrategy: Send + Sync {
    fn is_equivalent(&self, source: &Track, candidate: &Track) -> bool;
}

/// Default strategy: weighted comparison of title, artists, duration and album.
#[derive(Debug, Clone, Copy)]
pub struct WeightedMatch {
    /// Minimum combined score to accept (roughly 0.0 to 1.0)
    pub min_score: f32,
}

impl Default for WeightedMatch {
    fn default() -> Self {
        Self { min_score: 0.6 }
    }
}

/// Words that mark a different rendition of the same song.
const VARIANT_MARKERS: [&str; 5] = ["karaoke", "instrumental", "cover", "tribute", "8-bit"];

impl WeightedMatch {
    pub fn new(min_score: f32) -> Self {
        Self { min_score }
    }

    /// Combined similarity score of `candidate` against `source`.
    pub fn score(&self, source: &Track, candidate: &Track) -> f32 {
        let mut score = 0.0;

        let source_title = normalize_title(&source.name);
        let candidate_title = normalize_title(&candidate.name);
        if source_title == candidate_title {
            score += 0.5;
        } else if !source_title.is_empty()
            && !candidate_title.is_empty()
            && (source_title.contains(&candidate_title) || candidate_title.contains(&source_title))
        {
            score += 0.35;
        } else {
            score += 0.3 * token_overlap(&source_title, &candidate_title);
        }

        if source.artists.is_empty() {
            // Unknown artist: neither confirms nor refutes
            score += 0.2;
        } else if artists_overlap(&source.artists, &candidate.artists) {
            score += 0.4;
        }

        if let (Some(a), Some(b)) = (source.duration_secs(), candidate.duration_secs()) {
            let diff = a.abs_diff(b);
            if diff <= 3 {
                score += 0.1;
            } else if diff > 15 {
                score -= 0.2;
            }
        }

        if !source.album.is_empty() && normalize(&source.album) == normalize(&candidate.album) {
            score += 0.05;
        }

        let source_lower = source.name.to_lowercase();
        let candidate_lower = candidate.name.to_lowercase();
        for marker in VARIANT_MARKERS {
            if candidate_lower.contains(marker) && !source_lower.contains(marker) {
                score -= 0.3;
            }
        }

        score
    }
}

impl MatchStrategy for WeightedMatch {
    fn is_equivalent(&self, source: &Track, candidate: &Track) -> bool {
        self.score(source, candidate) >= self.min_score
    }
}

/// Lowercase, keep alphanumerics, collapse whitespace.
fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized title without bracketed suffixes or " - Remastered" style tails.
fn normalize_title(title: &str) -> String {
    let mut base = String::with_capacity(title.len());
    let mut depth = 0usize;
    for c in title.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => base.push(c),
            _ => {}
        }
    }
    let base = match base.find(" - ") {
        Some(idx) => &base[..idx],
        None => base.as_str(),
    };
    normalize(base)
}

fn token_overlap(a: &str, b: &str) -> f32 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(&b).count() as f32;
    let union = a.union(&b).count() as f32;
    shared / union
}

fn artists_overlap(source: &[String], candidate: &[String]) -> bool {
    let candidates: Vec<String> = candidate.iter().map(|a| normalize(a)).collect();
    source.iter().map(|a| normalize(a)).any(|artist| {
        !artist.is_empty()
            && candidates
                .iter()
                .any(|c| !c.is_empty() && (c.contains(&artist) || artist.contains(c.as_str())))
    })
}

/// Resolves source tracks on a target platform.
#[derive(Clone)]
pub struct MatchResolver {
    strategy: Arc<dyn MatchStrategy>,
}

impl Default for MatchResolver {
    fn default() -> Self {
        Self::new(Arc::new(WeightedMatch::default()))
    }
}

impl MatchResolver {
    pub fn new(strategy: Arc<dyn MatchStrategy>) -> Self {
        Self { strategy }
    }

    /// Search `target` for `track` and judge the candidate.
    ///
    /// A missing candidate, a rejected candidate and a not-found response are
    /// all `found = false` without error. Any other failure (after retries)
    /// is carried in [`MatchResult::error`].
    pub async fn resolve(&self, track: &Track, target: &PlatformLink, attempts: u32) -> MatchResult {
        let searched = target
            .call(attempts, |adapter| {
                let track = track.clone();
                async move { adapter.search_track(&track).await }
            })
            .await;

        match searched {
            Ok(Some(candidate)) => {
                if candidate.external_id.is_none() {
                    return MatchResult::failed(
                        track.clone(),
                        TransferError::InvalidResponse(format!(
                            "{} returned a candidate without an id for '{}'",
                            target.platform, track.name
                        )),
                    );
                }
                if self.strategy.is_equivalent(track, &candidate) {
                    MatchResult::found(track.clone(), track.resolved_as(&candidate))
                } else {
                    tracing::debug!(
                        position = track.position,
                        candidate = %candidate.name,
                        "Rejected candidate for '{}'",
                        track.name
                    );
                    MatchResult::not_found(track.clone())
                }
            }
            Ok(None) | Err(TransferError::NotFound(_)) => MatchResult::not_found(track.clone()),
            Err(err) => MatchResult::failed(track.clone(), err),
        }
    }
}
