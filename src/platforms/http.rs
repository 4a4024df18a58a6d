//! HTTP plumbing shared by the platform clients.
//!
//! Every client funnels its responses through [`read_json`] / [`expect_success`]
//! so status codes map onto [`TransferError`] the same way everywhere:
//!
//! | Response                   | Error                       |
//! |----------------------------|-----------------------------|
//! | 401, 403                   | `Auth`                      |
//! | 404                        | `NotFound`                  |
//! | 429 with `Retry-After`     | `Transient`                 |
//! | 429 without `Retry-After`  | `Quota`                     |
//! | 5xx, timeouts, resets      | `Transient`                 |
//! | body that doesn't decode   | `InvalidResponse`           |

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::model::{Credential, Platform};
use crate::transfer::domain::{InsertMode, TrackOutcome, TransferError};

/// Per-request timeout for platform calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the HTTP client used by one platform client.
///
/// Accepts gzip responses and identifies the application in User-Agent.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .gzip(true)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Refuse to call out with a credential that can't work.
pub fn ensure_fresh(platform: Platform, credential: &Credential) -> Result<(), TransferError> {
    if credential.is_expired() {
        return Err(TransferError::Auth(format!(
            "{} credential is missing or expired",
            platform.display_name()
        )));
    }
    Ok(())
}

/// Map a non-success status to the transfer taxonomy.
pub fn classify_status(
    platform: Platform,
    status: StatusCode,
    retry_after: Option<&str>,
    detail: &str,
) -> TransferError {
    let detail: String = detail.chars().take(200).collect();
    let message = format!(
        "{} answered HTTP {} {}",
        platform.display_name(),
        status.as_u16(),
        if detail.is_empty() {
            status.canonical_reason().unwrap_or("Unknown").to_string()
        } else {
            detail
        }
    );

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TransferError::Auth(message),
        StatusCode::NOT_FOUND => TransferError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => match retry_after {
            Some(secs) => TransferError::Transient(format!("{message} (retry after {secs}s)")),
            None => TransferError::Quota(message),
        },
        s if s.is_server_error() => TransferError::Transient(message),
        StatusCode::REQUEST_TIMEOUT => TransferError::Transient(message),
        _ => TransferError::InvalidResponse(message),
    }
}

/// Map a transport failure (no usable response) to the taxonomy.
pub fn classify_transport(platform: Platform, err: reqwest::Error) -> TransferError {
    if err.is_decode() {
        TransferError::InvalidResponse(format!("{} response unreadable: {}", platform, err))
    } else {
        TransferError::Transient(format!("{} request failed: {}", platform, err))
    }
}

/// Pass successful responses through; classify the rest.
pub async fn expect_success(platform: Platform, response: Response) -> Result<Response, TransferError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(platform, status, retry_after.as_deref(), &body))
}

/// Check the status and decode the JSON body.
pub async fn read_json<T: DeserializeOwned>(platform: Platform, response: Response) -> Result<T, TransferError> {
    let response = expect_success(platform, response).await?;
    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(platform, e))?;
    serde_json::from_str(&body).map_err(|e| {
        TransferError::InvalidResponse(format!("{} sent an unexpected payload: {}", platform, e))
    })
}

/// What an adapter has inserted into playlists during this process.
///
/// Maps playlist id → track id → the platform's entry id for that insertion
/// (when the platform has one). Used to report duplicates without listing the
/// playlist again.
#[derive(Debug, Default)]
pub struct InsertLedger {
    entries: Mutex<HashMap<String, HashMap<String, Option<String>>>>,
}

/// How a batch splits before it goes over the wire.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InsertPlan {
    /// Indices (into the submitted batch) to send
    pub send: Vec<usize>,
    /// Indices to remove first, with their entry ids (Replace mode)
    pub remove: Vec<(usize, Option<String>)>,
    /// Outcome per submitted track; `Added` is provisional for `send`
    pub outcomes: Vec<TrackOutcome>,
}

impl InsertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide which of `ids` to send. `None` ids (tracks without a platform id)
    /// fail outright.
    pub fn plan(&self, playlist_id: &str, ids: &[Option<String>], mode: InsertMode) -> InsertPlan {
        let entries = self.entries.lock();
        let existing = entries.get(playlist_id);
        let mut seen = HashSet::new();
        let mut plan = InsertPlan::default();

        for (index, id) in ids.iter().enumerate() {
            let Some(id) = id else {
                plan.outcomes.push(TrackOutcome::Failed("track has no platform id".into()));
                continue;
            };
            let known = existing.and_then(|e| e.get(id));
            let repeated = !seen.insert(id.as_str());
            match (mode, known) {
                (InsertMode::Append, Some(_)) => plan.outcomes.push(TrackOutcome::Duplicate),
                (InsertMode::Append, None) if repeated => plan.outcomes.push(TrackOutcome::Duplicate),
                (InsertMode::Replace, Some(entry)) => {
                    plan.remove.push((index, entry.clone()));
                    plan.send.push(index);
                    plan.outcomes.push(TrackOutcome::Added);
                }
                _ => {
                    plan.send.push(index);
                    plan.outcomes.push(TrackOutcome::Added);
                }
            }
        }
        plan
    }

    pub fn record(&self, playlist_id: &str, track_id: &str, entry_id: Option<String>) {
        self.entries
            .lock()
            .entry(playlist_id.to_string())
            .or_default()
            .insert(track_id.to_string(), entry_id);
    }

    pub fn forget(&self, playlist_id: &str, track_id: &str) {
        if let Some(tracks) = self.entries.lock().get_mut(playlist_id) {
            tracks.remove(track_id);
        }
    }
}
