//! Transfer orchestration - moves a playlist from one music service to another.
//!
//! # Architecture
//!
//! - **Domain models** (`domain.rs`) - jobs, options, errors and events
//! - **Traits** (`traits.rs`) - the adapter and conflict-decision seams
//! - **Rate limiting / retry** (`rate_limit.rs`, `retry.rs`) - per-platform call policy
//! - **Links** (`link.rs`) - adapter + limiter + retry bundled per platform
//! - **Matcher** (`matcher.rs`) - decides whether a search hit is the same recording
//! - **History** (`history.rs`) - bounded record of finished jobs
//! - **Engine** (`engine.rs`) - the job state machine
//!
//! The engine only ever sees [`PlatformAdapter`]; the concrete HTTP clients
//! live in [`crate::platforms`].
//!
//! # Usage
//!
//! ```ignore
//! use transfer::{Engine, TransferRequest, event_channel};
//!
//! let (tx, events) = event_channel();
//! let engine = Engine::new(registry, history).with_event_sender(tx);
//! let job_id = engine.start_transfer(TransferRequest::new(playlist, Platform::AppleMusic))?;
//! ```

pub mod domain;
pub mod engine;
pub mod history;
pub mod link;
pub mod matcher;
pub mod rate_limit;
pub mod retry;
pub mod traits;

pub use domain::{
    ConflictDecision, ConflictResolution, InsertMode, JobState, Phase, TrackConflict, TrackOutcome,
    TransferError, TransferEvent, TransferJob, TransferOptions, TransferRecord, TransferRequest,
};
pub use engine::{Engine, event_channel};
pub use history::{HistoryError, HistoryStore, MemoryHistory, SqliteHistory};
pub use link::{AdapterRegistry, PlatformLink};
pub use matcher::{MatchResolver, MatchStrategy, WeightedMatch};
pub use rate_limit::RateLimiter;
pub use retry::RetryExecutor;
pub use traits::{ConflictDecider, PlatformAdapter};
