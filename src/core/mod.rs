//! Core infrastructure for Postcraft.
//!
//! Configuration, retry with backoff, and the snapshot store that runs are
//! persisted to.

mod config;
mod retry;
mod storage;

pub use config::{CompletionConfig, Config, GeneralConfig, RetrySettings, RUNS_DIR_ENV};
pub use retry::{retry_async_with, RetryConfig, RetryDecision, RetryResult};
pub use storage::{
    FileStore, MemoryStore, SnapshotStore, StoreError, StoreResult, SNAPSHOT_VERSION,
};
