#![allow(clippy::format_push_string)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::or_fun_call)]

//! # Postcraft
//!
//! Resumable ten-stage pipeline that turns a title, keywords and an audience
//! description into a reviewed, publication-ready blog article.
//!
//! Six step handlers (planner, orchestrator, brainstormer, outline writer,
//! content writer, reviewer) serve ten fixed stages. The workflow manager runs
//! them strictly in order, persists the run after every step, emits progress
//! events, and can resume a halted run from its first unfinished step.
//!
//! ## Features
//!
//! - **Structured stages**: every reply is parsed into a typed step output
//! - **Resumable runs**: snapshots are stored after each step
//! - **Rate-limited client**: one shared completion client with retry and backoff
//! - **Session report**: timings, model usage and quality metrics per run
//!
//! ## Quick Start
//!
//! ```bash
//! export ANTHROPIC_API_KEY=...
//! postcraft run --title "Listening on Stage" --keywords "improv, listening" \
//!     --context "Professionals new to improv" --out ./articles
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unnecessary_literal_bound)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod agents;
pub mod completion;
pub mod core;
pub mod text;
pub mod workflow;

// Re-export commonly used types
pub use agents::{
    AgentError, AgentKind, AgentSet, BlogInputs, BrandProfile, CompiledArticle, RunningContext,
    Stage, StageExecutor, StepOutput,
};
pub use completion::{
    ChatMessage, CompletionClient, CompletionError, CompletionOptions, CompletionProvider,
    ModelRouting, ProviderRequest,
};
pub use core::{Config, FileStore, MemoryStore, SnapshotStore};
pub use workflow::{
    CancellationToken, EventBus, RunArtifacts, RunRepository, RunStatus, SessionRecorder,
    WorkflowError, WorkflowEvent, WorkflowManager, WorkflowRun,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "postcraft";
