//! # ASR-GoT Pipeline
//!
//! A nine-stage Graph-of-Thoughts pipeline for scientific reasoning. The
//! pipeline builds a typed knowledge graph (nodes, edges, hyperedges) from
//! LLM responses: it initializes a research task, decomposes it into
//! analysis dimensions, generates falsifiable hypotheses, integrates
//! search-grounded evidence, prunes and merges low-value material,
//! extracts the high-impact subgraph, composes syntheses, audits the
//! result and assembles a final report.
//!
//! ## Architecture
//!
//! ```text
//! StageEngine → TaskScheduler (worker pool) → ModelCallService (HTTP)
//!      ↓
//! GraphDocument (nodes / edges / hyperedges)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use asr_got_pipeline::{Config, HttpModelClient, StageEngine, TaskScheduler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = HttpModelClient::new(
//!         &config.endpoints,
//!         &config.credentials,
//!         config.request.clone(),
//!     )?;
//!     let scheduler = Arc::new(TaskScheduler::new(Arc::new(client), config.scheduler));
//!     let mut engine = StageEngine::new(scheduler, config.credentials, config.pipeline);
//!     for stage in 1..=9 {
//!         engine.execute_stage(stage, Some("What drives coral bleaching?")).await?;
//!     }
//!     println!("{}", engine.report().unwrap_or_default());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management.
pub mod config;
/// Four-dimensional confidence vectors and evidence scoring.
pub mod confidence;
/// Error types and result aliases.
pub mod error;
/// Heuristic text signal extraction from model completions.
pub mod extract;
/// Graph document model and graph algorithms.
pub mod graph;
/// Model Call Service trait, types and HTTP client.
pub mod model;
/// System prompts for the pipeline stages.
pub mod prompts;
/// Bounded-concurrency task scheduler.
pub mod scheduler;
/// The nine-stage reasoning pipeline.
pub mod stages;

pub use config::Config;
pub use confidence::ConfidenceVector;
pub use error::{AppError, AppResult};
pub use graph::GraphDocument;
pub use model::{HttpModelClient, ModelCallService};
pub use scheduler::TaskScheduler;
pub use stages::{StageEngine, StageResult};
