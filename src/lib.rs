//! Foreman-OS: grounded, tool-orchestrated manufacturing operations intelligence.
//!
//! ## Architecture
//!
//! - **Gateway**: read-only typed queries over operational entities
//! - **Tools**: capability tools, each a pure query-and-shape operator
//! - **Cache**: tiered TTL cache wrapping tool responses
//! - **Action Engine**: deterministic cross-tier action prioritization
//! - **Briefing**: deadline-bounded parallel orchestration of briefings
//! - **Grounding**: claim extraction + evidence scoring + citation injection

pub mod action_engine;
pub mod briefing;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod grounding;
pub mod ids;
pub mod llm;
pub mod memory;
pub mod telemetry;
pub mod time_range;
pub mod tools;
pub mod types;

pub use config::ForemanConfig;
pub use error::{Error, Result};
pub use gateway::DataSourceGateway;
