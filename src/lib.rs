//! Learning Progress - mastery tracking and recommendation core
//!
//! Turns assessment events into a mastery state per (learner, topic), then
//! reads that ledger back as heatmaps, recommendations, goal progress and
//! analytics. Study sessions feed streaks and analytics.
//!
//! ## Architecture
//!
//! ```text
//! assessment -> assessment log (append) -> mastery ledger (update)
//!                                               |
//!            heatmap / recommendations / goals / analytics (read)
//!
//! study sessions -> streak / analytics (read)
//! ```
//!
//! The domain modules (`mastery`, `prerequisites`, `heatmap`, `streak`,
//! `recommendations`, `analytics`, `goals`) are pure functions over plain
//! records. `services::ProgressService` wires them to a
//! [`db::ProgressStore`], and `http` exposes the service over JSON.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/learning-progress/
//! ├── progress.db            # SQLite ledger, assessment log, sessions, goals
//! └── config.toml            # Configuration
//! ```

pub mod config;
pub mod error;
pub mod clock;
pub mod db;
pub mod views;
pub mod services;
pub mod http;

// Domain rules
pub mod mastery;
pub mod prerequisites;
pub mod heatmap;
pub mod streak;
pub mod recommendations;
pub mod analytics;
pub mod goals;

// Re-exports
pub use config::Config;
pub use error::ProgressError;
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{LearnerContext, ProgressDb, ProgressStore};
pub use http::HttpServer;
pub use services::{EventBus, ProgressEvent, ProgressService, ServiceSettings, Services, SessionPage};
