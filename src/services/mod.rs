//! Service layer for learning-progress
//!
//! Services sit between HTTP handlers and the storage collaborator. They
//! validate input, run ledger writes as single store units, and emit events
//! for the audit log.
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! ProgressService (validation, ledger rules, aggregation)
//!     ↓
//! ProgressStore (db/store.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod response;
pub mod events;
pub mod progress_service;

// Re-exports
pub use response::*;
pub use events::{EventBus, EventListener, ProgressEvent};
pub use progress_service::{ProgressService, ServiceSettings, SessionPage};

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::db::ProgressStore;

/// Service container for dependency injection
///
/// Pass this to HttpServer for handler access.
pub struct Services {
    pub progress: Arc<ProgressService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create services over a store using the wall clock
    pub fn new(store: Arc<dyn ProgressStore + Send + Sync>, settings: ServiceSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    /// Create services with an explicit clock (tests pin the date this way)
    pub fn with_clock(
        store: Arc<dyn ProgressStore + Send + Sync>,
        settings: ServiceSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = Arc::new(EventBus::new());

        Self {
            progress: Arc::new(ProgressService::new(store, events.clone(), clock, settings)),
            events,
        }
    }
}
