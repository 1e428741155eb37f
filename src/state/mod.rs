//! Crawl state, persistence and health
//!
//! # Components
//!
//! - `CrawlState`: frontier, seen set, failures, robots cache and counters
//! - `StateStore`: where that state lives between runs (file or memory)
//! - `HealthMonitor`: rolling request outcomes used to stop a failing crawl

mod crawl_state;
mod health;
mod store;

pub use crawl_state::{
    CrawlState, CrawlStats, DomainStats, FailedEntry, FrontierEntry, STATE_VERSION,
};
pub use health::HealthMonitor;
pub use store::{FileStateStore, MemoryStateStore, StateError, StateStore};
