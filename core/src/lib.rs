//! lift-core: A/B lift studies for marketing messages.
//!
//! Measures the incremental effect of a message on a conversion event by
//! comparing a control arm (messages suppressed) with a test arm
//! (messages delivered).

pub mod assignment;
pub mod blob;
pub mod clock;
pub mod config;
pub mod conversion_filter;
pub mod error;
pub mod event;
pub mod group_metrics;
pub mod handler;
pub mod lift;
pub mod metric;
pub mod normal;
pub mod results;
pub mod rng;
pub mod significance;
pub mod store;
pub mod study;
pub mod study_service;
pub mod study_stats;
pub mod types;
