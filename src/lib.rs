//! Checklist tracker for IFAC technical competence topics.
//!
//! A bundled catalog of topics is merged with user-created topics; each
//! topic item can be checked off, and progress is aggregated per topic and
//! overall. State lives in a local SQLite key-value store.
//!
//! - [`catalog`] - the built-in topic catalog
//! - [`user_topics`] - user-created topics persisted as one JSON document
//! - [`completion`] - per-item checked flags keyed by a truncated SHA-256
//! - [`view`] - pure aggregation of topics, query and flags into a view
//! - [`tracker`] - reactive source of truth and fire-and-forget writes
//! - [`storage`] - SQLite key-value store with change notification

pub mod catalog;
pub mod completion;
pub mod config;
pub mod storage;
pub mod topic;
pub mod tracker;
pub mod user_topics;
pub mod view;
