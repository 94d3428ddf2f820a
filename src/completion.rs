//! Per-item completion flags.
//!
//! Each (topic code, item text) pair maps to a short hex key derived from
//! SHA-256. Keys are 12 bytes of digest, so two distinct pairs could collide;
//! collisions are neither detected nor handled.
use std::collections::HashMap;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::storage::Database;

/// Digest bytes kept in a completion key (24 hex characters).
pub const KEY_BYTES: usize = 12;

/// Completion key -> checked.
pub type CompletionMap = HashMap<String, bool>;

/// Storage key for an item's checked state: first 12 bytes of
/// `SHA-256("{code}::{item}")` as lowercase hex.
pub fn completion_key(code: &str, item: &str) -> String {
    let input = format!("{}::{}", code, item);
    let hash = Sha256::digest(input.as_bytes());
    hash[..KEY_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Whether `item` of topic `code` is checked in `map`. Missing keys are unchecked.
pub fn is_checked(map: &CompletionMap, code: &str, item: &str) -> bool {
    map.get(&completion_key(code, item)).copied().unwrap_or(false)
}

// ============================================================================
// CompletionStore
// ============================================================================

/// Reads and toggles completion flags in the key-value store.
#[derive(Clone)]
pub struct CompletionStore {
    db: Database,
}

impl CompletionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Flip the checked state of one item, returning the new state.
    pub async fn toggle(&self, code: &str, item: &str) -> Result<bool> {
        let key = completion_key(code, item);
        let checked = self.db.toggle_flag(&key).await?;
        tracing::debug!(code = %code, key = %key, checked, "Toggled item");
        Ok(checked)
    }

    /// Every stored key with its boolean reading.
    pub async fn read_all(&self) -> Result<CompletionMap> {
        self.db.all_flags().await
    }
}

// ============================================================================
// Tests
// ============================================================================
