//! Topic records and the `{"tcs": [...]}` JSON document that carries them.
//!
//! The same document shape is used for the bundled catalog and for the
//! user-topic list persisted in the key-value store. Unknown fields are
//! ignored on parse so older or newer documents still load.
use serde::{Deserialize, Serialize};

// ============================================================================
// Data Structures
// ============================================================================

/// A checklist topic ("TC") identified by its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique identifier, e.g. `TC-A` or `USER-001`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Checklist lines in display order.
    pub items: Vec<String>,
    /// Free-text search keywords.
    #[serde(default)]
    pub keywords: String,
}

impl Topic {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        items: Vec<String>,
        keywords: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            items,
            keywords: keywords.into(),
        }
    }

    /// Case-insensitive substring match against code, name, keywords and items.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.code.to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
            || self.keywords.to_lowercase().contains(needle)
            || self
                .items
                .iter()
                .any(|item| item.to_lowercase().contains(needle))
    }
}

/// Wire wrapper: `{"tcs": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDocument {
    pub tcs: Vec<Topic>,
}

impl TopicDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Vec<Topic>> for TopicDocument {
    fn from(tcs: Vec<Topic>) -> Self {
        Self { tcs }
    }
}

// ============================================================================
// Tests
// ============================================================================
