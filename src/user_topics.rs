//! User-created topics, stored as one JSON document under a fixed key.
//!
//! Writes always replace the whole document. A missing, blank or corrupt
//! document loads as an empty list; corrupt user data never fails a read.
use anyhow::Result;

use crate::storage::Database;
use crate::topic::{Topic, TopicDocument};

/// Store key holding the `{"tcs": [...]}` document.
pub const USER_TCS_KEY: &str = "user_tcs_json";

/// Items given to a new topic created without any.
pub const PLACEHOLDER_ITEMS: [&str; 2] = ["Example bullet 1", "Example bullet 2"];

// ============================================================================
// TopicDraft
// ============================================================================

/// Input for `UserTopicStore::add_or_replace`. Blank fields get defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDraft {
    pub code: String,
    pub name: String,
    pub items: Vec<String>,
    pub keywords: String,
}

impl TopicDraft {
    /// Build a draft from raw form input: fields are trimmed and `items_text`
    /// is split into one item per non-empty line.
    pub fn from_input(code: &str, name: &str, items_text: &str, keywords: &str) -> Self {
        Self {
            code: code.trim().to_string(),
            name: name.trim().to_string(),
            items: parse_item_lines(items_text),
            keywords: keywords.trim().to_string(),
        }
    }
}

/// Split multi-line text into trimmed, non-empty item lines.
pub fn parse_item_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Auto-generated code for the `nth` user topic: `USER-001`, `USER-002`, ...
///
/// Derived from the list length, so it is only unique while topics are never removed.
pub fn next_user_code(existing: usize) -> String {
    format!("USER-{:03}", existing + 1)
}

/// Resolve a draft against the current list into a complete topic.
fn build_topic(existing: &[Topic], draft: TopicDraft) -> Topic {
    let code = if draft.code.trim().is_empty() {
        next_user_code(existing.len())
    } else {
        draft.code
    };
    let name = if draft.name.trim().is_empty() {
        format!("Custom Topic {}", code)
    } else {
        draft.name
    };
    let items = if draft.items.is_empty() {
        PLACEHOLDER_ITEMS.iter().map(|s| s.to_string()).collect()
    } else {
        draft.items
    };
    Topic {
        code,
        name,
        items,
        keywords: draft.keywords,
    }
}

/// Effect of an add-or-replace, as seen in the topic list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(Topic),
    Replaced(Topic),
}

/// Work out what an add-or-replace for `code` did, given the merged topic
/// lists from before and after it ran. A blank `code` stands for a generated one.
///
/// Returns `None` when the list shows no trace of the write.
pub fn add_outcome(before: &[Topic], after: &[Topic], code: &str) -> Option<AddOutcome> {
    let topic = after.last()?;
    let code = code.trim();
    if !code.is_empty() && topic.code != code {
        return None;
    }
    if after.len() > before.len() {
        Some(AddOutcome::Added(topic.clone()))
    } else if after != before {
        Some(AddOutcome::Replaced(topic.clone()))
    } else {
        None
    }
}

// ============================================================================
// UserTopicStore
// ============================================================================

#[derive(Clone)]
pub struct UserTopicStore {
    db: Database,
}

impl UserTopicStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current user topics in stored order.
    pub async fn load(&self) -> Result<Vec<Topic>> {
        let Some(json) = self.db.get_string(USER_TCS_KEY).await? else {
            return Ok(Vec::new());
        };
        Ok(decode_topics(&json))
    }

    /// Overwrite the stored document with `topics`.
    pub async fn save(&self, topics: &[Topic]) -> Result<()> {
        let json = TopicDocument::from(topics.to_vec()).to_json()?;
        self.db.set_string(USER_TCS_KEY, &json).await?;
        tracing::debug!(topics = topics.len(), "Saved user topics");
        Ok(())
    }

    /// Insert a topic, replacing any existing topic with the same code.
    ///
    /// The replacement moves to the end of the list. Returns the saved topic.
    pub async fn add_or_replace(&self, draft: TopicDraft) -> Result<Topic> {
        let current = self.load().await?;
        let topic = build_topic(&current, draft);

        let mut updated: Vec<Topic> = current
            .into_iter()
            .filter(|t| t.code != topic.code)
            .collect();
        updated.push(topic.clone());

        self.save(&updated).await?;
        tracing::info!(code = %topic.code, items = topic.items.len(), "Saved user topic");
        Ok(topic)
    }

    /// Append `text` to the items of the user topic `code`.
    ///
    /// Returns `false` without writing when `text` is blank or no topic matches.
    pub async fn append_item(&self, code: &str, text: &str) -> Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }

        let mut topics = self.load().await?;
        let Some(topic) = topics.iter_mut().find(|t| t.code == code) else {
            tracing::debug!(code = %code, "No user topic with this code, ignoring append");
            return Ok(false);
        };
        topic.items.push(text.to_string());

        self.save(&topics).await?;
        Ok(true)
    }
}

fn decode_topics(json: &str) -> Vec<Topic> {
    if json.trim().is_empty() {
        return Vec::new();
    }
    match TopicDocument::from_json(json) {
        Ok(doc) => doc.tcs,
        Err(e) => {
            tracing::warn!(error = %e, "Stored user topics are corrupt, treating as empty");
            Vec::new()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
