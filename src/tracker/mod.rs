//! Single source of truth for the tracker.
//!
//! `Tracker` owns the four inputs of the view (catalog, user topics, query,
//! completion map) and republishes a freshly aggregated `ViewState` through a
//! `watch` channel whenever any of them changes.
//!
//! # Architecture
//!
//! - The catalog is fixed at startup.
//! - A store watcher task re-reads user topics and completion flags each
//!   time the database reports a write.
//! - The query is set synchronously by the caller.
//! - Writes go through [`WriteQueue`] and never block the caller.
//!
//! # Example
//!
//! ```ignore
//! let tracker = Tracker::start(db, catalog::bundled()?).await?;
//! let mut view = tracker.subscribe();
//! tracker.toggle("TC-A", "Prepare financial statements");
//! view.changed().await?;
//! println!("{}%", view.borrow().overall_percent());
//! ```

mod writes;

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::completion::{CompletionMap, CompletionStore};
use crate::storage::Database;
use crate::topic::Topic;
use crate::user_topics::{TopicDraft, UserTopicStore};
use crate::view::{aggregate, ViewState};

pub use writes::{WriteCommand, WriteQueue};

// ============================================================================
// Shared State
// ============================================================================

#[derive(Default)]
struct Inputs {
    catalog: Vec<Topic>,
    user: Vec<Topic>,
    query: String,
    checked: CompletionMap,
    /// Store revision that `user` and `checked` were read at.
    store_revision: u64,
}

struct Shared {
    inputs: Mutex<Inputs>,
    view_tx: watch::Sender<ViewState>,
}

impl Shared {
    /// Apply `f` to the inputs and publish the recomputed view.
    fn update(&self, f: impl FnOnce(&mut Inputs)) {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *inputs);

        let merged: Vec<Topic> = inputs
            .catalog
            .iter()
            .chain(inputs.user.iter())
            .cloned()
            .collect();
        let view = aggregate(merged, &inputs.query, inputs.checked.clone());
        self.view_tx.send_replace(view);
    }
}

/// Re-read everything the view projects from the store.
///
/// Results read at an older revision than the one already applied are
/// dropped, so a slow refresh cannot overwrite a newer one.
async fn refresh(
    shared: &Shared,
    db: &Database,
    topics: &UserTopicStore,
    completion: &CompletionStore,
) {
    let revision = db.revision();
    let user = match topics.load().await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload user topics");
            None
        }
    };
    let checked = match completion.read_all().await {
        Ok(checked) => Some(checked),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to reload completion flags");
            None
        }
    };
    if user.is_none() && checked.is_none() {
        return;
    }
    shared.update(|inputs| {
        if revision < inputs.store_revision {
            tracing::trace!(revision, applied = inputs.store_revision, "Dropping stale refresh");
            return;
        }
        inputs.store_revision = revision;
        if let Some(user) = user {
            inputs.user = user;
        }
        if let Some(checked) = checked {
            inputs.checked = checked;
        }
    });
}

/// Aborts the store watcher when dropped.
struct WatcherHandle(JoinHandle<()>);

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Dropping a `Tracker` stops its store watcher. Queued writes still run to
/// completion in the background; call [`Tracker::shutdown`] to wait for them.
pub struct Tracker {
    shared: Arc<Shared>,
    db: Database,
    topics: UserTopicStore,
    completion: CompletionStore,
    writes: WriteQueue,
    watcher: WatcherHandle,
}

impl Tracker {
    /// Load persisted state, publish the first view and start the store watcher.
    pub async fn start(db: Database, catalog: Vec<Topic>) -> Result<Self> {
        let topics = UserTopicStore::new(db.clone());
        let completion = CompletionStore::new(db.clone());

        // Subscribe before the first read so a write landing during startup
        // still wakes the watcher.
        let mut changes = db.subscribe_changes();
        let revision = *changes.borrow_and_update();
        let user = topics.load().await?;
        let checked = completion.read_all().await?;
        tracing::info!(
            catalog = catalog.len(),
            user = user.len(),
            flags = checked.len(),
            "Tracker started"
        );

        let (view_tx, _) = watch::channel(ViewState::default());
        let shared = Arc::new(Shared {
            inputs: Mutex::new(Inputs::default()),
            view_tx,
        });
        shared.update(|inputs| {
            inputs.catalog = catalog;
            inputs.user = user;
            inputs.checked = checked;
            inputs.store_revision = revision;
        });

        let watcher = tokio::spawn({
            let shared = Arc::clone(&shared);
            let db = db.clone();
            let topics = topics.clone();
            let completion = completion.clone();
            async move {
                while changes.changed().await.is_ok() {
                    tracing::trace!("Store changed, refreshing view inputs");
                    refresh(&shared, &db, &topics, &completion).await;
                }
            }
        });

        let writes = WriteQueue::spawn(completion.clone(), topics.clone());

        Ok(Self {
            shared,
            db,
            topics,
            completion,
            writes,
            watcher: WatcherHandle(watcher),
        })
    }

    /// Receiver that observes every recomputed view.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.shared.view_tx.subscribe()
    }

    /// The current view.
    pub fn snapshot(&self) -> ViewState {
        self.shared.view_tx.borrow().clone()
    }

    pub fn set_query(&self, query: &str) {
        self.shared.update(|inputs| inputs.query = query.to_string());
    }

    /// Queue a checked-state flip for one item.
    pub fn toggle(&self, code: &str, item: &str) {
        self.writes.submit(WriteCommand::Toggle {
            code: code.to_string(),
            item: item.to_string(),
        });
    }

    /// Queue an add-or-replace of a user topic.
    pub fn add_custom_topic(&self, draft: TopicDraft) {
        self.writes.submit(WriteCommand::AddOrReplace(draft));
    }

    /// Queue appending an item to a user topic.
    pub fn add_item_to_topic(&self, code: &str, text: &str) {
        self.writes.submit(WriteCommand::AppendItem {
            code: code.to_string(),
            text: text.to_string(),
        });
    }

    /// Wait for queued writes, then bring the view up to date with the store.
    pub async fn flush(&self) {
        self.writes.flush().await;
        refresh(&self.shared, &self.db, &self.topics, &self.completion).await;
    }

    /// Drain queued writes and stop background tasks.
    pub async fn shutdown(self) {
        let Self { writes, watcher, .. } = self;
        writes.shutdown().await;
        drop(watcher);
        tracing::debug!("Tracker stopped");
    }
}
