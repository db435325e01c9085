use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Process-lifetime set of identifiers that have already been handled.
///
/// Clones share the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct DedupStore {
    seen: Arc<RwLock<HashSet<String>>>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether an identity was recorded
    pub async fn contains(&self, identity: &str) -> bool {
        self.seen.read().await.contains(identity)
    }

    /// Check whether any of the identities was recorded
    pub async fn contains_any<I, S>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seen = self.seen.read().await;
        identities.into_iter().any(|id| seen.contains(id.as_ref()))
    }

    /// Record an identity unless it is already present.
    ///
    /// The check and the write happen under one write lock, so concurrent
    /// callers racing on the same key see exactly one `Inserted`.
    pub async fn insert(&self, identity: &str) -> InsertOutcome {
        if self.seen.write().await.insert(identity.to_string()) {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        }
    }

    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }
}
