//! Actor rank lookup.
//!
//! Rank tracking is a collaborator, not something the dispatcher owns:
//! the platform reports ranks through `userlist`/`addUser` traffic and
//! an application keeps whatever bookkeeping it wants. The dispatcher
//! only asks one question per command: what is this actor's rank right
//! now.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

/// Supplies the rank used by the command gate.
#[async_trait]
pub trait RankProvider: Send + Sync {
    /// The current rank of `username`. Unknown users get the guest rank.
    async fn rank_of(&self, username: &str) -> f64;
}

/// Treats every actor as a guest (rank 0). The default provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuestRanks;

#[async_trait]
impl RankProvider for GuestRanks {
    async fn rank_of(&self, _username: &str) -> f64 {
        0.0
    }
}

/// A mutable in-memory rank table.
///
/// Suitable for tests and for applications that update it from
/// `UserListSnapshot` / `UserJoin` events.
#[derive(Debug, Default)]
pub struct StaticRanks {
    ranks: RwLock<HashMap<String, f64>>,
    fallback: f64,
}

impl StaticRanks {
    /// Creates an empty table with guest fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rank returned for users not in the table.
    pub fn with_fallback(mut self, rank: f64) -> Self {
        self.fallback = rank;
        self
    }

    /// Inserts or updates a user's rank.
    pub fn set(&self, username: impl Into<String>, rank: f64) {
        self.ranks.write().insert(username.into(), rank);
    }

    /// Removes a user from the table.
    pub fn remove(&self, username: &str) {
        self.ranks.write().remove(username);
    }
}

#[async_trait]
impl RankProvider for StaticRanks {
    async fn rank_of(&self, username: &str) -> f64 {
        self.ranks
            .read()
            .get(username)
            .copied()
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_users_fall_back() {
        let ranks = StaticRanks::new();
        ranks.set("mod", 3.0);
        assert_eq!(ranks.rank_of("mod").await, 3.0);
        assert_eq!(ranks.rank_of("stranger").await, 0.0);

        let strict = StaticRanks::new().with_fallback(-1.0);
        assert_eq!(strict.rank_of("anyone").await, -1.0);
    }

    #[tokio::test]
    async fn guest_ranks_are_always_zero() {
        assert_eq!(GuestRanks.rank_of("admin").await, 0.0);
    }
}
