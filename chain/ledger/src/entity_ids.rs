//! Entity number allocation

use types::ids::AccountId;

pub trait EntityIdSource {
    /// Next account id, in the sponsor's shard and realm.
    fn new_account_id(&mut self, sponsor: &AccountId) -> AccountId;

    /// Give back the most recently allocated number.
    fn reclaim_last_id(&mut self);
}

/// Allocates entity numbers from a monotonically increasing counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialIdSource {
    next: u64,
}

impl SequentialIdSource {
    pub fn new(first: u64) -> Self {
        Self { next: first }
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for SequentialIdSource {
    fn default() -> Self {
        Self::new(1001)
    }
}

impl EntityIdSource for SequentialIdSource {
    fn new_account_id(&mut self, sponsor: &AccountId) -> AccountId {
        let id = AccountId::new(sponsor.shard, sponsor.realm, self.next);
        self.next += 1;
        id
    }

    fn reclaim_last_id(&mut self) {
        self.next = self.next.saturating_sub(1);
    }
}
