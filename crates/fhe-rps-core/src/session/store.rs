//! Session state store.
//!
//! Read-through cache of the two ledger views the presentation layer renders.
//! Views are only ever replaced wholesale from fresh ledger reads. Each read
//! carries a ticket taken before it was issued; a view read under an older
//! ticket than the one already applied is dropped, so a slow read can never
//! overwrite newer data.

use crate::protocol::GameId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Immutable view of cached sessions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Games awaiting a second player
    pub open_games: BTreeSet<GameId>,
    /// Games this player created or joined, in ledger order
    pub my_games: Vec<GameId>,
    /// Bumped on every applied change
    pub version: u64,
}

impl SessionSnapshot {
    pub fn is_open(&self, game_id: GameId) -> bool {
        self.open_games.contains(&game_id)
    }
}

/// Monotonic token identifying when a read was issued
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Default)]
struct StoreInner {
    snapshot: Arc<SessionSnapshot>,
    open_ticket: u64,
    mine_ticket: u64,
}

#[derive(Default)]
pub struct SessionStateStore {
    inner: RwLock<StoreInner>,
    tickets: AtomicU64,
}

impl SessionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current view. Cheap to clone, never waits on I/O.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.inner.read().unwrap().snapshot.clone()
    }

    /// Take a ticket before issuing ledger reads
    pub fn ticket(&self) -> RefreshTicket {
        RefreshTicket(self.tickets.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replace both views at once, superseding any read still in flight
    pub fn refresh(&self, open_games: BTreeSet<GameId>, my_games: Vec<GameId>) {
        let ticket = self.ticket();
        self.apply(ticket, Some(open_games), Some(my_games));
    }

    /// Replace the open-games view if `ticket` is not stale
    pub fn apply_open_games(&self, ticket: RefreshTicket, open_games: BTreeSet<GameId>) -> bool {
        self.apply(ticket, Some(open_games), None)
    }

    /// Replace the my-games view if `ticket` is not stale
    pub fn apply_my_games(&self, ticket: RefreshTicket, my_games: Vec<GameId>) -> bool {
        self.apply(ticket, None, Some(my_games))
    }

    /// Apply whichever views are given under one write lock. Returns whether
    /// anything was applied.
    pub fn apply(
        &self,
        ticket: RefreshTicket,
        open_games: Option<BTreeSet<GameId>>,
        my_games: Option<Vec<GameId>>,
    ) -> bool {
        let mut inner = self.inner.write().unwrap();
        let mut next = (*inner.snapshot).clone();
        let mut changed = false;

        if let Some(open_games) = open_games {
            if ticket.0 > inner.open_ticket {
                inner.open_ticket = ticket.0;
                next.open_games = open_games;
                changed = true;
            }
        }
        if let Some(my_games) = my_games {
            if ticket.0 > inner.mine_ticket {
                inner.mine_ticket = ticket.0;
                next.my_games = my_games;
                changed = true;
            }
        }

        if changed {
            next.version += 1;
            inner.snapshot = Arc::new(next);
        }
        changed
    }
}
