//! Game coordinator.
//!
//! Per-player state machine driving create/join:
//!
//! ```text
//! Idle --select--> MoveSelected --create/join--> Submitting --ok--> Idle
//!                        ^                            |
//!                        +-----------error------------+
//! ```
//!
//! Only one submission may be in flight. Ledger reads never wait on it.

use crate::crypto::{BackendStatus, EncryptedInputBuilder, EncryptionContext};
use crate::error::GameError;
use crate::games::Move;
use crate::ledger::LedgerGateway;
use crate::protocol::{Address, GameId, GameSession, LedgerOperation, PendingTransaction, TxStatus};
use crate::session::{SessionSnapshot, SessionStateStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorPhase {
    Idle,
    MoveSelected,
    Submitting,
}

/// What the presentation layer renders
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorState {
    pub player: Address,
    pub phase: CoordinatorPhase,
    pub pending_move: Option<Move>,
    pub last_error: Option<GameError>,
    pub last_submission: Option<PendingTransaction>,
    pub last_submission_status: Option<TxStatus>,
    pub backend: BackendStatus,
}

struct Inner {
    phase: CoordinatorPhase,
    pending_move: Option<Move>,
    last_error: Option<GameError>,
    last_submission: Option<PendingTransaction>,
    last_submission_status: Option<TxStatus>,
}

impl Inner {
    /// Phase to settle into when not submitting
    fn resting_phase(&self) -> CoordinatorPhase {
        if self.pending_move.is_some() {
            CoordinatorPhase::MoveSelected
        } else {
            CoordinatorPhase::Idle
        }
    }
}

/// Returns the coordinator to a resting phase if a submission future is
/// dropped before it finishes.
struct SubmittingGuard<'a> {
    inner: &'a Mutex<Inner>,
    armed: bool,
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.inner.lock().unwrap();
            inner.phase = inner.resting_phase();
        }
    }
}

pub struct GameCoordinator {
    player: Address,
    builder: Arc<EncryptedInputBuilder>,
    gateway: LedgerGateway,
    store: SessionStateStore,
    inner: Mutex<Inner>,
}

impl GameCoordinator {
    pub fn new(
        player: Address,
        builder: Arc<EncryptedInputBuilder>,
        gateway: LedgerGateway,
    ) -> Self {
        Self {
            player,
            builder,
            gateway,
            store: SessionStateStore::new(),
            inner: Mutex::new(Inner {
                phase: CoordinatorPhase::Idle,
                pending_move: None,
                last_error: None,
                last_submission: None,
                last_submission_status: None,
            }),
        }
    }

    pub fn player(&self) -> Address {
        self.player
    }

    pub fn builder(&self) -> &Arc<EncryptedInputBuilder> {
        &self.builder
    }

    /// The pair every encrypted input from this coordinator is bound to
    pub fn context(&self) -> EncryptionContext {
        EncryptionContext::new(self.gateway.contract(), self.player)
    }

    pub fn state(&self) -> CoordinatorState {
        let inner = self.inner.lock().unwrap();
        CoordinatorState {
            player: self.player,
            phase: inner.phase,
            pending_move: inner.pending_move,
            last_error: inner.last_error.clone(),
            last_submission: inner.last_submission.clone(),
            last_submission_status: inner.last_submission_status.clone(),
            backend: self.builder.status(),
        }
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.store.snapshot()
    }

    /// Choose a move by its code (0 = Rock, 1 = Paper, 2 = Scissors).
    /// Invalid codes leave the state untouched.
    pub fn select_move(&self, code: u8) -> Result<Move, GameError> {
        let mv = Move::try_from(code)?;
        let mut inner = self.inner.lock().unwrap();
        if inner.phase == CoordinatorPhase::Submitting {
            return Err(GameError::AlreadySubmitting);
        }
        inner.pending_move = Some(mv);
        inner.phase = CoordinatorPhase::MoveSelected;
        inner.last_error = None;
        Ok(mv)
    }

    /// Drop the pending move and any error
    pub fn reset(&self) -> Result<(), GameError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.phase == CoordinatorPhase::Submitting {
            return Err(GameError::AlreadySubmitting);
        }
        inner.pending_move = None;
        inner.last_error = None;
        inner.phase = CoordinatorPhase::Idle;
        Ok(())
    }

    /// Create a new game with the pending move
    pub async fn create_game(&self) -> Result<PendingTransaction, GameError> {
        self.submit(None).await
    }

    /// Join an open game with the pending move
    pub async fn join_game(&self, game_id: GameId) -> Result<PendingTransaction, GameError> {
        let result = self.submit(Some(game_id)).await;
        if let Err(GameError::GameNotOpen(_)) = &result {
            // Local view is stale; pull a fresh one for the next attempt
            if let Err(e) = self.refresh_sessions().await {
                warn!("Refresh after stale join target failed: {}", e);
            }
        }
        result
    }

    async fn submit(&self, target: Option<GameId>) -> Result<PendingTransaction, GameError> {
        let mv = self.begin_submission(target)?;
        let mut guard = SubmittingGuard {
            inner: &self.inner,
            armed: true,
        };

        let result = self.build_and_submit(mv, target).await;

        guard.armed = false;
        {
            let mut inner = self.inner.lock().unwrap();
            match &result {
                Ok(pending) => {
                    inner.pending_move = None;
                    inner.last_error = None;
                    inner.last_submission = Some(pending.clone());
                    inner.last_submission_status = Some(TxStatus::Pending);
                }
                Err(e) => {
                    inner.last_error = Some(e.clone());
                }
            }
            inner.phase = inner.resting_phase();
        }

        if result.is_ok() {
            if let Err(e) = self.refresh_sessions().await {
                warn!("Refresh after submission failed: {}", e);
            }
        }
        result
    }

    /// Validate and enter `Submitting`, returning the move to encrypt
    fn begin_submission(&self, target: Option<GameId>) -> Result<Move, GameError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.phase == CoordinatorPhase::Submitting {
            return Err(GameError::AlreadySubmitting);
        }

        let checked = self.check_submission(&inner, target);

        match checked {
            Ok(mv) => {
                inner.phase = CoordinatorPhase::Submitting;
                inner.last_error = None;
                Ok(mv)
            }
            Err(e) => {
                warn!("Submission not started: {}", e);
                inner.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn check_submission(&self, inner: &Inner, target: Option<GameId>) -> Result<Move, GameError> {
        let mv = inner.pending_move.ok_or(GameError::NoMoveSelected)?;
        if let Some(game_id) = target {
            if !self.store.snapshot().is_open(game_id) {
                return Err(GameError::GameNotOpen(game_id));
            }
        }
        match self.builder.status() {
            BackendStatus::Ready => Ok(mv),
            BackendStatus::Initializing => Err(GameError::EncryptionUnavailable(
                "backend still initializing".to_string(),
            )),
            BackendStatus::Unavailable(reason) => Err(GameError::EncryptionUnavailable(reason)),
        }
    }

    async fn build_and_submit(
        &self,
        mv: Move,
        target: Option<GameId>,
    ) -> Result<PendingTransaction, GameError> {
        let input = self.builder.build(mv, &self.context()).await?;
        let operation = match target {
            None => LedgerOperation::CreateGame { input },
            Some(game_id) => LedgerOperation::JoinGame { game_id, input },
        };
        self.gateway.submit(operation).await
    }

    /// Re-read both ledger views into the store. Each view that was read
    /// successfully is applied even if the other failed; on failure the
    /// previous view is kept. Safe in any phase.
    pub async fn refresh_sessions(&self) -> Result<Arc<SessionSnapshot>, GameError> {
        let ticket = self.store.ticket();
        let (open, mine) = tokio::join!(
            self.gateway.read_open_games(),
            self.gateway.read_player_games(&self.player)
        );

        let mut failure = None;
        let mine = match mine {
            Ok(mine) => Some(mine),
            Err(e) => {
                failure.get_or_insert(e);
                None
            }
        };
        let open = match open {
            Ok(open) => Some(self.without_own_games(open, mine.as_deref())),
            Err(e) => {
                failure.get_or_insert(e);
                None
            }
        };

        self.store.apply(ticket, open, mine);

        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = failure {
            // Never hide an error from a create or join behind a read error
            if matches!(inner.last_error, None | Some(GameError::ReadUnavailable(_))) {
                inner.last_error = Some(e.clone());
            }
            return Err(e);
        }
        if let Some(GameError::ReadUnavailable(_)) = inner.last_error {
            inner.last_error = None;
        }
        drop(inner);

        let snapshot = self.store.snapshot();
        info!(
            "Sessions refreshed: {} open, {} mine (v{})",
            snapshot.open_games.len(),
            snapshot.my_games.len(),
            snapshot.version
        );
        Ok(snapshot)
    }

    /// The registry does not let creators join their own games, so they are
    /// left out of the joinable view. Falls back to the cached my-games view
    /// when the fresh read failed.
    fn without_own_games(
        &self,
        open: BTreeSet<GameId>,
        mine: Option<&[GameId]>,
    ) -> BTreeSet<GameId> {
        let cached;
        let mine = match mine {
            Some(mine) => mine,
            None => {
                cached = self.store.snapshot();
                cached.my_games.as_slice()
            }
        };
        open.into_iter().filter(|id| !mine.contains(id)).collect()
    }

    /// Check the last submission. Once it resolves, the session views are
    /// refreshed so they reflect the outcome.
    pub async fn poll_submission(&self) -> Result<Option<TxStatus>, GameError> {
        let pending = {
            let inner = self.inner.lock().unwrap();
            match (&inner.last_submission, &inner.last_submission_status) {
                (Some(pending), Some(TxStatus::Pending)) => pending.clone(),
                (_, status) => return Ok(status.clone()),
            }
        };

        let status = self.gateway.transaction_status(&pending).await?;
        {
            let mut inner = self.inner.lock().unwrap();
            // A newer submission may have replaced this one meanwhile
            if inner.last_submission.as_ref() == Some(&pending) {
                inner.last_submission_status = Some(status.clone());
            }
        }

        if status.is_resolved() {
            info!("{} for {} resolved: {:?}", pending.operation, pending.tx_hash, status);
            if let Err(e) = self.refresh_sessions().await {
                warn!("Refresh after resolution failed: {}", e);
            }
        }
        Ok(Some(status))
    }

    /// Ledger record for one game (status, participants, outcome)
    pub async fn game_details(&self, game_id: GameId) -> Result<GameSession, GameError> {
        self.gateway.read_game(game_id).await
    }
}
