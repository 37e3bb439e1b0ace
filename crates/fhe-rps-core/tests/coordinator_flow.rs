//! Integration tests for the coordinator.
//!
//! These drive complete create/join/refresh flows against the in-memory
//! registry and a scripted ledger that can hold submissions open.

use async_trait::async_trait;
use fhe_rps_core::crypto::{
    DisabledBackend, EncryptedInputBuilder, EncryptedMove, EncryptionBackend, EncryptionContext,
    MockEncryptionBackend, MockFheKey,
};
use fhe_rps_core::ledger::{LedgerClient, LedgerError, LedgerGateway, MockLedgerClient};
use fhe_rps_core::protocol::{Address, GameId, GameSession, GameStatus, Outcome, TxHash, TxStatus};
use fhe_rps_core::{CoordinatorPhase, GameCoordinator, GameError, LedgerConfig, Move};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

/// Ledger with scripted reads that counts calls and can hold submissions
/// until released.
struct ScriptedLedger {
    open_games: Mutex<Result<Vec<GameId>, LedgerError>>,
    player_games: Mutex<Result<Vec<GameId>, LedgerError>>,
    reads: AtomicUsize,
    submissions: Mutex<Vec<(&'static str, Option<GameId>, EncryptionContext)>>,
    entered: Notify,
    release: Option<Semaphore>,
}

impl ScriptedLedger {
    fn new() -> Self {
        Self {
            open_games: Mutex::new(Ok(Vec::new())),
            player_games: Mutex::new(Ok(Vec::new())),
            reads: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
            entered: Notify::new(),
            release: None,
        }
    }

    /// Submissions block until `release` gets a permit
    fn gated() -> Self {
        Self {
            release: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    fn set_reads(&self, open: &[u64], mine: &[u64]) {
        *self.open_games.lock().unwrap() = Ok(open.iter().copied().map(GameId::new).collect());
        *self.player_games.lock().unwrap() = Ok(mine.iter().copied().map(GameId::new).collect());
    }

    fn fail_reads(&self) {
        let err = LedgerError::NetworkError("connection refused".to_string());
        *self.open_games.lock().unwrap() = Err(err.clone());
        *self.player_games.lock().unwrap() = Err(err);
    }

    fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    async fn record(
        &self,
        operation: &'static str,
        game_id: Option<GameId>,
        input: &EncryptedMove,
    ) -> Result<TxHash, LedgerError> {
        self.submissions
            .lock()
            .unwrap()
            .push((operation, game_id, *input.context()));
        self.entered.notify_one();
        if let Some(release) = &self.release {
            release.acquire().await.unwrap().forget();
        }
        Ok(TxHash::from_bytes(rand::random()))
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn get_open_games(&self) -> Result<Vec<GameId>, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.open_games.lock().unwrap().clone()
    }

    async fn get_player_games(&self, _player: &Address) -> Result<Vec<GameId>, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.player_games.lock().unwrap().clone()
    }

    async fn get_game(&self, game_id: GameId) -> Result<GameSession, LedgerError> {
        Err(LedgerError::GameNotFound(game_id))
    }

    async fn create_game(&self, input: &EncryptedMove) -> Result<TxHash, LedgerError> {
        self.record("createGame", None, input).await
    }

    async fn join_game(
        &self,
        game_id: GameId,
        input: &EncryptedMove,
    ) -> Result<TxHash, LedgerError> {
        self.record("joinGame", Some(game_id), input).await
    }

    async fn transaction_status(&self, _tx_hash: &TxHash) -> Result<TxStatus, LedgerError> {
        Ok(TxStatus::Confirmed)
    }
}

async fn coordinator(
    client: Arc<dyn LedgerClient>,
    backend: Arc<dyn EncryptionBackend>,
    contract: Address,
    player: Address,
) -> Arc<GameCoordinator> {
    let builder = Arc::new(EncryptedInputBuilder::new(backend));
    let _ = builder.initialize().await;
    let config = LedgerConfig::new("mock://", contract);
    let gateway = LedgerGateway::new(client, &config);
    Arc::new(GameCoordinator::new(player, builder, gateway))
}

/// A player wired to the shared in-memory registry
async fn mock_player(ledger: &MockLedgerClient, key: MockFheKey) -> Arc<GameCoordinator> {
    let player = Address::random();
    coordinator(
        Arc::new(ledger.for_player(player)),
        Arc::new(MockEncryptionBackend::new(key)),
        ledger.contract(),
        player,
    )
    .await
}

async fn scripted_player(ledger: Arc<ScriptedLedger>) -> Arc<GameCoordinator> {
    coordinator(
        ledger,
        Arc::new(MockEncryptionBackend::new(MockFheKey::random())),
        Address::random(),
        Address::random(),
    )
    .await
}

fn ids(raw: &[u64]) -> Vec<GameId> {
    raw.iter().copied().map(GameId::new).collect()
}

fn set(raw: &[u64]) -> BTreeSet<GameId> {
    raw.iter().copied().map(GameId::new).collect()
}

#[tokio::test]
async fn test_create_game_submits_once_bound_to_caller() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    let alice = mock_player(&ledger, key).await;

    for (i, mv) in Move::ALL.into_iter().enumerate() {
        alice.select_move(mv.code()).unwrap();
        alice.create_game().await.unwrap();

        let submissions = ledger.submissions();
        assert_eq!(submissions.len(), i + 1);
        let last = submissions.last().unwrap();
        assert_eq!(last.operation, "createGame");
        assert_eq!(last.context, alice.context());
        assert_eq!(last.context.contract, ledger.contract());
        assert_eq!(last.context.submitter, alice.player());
    }

    let state = alice.state();
    assert_eq!(state.phase, CoordinatorPhase::Idle);
    assert_eq!(state.pending_move, None);
    assert_eq!(alice.snapshot().my_games, ids(&[1, 2, 3]));
}

#[tokio::test]
async fn test_invalid_move_leaves_state_unchanged() {
    let alice = scripted_player(Arc::new(ScriptedLedger::new())).await;

    let before = alice.state();
    assert_eq!(alice.select_move(3), Err(GameError::InvalidMove(3)));
    assert_eq!(alice.state(), before);

    alice.select_move(Move::Paper.code()).unwrap();
    let before = alice.state();
    assert_eq!(alice.select_move(200), Err(GameError::InvalidMove(200)));
    assert_eq!(alice.state(), before);
    assert_eq!(alice.state().pending_move, Some(Move::Paper));
}

#[tokio::test]
async fn test_create_while_submitting_is_rejected() {
    let ledger = Arc::new(ScriptedLedger::gated());
    let alice = scripted_player(ledger.clone()).await;
    alice.select_move(Move::Rock.code()).unwrap();

    let first = {
        let alice = alice.clone();
        tokio::spawn(async move { alice.create_game().await })
    };
    ledger.entered.notified().await;
    assert_eq!(alice.state().phase, CoordinatorPhase::Submitting);

    assert_eq!(
        alice.create_game().await.unwrap_err(),
        GameError::AlreadySubmitting
    );
    assert_eq!(
        alice.join_game(GameId::new(1)).await.unwrap_err(),
        GameError::AlreadySubmitting
    );
    assert_eq!(
        alice.select_move(Move::Paper.code()),
        Err(GameError::AlreadySubmitting)
    );
    // Misuse is ignored, not recorded
    assert_eq!(alice.state().last_error, None);

    // Reads are not blocked by the in-flight submission
    ledger.set_reads(&[4], &[]);
    let snapshot = alice.refresh_sessions().await.unwrap();
    assert_eq!(snapshot.open_games, set(&[4]));
    assert_eq!(alice.state().pending_move, Some(Move::Rock));

    ledger.release.as_ref().unwrap().add_permits(1);
    first.await.unwrap().unwrap();

    assert_eq!(ledger.submission_count(), 1);
    assert_eq!(alice.state().phase, CoordinatorPhase::Idle);
}

#[tokio::test]
async fn test_dropped_submission_returns_to_move_selected() {
    let ledger = Arc::new(ScriptedLedger::gated());
    let alice = scripted_player(ledger.clone()).await;
    alice.select_move(Move::Scissors.code()).unwrap();

    let task = {
        let alice = alice.clone();
        tokio::spawn(async move { alice.create_game().await })
    };
    ledger.entered.notified().await;
    assert_eq!(alice.state().phase, CoordinatorPhase::Submitting);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let state = alice.state();
    assert_eq!(state.phase, CoordinatorPhase::MoveSelected);
    assert_eq!(state.pending_move, Some(Move::Scissors));
    assert_eq!(alice.select_move(Move::Rock.code()), Ok(Move::Rock));
}

#[tokio::test]
async fn test_join_unknown_game_does_not_submit() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_reads(&[7], &[]);
    let bob = scripted_player(ledger.clone()).await;
    bob.refresh_sessions().await.unwrap();
    bob.select_move(Move::Scissors.code()).unwrap();

    let reads_before = ledger.reads.load(Ordering::SeqCst);
    let err = bob.join_game(GameId::new(8)).await.unwrap_err();

    assert_eq!(err, GameError::GameNotOpen(GameId::new(8)));
    assert_eq!(ledger.submission_count(), 0);
    // Stale target triggers a refresh
    assert!(ledger.reads.load(Ordering::SeqCst) > reads_before);

    let state = bob.state();
    assert_eq!(state.phase, CoordinatorPhase::MoveSelected);
    assert_eq!(state.pending_move, Some(Move::Scissors));
    assert_eq!(state.last_error, Some(GameError::GameNotOpen(GameId::new(8))));
}

#[tokio::test]
async fn test_failed_refresh_keeps_snapshot() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_reads(&[7, 9], &[3]);
    let alice = scripted_player(ledger.clone()).await;
    let good = alice.refresh_sessions().await.unwrap();

    ledger.fail_reads();
    let err = alice.refresh_sessions().await.unwrap_err();
    assert!(matches!(err, GameError::ReadUnavailable(_)));
    assert_eq!(alice.snapshot(), good);

    // Repeated failures stay harmless
    assert!(alice.refresh_sessions().await.is_err());
    assert_eq!(alice.snapshot(), good);
    assert!(matches!(
        alice.state().last_error,
        Some(GameError::ReadUnavailable(_))
    ));

    // Recovery clears the read error
    ledger.set_reads(&[9], &[3]);
    alice.refresh_sessions().await.unwrap();
    assert_eq!(alice.state().last_error, None);
}

#[tokio::test]
async fn test_stale_join_error_survives_failed_refresh() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_reads(&[7], &[]);
    let bob = scripted_player(ledger.clone()).await;
    bob.refresh_sessions().await.unwrap();
    bob.select_move(Move::Rock.code()).unwrap();

    ledger.fail_reads();
    let err = bob.join_game(GameId::new(8)).await.unwrap_err();

    assert_eq!(err, GameError::GameNotOpen(GameId::new(8)));
    assert_eq!(bob.state().last_error, Some(err));
    assert_eq!(ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_rejection_survives_background_refresh() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    let alice = mock_player(&ledger, key).await;
    alice.select_move(Move::Paper.code()).unwrap();

    ledger.reject_next_submission("insufficient funds");
    let err = alice.create_game().await.unwrap_err();

    ledger.set_offline(true);
    assert!(matches!(
        alice.refresh_sessions().await,
        Err(GameError::ReadUnavailable(_))
    ));
    assert_eq!(alice.state().last_error, Some(err));
}

#[tokio::test]
async fn test_partial_refresh_applies_successful_view() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_reads(&[7, 9], &[3]);
    let alice = scripted_player(ledger.clone()).await;
    alice.refresh_sessions().await.unwrap();

    ledger.set_reads(&[9], &[3, 7]);
    *ledger.player_games.lock().unwrap() =
        Err(LedgerError::NetworkError("timeout".to_string()));

    assert!(alice.refresh_sessions().await.is_err());
    let snapshot = alice.snapshot();
    assert_eq!(snapshot.open_games, set(&[9]));
    assert_eq!(snapshot.my_games, ids(&[3]));
}

#[tokio::test]
async fn test_join_round_trip() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.set_reads(&[7, 9], &[3]);
    let bob = scripted_player(ledger.clone()).await;

    let snapshot = bob.refresh_sessions().await.unwrap();
    assert_eq!(snapshot.open_games, set(&[7, 9]));
    assert_eq!(snapshot.my_games, ids(&[3]));

    bob.select_move(Move::Rock.code()).unwrap();
    ledger.set_reads(&[9], &[3, 7]);
    let pending = bob.join_game(GameId::new(7)).await.unwrap();
    assert_eq!(pending.operation, "joinGame");
    assert_eq!(pending.game_id, Some(GameId::new(7)));

    let state = bob.state();
    assert_eq!(state.phase, CoordinatorPhase::Idle);
    assert_eq!(state.pending_move, None);
    assert_eq!(state.last_submission, Some(pending));

    let snapshot = bob.refresh_sessions().await.unwrap();
    assert_eq!(snapshot.open_games, set(&[9]));
    assert_eq!(snapshot.my_games, ids(&[3, 7]));
}

#[tokio::test]
async fn test_backend_never_ready() {
    let ledger = Arc::new(ScriptedLedger::new());
    let alice = coordinator(
        ledger.clone(),
        Arc::new(DisabledBackend),
        Address::random(),
        Address::random(),
    )
    .await;
    alice.select_move(Move::Paper.code()).unwrap();

    for _ in 0..3 {
        let err = alice.create_game().await.unwrap_err();
        assert!(matches!(err, GameError::EncryptionUnavailable(_)));
        let state = alice.state();
        assert_eq!(state.pending_move, Some(Move::Paper));
        assert_eq!(state.phase, CoordinatorPhase::MoveSelected);
    }
    assert_eq!(ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_backend_still_initializing() {
    let ledger = Arc::new(ScriptedLedger::new());
    let builder = Arc::new(EncryptedInputBuilder::new(Arc::new(
        MockEncryptionBackend::new(MockFheKey::random()),
    )));
    let contract = Address::random();
    let gateway = LedgerGateway::new(ledger.clone(), &LedgerConfig::new("mock://", contract));
    let alice = GameCoordinator::new(Address::random(), builder.clone(), gateway);

    alice.select_move(Move::Rock.code()).unwrap();
    assert!(matches!(
        alice.create_game().await,
        Err(GameError::EncryptionUnavailable(_))
    ));

    builder.initialize().await.unwrap();
    alice.create_game().await.unwrap();
    assert_eq!(ledger.submission_count(), 1);
}

#[tokio::test]
async fn test_rejected_submission_keeps_move_for_retry() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    let alice = mock_player(&ledger, key).await;
    alice.select_move(Move::Scissors.code()).unwrap();

    ledger.reject_next_submission("nonce too low");
    let err = alice.create_game().await.unwrap_err();
    assert_eq!(
        err,
        GameError::SubmissionRejected("Rejected by ledger: nonce too low".to_string())
    );
    assert_eq!(alice.state().pending_move, Some(Move::Scissors));
    assert_eq!(alice.state().last_error, Some(err));

    alice.create_game().await.unwrap();
    assert_eq!(alice.state().pending_move, None);
    assert_eq!(alice.state().last_error, None);
    assert_eq!(ledger.submissions().len(), 1);
}

#[tokio::test]
async fn test_losing_join_race_is_recoverable() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    let alice = mock_player(&ledger, key).await;
    let bob = mock_player(&ledger, key).await;
    let carol = mock_player(&ledger, key).await;

    alice.select_move(Move::Rock.code()).unwrap();
    alice.create_game().await.unwrap();

    bob.refresh_sessions().await.unwrap();
    carol.refresh_sessions().await.unwrap();
    assert!(carol.snapshot().is_open(GameId::new(1)));

    bob.select_move(Move::Paper.code()).unwrap();
    bob.join_game(GameId::new(1)).await.unwrap();

    // Carol's view is stale; the ledger refuses the second join
    carol.select_move(Move::Scissors.code()).unwrap();
    let err = carol.join_game(GameId::new(1)).await.unwrap_err();
    assert!(matches!(err, GameError::SubmissionRejected(_)));
    assert_eq!(carol.state().phase, CoordinatorPhase::MoveSelected);

    carol.refresh_sessions().await.unwrap();
    assert_eq!(
        carol.join_game(GameId::new(1)).await.unwrap_err(),
        GameError::GameNotOpen(GameId::new(1))
    );
    assert_eq!(carol.state().pending_move, Some(Move::Scissors));
}

#[tokio::test]
async fn test_own_open_games_are_not_joinable() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    let alice = mock_player(&ledger, key).await;
    let bob = mock_player(&ledger, key).await;

    alice.select_move(Move::Rock.code()).unwrap();
    alice.create_game().await.unwrap();

    let alice_view = alice.refresh_sessions().await.unwrap();
    assert!(alice_view.open_games.is_empty());
    assert_eq!(alice_view.my_games, ids(&[1]));

    let bob_view = bob.refresh_sessions().await.unwrap();
    assert_eq!(bob_view.open_games, set(&[1]));
}

#[tokio::test]
async fn test_poll_submission_refreshes_on_confirmation() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    ledger.set_auto_confirm(false);
    let alice = mock_player(&ledger, key).await;

    alice.select_move(Move::Rock.code()).unwrap();
    alice.create_game().await.unwrap();
    assert_eq!(alice.state().last_submission_status, Some(TxStatus::Pending));
    assert!(alice.snapshot().my_games.is_empty());

    assert_eq!(alice.poll_submission().await.unwrap(), Some(TxStatus::Pending));

    ledger.confirm_pending();
    assert_eq!(
        alice.poll_submission().await.unwrap(),
        Some(TxStatus::Confirmed)
    );
    assert_eq!(alice.snapshot().my_games, ids(&[1]));
    assert_eq!(
        alice.state().last_submission_status,
        Some(TxStatus::Confirmed)
    );
}

#[tokio::test]
async fn test_full_game_resolves() {
    let key = MockFheKey::random();
    let ledger = MockLedgerClient::new(Address::random(), key);
    let alice = mock_player(&ledger, key).await;
    let bob = mock_player(&ledger, key).await;

    alice.select_move(Move::Rock.code()).unwrap();
    alice.create_game().await.unwrap();

    bob.refresh_sessions().await.unwrap();
    bob.select_move(Move::Paper.code()).unwrap();
    bob.join_game(GameId::new(1)).await.unwrap();

    let session = alice.game_details(GameId::new(1)).await.unwrap();
    assert_eq!(session.status, GameStatus::Resolved);
    assert_eq!(session.created_by, alice.player());
    assert_eq!(session.joined_by, Some(bob.player()));
    assert_eq!(session.outcome, Some(Outcome::JoinerWins));

    assert_eq!(bob.snapshot().my_games, ids(&[1]));
    assert!(bob.snapshot().open_games.is_empty());
}

#[tokio::test]
async fn test_create_without_move() {
    let ledger = Arc::new(ScriptedLedger::new());
    let alice = scripted_player(ledger.clone()).await;

    assert_eq!(
        alice.create_game().await.unwrap_err(),
        GameError::NoMoveSelected
    );
    assert_eq!(alice.state().phase, CoordinatorPhase::Idle);
    assert_eq!(ledger.submission_count(), 0);
}

#[tokio::test]
async fn test_reset_clears_pending_move() {
    let alice = scripted_player(Arc::new(ScriptedLedger::new())).await;
    alice.select_move(Move::Rock.code()).unwrap();
    alice.reset().unwrap();

    let state = alice.state();
    assert_eq!(state.phase, CoordinatorPhase::Idle);
    assert_eq!(state.pending_move, None);
}
