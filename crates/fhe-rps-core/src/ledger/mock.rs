//! Mock ledger client for testing.
//!
//! An in-memory game registry with the contract's observable rules: input
//! proofs must verify against (contract, sender), a game accepts at most one
//! join, creators cannot join their own game, and a joined game is judged
//! from the two encrypted moves.

use super::traits::{LedgerClient, LedgerError};
use crate::crypto::{EncryptedMove, EncryptionContext, MockFheKey};
use crate::games::{judge, Move};
use crate::protocol::{Address, GameId, GameSession, GameStatus, TxHash, TxStatus};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Submission as seen by the mock node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub operation: &'static str,
    pub game_id: Option<GameId>,
    pub sender: Address,
    pub context: EncryptionContext,
    pub tx_hash: TxHash,
}

#[derive(Clone, Copy, Debug)]
enum QueuedCall {
    Create { mv: Move },
    Join { game_id: GameId, mv: Move },
}

#[derive(Debug)]
struct MockGame {
    session: GameSession,
    creator_move: Move,
    joiner_move: Option<Move>,
}

struct MockLedgerState {
    next_id: u64,
    games: BTreeMap<GameId, MockGame>,
    player_games: HashMap<Address, Vec<GameId>>,
    transactions: HashMap<TxHash, TxStatus>,
    queued: Vec<(TxHash, Address, QueuedCall)>,
    submissions: Vec<RecordedSubmission>,
    offline: bool,
    reject_next: Option<String>,
    auto_confirm: bool,
    auto_judge: bool,
}

impl MockLedgerState {
    fn new() -> Self {
        Self {
            next_id: 1,
            games: BTreeMap::new(),
            player_games: HashMap::new(),
            transactions: HashMap::new(),
            queued: Vec::new(),
            submissions: Vec::new(),
            offline: false,
            reject_next: None,
            auto_confirm: true,
            auto_judge: true,
        }
    }

    fn check_join(&self, game_id: GameId, sender: &Address) -> Result<(), String> {
        let game = self
            .games
            .get(&game_id)
            .ok_or_else(|| format!("game {} does not exist", game_id))?;
        if game.session.status != GameStatus::Open {
            return Err(format!("game {} is not open", game_id));
        }
        if game.session.created_by == *sender {
            return Err("cannot join your own game".to_string());
        }
        Ok(())
    }

    fn judge_game(game: &mut MockGame) {
        if let Some(joiner_move) = game.joiner_move {
            game.session.outcome = Some(judge(game.creator_move, joiner_move));
            game.session.status = GameStatus::Resolved;
        }
    }

    /// Apply a confirmed call. Errors become a failed transaction.
    fn apply(&mut self, sender: Address, call: QueuedCall) -> Result<(), String> {
        match call {
            QueuedCall::Create { mv } => {
                let id = GameId::new(self.next_id);
                self.next_id += 1;
                self.games.insert(
                    id,
                    MockGame {
                        session: GameSession {
                            id,
                            status: GameStatus::Open,
                            created_by: sender,
                            joined_by: None,
                            outcome: None,
                        },
                        creator_move: mv,
                        joiner_move: None,
                    },
                );
                self.player_games.entry(sender).or_default().push(id);
            }
            QueuedCall::Join { game_id, mv } => {
                self.check_join(game_id, &sender)?;
                let auto_judge = self.auto_judge;
                if let Some(game) = self.games.get_mut(&game_id) {
                    game.session.status = GameStatus::Joined;
                    game.session.joined_by = Some(sender);
                    game.joiner_move = Some(mv);
                    if auto_judge {
                        Self::judge_game(game);
                    }
                }
                self.player_games.entry(sender).or_default().push(game_id);
            }
        }
        Ok(())
    }

    fn settle(&mut self, tx_hash: TxHash, sender: Address, call: QueuedCall) {
        let status = match self.apply(sender, call) {
            Ok(()) => TxStatus::Confirmed,
            Err(reason) => TxStatus::Failed(reason),
        };
        self.transactions.insert(tx_hash, status);
    }
}

/// In-memory mock game registry
///
/// Clones share the same registry. Each clone acts for one sender account,
/// set with `for_player`.
#[derive(Clone)]
pub struct MockLedgerClient {
    contract: Address,
    key: MockFheKey,
    sender: Option<Address>,
    state: Arc<Mutex<MockLedgerState>>,
}

impl MockLedgerClient {
    /// Create an empty registry deployed at `contract`. `key` must be the one
    /// the players' encryption backend uses.
    pub fn new(contract: Address, key: MockFheKey) -> Self {
        Self {
            contract,
            key,
            sender: None,
            state: Arc::new(Mutex::new(MockLedgerState::new())),
        }
    }

    /// A handle onto the same registry that submits as `player`
    pub fn for_player(&self, player: Address) -> Self {
        Self {
            sender: Some(player),
            ..self.clone()
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Simulate the node being unreachable
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Make the next submission fail synchronously with `reason`
    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.state.lock().unwrap().reject_next = Some(reason.into());
    }

    /// When disabled, submissions stay `Pending` until `confirm_pending`
    pub fn set_auto_confirm(&self, auto_confirm: bool) {
        self.state.lock().unwrap().auto_confirm = auto_confirm;
    }

    /// When disabled, joined games stay `Joined` until `judge_joined`
    pub fn set_auto_judge(&self, auto_judge: bool) {
        self.state.lock().unwrap().auto_judge = auto_judge;
    }

    /// Include every queued transaction, in submission order
    pub fn confirm_pending(&self) {
        let mut state = self.state.lock().unwrap();
        let queued = std::mem::take(&mut state.queued);
        for (tx_hash, sender, call) in queued {
            state.settle(tx_hash, sender, call);
        }
    }

    /// Emit judgments for every joined game
    pub fn judge_joined(&self) {
        let mut state = self.state.lock().unwrap();
        for game in state.games.values_mut() {
            if game.session.status == GameStatus::Joined {
                MockLedgerState::judge_game(game);
            }
        }
    }

    /// Every accepted submission so far
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    fn submit(
        &self,
        operation: &'static str,
        game_id: Option<GameId>,
        input: &EncryptedMove,
        call: impl FnOnce(Move) -> QueuedCall,
    ) -> Result<TxHash, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if state.offline {
            return Err(LedgerError::NetworkError("connection refused".to_string()));
        }
        if let Some(reason) = state.reject_next.take() {
            return Err(LedgerError::Rejected(reason));
        }

        let sender = self
            .sender
            .ok_or_else(|| LedgerError::Rejected("no sender account".to_string()))?;

        // msg.sender and this contract are what the proof must bind to
        let expected = EncryptionContext::new(self.contract, sender);
        let mv = self
            .key
            .open(input.handle(), input.proof(), &expected)
            .ok_or_else(|| LedgerError::Rejected("invalid input proof".to_string()))?;

        let call = call(mv);
        if let QueuedCall::Join { game_id, .. } = call {
            state.check_join(game_id, &sender).map_err(LedgerError::Rejected)?;
        }

        let tx_hash = TxHash::from_bytes(rand::random());
        state.submissions.push(RecordedSubmission {
            operation,
            game_id,
            sender,
            context: *input.context(),
            tx_hash,
        });

        if state.auto_confirm {
            state.settle(tx_hash, sender, call);
        } else {
            state.transactions.insert(tx_hash, TxStatus::Pending);
            state.queued.push((tx_hash, sender, call));
        }
        Ok(tx_hash)
    }

    fn read<T>(&self, f: impl FnOnce(&MockLedgerState) -> T) -> Result<T, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(LedgerError::NetworkError("connection refused".to_string()));
        }
        Ok(f(&state))
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn get_open_games(&self) -> Result<Vec<GameId>, LedgerError> {
        self.read(|state| {
            state
                .games
                .values()
                .filter(|g| g.session.status == GameStatus::Open)
                .map(|g| g.session.id)
                .collect()
        })
    }

    async fn get_player_games(&self, player: &Address) -> Result<Vec<GameId>, LedgerError> {
        self.read(|state| state.player_games.get(player).cloned().unwrap_or_default())
    }

    async fn get_game(&self, game_id: GameId) -> Result<GameSession, LedgerError> {
        self.read(|state| state.games.get(&game_id).map(|g| g.session.clone()))?
            .ok_or(LedgerError::GameNotFound(game_id))
    }

    async fn create_game(&self, input: &EncryptedMove) -> Result<TxHash, LedgerError> {
        self.submit("createGame", None, input, |mv| QueuedCall::Create { mv })
    }

    async fn join_game(
        &self,
        game_id: GameId,
        input: &EncryptedMove,
    ) -> Result<TxHash, LedgerError> {
        self.submit("joinGame", Some(game_id), input, |mv| QueuedCall::Join {
            game_id,
            mv,
        })
    }

    async fn transaction_status(&self, tx_hash: &TxHash) -> Result<TxStatus, LedgerError> {
        self.read(|state| state.transactions.get(tx_hash).cloned())?
            .ok_or(LedgerError::TransactionNotFound(*tx_hash))
    }
}
