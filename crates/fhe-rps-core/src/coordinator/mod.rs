//! Create/join orchestration exposed to the presentation layer.

mod game;

pub use game::{CoordinatorPhase, CoordinatorState, GameCoordinator};
