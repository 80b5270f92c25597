//! Single point of truth for the table
//!
//! The turn state, the roster and every player's outbox live behind one
//! async mutex. Each request takes the lock, lets `GameState` decide, and
//! pushes the resulting messages into the players' outboxes before
//! releasing it. Outbox pushes never block, and because all of them happen
//! under the same lock every player sees broadcasts in the same order.

use crate::dice::DiceSource;
use crate::game::{GameState, RollOutcome, TurnError};
use crate::message::Dispatch;
use crate::session::Outbox;
use log::warn;
use shared::PlayerId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct Table {
    game: GameState,
    outboxes: BTreeMap<PlayerId, Outbox>,
}

impl Table {
    /// Delivers dispatches in order. Players whose outbox is closed or full are
    /// unseated, and whatever their departure produces is delivered too.
    fn deliver(&mut self, mut pending: Vec<Dispatch>) {
        loop {
            let mut unreachable = Vec::new();

            for dispatch in pending.drain(..) {
                match dispatch {
                    Dispatch::Broadcast(message) => {
                        for (id, outbox) in &self.outboxes {
                            if !outbox.deliver(message.clone()) {
                                unreachable.push(*id);
                            }
                        }
                    }
                    Dispatch::Direct(id, message) => {
                        if let Some(outbox) = self.outboxes.get(&id) {
                            if !outbox.deliver(message) {
                                unreachable.push(id);
                            }
                        }
                    }
                }
            }

            if unreachable.is_empty() {
                break;
            }

            unreachable.sort_unstable();
            unreachable.dedup();
            for id in unreachable {
                warn!("Player {} is unreachable, removing from the table", id);
                self.outboxes.remove(&id);
                self.game.remove_player(id, &mut pending);
            }
        }
    }
}

pub struct TurnCoordinator {
    table: Mutex<Table>,
    dice: Arc<dyn DiceSource>,
}

impl TurnCoordinator {
    pub fn new(dice: Arc<dyn DiceSource>) -> Self {
        Self {
            table: Mutex::new(Table {
                game: GameState::new(),
                outboxes: BTreeMap::new(),
            }),
            dice,
        }
    }

    /// Seats a new player whose messages go to `outbox`
    pub async fn register(&self, outbox: Outbox) -> PlayerId {
        let mut table = self.table.lock().await;
        let mut out = Vec::new();

        let id = table.game.add_player(&mut out);
        table.outboxes.insert(id, outbox);
        table.deliver(out);
        id
    }

    /// Handles `r`. Out-of-turn requests are answered with a private
    /// rejection and leave the table untouched.
    pub async fn request_roll(&self, id: PlayerId) -> Result<RollOutcome, TurnError> {
        let mut table = self.table.lock().await;
        let mut out = Vec::new();

        let result = table.game.roll(id, self.dice.as_ref(), &mut out);
        table.deliver(out);
        result
    }

    /// Rolls again for a holder whose last roll was blank
    pub async fn reroll(&self, id: PlayerId) -> Result<RollOutcome, TurnError> {
        let mut table = self.table.lock().await;
        let mut out = Vec::new();

        let result = table.game.reroll(id, self.dice.as_ref(), &mut out);
        table.deliver(out);
        result
    }

    pub async fn relay(&self, id: PlayerId, text: String) -> Result<(), TurnError> {
        let mut table = self.table.lock().await;
        let mut out = Vec::new();

        let result = table.game.chat(id, text, &mut out);
        table.deliver(out);
        result
    }

    /// Unseats a player. The player's outbox is dropped first, so they get
    /// no further messages. Returns false if they were already gone.
    pub async fn leave(&self, id: PlayerId) -> bool {
        let mut table = self.table.lock().await;
        let mut out = Vec::new();

        table.outboxes.remove(&id);
        let removed = table.game.remove_player(id, &mut out);
        table.deliver(out);
        removed
    }

    pub async fn current_turn(&self) -> Option<PlayerId> {
        self.table.lock().await.game.current_turn()
    }

    pub async fn score_of(&self, id: PlayerId) -> Option<u8> {
        self.table.lock().await.game.score(id)
    }

    pub async fn player_count(&self) -> usize {
        self.table.lock().await.game.len()
    }

    pub async fn round(&self) -> u32 {
        self.table.lock().await.game.round()
    }
}
