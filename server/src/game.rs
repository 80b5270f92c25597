//! Turn order, scoring and round results for the dice table
//!
//! `GameState` is plain data with no I/O. Every mutating call appends the
//! messages it produces to an outgoing `Vec<Dispatch>` in the order players
//! must see them; the coordinator delivers them while still holding its lock.

use crate::dice::{DiceSource, Roll};
use crate::message::{Dispatch, ServerMessage};
use log::{debug, info};
use shared::PlayerId;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};
use thiserror::Error;

/// Reasons a roll request is refused. None of them change the table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("player {player} tried to roll out of turn (current turn: {current:?})")]
    NotYourTurn {
        player: PlayerId,
        current: Option<PlayerId>,
    },

    #[error("player {0} must finish rerolling first")]
    RollInProgress(PlayerId),

    #[error("player {0} has no blank roll to reroll")]
    NoRollPending(PlayerId),

    #[error("player {0} is not seated at the table")]
    UnknownPlayer(PlayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The holder has not rolled yet this turn
    AwaitingRoll,
    /// The holder rolled a blank and owes a reroll
    Rerolling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    pub current: PlayerId,
    pub phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOutcome {
    /// All three dice differ; the same player rolls again
    Blank(Roll),
    Scored { roll: Roll, score: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    /// Score for the current round, `None` until the player's turn resolves
    pub score: Option<u8>,
    pub last_roll: Option<Roll>,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            score: None,
            last_roll: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundResult {
    Winner { player: PlayerId, score: u8 },
    Tie { players: Vec<PlayerId>, score: u8 },
    NoScores,
}

#[derive(Debug)]
pub struct GameState {
    players: BTreeMap<PlayerId, Player>,
    turn: Option<TurnState>,
    next_id: PlayerId,
    round: u32,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            turn: None,
            next_id: 0,
            round: 1,
        }
    }

    /// Seats a new player under the next sequential id
    ///
    /// The newcomer is greeted privately. If nobody holds the turn the
    /// newcomer's turn starts right away, otherwise they are told whose
    /// turn it is.
    pub fn add_player(&mut self, out: &mut Vec<Dispatch>) -> PlayerId {
        let id = self.next_id;
        self.next_id += 1;
        self.players.insert(id, Player::new(id));

        out.push(Dispatch::Direct(id, ServerMessage::Welcome { player: id }));

        match self.turn {
            None => self.begin_turn(id, out),
            Some(turn) => out.push(Dispatch::Direct(
                id,
                ServerMessage::TurnAnnouncement {
                    player: turn.current,
                },
            )),
        }

        info!("Seated player {} ({} at the table)", id, self.players.len());
        id
    }

    /// Removes a player from the table and the rotation
    ///
    /// When the departing player holds the turn, the turn passes on as if
    /// they had finished it. Returns false if the player was not seated.
    pub fn remove_player(&mut self, id: PlayerId, out: &mut Vec<Dispatch>) -> bool {
        if self.players.remove(&id).is_none() {
            return false;
        }

        info!("Player {} left ({} at the table)", id, self.players.len());
        out.push(Dispatch::Broadcast(ServerMessage::PlayerLeft { player: id }));

        if self.turn.map(|turn| turn.current) == Some(id) {
            self.advance_from(id, out);
        }
        true
    }

    /// First roll of a turn
    pub fn roll(
        &mut self,
        id: PlayerId,
        dice: &dyn DiceSource,
        out: &mut Vec<Dispatch>,
    ) -> Result<RollOutcome, TurnError> {
        if !self.players.contains_key(&id) {
            return Err(TurnError::UnknownPlayer(id));
        }

        match self.turn {
            Some(turn) if turn.current == id => {
                if turn.phase == Phase::Rerolling {
                    return Err(TurnError::RollInProgress(id));
                }
            }
            other => {
                debug!("Rejected out-of-turn roll from player {}", id);
                out.push(Dispatch::Direct(id, ServerMessage::NotYourTurn));
                return Err(TurnError::NotYourTurn {
                    player: id,
                    current: other.map(|turn| turn.current),
                });
            }
        }

        out.push(Dispatch::Broadcast(ServerMessage::DecidesToRoll { player: id }));
        let roll = dice.roll();
        out.push(Dispatch::Broadcast(ServerMessage::Rolled { player: id, roll }));

        Ok(self.settle(id, roll, out))
    }

    /// Follow-up roll after a blank, same player and same turn
    pub fn reroll(
        &mut self,
        id: PlayerId,
        dice: &dyn DiceSource,
        out: &mut Vec<Dispatch>,
    ) -> Result<RollOutcome, TurnError> {
        if !self.players.contains_key(&id) {
            return Err(TurnError::UnknownPlayer(id));
        }

        let pending = TurnState {
            current: id,
            phase: Phase::Rerolling,
        };
        if self.turn != Some(pending) {
            return Err(TurnError::NoRollPending(id));
        }

        let roll = dice.roll();
        out.push(Dispatch::Broadcast(ServerMessage::Rerolled { player: id, roll }));

        Ok(self.settle(id, roll, out))
    }

    /// Relays free text from a seated player to everyone
    pub fn chat(
        &mut self,
        id: PlayerId,
        text: String,
        out: &mut Vec<Dispatch>,
    ) -> Result<(), TurnError> {
        if !self.players.contains_key(&id) {
            return Err(TurnError::UnknownPlayer(id));
        }
        out.push(Dispatch::Broadcast(ServerMessage::Chat { text }));
        Ok(())
    }

    /// Best score among players who have scored this round
    pub fn standings(&self) -> RoundResult {
        let scored = self
            .players
            .values()
            .filter_map(|player| player.score.map(|score| (player.id, score)));

        let Some(best) = scored.clone().map(|(_, score)| score).max() else {
            return RoundResult::NoScores;
        };

        let leaders: Vec<PlayerId> = scored
            .filter(|(_, score)| *score == best)
            .map(|(id, _)| id)
            .collect();

        if leaders.len() == 1 {
            RoundResult::Winner {
                player: leaders[0],
                score: best,
            }
        } else {
            RoundResult::Tie {
                players: leaders,
                score: best,
            }
        }
    }

    pub fn current_turn(&self) -> Option<PlayerId> {
        self.turn.map(|turn| turn.current)
    }

    pub fn turn_state(&self) -> Option<TurnState> {
        self.turn
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn score(&self, id: PlayerId) -> Option<u8> {
        self.players.get(&id).and_then(|player| player.score)
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn settle(&mut self, id: PlayerId, roll: Roll, out: &mut Vec<Dispatch>) -> RollOutcome {
        let score = roll.score();

        if let Some(player) = self.players.get_mut(&id) {
            player.last_roll = Some(roll);
            if score > 0 {
                player.score = Some(score);
            }
        }

        if score == 0 {
            self.turn = Some(TurnState {
                current: id,
                phase: Phase::Rerolling,
            });
            return RollOutcome::Blank(roll);
        }

        out.push(Dispatch::Broadcast(ServerMessage::ScoreRule));
        out.push(Dispatch::Broadcast(ServerMessage::Score { player: id, score }));
        out.push(Dispatch::Broadcast(ServerMessage::ScoreRule));

        self.advance_from(id, out);
        RollOutcome::Scored { roll, score }
    }

    /// Hands the turn to the next seated id above `id`, or closes the round
    fn advance_from(&mut self, id: PlayerId, out: &mut Vec<Dispatch>) {
        let next = self
            .players
            .range((Excluded(id), Unbounded))
            .next()
            .map(|(next, _)| *next);

        match next {
            Some(next) => self.begin_turn(next, out),
            None => self.finish_round(out),
        }
    }

    fn finish_round(&mut self, out: &mut Vec<Dispatch>) {
        match self.standings() {
            RoundResult::Winner { player, score } => {
                info!("Round {} won by player {} with {}", self.round, player, score);
                out.push(Dispatch::Broadcast(ServerMessage::Winner { player, score }));
            }
            RoundResult::Tie { players, score } => {
                info!("Round {} tied at {} by {:?}", self.round, score, players);
                out.push(Dispatch::Broadcast(ServerMessage::TieHeader));
                for player in players {
                    out.push(Dispatch::Broadcast(ServerMessage::TieEntry { player, score }));
                }
            }
            RoundResult::NoScores => {
                info!("Round {} ended without scores", self.round);
            }
        }

        self.round += 1;
        for player in self.players.values_mut() {
            player.score = None;
        }

        match self.players.keys().next().copied() {
            Some(first) => self.begin_turn(first, out),
            None => self.turn = None,
        }
    }

    fn begin_turn(&mut self, id: PlayerId, out: &mut Vec<Dispatch>) {
        self.turn = Some(TurnState {
            current: id,
            phase: Phase::AwaitingRoll,
        });

        out.push(Dispatch::Broadcast(ServerMessage::BannerOpen));
        out.push(Dispatch::Broadcast(ServerMessage::TurnAnnouncement { player: id }));
        out.push(Dispatch::Direct(id, ServerMessage::RollPrompt));
        out.push(Dispatch::Broadcast(ServerMessage::ExitHint));
        out.push(Dispatch::Broadcast(ServerMessage::BannerClose));
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
