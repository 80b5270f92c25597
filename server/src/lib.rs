//! # Dice Table Server Library
//!
//! This library provides the authoritative server for the turn-based dice
//! game. Players connect over TCP, are seated in connection order and take
//! turns rolling three dice. When every seated player has scored, the round
//! closes, the winner (or the tied leaders) is announced and a new round
//! begins.
//!
//! ## Core Responsibilities
//!
//! ### Turn Authority
//! Exactly one player holds the turn at any moment. Roll requests from any
//! other player are answered with a private rejection and change nothing.
//! A blank roll (three different dice) keeps the turn with the same player
//! until a scoring roll comes up.
//!
//! ### Consistent Broadcasts
//! Every event is decided and queued for delivery inside one critical
//! section, so all connected players observe the same lines in the same
//! order: turn banner, roll, rerolls, score, round result.
//!
//! ### Connection Lifecycle
//! - Sequential id assignment on accept
//! - Exit requests and dropped connections unseat the player
//! - A departing turn holder passes the turn on instead of stalling the round
//!
//! ## Architecture Design
//!
//! ### Task Per Session
//! Each connection gets a reader task (`session::PlayerSession`) and a
//! writer task fed through a bounded queue (`session::Outbox`). Readers
//! suspend on the socket; nothing polls. A player who stops reading until
//! their queue fills is unseated.
//!
//! ### Single Lock Coordinator
//! `coordinator::TurnCoordinator` owns the roster, turn state and outboxes
//! behind one async mutex. The rules themselves live in `game::GameState`,
//! which is plain data and returns the messages each mutation produces.
//!
//! ## Module Organization
//!
//! - `dice`: roll generation and scoring
//! - `message`: every line the server can send
//! - `game`: turn order, scores, round results
//! - `coordinator`: serialized access to the game and message delivery
//! - `session`: per-connection read loop and writer task
//! - `listener`: TCP accept loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::coordinator::TurnCoordinator;
//! use server::dice::RandomDice;
//! use server::listener::SessionListener;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Arc::new(TurnCoordinator::new(Arc::new(RandomDice::new())));
//!     let listener = SessionListener::bind("0.0.0.0:7777", coordinator).await?;
//!     listener.run().await;
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod dice;
pub mod game;
pub mod listener;
pub mod message;
pub mod session;
