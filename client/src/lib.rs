//! # Dice Table Client Library
//!
//! A line-oriented terminal client for the dice server. The server drives
//! the whole game; the client only relays text in both directions.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Reads the player's terminal input one line at a time.
//!
//! ### Network Module (`network`)
//! Owns the TCP connection and the length-prefixed string framing:
//! - each input line goes out as one frame
//! - each frame from the server is printed as one line
//! - closing input half-closes the connection, and the client exits once
//!   the server has finished sending
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::{stdin, stdout, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1:7777").await?;
//!     client.run(BufReader::new(stdin()), stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
