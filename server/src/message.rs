//! Every line the server sends to a client
//!
//! All outbound traffic travels as plain length-prefixed strings, so each
//! message kind is a variant here and `Display` produces its wire text.

use crate::dice::Roll;
use shared::PlayerId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Welcome { player: PlayerId },
    BannerOpen,
    TurnAnnouncement { player: PlayerId },
    RollPrompt,
    ExitHint,
    BannerClose,
    Chat { text: String },
    NotYourTurn,
    DecidesToRoll { player: PlayerId },
    Rolled { player: PlayerId, roll: Roll },
    RerollPrompt,
    Rerolled { player: PlayerId, roll: Roll },
    ScoreRule,
    Score { player: PlayerId, score: u8 },
    Winner { player: PlayerId, score: u8 },
    TieHeader,
    TieEntry { player: PlayerId, score: u8 },
    PlayerLeft { player: PlayerId },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome { player } => write!(f, "You are Player_{}", player),
            ServerMessage::BannerOpen => f.write_str("\n-------------------"),
            ServerMessage::TurnAnnouncement { player } => {
                write!(f, "It is Player_{} turn.", player)
            }
            ServerMessage::RollPrompt => f.write_str("Type 'r' to roll."),
            ServerMessage::ExitHint => f.write_str("Type 'exit' if you want to leave."),
            ServerMessage::BannerClose => f.write_str("-------------------"),
            ServerMessage::Chat { text } => f.write_str(text),
            ServerMessage::NotYourTurn => f.write_str("NOT YOUR TURN!"),
            ServerMessage::DecidesToRoll { player } => {
                write!(f, "Player_{} decides to roll", player)
            }
            ServerMessage::Rolled { player, roll } => {
                write!(f, "Player_{} rolls a {}", player, roll)
            }
            ServerMessage::RerollPrompt => f.write_str("Press Enter to reroll."),
            ServerMessage::Rerolled { player, roll } => {
                write!(f, "Player_{} rerolls a {}", player, roll)
            }
            ServerMessage::ScoreRule => f.write_str("===================="),
            ServerMessage::Score { player, score } => {
                write!(f, "Player_{} score is {}", player, score)
            }
            ServerMessage::Winner { player, score } => write!(
                f,
                "\n-------- Player_{} WINS with a score of {} --------",
                player, score
            ),
            ServerMessage::TieHeader => f.write_str("\n-------- It's a TIE! Winners are --------"),
            ServerMessage::TieEntry { player, score } => {
                write!(f, "Player_{} with a score of {}", player, score)
            }
            ServerMessage::PlayerLeft { player } => {
                write!(f, "Player_{} has left the game.", player)
            }
        }
    }
}

/// Who a message is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Every seated player, in id order
    Broadcast(ServerMessage),
    /// A single player
    Direct(PlayerId, ServerMessage),
}
