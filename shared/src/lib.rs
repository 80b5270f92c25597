pub mod codec;

pub use codec::{CodecError, Utf8Codec, LENGTH_PREFIX, MAX_FRAME_LEN};

/// Port the server listens on when none is given
pub const DEFAULT_PORT: u16 = 7777;

/// Player identity, assigned by the server in connection order starting at 0
pub type PlayerId = u32;

/// What a line typed by a player asks the server to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Roll,
    Exit,
    /// Anything else; relayed to the table as-is
    Chat(String),
}

impl Command {
    /// Interprets one client line. Commands are matched case-insensitively
    /// after trimming surrounding whitespace, chat keeps the original text.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("r") {
            Command::Roll
        } else if trimmed.eq_ignore_ascii_case("exit") {
            Command::Exit
        } else {
            Command::Chat(line.to_string())
        }
    }
}
