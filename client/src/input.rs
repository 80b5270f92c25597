//! Line input from the terminal, one command per line

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Reads player input line by line
pub struct InputManager<R> {
    lines: Lines<R>,
    lines_read: u32,
}

impl<R> InputManager<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            lines_read: 0,
        }
    }

    /// Next line without its line ending, or `None` once input is closed
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let line = self.lines.next_line().await?;
        if line.is_some() {
            self.lines_read += 1;
        }
        Ok(line)
    }

    pub fn lines_read(&self) -> u32 {
        self.lines_read
    }
}
