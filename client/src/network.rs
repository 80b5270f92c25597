//! Connection to the dice server
//!
//! Forwards every input line to the server as one frame and prints every
//! frame the server sends as one line. When input runs out the write side
//! is shut down, and the client keeps printing until the server closes.

use crate::input::InputManager;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use shared::{CodecError, Utf8Codec};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        info!("Connected to {}", addr);
        Ok(Client { stream })
    }

    /// Runs the session until the server closes the connection
    pub async fn run<I, O>(self, input: I, mut output: O) -> Result<(), ClientError>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (reader, writer) = self.stream.into_split();
        let mut incoming = FramedRead::new(reader, Utf8Codec::new());
        let mut outgoing = FramedWrite::new(writer, Utf8Codec::new());
        let mut input = InputManager::new(input);
        let mut input_open = true;

        loop {
            tokio::select! {
                frame = incoming.next() => match frame {
                    Some(Ok(text)) => {
                        output.write_all(text.as_bytes()).await?;
                        output.write_all(b"\n").await?;
                        output.flush().await?;
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        info!("Server closed the connection");
                        return Ok(());
                    }
                },

                line = input.next_line(), if input_open => match line? {
                    Some(line) => outgoing.send(line).await?,
                    None => {
                        debug!("Input closed after {} line(s)", input.lines_read());
                        input_open = false;
                        outgoing.close().await?;
                    }
                },
            }
        }
    }
}
