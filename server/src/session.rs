//! Per-connection state and the session loop
//!
//! A connection is split in two. The read half belongs to a `PlayerSession`
//! running on its own task; it suspends in `receive` until a full frame has
//! arrived and never holds the coordinator lock while waiting. The write
//! half belongs to a writer task fed through an `Outbox`, so anyone can
//! queue a message for the player without blocking. The queue is bounded;
//! a player who stops reading long enough to fill it is unseated.

use crate::coordinator::TurnCoordinator;
use crate::game::{RollOutcome, TurnError};
use crate::message::ServerMessage;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{CodecError, Command, PlayerId, Utf8Codec};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::codec::{FramedRead, FramedWrite};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("turn error: {0}")]
    Turn(#[from] TurnError),
}

/// Messages a player may have queued before they count as unreachable
pub const OUTBOX_CAPACITY: usize = 256;

/// Queue of messages waiting to be written to one player's connection
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<ServerMessage>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::Receiver<ServerMessage>) {
        Self::with_capacity(OUTBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Queues a message without waiting. False once the writer is gone or
    /// the queue is full, i.e. the player has stopped reading.
    pub fn deliver(&self, message: ServerMessage) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Outbox full, peer is not reading");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Spawns the writer task for a connection and returns its outbox
///
/// The task ends when every outbox handle is dropped or a write fails.
/// Either way the receiver is dropped, so later deliveries report the
/// player as unreachable.
pub fn spawn_writer<W>(writer: W) -> Outbox
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbox, receiver) = Outbox::channel();
    tokio::spawn(write_loop(writer, receiver));
    outbox
}

async fn write_loop<W>(writer: W, mut receiver: mpsc::Receiver<ServerMessage>)
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, Utf8Codec::new());

    while let Some(message) = receiver.recv().await {
        if let Err(e) = sink.send(message.to_string()).await {
            warn!("Failed to write to client: {}", e);
            break;
        }
    }
}

pub struct PlayerSession<R> {
    id: PlayerId,
    reader: FramedRead<R, Utf8Codec>,
    outbox: Outbox,
    coordinator: Arc<TurnCoordinator>,
}

impl<R> PlayerSession<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(id: PlayerId, reader: R, outbox: Outbox, coordinator: Arc<TurnCoordinator>) -> Self {
        Self {
            id,
            reader: FramedRead::new(reader, Utf8Codec::new()),
            outbox,
            coordinator,
        }
    }

    /// Sends a message to this player only. A closed connection unseats
    /// the player.
    pub async fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        if self.outbox.deliver(message) {
            return Ok(());
        }

        self.coordinator.leave(self.id).await;
        Err(SessionError::ConnectionClosed)
    }

    /// Waits for the next line from the player
    pub async fn receive(&mut self) -> Result<String, SessionError> {
        match self.reader.next().await {
            Some(Ok(line)) => Ok(line),
            Some(Err(e)) => Err(e.into()),
            None => Err(SessionError::ConnectionClosed),
        }
    }

    /// Runs the session until the player exits or the connection fails,
    /// then unseats the player.
    pub async fn run(mut self) {
        match self.play().await {
            Ok(()) => info!("Player {} sent exit, closing connection", self.id),
            Err(SessionError::ConnectionClosed) => info!("Player {} disconnected", self.id),
            Err(e) => warn!("Session for player {} ended: {}", self.id, e),
        }

        self.coordinator.leave(self.id).await;
    }

    async fn play(&mut self) -> Result<(), SessionError> {
        loop {
            let line = self.receive().await?;

            match Command::parse(&line) {
                Command::Roll => self.take_turn().await?,
                Command::Exit => return Ok(()),
                Command::Chat(text) => self.coordinator.relay(self.id, text).await?,
            }
        }
    }

    /// Rolls until the result scores. Each blank earns one reroll prompt,
    /// and whatever the player sends back triggers the next roll.
    async fn take_turn(&mut self) -> Result<(), SessionError> {
        let mut outcome = match self.coordinator.request_roll(self.id).await {
            Ok(outcome) => outcome,
            Err(e @ TurnError::UnknownPlayer(_)) => return Err(e.into()),
            Err(e) => {
                debug!("{}", e);
                return Ok(());
            }
        };

        while let RollOutcome::Blank(roll) = outcome {
            debug!("Player {} rolled blank {}, prompting reroll", self.id, roll);
            self.send(ServerMessage::RerollPrompt).await?;
            self.receive().await?;
            outcome = self.coordinator.reroll(self.id).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{Roll, ScriptedDice};
    use bytes::BytesMut;
    use tokio_util::codec::Encoder;

    fn frame(text: &str) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Utf8Codec.encode(text.to_string(), &mut buf).unwrap();
        buf.to_vec()
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn coordinator(rolls: Vec<Roll>) -> Arc<TurnCoordinator> {
        Arc::new(TurnCoordinator::new(Arc::new(ScriptedDice::new(rolls))))
    }

    #[tokio::test]
    async fn test_receive_reads_frames_until_closed() {
        let coordinator = coordinator(vec![]);
        let (outbox, _rx) = Outbox::channel();
        let mock = tokio_test::io::Builder::new()
            .read(&frame("hello"))
            .read(&frame("r"))
            .build();

        let mut session = PlayerSession::new(0, mock, outbox, coordinator);

        assert_eq!(session.receive().await.unwrap(), "hello");
        assert_eq!(session.receive().await.unwrap(), "r");
        assert!(matches!(
            session.receive().await,
            Err(SessionError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_receive_waits_for_split_frame() {
        let coordinator = coordinator(vec![]);
        let (outbox, _rx) = Outbox::channel();
        let bytes = frame("exit");
        let mock = tokio_test::io::Builder::new()
            .read(&bytes[..3])
            .read(&bytes[3..])
            .build();

        let mut session = PlayerSession::new(0, mock, outbox, coordinator);
        assert_eq!(session.receive().await.unwrap(), "exit");
    }

    #[tokio::test]
    async fn test_blank_roll_prompts_single_reroll() {
        let coordinator = coordinator(vec![Roll::new(1, 2, 3), Roll::new(4, 4, 6)]);
        let (outbox, mut rx) = Outbox::channel();
        let id = coordinator.register(outbox.clone()).await;
        let (other, _other_rx) = Outbox::channel();
        coordinator.register(other).await;

        let mock = tokio_test::io::Builder::new()
            .read(&frame("r"))
            .read(&frame(""))
            .read(&frame("exit"))
            .build();
        PlayerSession::new(id, mock, outbox, Arc::clone(&coordinator))
            .run()
            .await;

        let seen = drain(&mut rx);
        let prompts = seen
            .iter()
            .filter(|message| **message == ServerMessage::RerollPrompt)
            .count();
        assert_eq!(prompts, 1);
        assert!(seen.contains(&ServerMessage::Rerolled {
            player: 0,
            roll: Roll::new(4, 4, 6)
        }));
        assert!(seen.contains(&ServerMessage::Score { player: 0, score: 6 }));
        assert!(!seen.contains(&ServerMessage::Score { player: 0, score: 0 }));

        // exit unseats the player
        assert_eq!(coordinator.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_turn_roll_is_rejected() {
        let coordinator = coordinator(vec![Roll::new(2, 2, 5)]);
        let (holder, _holder_rx) = Outbox::channel();
        coordinator.register(holder).await;
        let (outbox, mut rx) = Outbox::channel();
        let id = coordinator.register(outbox.clone()).await;
        drain(&mut rx);

        let mock = tokio_test::io::Builder::new().read(&frame("R")).build();
        PlayerSession::new(id, mock, outbox, Arc::clone(&coordinator))
            .run()
            .await;

        assert_eq!(drain(&mut rx), vec![ServerMessage::NotYourTurn]);
        assert_eq!(coordinator.current_turn().await, Some(0));
        assert_eq!(coordinator.score_of(0).await, None);
    }

    #[tokio::test]
    async fn test_chat_is_relayed() {
        let coordinator = coordinator(vec![]);
        let (listener, mut listener_rx) = Outbox::channel();
        coordinator.register(listener).await;
        let (outbox, _rx) = Outbox::channel();
        let id = coordinator.register(outbox.clone()).await;
        drain(&mut listener_rx);

        let mock = tokio_test::io::Builder::new()
            .read(&frame("hello table"))
            .build();
        PlayerSession::new(id, mock, outbox, Arc::clone(&coordinator))
            .run()
            .await;

        let seen = drain(&mut listener_rx);
        assert_eq!(
            seen[0],
            ServerMessage::Chat {
                text: "hello table".to_string()
            }
        );
        assert_eq!(seen[1], ServerMessage::PlayerLeft { player: 1 });
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_end_session() {
        let coordinator = coordinator(vec![]);
        let (listener, mut listener_rx) = Outbox::channel();
        coordinator.register(listener).await;
        let (outbox, _rx) = Outbox::channel();
        let id = coordinator.register(outbox.clone()).await;
        drain(&mut listener_rx);

        let mock = tokio_test::io::Builder::new()
            .read(&[0x00, 0x01, 0xFF])
            .read(&[0x00, 0x03, 0xED, 0xA0, 0xBC])
            .read(&frame("still here"))
            .read(&frame("exit"))
            .build();
        PlayerSession::new(id, mock, outbox, Arc::clone(&coordinator))
            .run()
            .await;

        let chat: Vec<String> = drain(&mut listener_rx)
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::Chat { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(chat, vec!["\u{FFFD}", "\u{FFFD}", "still here"]);
    }

    #[tokio::test]
    async fn test_writer_frames_messages() {
        let mut expected = frame("You are Player_0");
        expected.extend(frame("NOT YOUR TURN!"));
        let mock = tokio_test::io::Builder::new().write(&expected).build();

        let (outbox, receiver) = Outbox::channel();
        outbox.deliver(ServerMessage::Welcome { player: 0 });
        outbox.deliver(ServerMessage::NotYourTurn);
        drop(outbox);

        write_loop(mock, receiver).await;
    }

    #[tokio::test]
    async fn test_send_to_closed_connection_unseats() {
        let coordinator = coordinator(vec![]);
        let (outbox, rx) = Outbox::channel();
        let id = coordinator.register(outbox.clone()).await;
        drop(rx);

        let mock = tokio_test::io::Builder::new().build();
        let session = PlayerSession::new(id, mock, outbox, Arc::clone(&coordinator));

        assert!(matches!(
            session.send(ServerMessage::RerollPrompt).await,
            Err(SessionError::ConnectionClosed)
        ));
        assert_eq!(coordinator.player_count().await, 0);
    }
}
