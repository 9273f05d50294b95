//! Async driver: one cooperative loop per participant.
//!
//! The socket is split into a reader task and a writer task that talk to
//! the loop over unbounded channels. The loop itself only ever runs one
//! handler at a time (an inbound message, a tick or a local command), so
//! the [`Peer`] state machine never sees interleaved calls and the
//! simulation step never waits on the network.

use crate::session::{Peer, PeerEvent};
use log::{debug, error, info, warn};
use shared::codec::{read_message, write_message};
use shared::input::UnknownKey;
use shared::render;
use shared::{Key, Message};
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Ticks between periodic frame summaries.
const SUMMARY_INTERVAL: u64 = 60;

/// Reason sent with `cleanup` when the local player quits.
pub const QUIT_REASON: &str = "opponent_left";

/// A local action, typed at the keyboard or injected by a test.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    Start,
    Key { key: Key, pressed: bool },
    Pause,
    Restart,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs a key name")]
    MissingKey(&'static str),
    #[error(transparent)]
    Key(#[from] UnknownKey),
}

impl FromStr for LocalCommand {
    type Err = CommandParseError;

    /// Parses `start`, `press <Key>`, `release <Key>`, `pause`, `restart`
    /// or `quit`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandParseError::Empty)?;

        match command.to_ascii_lowercase().as_str() {
            "start" => Ok(LocalCommand::Start),
            "pause" => Ok(LocalCommand::Pause),
            "restart" => Ok(LocalCommand::Restart),
            "quit" | "exit" => Ok(LocalCommand::Quit),
            "press" => {
                let key = words.next().ok_or(CommandParseError::MissingKey("press"))?;
                Ok(LocalCommand::Key {
                    key: key.parse()?,
                    pressed: true,
                })
            }
            "release" => {
                let key = words
                    .next()
                    .ok_or(CommandParseError::MissingKey("release"))?;
                Ok(LocalCommand::Key {
                    key: key.parse()?,
                    pressed: false,
                })
            }
            _ => Err(CommandParseError::Unknown(command.to_string())),
        }
    }
}

pub struct PeerDriver {
    peer: Peer,
    outbox: mpsc::UnboundedReceiver<Message>,
    tick: Duration,
    auto_start: bool,
    events: Option<mpsc::UnboundedSender<PeerEvent>>,
}

impl PeerDriver {
    /// `outbox` must be the receiving end of the peer's own outbox.
    pub fn new(peer: Peer, outbox: mpsc::UnboundedReceiver<Message>, tick: Duration) -> Self {
        Self {
            peer,
            outbox,
            tick,
            auto_start: false,
            events: None,
        }
    }

    /// Performs the local "start" action as soon as the peer is paired,
    /// and again after every restart.
    pub fn auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    /// Forwards every lifecycle event to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<PeerEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Joins through `stream` and runs until the session is over for good.
    /// Returns the peer so callers can inspect its final state.
    pub async fn run<S>(self, stream: S, mut commands: mpsc::UnboundedReceiver<LocalCommand>) -> Peer
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let PeerDriver {
            mut peer,
            mut outbox,
            tick,
            auto_start,
            events,
        } = self;
        let (mut reader, mut writer) = tokio::io::split(stream);

        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(async move {
            loop {
                match read_message(&mut reader).await {
                    Ok(Some(message)) => {
                        if inbound_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Relay closed the connection");
                        break;
                    }
                    Err(e) if e.is_recoverable() => warn!("Dropping frame: {}", e),
                    Err(e) => {
                        error!("Error reading from relay: {}", e);
                        break;
                    }
                }
            }
        });

        let writer_task = tokio::spawn(async move {
            while let Some(message) = outbox.recv().await {
                if let Err(e) = write_message(&mut writer, &message).await {
                    error!("Error sending {}: {}", message.name(), e);
                    break;
                }
            }
            if let Err(e) = writer.shutdown().await {
                debug!("Error shutting down writer: {}", e);
            }
        });

        if let Err(e) = peer.join() {
            warn!("{}", e);
        }

        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();
        let mut frames: u64 = 0;
        let mut commands_open = true;

        loop {
            tokio::select! {
                inbound = inbound_rx.recv() => match inbound {
                    Some(message) => peer.on_message(message),
                    None => peer.on_channel_closed(),
                },

                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed = now - last_tick;
                    last_tick = now;

                    peer.tick(elapsed);
                    frames += 1;
                    if frames % SUMMARY_INTERVAL == 0 {
                        let state = peer.state();
                        debug!(
                            "Frame {}: {}-{}, factor {:.2}, {}",
                            frames,
                            state.score_left,
                            state.score_right,
                            peer.config().game.frame_factor(elapsed),
                            render::describe(&peer.render())
                        );
                    }
                },

                command = commands.recv(), if commands_open => match command {
                    Some(command) => apply_command(&mut peer, command),
                    None => commands_open = false,
                },
            }

            loop {
                let pending = peer.drain_events();
                if pending.is_empty() {
                    break;
                }
                for event in pending {
                    if auto_start && matches!(event, PeerEvent::Paired { .. } | PeerEvent::Restarted) {
                        if let Err(e) = peer.start() {
                            warn!("Auto-start failed: {}", e);
                        }
                    }
                    if let Some(tx) = &events {
                        if let Err(e) = tx.send(event) {
                            debug!("Event listener gone, dropping {:?}", e.0);
                        }
                    }
                }
            }

            if peer.should_exit() {
                break;
            }
        }

        info!("Session over: {}", peer.phase());
        peer.release_channel();
        reader_task.abort();
        if let Err(e) = writer_task.await {
            error!("Writer task failed: {}", e);
        }

        peer
    }
}

fn apply_command(peer: &mut Peer, command: LocalCommand) {
    let result = match command {
        LocalCommand::Start => peer.start(),
        LocalCommand::Key { key, pressed } => peer.key_event(key, pressed),
        LocalCommand::Pause => peer
            .key_event(Key::KeyP, true)
            .and_then(|_| peer.key_event(Key::KeyP, false)),
        LocalCommand::Restart => peer.restart(),
        LocalCommand::Quit => {
            peer.leave(Some(QUIT_REASON.to_string()));
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!("{}", e);
    }
}
