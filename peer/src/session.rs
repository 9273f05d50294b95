//! The per-connection session state machine shared by host and guest.
//!
//! A [`Peer`] never touches a socket. Messages it wants to send go to an
//! unbounded outbox channel; messages it receives are fed in through
//! [`Peer::on_message`]; time advances through [`Peer::tick`]. That keeps
//! every transition testable without a network or a clock.

use crate::config::PeerConfig;
use crate::error::ProtocolError;
use crate::record::{MatchResult, RecordSink};
use crate::replication::{InputQueue, SnapshotMirror, SnapshotSource};
use log::{debug, error, info, warn};
use shared::render::{self, DrawCommand, Names};
use shared::{
    InputEdge, InputState, Key, Message, Role, SessionId, Side, SimState, Simulation,
    StepOutcome,
};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EndReason {
    /// The game reached its win score. The channel stays open so the host
    /// can offer a restart.
    GameOver { winner_name: String },
    /// Either side sent `cleanup`, or the relay refused the join.
    Cleanup { reason: Option<String> },
    /// The relay reported that the other participant's channel closed.
    OpponentDisconnected,
    /// Our own channel to the relay closed.
    ConnectionClosed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Waiting,
    Paired,
    Negotiating,
    Running,
    Ended(EndReason),
}

impl Phase {
    pub fn is_ended(&self) -> bool {
        matches!(self, Phase::Ended(_))
    }

    /// Ended for a reason that leaves nothing more to do on this channel.
    fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ended(reason) if !matches!(reason, EndReason::GameOver { .. }))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => f.write_str("idle"),
            Phase::Waiting => f.write_str("waiting"),
            Phase::Paired => f.write_str("paired"),
            Phase::Negotiating => f.write_str("negotiating"),
            Phase::Running => f.write_str("running"),
            Phase::Ended(EndReason::GameOver { winner_name }) => {
                write!(f, "ended ({} won)", winner_name)
            }
            Phase::Ended(EndReason::Cleanup { reason }) => match reason {
                Some(reason) => write!(f, "ended (cleanup: {})", reason),
                None => f.write_str("ended (cleanup)"),
            },
            Phase::Ended(EndReason::OpponentDisconnected) => {
                f.write_str("ended (opponent disconnected)")
            }
            Phase::Ended(EndReason::ConnectionClosed) => f.write_str("ended (connection closed)"),
        }
    }
}

/// Lifecycle notifications for whoever drives the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    Paired { role: Role, opponent_name: String },
    GameStarted,
    GameOver { winner_name: String },
    Restarted,
    Ended(EndReason),
}

#[derive(Debug, Clone)]
struct Pairing {
    role: Role,
    opponent_id: String,
    opponent_name: String,
    session_id: SessionId,
}

struct HostAuthority {
    sim: Simulation,
    input: InputState,
    queue: InputQueue,
    source: SnapshotSource,
    recorded: bool,
}

enum Authority {
    /// Not paired yet; holds the state shown while waiting.
    Unassigned(SimState),
    Host(Box<HostAuthority>),
    Guest(SnapshotMirror),
}

pub struct Peer {
    config: PeerConfig,
    phase: Phase,
    pairing: Option<Pairing>,
    authority: Authority,
    local_ready: bool,
    opponent_ready: bool,
    outbox: Option<mpsc::UnboundedSender<Message>>,
    events: Vec<PeerEvent>,
    sink: Box<dyn RecordSink>,
}

impl Peer {
    pub fn new(
        config: PeerConfig,
        outbox: mpsc::UnboundedSender<Message>,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        let idle_state = SimState::initial(&config.game);
        Self {
            config,
            phase: Phase::Idle,
            pairing: None,
            authority: Authority::Unassigned(idle_state),
            local_ready: false,
            opponent_ready: false,
            outbox: Some(outbox),
            events: Vec::new(),
            sink,
        }
    }

    /// Creates a peer together with the receiving end of its outbox.
    pub fn channel(
        config: PeerConfig,
        sink: Box<dyn RecordSink>,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, tx, sink), rx)
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn role(&self) -> Option<Role> {
        self.pairing.as_ref().map(|pairing| pairing.role)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.pairing.as_ref().map(|pairing| pairing.session_id)
    }

    pub fn opponent_id(&self) -> Option<&str> {
        self.pairing
            .as_ref()
            .map(|pairing| pairing.opponent_id.as_str())
    }

    /// The host's canonical state, or the guest's latest mirror.
    pub fn state(&self) -> &SimState {
        match &self.authority {
            Authority::Unassigned(state) => state,
            Authority::Host(host) => host.sim.state(),
            Authority::Guest(mirror) => mirror.state(),
        }
    }

    /// Draws the current state with both display names.
    pub fn render(&self) -> Vec<DrawCommand> {
        let names = Names {
            left: self.side_name(Side::Left),
            right: self.side_name(Side::Right),
        };
        render::render(self.state(), &self.config.game, names)
    }

    pub fn drain_events(&mut self) -> Vec<PeerEvent> {
        std::mem::take(&mut self.events)
    }

    /// True once the session has ended for a reason other than a finished
    /// game, or the channel is gone.
    pub fn should_exit(&self) -> bool {
        self.phase.is_terminal() || (self.phase.is_ended() && self.outbox.is_none())
    }

    /// Drops the outbox. Safe to call more than once.
    pub fn release_channel(&mut self) {
        if self.outbox.take().is_some() {
            debug!("Released channel for {}", self.config.player_id);
        }
    }

    /// Idle → Waiting: asks the relay for an opponent.
    pub fn join(&mut self) -> Result<(), ProtocolError> {
        if self.phase != Phase::Idle {
            return Err(self.invalid("join"));
        }

        self.send(Message::Join {
            player_id: self.config.player_id.clone(),
            display_name: self.config.display_name.clone(),
            variant: self.config.game.variant,
        });
        self.phase = Phase::Waiting;
        info!(
            "{} waiting for a {} opponent",
            self.config.player_id, self.config.game.variant
        );
        Ok(())
    }

    /// The local "start" action: Paired → Negotiating.
    pub fn start(&mut self) -> Result<(), ProtocolError> {
        if self.phase != Phase::Paired {
            return Err(self.invalid("start"));
        }

        self.local_ready = true;
        self.send(Message::Ready);
        self.phase = Phase::Negotiating;
        debug!("{} is ready", self.config.player_id);

        if self.is_host() && self.opponent_ready {
            self.begin_game();
        }
        Ok(())
    }

    /// A local key press or release while the game runs. The host queues it
    /// for its own side; the guest forwards it to the host.
    pub fn key_event(&mut self, key: Key, pressed: bool) -> Result<(), ProtocolError> {
        if self.phase != Phase::Running {
            return Err(self.invalid("send input"));
        }

        let edge = InputEdge { key, pressed };
        match &mut self.authority {
            Authority::Host(host) => host.queue.push(Side::Left, edge),
            _ => self.send(Message::Input { key, pressed }),
        }
        Ok(())
    }

    /// Host-only: resets a finished game and returns both sides to Paired.
    pub fn restart(&mut self) -> Result<(), ProtocolError> {
        let finished = matches!(self.phase, Phase::Ended(EndReason::GameOver { .. }));
        if !finished || self.outbox.is_none() {
            return Err(self.invalid("restart"));
        }

        let Authority::Host(host) = &mut self.authority else {
            return Err(ProtocolError::InvalidAction {
                action: "restart as guest",
                phase: self.phase.clone(),
            });
        };
        host.sim.restart();
        host.input.clear();
        host.queue.clear();
        host.recorded = false;

        self.reset_readiness();
        self.phase = Phase::Paired;
        self.send(Message::Restart);
        self.events.push(PeerEvent::Restarted);
        info!("Host restarted the game");
        Ok(())
    }

    /// Ends the session locally and tells the other side.
    pub fn leave(&mut self, reason: Option<String>) {
        if self.phase.is_terminal() {
            return;
        }
        if self.phase != Phase::Idle {
            self.send(Message::Cleanup {
                reason: reason.clone(),
            });
        }
        self.end(EndReason::Cleanup { reason });
    }

    /// Our own channel closed, locally or detected by the reader.
    pub fn on_channel_closed(&mut self) {
        if !self.phase.is_terminal() {
            self.end(EndReason::ConnectionClosed);
        }
        self.release_channel();
    }

    /// Feeds one received message through the state machine. Messages that
    /// do not fit the current phase or role are logged and ignored.
    pub fn on_message(&mut self, message: Message) {
        debug!("{} received {}", self.config.player_id, message.name());
        if let Err(e) = self.handle_message(message) {
            warn!("Ignoring message: {}", e);
        }
    }

    pub fn handle_message(&mut self, message: Message) -> Result<(), ProtocolError> {
        if self.phase.is_ended() {
            return self.handle_after_end(message);
        }

        match message {
            Message::Join { .. } => Err(ProtocolError::RelayOnly { message: "join" }),
            Message::Paired {
                role,
                opponent_id,
                opponent_name,
                session_id,
            } => {
                if self.phase != Phase::Waiting {
                    return Err(self.unexpected("paired"));
                }
                self.on_paired(Pairing {
                    role,
                    opponent_id,
                    opponent_name,
                    session_id,
                });
                Ok(())
            }
            Message::Ready => {
                if !matches!(self.phase, Phase::Paired | Phase::Negotiating) {
                    return Err(self.unexpected("ready"));
                }
                self.opponent_ready = true;
                if self.is_host() && self.local_ready {
                    self.begin_game();
                }
                Ok(())
            }
            Message::GameStart => {
                self.require_role(Role::Guest, "game_start")?;
                if self.phase != Phase::Negotiating {
                    return Err(self.unexpected("game_start"));
                }
                let mut state = SimState::initial(&self.config.game);
                state.game_started = true;
                if let Authority::Guest(mirror) = &mut self.authority {
                    mirror.reset(state);
                }
                self.enter_running();
                Ok(())
            }
            Message::Input { key, pressed } => {
                self.require_role(Role::Host, "input")?;
                if self.phase != Phase::Running {
                    return Err(self.unexpected("input"));
                }
                if let Authority::Host(host) = &mut self.authority {
                    host.queue.push(Side::Right, InputEdge { key, pressed });
                }
                Ok(())
            }
            Message::State(snapshot) => {
                self.require_role(Role::Guest, "state")?;
                if self.phase != Phase::Running {
                    return Err(self.unexpected("state"));
                }
                if let Authority::Guest(mirror) = &mut self.authority {
                    mirror.apply(snapshot);
                }
                Ok(())
            }
            Message::GameOver { winner_name } => {
                self.require_role(Role::Guest, "gameOver")?;
                if self.phase != Phase::Running {
                    return Err(self.unexpected("gameOver"));
                }
                info!("Game over: {} won", winner_name);
                self.events.push(PeerEvent::GameOver {
                    winner_name: winner_name.clone(),
                });
                self.end(EndReason::GameOver { winner_name });
                Ok(())
            }
            Message::Cleanup { reason } => {
                if self.phase == Phase::Idle {
                    return Err(self.unexpected("cleanup"));
                }
                self.end(EndReason::Cleanup { reason });
                Ok(())
            }
            Message::OpponentDisconnected => {
                if self.phase == Phase::Idle {
                    return Err(self.unexpected("opponentDisconnected"));
                }
                self.end(EndReason::OpponentDisconnected);
                Ok(())
            }
            Message::Restart => Err(self.unexpected("restart")),
        }
    }

    /// Advances the host simulation by `elapsed` and broadcasts the result.
    /// Does nothing unless this peer is a running host.
    pub fn tick(&mut self, elapsed: Duration) -> Option<StepOutcome> {
        if self.phase != Phase::Running {
            return None;
        }
        let Authority::Host(host) = &mut self.authority else {
            return None;
        };

        let pause_presses = host.queue.drain_into(&mut host.input);
        for _ in 0..pause_presses {
            let paused = host.sim.toggle_pause();
            info!("Game {}", if paused { "paused" } else { "resumed" });
        }

        let outcome = host.sim.step(&host.input, elapsed);
        let snapshot = host.source.capture(host.sim.state());
        self.send(Message::State(snapshot));

        if let StepOutcome::GameOver { winner } = outcome {
            self.finish_game(winner);
        }
        Some(outcome)
    }

    fn handle_after_end(&mut self, message: Message) -> Result<(), ProtocolError> {
        let game_over = !self.phase.is_terminal();
        match message {
            Message::Restart if game_over && self.role() == Some(Role::Guest) => {
                if let Authority::Guest(mirror) = &mut self.authority {
                    mirror.reset(SimState::initial(&self.config.game));
                }
                self.reset_readiness();
                self.phase = Phase::Paired;
                self.events.push(PeerEvent::Restarted);
                info!("Host restarted the game");
                Ok(())
            }
            Message::Cleanup { reason } if game_over => {
                self.end(EndReason::Cleanup { reason });
                Ok(())
            }
            Message::OpponentDisconnected if game_over => {
                self.end(EndReason::OpponentDisconnected);
                Ok(())
            }
            // Terminal and idempotent.
            Message::Cleanup { .. } | Message::OpponentDisconnected => Ok(()),
            other => Err(self.unexpected(other.name())),
        }
    }

    fn on_paired(&mut self, pairing: Pairing) {
        info!(
            "{} paired with {} as {} (session {})",
            self.config.player_id, pairing.opponent_id, pairing.role, pairing.session_id
        );

        self.authority = match pairing.role {
            Role::Host => {
                let game = self.config.game.clone();
                let sim = match self.config.seed {
                    Some(seed) => Simulation::with_seed(game, seed),
                    None => Simulation::new(game),
                };
                Authority::Host(Box::new(HostAuthority {
                    sim,
                    input: InputState::new(),
                    queue: InputQueue::new(),
                    source: SnapshotSource::new(),
                    recorded: false,
                }))
            }
            Role::Guest => Authority::Guest(SnapshotMirror::new(SimState::initial(
                &self.config.game,
            ))),
        };

        self.events.push(PeerEvent::Paired {
            role: pairing.role,
            opponent_name: pairing.opponent_name.clone(),
        });
        self.pairing = Some(pairing);
        self.reset_readiness();
        self.phase = Phase::Paired;
    }

    /// Host only: both sides are ready, declare the game started. The phase
    /// leaves Negotiating here, so `game_start` goes out at most once per
    /// negotiation.
    fn begin_game(&mut self) {
        if self.phase != Phase::Negotiating {
            return;
        }
        if let Authority::Host(host) = &mut self.authority {
            host.sim.start();
        }
        self.send(Message::GameStart);
        self.enter_running();
    }

    fn enter_running(&mut self) {
        self.reset_readiness();
        self.phase = Phase::Running;
        self.events.push(PeerEvent::GameStarted);
        info!("{} game started", self.config.game.variant);
    }

    fn finish_game(&mut self, winner: Side) {
        let winner_name = self.side_name(winner).to_string();
        let loser_name = self.side_name(winner.opponent()).to_string();
        info!("Game over: {} won", winner_name);

        self.send(Message::GameOver {
            winner_name: winner_name.clone(),
        });
        self.events.push(PeerEvent::GameOver {
            winner_name: winner_name.clone(),
        });
        self.end(EndReason::GameOver {
            winner_name: winner_name.clone(),
        });

        if let Authority::Host(host) = &mut self.authority {
            if !host.recorded {
                host.recorded = true;
                let state = host.sim.state();
                self.sink.submit(MatchResult {
                    winner_name,
                    loser_name,
                    score_left: state.score_left,
                    score_right: state.score_right,
                });
            }
        }
    }

    fn end(&mut self, reason: EndReason) {
        if self.phase.is_terminal() {
            return;
        }

        if let Authority::Host(host) = &mut self.authority {
            host.queue.clear();
            host.input.clear();
        }

        info!("{} session {}", self.config.player_id, Phase::Ended(reason.clone()));
        let keeps_channel = matches!(reason, EndReason::GameOver { .. });
        self.events.push(PeerEvent::Ended(reason.clone()));
        self.phase = Phase::Ended(reason);

        if !keeps_channel {
            self.release_channel();
        }
    }

    fn send(&mut self, message: Message) {
        let Some(outbox) = &self.outbox else {
            debug!("Channel released, dropping {}", message.name());
            return;
        };
        if outbox.send(message).is_err() {
            error!("Outbox closed for {}", self.config.player_id);
            self.outbox = None;
        }
    }

    fn side_name(&self, side: Side) -> &str {
        match &self.pairing {
            Some(pairing) if pairing.role.side() == side => self.config.display_name.as_str(),
            Some(pairing) => pairing.opponent_name.as_str(),
            None if side == Side::Left => self.config.display_name.as_str(),
            None => "Opponent",
        }
    }

    fn is_host(&self) -> bool {
        self.role() == Some(Role::Host)
    }

    fn reset_readiness(&mut self) {
        self.local_ready = false;
        self.opponent_ready = false;
    }

    fn require_role(&self, expected: Role, message: &'static str) -> Result<(), ProtocolError> {
        match self.role() {
            Some(role) if role != expected => Err(ProtocolError::WrongRole { message, role }),
            _ => Ok(()),
        }
    }

    fn unexpected(&self, message: &'static str) -> ProtocolError {
        ProtocolError::UnexpectedMessage {
            message,
            phase: self.phase.clone(),
        }
    }

    fn invalid(&self, action: &'static str) -> ProtocolError {
        ProtocolError::InvalidAction {
            action,
            phase: self.phase.clone(),
        }
    }
}
