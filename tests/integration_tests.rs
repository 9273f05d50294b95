//! Integration tests for the relay and two session participants
//!
//! Every test runs a real relay on a loopback port. Participants are either
//! full `PeerDriver`s or raw sockets speaking the framed protocol directly,
//! which lets a test play a misbehaving or vanishing peer.

use assert_approx_eq::assert_approx_eq;
use peer::{
    ChannelSink, EndReason, LocalCommand, LogSink, Peer, PeerConfig, PeerDriver, PeerEvent, Phase,
    RecordSink,
};
use relay::{Registry, RelayServer};
use shared::codec::{read_message, write_message};
use shared::sim::World;
use shared::{GameConfig, Key, Message, Role, Snapshot, Variant};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

const TICK: Duration = Duration::from_millis(10);
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future)
        .await
        .expect("test step timed out")
}

async fn start_relay() -> (SocketAddr, Arc<RwLock<Registry>>) {
    let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let registry = server.registry();
    tokio::spawn(server.run());
    (addr, registry)
}

async fn wait_for_waiting(registry: &Arc<RwLock<Registry>>, count: usize) {
    within(async {
        while registry.read().await.waiting_count() != count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
}

struct PeerHandle {
    task: JoinHandle<Peer>,
    commands: mpsc::UnboundedSender<LocalCommand>,
    events: mpsc::UnboundedReceiver<PeerEvent>,
}

impl PeerHandle {
    async fn spawn(addr: SocketAddr, config: PeerConfig, sink: Box<dyn RecordSink>) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (peer, outbox) = Peer::channel(config, sink);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        let driver = PeerDriver::new(peer, outbox, TICK)
            .auto_start(true)
            .with_events(event_tx);
        let task = tokio::spawn(driver.run(stream, command_rx));

        Self {
            task,
            commands,
            events,
        }
    }

    async fn wait_for(&mut self, wanted: impl Fn(&PeerEvent) -> bool) -> PeerEvent {
        within(async {
            loop {
                match self.events.recv().await {
                    Some(event) if wanted(&event) => return event,
                    Some(_) => continue,
                    None => panic!("driver stopped before the expected event"),
                }
            }
        })
        .await
    }

    async fn finish(self) -> Peer {
        within(self.task).await.unwrap()
    }
}

/// A bare socket that speaks the framed protocol.
struct RawClient {
    stream: TcpStream,
}

impl RawClient {
    async fn join(addr: SocketAddr, player_id: &str) -> Self {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_message(
            &mut stream,
            &Message::Join {
                player_id: player_id.into(),
                display_name: player_id.into(),
                variant: Variant::Pong,
            },
        )
        .await
        .unwrap();
        Self { stream }
    }

    async fn send(&mut self, message: Message) {
        write_message(&mut self.stream, &message).await.unwrap();
    }

    async fn recv(&mut self) -> Option<Message> {
        within(read_message(&mut self.stream)).await.unwrap()
    }

    async fn next_snapshot(&mut self) -> Snapshot {
        loop {
            match self.recv().await {
                Some(Message::State(snapshot)) => return snapshot,
                Some(_) => continue,
                None => panic!("connection closed while waiting for state"),
            }
        }
    }
}

/// Starts a host peer and a raw guest, paired and running.
async fn host_with_raw_guest(
    addr: SocketAddr,
    registry: &Arc<RwLock<Registry>>,
) -> (PeerHandle, RawClient) {
    let config = PeerConfig::new("alice", "Alice", GameConfig::default()).with_seed(3);
    let host = PeerHandle::spawn(addr, config, Box::new(LogSink)).await;
    wait_for_waiting(registry, 1).await;

    let mut guest = RawClient::join(addr, "bob").await;
    let Some(Message::Paired { role, .. }) = guest.recv().await else {
        panic!("expected paired");
    };
    assert_eq!(role, Role::Guest);
    guest.send(Message::Ready).await;

    (host, guest)
}

/// FULL SESSION TESTS
mod session_tests {
    use super::*;

    /// Two drivers play a one-point game through the relay; the host records
    /// the result once and quitting ends both sides.
    #[tokio::test]
    async fn full_game_through_relay() {
        let (addr, registry) = start_relay().await;
        let game = GameConfig::for_variant(Variant::Pong)
            .with_win_score(1)
            .unwrap();
        let (record_tx, mut records) = mpsc::unbounded_channel();

        let mut host = PeerHandle::spawn(
            addr,
            PeerConfig::new("alice", "Alice", game.clone()).with_seed(21),
            Box::new(ChannelSink::new(record_tx)),
        )
        .await;
        wait_for_waiting(&registry, 1).await;
        let mut guest = PeerHandle::spawn(
            addr,
            PeerConfig::new("bob", "Bob", game),
            Box::new(LogSink),
        )
        .await;

        let paired = host
            .wait_for(|e| matches!(e, PeerEvent::Paired { .. }))
            .await;
        assert_eq!(
            paired,
            PeerEvent::Paired {
                role: Role::Host,
                opponent_name: "Bob".into()
            }
        );

        // Bob parks his paddle at the top and misses the first ball.
        guest
            .wait_for(|e| matches!(e, PeerEvent::GameStarted))
            .await;
        guest
            .commands
            .send(LocalCommand::Key {
                key: Key::ArrowUp,
                pressed: true,
            })
            .unwrap();

        let over = host
            .wait_for(|e| matches!(e, PeerEvent::GameOver { .. }))
            .await;
        assert_eq!(
            over,
            PeerEvent::GameOver {
                winner_name: "Alice".into()
            }
        );
        guest
            .wait_for(|e| matches!(e, PeerEvent::GameOver { .. }))
            .await;

        let result = within(records.recv()).await.unwrap();
        assert_eq!(result.winner_name, "Alice");
        assert_eq!(result.loser_name, "Bob");
        assert_eq!(result.score_left, 1);
        assert_eq!(result.score_right, 0);

        host.commands.send(LocalCommand::Quit).unwrap();
        let host = host.finish().await;
        let guest = guest.finish().await;

        assert!(host.should_exit());
        assert!(host.state().game_over);
        assert_eq!(
            guest.phase(),
            &Phase::Ended(EndReason::Cleanup {
                reason: Some("opponent_left".into())
            })
        );
        assert!(guest.state().game_over);
        assert!(records.try_recv().is_err());
    }

    /// The relay refuses a second waiting player with the same id.
    #[tokio::test]
    async fn duplicate_player_id_is_refused() {
        let (addr, registry) = start_relay().await;
        let _first = RawClient::join(addr, "alice").await;
        wait_for_waiting(&registry, 1).await;

        let second = PeerHandle::spawn(
            addr,
            PeerConfig::new("alice", "Impostor", GameConfig::default()),
            Box::new(LogSink),
        )
        .await;
        let second = second.finish().await;

        assert_eq!(
            second.phase(),
            &Phase::Ended(EndReason::Cleanup {
                reason: Some("duplicate_player_id".into())
            })
        );
        assert_eq!(registry.read().await.session_count(), 0);
    }
}

/// REPLICATION TESTS
mod replication_tests {
    use super::*;

    /// A guest input edge moves the right paddle on the host, and the next
    /// snapshots carry the new position.
    #[tokio::test]
    async fn guest_input_reaches_host_snapshot() {
        let (addr, registry) = start_relay().await;
        let (host, mut guest) = host_with_raw_guest(addr, &registry).await;

        let first = guest.next_snapshot().await;
        let World::Pong(world) = &first.state.world else {
            panic!("expected pong");
        };
        assert_approx_eq!(world.right_paddle_y, 160.0);

        guest
            .send(Message::Input {
                key: Key::ArrowUp,
                pressed: true,
            })
            .await;

        let mut last_seq = first.seq;
        let moved = within(async {
            loop {
                let snapshot = guest.next_snapshot().await;
                assert!(snapshot.seq > last_seq);
                last_seq = snapshot.seq;
                if let World::Pong(world) = &snapshot.state.world {
                    assert_approx_eq!(world.left_paddle_y, 160.0);
                    if world.right_paddle_y < 160.0 {
                        return world.right_paddle_y;
                    }
                }
            }
        })
        .await;
        assert!(moved >= 0.0);

        drop(guest);
        host.finish().await;
    }

    /// Closing the guest socket mid-game ends the host and stops snapshots.
    #[tokio::test]
    async fn guest_disconnect_ends_host() {
        let (addr, registry) = start_relay().await;
        let (mut host, mut guest) = host_with_raw_guest(addr, &registry).await;

        host.wait_for(|e| matches!(e, PeerEvent::GameStarted)).await;
        guest.next_snapshot().await;
        drop(guest);

        let ended = host
            .wait_for(|e| matches!(e, PeerEvent::Ended(_)))
            .await;
        assert_eq!(ended, PeerEvent::Ended(EndReason::OpponentDisconnected));

        let host = host.finish().await;
        assert_eq!(host.phase(), &Phase::Ended(EndReason::OpponentDisconnected));
        assert_eq!(registry.read().await.session_count(), 0);
    }

    /// A frame that fails to decode is skipped; the session keeps running.
    #[tokio::test]
    async fn malformed_frame_is_ignored() {
        use tokio::io::AsyncWriteExt;

        let (addr, registry) = start_relay().await;
        let (host, mut guest) = host_with_raw_guest(addr, &registry).await;
        guest.next_snapshot().await;

        let garbage = [0xffu8; 6];
        guest
            .stream
            .write_all(&(garbage.len() as u32).to_le_bytes())
            .await
            .unwrap();
        guest.stream.write_all(&garbage).await.unwrap();

        let before = guest.next_snapshot().await.seq;
        let after = guest.next_snapshot().await.seq;
        assert!(after > before);

        drop(guest);
        let host = host.finish().await;
        assert_eq!(host.phase(), &Phase::Ended(EndReason::OpponentDisconnected));
    }
}
