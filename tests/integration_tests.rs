//! Integration tests for the session layer.
//!
//! These run a real server and real clients over loopback TCP and drive
//! the clients with their normal tick pump, so bootstrap, fan-out, and
//! disconnect handling are exercised end to end.

use client::{Client, GameCallbacks, HitEffect, LocalPlayer, Role, SessionEnd, SessionStatus};
use server::{Server, ShutdownHandle};
use shared::{ClientId, Color, Vec2};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;

const DT: f64 = 0.02;
const MAX_TICKS: u32 = 250;

/// Records every callback so tests can assert on what the game layer saw.
#[derive(Default)]
struct Recorder {
    seeds: Vec<i64>,
    joined: Vec<ClientId>,
    left: Vec<ClientId>,
    hits: Vec<HitEffect>,
    damage_from: Vec<ClientId>,
    ended: Vec<SessionEnd>,
}

impl GameCallbacks for Recorder {
    fn world_ready(&mut self, seed: i64) {
        self.seeds.push(seed);
    }

    fn player_joined(&mut self, id: ClientId) {
        self.joined.push(id);
    }

    fn player_left(&mut self, id: ClientId) {
        self.left.push(id);
    }

    fn hit_effect(&mut self, effect: &HitEffect) {
        self.hits.push(*effect);
    }

    fn damage_taken(&mut self, attacker_id: ClientId) {
        self.damage_from.push(attacker_id);
    }

    fn session_ended(&mut self, reason: SessionEnd) {
        self.ended.push(reason);
    }
}

fn local_at(x: f64, y: f64) -> LocalPlayer {
    LocalPlayer {
        pos: Vec2::new(x, y),
        height: 0.0,
        facing: Vec2::new(0.0, 1.0),
        color: Color::WHITE,
    }
}

async fn start_server() -> (SocketAddr, ShutdownHandle) {
    let server = Server::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, handle)
}

async fn connect(addr: SocketAddr) -> Client {
    Client::connect(&addr.to_string(), Role::Client)
        .await
        .expect("connect failed")
}

/// SESSION BOOTSTRAP TESTS
mod bootstrap_tests {
    use super::*;

    /// Two clients join; both end up seeded with the same seed, each
    /// tracking exactly one remote entity for the other.
    #[tokio::test]
    async fn two_clients_bootstrap_and_see_each_other() {
        let (addr, _handle) = start_server().await;

        let mut a = connect(addr).await;
        let mut ra = Recorder::default();
        let la = local_at(0.0, 0.0);

        let mut b = connect(addr).await;
        let mut rb = Recorder::default();
        let lb = local_at(50.0, 50.0);

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            b.tick(DT, &lb, &mut rb);
            if a.session().is_seeded()
                && b.session().is_seeded()
                && a.replication().len() == 1
                && b.replication().len() == 1
            {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        let a_id = a.session().self_id().expect("A never got an ID");
        let b_id = b.session().self_id().expect("B never got an ID");
        assert_ne!(a_id, b_id);

        // Same seed on both sides, delivered exactly once each.
        assert_eq!(ra.seeds.len(), 1);
        assert_eq!(rb.seeds.len(), 1);
        assert_eq!(ra.seeds[0], rb.seeds[0]);

        // A heard the join broadcast for B; B got the roster replay for A.
        assert_eq!(ra.joined, vec![b_id]);
        assert_eq!(rb.joined, vec![a_id]);
        assert!(a.replication().get(b_id).is_some());
        assert!(b.replication().get(a_id).is_some());

        // Nobody tracks themselves.
        assert!(a.replication().get(a_id).is_none());
        assert!(b.replication().get(b_id).is_none());
    }

    /// Position snapshots published by one client reach the other and
    /// land in its replicated entity.
    #[tokio::test]
    async fn snapshots_replicate_across_clients() {
        let (addr, _handle) = start_server().await;

        let mut a = connect(addr).await;
        let mut ra = Recorder::default();
        let la = local_at(120.0, -40.0);

        let mut b = connect(addr).await;
        let mut rb = Recorder::default();
        let lb = local_at(0.0, 0.0);

        let mut a_id = None;
        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            b.tick(DT, &lb, &mut rb);

            a_id = a.session().self_id();
            if let Some(id) = a_id {
                if let Some(entity) = b.replication().get(id) {
                    if entity.last_pos.x != 0.0 {
                        break;
                    }
                }
            }
            sleep(Duration::from_millis(5)).await;
        }

        let entity = b
            .replication()
            .get(a_id.expect("A never got an ID"))
            .expect("B never saw A's snapshot");
        assert!((entity.last_pos.x - 120.0).abs() < 1e-9);
        assert!((entity.last_pos.y - (-40.0)).abs() < 1e-9);
    }
}

/// EVENT FAN-OUT TESTS
mod fanout_tests {
    use super::*;

    /// A hit announced by one client reaches the victim, who records both
    /// the visual effect and the damage; the shooter ignores its own echo.
    #[tokio::test]
    async fn hit_event_reaches_victim() {
        let (addr, _handle) = start_server().await;

        let mut a = connect(addr).await;
        let mut ra = Recorder::default();
        let la = local_at(0.0, 0.0);

        let mut b = connect(addr).await;
        let mut rb = Recorder::default();
        let lb = local_at(10.0, 10.0);

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            b.tick(DT, &lb, &mut rb);
            if a.session().self_id().is_some() && b.session().self_id().is_some() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        let a_id = a.session().self_id().unwrap();
        let b_id = b.session().self_id().unwrap();

        a.send_hit(Some(b_id), Vec2::new(10.0, 10.0), 1.5);

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            b.tick(DT, &lb, &mut rb);
            if !rb.damage_from.is_empty() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(rb.damage_from, vec![a_id]);
        assert_eq!(rb.hits.len(), 1);
        assert_eq!(rb.hits[0].attacker_id, a_id);
        assert!((rb.hits[0].hit_pos.x - 10.0).abs() < 1e-9);

        // The shooter already played its effect locally; the echo is
        // filtered out.
        assert!(ra.hits.is_empty());
        assert!(ra.damage_from.is_empty());
    }
}

/// DEPARTURE TESTS
mod departure_tests {
    use super::*;

    /// A graceful leave reaches the remaining client, which drops the
    /// leaver's entity.
    #[tokio::test]
    async fn graceful_leave_propagates() {
        let (addr, _handle) = start_server().await;

        let mut a = connect(addr).await;
        let mut ra = Recorder::default();
        let la = local_at(0.0, 0.0);

        let mut b = connect(addr).await;
        let mut rb = Recorder::default();
        let lb = local_at(0.0, 0.0);

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            b.tick(DT, &lb, &mut rb);
            if a.replication().len() == 1 && b.session().self_id().is_some() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        let b_id = b.session().self_id().unwrap();

        b.send_leave();

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            if !ra.left.is_empty() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(ra.left, vec![b_id]);
        assert!(a.replication().is_empty());
    }

    /// A client that vanishes without a leave packet is still announced
    /// to the others once the server notices the closed socket.
    #[tokio::test]
    async fn detected_disconnect_propagates() {
        let (addr, _handle) = start_server().await;

        let mut a = connect(addr).await;
        let mut ra = Recorder::default();
        let la = local_at(0.0, 0.0);

        let mut b = connect(addr).await;
        let mut rb = Recorder::default();
        let lb = local_at(0.0, 0.0);

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            b.tick(DT, &lb, &mut rb);
            if a.replication().len() == 1 && b.session().self_id().is_some() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        let b_id = b.session().self_id().unwrap();

        drop(b); // connection closes with no leave packet

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            if !ra.left.is_empty() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(ra.left, vec![b_id]);
        assert!(a.replication().is_empty());
    }

    /// Server shutdown announces itself; clients end their session with
    /// the host-left reason rather than a bare connection loss.
    #[tokio::test]
    async fn host_shutdown_ends_sessions() {
        let (addr, handle) = start_server().await;

        let mut a = connect(addr).await;
        let mut ra = Recorder::default();
        let la = local_at(0.0, 0.0);

        for _ in 0..MAX_TICKS {
            a.tick(DT, &la, &mut ra);
            if a.session().is_seeded() {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        handle.shutdown();

        let mut status = SessionStatus::Active;
        for _ in 0..MAX_TICKS {
            status = a.tick(DT, &la, &mut ra);
            if status != SessionStatus::Active {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(status, SessionStatus::Ended(SessionEnd::HostLeft));
        assert_eq!(ra.ended, vec![SessionEnd::HostLeft]);
    }
}
