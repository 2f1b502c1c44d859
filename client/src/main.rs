use clap::Parser;
use client::{Client, GameCallbacks, HitEffect, LocalPlayer, Role, SessionEnd, SessionStatus};
use log::info;
use rand::Rng;
use shared::{ClientId, Color, Vec2, DEFAULT_PORT};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:1155")]
    server: String,

    /// Host the session: run a server in this process and join it
    #[arg(long)]
    host: bool,

    /// Port to listen on when hosting
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

/// Logs every session event. A game would render and mutate state here;
/// this binary just narrates the session.
struct LogCallbacks;

impl GameCallbacks for LogCallbacks {
    fn world_ready(&mut self, seed: i64) {
        info!("World ready, seed {}", seed);
    }

    fn player_joined(&mut self, id: ClientId) {
        info!("Player {} joined the session", id);
    }

    fn player_left(&mut self, id: ClientId) {
        info!("Player {} left the session", id);
    }

    fn hit_effect(&mut self, effect: &HitEffect) {
        info!(
            "Player {} fired: ({:.1}, {:.1}) -> ({:.1}, {:.1})",
            effect.attacker_id,
            effect.origin_pos.x,
            effect.origin_pos.y,
            effect.hit_pos.x,
            effect.hit_pos.y
        );
    }

    fn damage_taken(&mut self, attacker_id: ClientId) {
        info!("Hit by player {}", attacker_id);
    }

    fn session_ended(&mut self, reason: SessionEnd) {
        info!("Session ended: {:?}", reason);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let (role, addr, host_handle) = if args.host {
        let server = server::Server::bind(&format!("0.0.0.0:{}", args.port)).await?;
        let handle = server.shutdown_handle();
        info!("Hosting session on port {}", args.port);
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                log::error!("Hosted server stopped: {}", e);
            }
        });
        (Role::HostClient, format!("127.0.0.1:{}", args.port), Some(handle))
    } else {
        (Role::Client, args.server.clone(), None)
    };

    info!("Connecting to: {}", addr);
    let mut client = Client::connect(&addr, role).await?;

    let mut rng = rand::thread_rng();
    let local = LocalPlayer {
        pos: Vec2::default(),
        height: 0.0,
        facing: Vec2::new(0.0, 1.0),
        color: Color {
            r: rng.gen_range(25..255),
            g: rng.gen_range(25..255),
            b: rng.gen_range(25..255),
            a: 255,
        },
    };

    let mut callbacks = LogCallbacks;
    let mut interval = tokio::time::interval(Duration::from_millis(16));
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let delta = now.duration_since(last_tick).as_secs_f64();
                last_tick = now;

                if let SessionStatus::Ended(_) = client.tick(delta, &local, &mut callbacks) {
                    info!("Returning to offline mode");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                client.send_leave();
                if let Some(handle) = &host_handle {
                    handle.shutdown();
                }
                // Give the writer task a moment to flush the leave packet.
                tokio::time::sleep(Duration::from_millis(100)).await;
                break;
            }
        }
    }

    Ok(())
}
