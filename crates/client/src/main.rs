use std::time::Duration;

use clap::Parser;
use tokio::time::{self, MissedTickBehavior};

use skirmish::DEFAULT_SERVER_URL;
use skirmish_client::net::{ClientConfig, InputState, JoinRequest, NetworkClient};

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Headless skirmish client")]
struct Args {
    #[arg(short, long, default_value = DEFAULT_SERVER_URL, help = "WebSocket URL of the game server")]
    server: String,

    #[arg(short, long, default_value = "Player", help = "Display name (max 20 characters)")]
    name: String,

    #[arg(short, long, help = "Room to join; matchmaking is used when omitted")]
    room: Option<String>,

    #[arg(long, help = "Join with two local players in the same room")]
    split: bool,

    #[arg(long, default_value_t = 60, help = "Frames per second to tick the client at")]
    render_rate: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
    let request = JoinRequest {
        url: args.server,
        player_name: args.name,
        matchmake: args.room.is_none(),
        room_id: args.room,
        split: args.split,
    };

    let mut client = NetworkClient::new(ClientConfig::default());
    if let Err(e) = client.connect(&request).await {
        client.close();
        return Err(e.into());
    }

    for session in client.sessions() {
        log::info!(
            "P{} {}: {}",
            session.slot() + 1,
            session.player_name(),
            session.status()
        );
    }

    let period = Duration::from_secs_f64(1.0 / args.render_rate.max(1) as f64);
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let inputs = vec![InputState::default(); client.sessions().len()];
    let mut statuses: Vec<String> = client
        .sessions()
        .iter()
        .map(|s| s.status().to_string())
        .collect();
    let mut last = time::Instant::now();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            now = interval.tick() => {
                let dt = now.duration_since(last).as_secs_f32();
                last = now;

                let frame = client.tick(dt, &inputs);
                log::debug!(
                    "entities={} projectiles={} pickups={} rtt={:?}",
                    frame.entities.len(),
                    frame.projectiles.len(),
                    frame.pickups.len(),
                    frame.rtt_ms
                );

                for (session, previous) in client.sessions().iter().zip(statuses.iter_mut()) {
                    let status = session.status().to_string();
                    if status != *previous {
                        log::info!("P{}: {}", session.slot() + 1, status);
                        *previous = status;
                    }
                }
            }
        }
    }

    log::info!("Shutting down");
    client.close();
    Ok(())
}
