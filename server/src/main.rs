use clap::Parser;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

use server::connection::ConnectionManager;
use server::game::HostGame;
use server::scenario::Scenario;
use shared::codec;
use shared::intent::Intent;

/// Events flowing from the per-client session tasks into the tick loop.
#[derive(Debug)]
enum SessionEvent {
    Intent { seat: u32, intent: Intent },
    Disconnected { seat: u32 },
}

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Maximum simultaneous client connections
    #[clap(short, long, default_value_t = shared::MAX_CONNECTIONS)]
    max_clients: usize,
    /// Clients to wait for before the match starts
    #[clap(long, default_value = "1")]
    seats: usize,
    /// Board edge length when generating a skirmish map
    #[clap(long, default_value = "12")]
    board_size: u32,
    /// Seed for the generated skirmish map
    #[clap(long, default_value = "7")]
    seed: u64,
    /// JSON scenario file; a skirmish map is generated when absent
    #[clap(long)]
    scenario: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::skirmish(
            args.board_size,
            args.board_size,
            args.seats as u32,
            args.seed,
        ),
    };
    let mut game = HostGame::new(scenario.build_board()?);

    let mut manager = ConnectionManager::new(args.max_clients);
    manager
        .bind(&format!("{}:{}", args.host, args.port))
        .await?;

    // Lobby phase: accept and handshake clients in lock-step until
    // enough seats are filled. A client that fumbles the handshake is
    // dropped and its seat stays open.
    let seats = args.seats.min(args.max_clients);
    while manager.len() < seats {
        let id = manager.add_client().await?;
        match manager.handshake(id, game.board()).await {
            Ok(()) => game.add_seat(id),
            Err(err) => warn!("client {} failed the handshake: {}", id, err),
        }
    }

    manager.broadcast(codec::GAME_START, false).await?;
    if !manager.all_received(codec::READY_MESSAGE).await {
        warn!("not every client confirmed the start barrier");
    }
    // Anyone dropped during the barrier loses their seat too.
    for seat in game.seats() {
        if !manager.client_ids().contains(&seat) {
            game.remove_seat(seat);
        }
    }

    // Steady state: promote each surviving connection into a reader
    // task (intents in) and a writer task (frames out). The tick loop
    // below is the only place the board is ever mutated.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let mut writers: HashMap<u32, mpsc::UnboundedSender<String>> = HashMap::new();

    for seat in manager.client_ids() {
        let (stream, addr) = manager.into_stream(seat)?;
        let (read_half, mut write_half) = stream.into_split();
        info!("session started for seat {} ({})", seat, addr);

        let events = event_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match Intent::parse(&line) {
                        Ok(intent) => {
                            if events.send(SessionEvent::Intent { seat, intent }).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!("seat {} sent a malformed intent: {}", seat, err),
                    },
                    Ok(None) => break,
                    Err(err) => {
                        error!("seat {} read failed: {}", seat, err);
                        break;
                    }
                }
            }
            let _ = events.send(SessionEvent::Disconnected { seat });
        });

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();
        writers.insert(seat, frame_tx);
        tokio::spawn(async move {
            while let Some(frame) = frame_rx.recv().await {
                if write_half.write_all(frame.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(event_tx);

    run_game_loop(&mut game, &mut event_rx, &mut writers, args.tick_rate).await;
    info!("server stopped after {} ticks", game.tick());
    Ok(())
}

/// The authoritative tick loop: drain intents, advance the simulation,
/// broadcast the frame.
async fn run_game_loop(
    game: &mut HostGame,
    event_rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
    writers: &mut HashMap<u32, mpsc::UnboundedSender<String>>,
    tick_rate: u32,
) {
    let mut ticker = interval(Duration::from_secs_f32(1.0 / tick_rate as f32));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Cap the delta so a stall cannot teleport every animation.
    let max_delta_time = 0.1;
    let mut last_tick = Instant::now();

    // Skip the first tick since it fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(SessionEvent::Intent { seat, intent }) => {
                        game.apply_intent(seat, intent);
                    }
                    Some(SessionEvent::Disconnected { seat }) => {
                        writers.remove(&seat);
                        game.remove_seat(seat);
                        if writers.is_empty() {
                            info!("last client disconnected");
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = ticker.tick() => {
                let now = Instant::now();
                let mut dt = (now - last_tick).as_secs_f32();
                last_tick = now;
                if dt > max_delta_time {
                    dt = max_delta_time;
                }

                game.update(dt);
                let frame = format!("{}\n", game.state_frame());
                writers.retain(|_, frames| frames.send(frame.clone()).is_ok());
                game.clear_damage_markers();

                if game.tick() % 150 == 0 {
                    debug!(
                        "tick {}: {} seats, {} creatures",
                        game.tick(),
                        game.seats().len(),
                        game.board().creature_count()
                    );
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                break;
            }
        }
    }
}
